//! Filtering, sorting, paging and summary statistics over the collection.
//!
//! Everything here works on borrowed records and never reorders the store.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::models::{Game, GameRanking, GameStatus, Locale};

/// Number of records per list page.
pub const DEFAULT_PAGE_SIZE: usize = 9;

/// Sort keys offered by the list view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest first by creation timestamp.
    Created,
    /// Title, ascending, locale aware.
    #[default]
    Title,
    /// Best tier first.
    Ranking,
}

impl SortKey {
    /// Cycle to the next key.
    pub fn next(self) -> Self {
        match self {
            SortKey::Created => SortKey::Title,
            SortKey::Title => SortKey::Ranking,
            SortKey::Ranking => SortKey::Created,
        }
    }

    /// Label for the interface.
    pub fn label(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Es, SortKey::Created) => "Recientes",
            (Locale::Es, SortKey::Title) => "Título (A-Z)",
            (Locale::Es, SortKey::Ranking) => "Ranking",
            (Locale::En, SortKey::Created) => "Newest",
            (Locale::En, SortKey::Title) => "Title (A-Z)",
            (Locale::En, SortKey::Ranking) => "Ranking",
        }
    }
}

/// Filters plus one sort key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameQuery {
    /// Case-insensitive title substring; blank matches everything.
    pub search: String,
    /// Exact status match.
    pub status: Option<GameStatus>,
    /// Exact ranking match.
    pub ranking: Option<GameRanking>,
    /// Ordering applied after filtering.
    pub sort: SortKey,
    /// Collation used by [`SortKey::Title`].
    pub locale: Locale,
}

impl GameQuery {
    /// Whether `game` passes every active filter.
    pub fn matches(&self, game: &Game) -> bool {
        if let Some(status) = self.status {
            if game.status != status {
                return false;
            }
        }
        if let Some(ranking) = self.ranking {
            if game.ranking != ranking {
                return false;
            }
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || game.title.to_lowercase().contains(&needle)
    }

    /// Filter then stably sort, returning borrowed records.
    pub fn apply<'a>(&self, games: &'a [Game]) -> Vec<&'a Game> {
        let mut selected: Vec<&Game> = games.iter().filter(|game| self.matches(game)).collect();
        match self.sort {
            // Unparseable timestamps share the `None` bucket and sort last.
            SortKey::Created => selected.sort_by_cached_key(|game| {
                Reverse((game.created_at_utc(), game.created_at.clone()))
            }),
            SortKey::Title => {
                let locale = self.locale;
                selected.sort_by_cached_key(|game| collation_key(&game.title, locale));
            }
            SortKey::Ranking => selected.sort_by_key(|game| game.ranking.rank()),
        }
        selected
    }
}

/// Sort key approximating locale collation for Latin titles.
///
/// Case and common diacritics are folded. In Spanish `ñ` sorts as its own
/// letter between `n` and `o`; in English it folds to `n`.
pub fn collation_key(title: &str, locale: Locale) -> String {
    let mut key = String::with_capacity(title.len());
    for ch in title.trim().chars().flat_map(char::to_lowercase) {
        match ch {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => key.push('a'),
            'é' | 'è' | 'ê' | 'ë' => key.push('e'),
            'í' | 'ì' | 'î' | 'ï' => key.push('i'),
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => key.push('o'),
            'ú' | 'ù' | 'û' | 'ü' => key.push('u'),
            'ç' => key.push('c'),
            'ý' | 'ÿ' => key.push('y'),
            'ñ' => match locale {
                Locale::Es => key.push_str("n\u{10FFFF}"),
                Locale::En => key.push('n'),
            },
            other => key.push(other),
        }
    }
    key
}

/// A window over a filtered list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// Records on this page.
    pub items: Vec<&'a Game>,
    /// One-based page number after clamping.
    pub number: usize,
    /// Total number of pages; at least one.
    pub count: usize,
    /// Number of records across every page.
    pub total: usize,
}

/// Number of pages needed for `total` records; never zero.
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Slice one page out of `items`, clamping `page` (one-based) into range.
pub fn paginate<'a>(items: &[&'a Game], page: usize, page_size: usize) -> Page<'a> {
    let page_size = page_size.max(1);
    let count = page_count(items.len(), page_size);
    let number = page.clamp(1, count);
    let start = (number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    Page {
        items: items.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
        number,
        count,
        total: items.len(),
    }
}

/// Collection totals shown in the list header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// All records.
    pub total: usize,
    /// Per-status counts in [`GameStatus::ALL`] order.
    pub by_status: Vec<(GameStatus, usize)>,
}

impl StatusCounts {
    /// Count `games` by status.
    pub fn from_games(games: &[Game]) -> Self {
        let by_status = GameStatus::ALL
            .iter()
            .map(|status| {
                let count = games.iter().filter(|game| game.status == *status).count();
                (*status, count)
            })
            .collect();
        Self {
            total: games.len(),
            by_status,
        }
    }

    /// Count for one status.
    pub fn count(&self, status: GameStatus) -> usize {
        self.by_status
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GameInput;

    fn game(id: &str, title: &str, status: GameStatus, ranking: GameRanking, created: &str) -> Game {
        Game::from_parts(
            id.to_string(),
            created.to_string(),
            GameInput {
                status,
                ranking,
                ..GameInput::titled(title)
            },
        )
    }

    fn titles(games: &[&Game]) -> Vec<String> {
        games.iter().map(|g| g.title.clone()).collect()
    }

    fn sample() -> Vec<Game> {
        vec![
            game("1", "Zelda", GameStatus::Completed, GameRanking::A, "2024-01-01T00:00:00Z"),
            game("2", "Ápex", GameStatus::Dropped, GameRanking::G, "2024-03-01T00:00:00Z"),
            game("3", "Bayonetta", GameStatus::Completed, GameRanking::S, "2024-02-01T00:00:00Z"),
            game("4", "Alan Wake", GameStatus::Completed, GameRanking::A, "2024-04-01T00:00:00Z"),
        ]
    }

    #[test]
    fn ranking_sort_follows_tiers() {
        let games = vec![
            game("a", "Game A", GameStatus::Tried, GameRanking::B, "2024-01-01T00:00:00Z"),
            game("b", "Game B", GameStatus::Tried, GameRanking::S, "2024-01-02T00:00:00Z"),
        ];
        let query = GameQuery {
            sort: SortKey::Ranking,
            ..GameQuery::default()
        };
        assert_eq!(titles(&query.apply(&games)), vec!["Game B", "Game A"]);
    }

    #[test]
    fn ranking_sort_is_stable() {
        let query = GameQuery {
            sort: SortKey::Ranking,
            ..GameQuery::default()
        };
        let games = sample();
        assert_eq!(
            titles(&query.apply(&games)),
            vec!["Bayonetta", "Zelda", "Alan Wake", "Ápex"]
        );
    }

    #[test]
    fn title_sort_folds_case_and_accents() {
        let games = sample();
        let query = GameQuery::default();
        assert_eq!(
            titles(&query.apply(&games)),
            vec!["Alan Wake", "Ápex", "Bayonetta", "Zelda"]
        );
    }

    #[test]
    fn spanish_collation_places_enye_after_n() {
        assert!(collation_key("Ñu", Locale::Es) > collation_key("Nz", Locale::Es));
        assert!(collation_key("Ñu", Locale::Es) < collation_key("O", Locale::Es));
        assert!(collation_key("Ñu", Locale::En) < collation_key("Nz", Locale::En));
    }

    #[test]
    fn created_sort_is_newest_first() {
        let games = sample();
        let query = GameQuery {
            sort: SortKey::Created,
            ..GameQuery::default()
        };
        assert_eq!(
            titles(&query.apply(&games)),
            vec!["Alan Wake", "Ápex", "Bayonetta", "Zelda"]
        );
    }

    fn ids(games: &[&Game]) -> Vec<String> {
        games.iter().map(|g| g.id.clone()).collect()
    }

    #[test]
    fn title_sort_keeps_input_order_for_equal_keys() {
        let games = vec![
            game("1", "zelda", GameStatus::Tried, GameRanking::G, "2024-01-01T00:00:00Z"),
            game("2", "Zelda", GameStatus::Tried, GameRanking::G, "2024-01-02T00:00:00Z"),
            game("3", "Zélda", GameStatus::Tried, GameRanking::G, "2024-01-03T00:00:00Z"),
        ];
        let query = GameQuery::default();
        assert_eq!(ids(&query.apply(&games)), vec!["1", "2", "3"]);
    }

    #[test]
    fn created_sort_keeps_input_order_for_equal_timestamps() {
        let games = vec![
            game("1", "Hades", GameStatus::Tried, GameRanking::G, "2024-05-01T10:00:00Z"),
            game("2", "Tunic", GameStatus::Tried, GameRanking::G, "2024-05-01T10:00:00Z"),
            game("3", "Celeste", GameStatus::Tried, GameRanking::G, "2024-05-01T10:00:00Z"),
        ];
        let query = GameQuery {
            sort: SortKey::Created,
            ..GameQuery::default()
        };
        assert_eq!(ids(&query.apply(&games)), vec!["1", "2", "3"]);
    }

    #[test]
    fn created_sort_is_consistent_with_unparseable_timestamps() {
        let mut games = vec![
            game("1", "Offset", GameStatus::Tried, GameRanking::G, "2024-01-01T00:00:00+05:00"),
            game("2", "Broken", GameStatus::Tried, GameRanking::G, "2023-12-31T21:00 not rfc3339"),
            game("3", "Utc", GameStatus::Tried, GameRanking::G, "2023-12-31T20:00:00Z"),
        ];
        let query = GameQuery {
            sort: SortKey::Created,
            ..GameQuery::default()
        };
        let forward = ids(&query.apply(&games));
        assert_eq!(forward, vec!["3", "1", "2"]);

        games.reverse();
        assert_eq!(ids(&query.apply(&games)), forward);
    }

    #[test]
    fn filters_intersect() {
        let games = sample();
        let query = GameQuery {
            status: Some(GameStatus::Completed),
            ranking: Some(GameRanking::A),
            ..GameQuery::default()
        };
        assert_eq!(titles(&query.apply(&games)), vec!["Alan Wake", "Zelda"]);

        let query = GameQuery {
            search: "  ZEL ".to_string(),
            status: Some(GameStatus::Completed),
            ..GameQuery::default()
        };
        assert_eq!(titles(&query.apply(&games)), vec!["Zelda"]);
    }

    #[test]
    fn apply_leaves_source_order_untouched() {
        let games = sample();
        let query = GameQuery {
            sort: SortKey::Ranking,
            ..GameQuery::default()
        };
        let _ = query.apply(&games);
        assert_eq!(games[0].title, "Zelda");
    }

    #[test]
    fn paginate_clamps() {
        let games: Vec<Game> = (0..20)
            .map(|i| {
                game(
                    &i.to_string(),
                    &format!("Game {i:02}"),
                    GameStatus::Tried,
                    GameRanking::G,
                    "2024-01-01T00:00:00Z",
                )
            })
            .collect();
        let refs: Vec<&Game> = games.iter().collect();
        let page = paginate(&refs, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(page.count, 3);
        assert_eq!(page.items.len(), 2);

        let page = paginate(&refs, 99, DEFAULT_PAGE_SIZE);
        assert_eq!(page.number, 3);
        let page = paginate(&[], 0, DEFAULT_PAGE_SIZE);
        assert_eq!(page.number, 1);
        assert_eq!(page.count, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn counts_by_status() {
        let counts = StatusCounts::from_games(&sample());
        assert_eq!(counts.total, 4);
        assert_eq!(counts.count(GameStatus::Completed), 3);
        assert_eq!(counts.count(GameStatus::Dropped), 1);
        assert_eq!(counts.count(GameStatus::Platinum), 0);
    }
}
