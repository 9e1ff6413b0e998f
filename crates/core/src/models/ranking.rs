use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Locale;

/// Subjective quality tier, from `S+` (best) down to `G`.
///
/// Ordering follows [`GameRanking::ALL`]: `S+ < S < A < ... < G`, so an
/// ascending sort lists the best tiers first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameRanking {
    /// Key games, even above `S`.
    SPlus,
    /// Excellent.
    S,
    /// Outstanding.
    A,
    /// Very good.
    B,
    /// Good.
    C,
    /// Decent.
    D,
    /// Mediocre.
    E,
    /// Waste of time.
    F,
    /// No opinion; the lowest tier and the fallback for unknown input.
    #[default]
    G,
}

impl GameRanking {
    /// The tier sequence, best first. [`GameRanking::rank`] indexes into it.
    pub const ALL: [GameRanking; 9] = [
        GameRanking::SPlus,
        GameRanking::S,
        GameRanking::A,
        GameRanking::B,
        GameRanking::C,
        GameRanking::D,
        GameRanking::E,
        GameRanking::F,
        GameRanking::G,
    ];

    /// Position in the tier sequence; `0` is the best tier.
    pub fn rank(self) -> usize {
        match self {
            GameRanking::SPlus => 0,
            GameRanking::S => 1,
            GameRanking::A => 2,
            GameRanking::B => 3,
            GameRanking::C => 4,
            GameRanking::D => 5,
            GameRanking::E => 6,
            GameRanking::F => 7,
            GameRanking::G => 8,
        }
    }

    /// Tier label; identical across locales.
    pub fn label(self) -> &'static str {
        match self {
            GameRanking::SPlus => "S+",
            GameRanking::S => "S",
            GameRanking::A => "A",
            GameRanking::B => "B",
            GameRanking::C => "C",
            GameRanking::D => "D",
            GameRanking::E => "E",
            GameRanking::F => "F",
            GameRanking::G => "G",
        }
    }

    /// Legend text for the tier.
    pub fn description(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Es, GameRanking::SPlus) => {
                "Prácticamente igual que S pero me marcó más; juegos clave."
            }
            (Locale::Es, GameRanking::S) => "Excelente.",
            (Locale::Es, GameRanking::A) => "Sobresaliente.",
            (Locale::Es, GameRanking::B) => "Muy bueno.",
            (Locale::Es, GameRanking::C) => "Bueno.",
            (Locale::Es, GameRanking::D) => "Decente.",
            (Locale::Es, GameRanking::E) => "Mediocre.",
            (Locale::Es, GameRanking::F) => "Basura infecta, pérdida de tiempo.",
            (Locale::Es, GameRanking::G) => "Irrelevante, sin opinión.",
            (Locale::En, GameRanking::SPlus) => {
                "Almost like S but resonated even more; key games."
            }
            (Locale::En, GameRanking::S) => "Excellent.",
            (Locale::En, GameRanking::A) => "Outstanding.",
            (Locale::En, GameRanking::B) => "Very good.",
            (Locale::En, GameRanking::C) => "Good.",
            (Locale::En, GameRanking::D) => "Decent.",
            (Locale::En, GameRanking::E) => "Mediocre.",
            (Locale::En, GameRanking::F) => "Terrible, waste of time.",
            (Locale::En, GameRanking::G) => "Irrelevant, no opinion yet.",
        }
    }

    /// Strict parse of a tier label. Labels are case-sensitive (`s` is not `S`).
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL.into_iter().find(|tier| tier.label() == trimmed)
    }

    /// Lenient parse: anything outside the closed set becomes the lowest tier.
    pub fn coerce(input: &str) -> Self {
        Self::parse(input).unwrap_or_default()
    }

    /// One tier better, saturating at `S+`.
    pub fn promoted(self) -> Self {
        Self::ALL[self.rank().saturating_sub(1)]
    }

    /// One tier worse, saturating at `G`.
    pub fn demoted(self) -> Self {
        Self::ALL[(self.rank() + 1).min(Self::ALL.len() - 1)]
    }
}

impl Ord for GameRanking {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for GameRanking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GameRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for GameRanking {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for GameRanking {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::coerce).unwrap_or_default())
    }
}
