//! Shared domain models.

mod ranking;
mod status;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use ranking::GameRanking;
pub use status::GameStatus;

/// Display language used for labels, legends and spreadsheet headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Spanish, the language of the original spreadsheets.
    #[default]
    Es,
    /// English.
    En,
}

impl Locale {
    /// Toggle between the two supported languages.
    pub fn toggled(self) -> Self {
        match self {
            Locale::Es => Locale::En,
            Locale::En => Locale::Es,
        }
    }

    /// Short code shown in the interface.
    pub fn code(self) -> &'static str {
        match self {
            Locale::Es => "es",
            Locale::En => "en",
        }
    }
}

/// A tracked game entry.
///
/// Field order matches the interchange format written by
/// [`crate::store::GameStore::export_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Opaque unique identifier assigned at creation.
    pub id: String,
    /// Game title; never empty for records created through the store.
    pub title: String,
    /// Platform(s) the game was played on.
    #[serde(default)]
    pub platform: String,
    /// Play status.
    #[serde(default)]
    pub status: GameStatus,
    /// Subjective quality tier.
    #[serde(default)]
    pub ranking: GameRanking,
    /// Free-form notes.
    #[serde(default)]
    pub comment: String,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Release date, usually `dd/mm/yyyy`.
    #[serde(default)]
    pub release_date: String,
    /// Publisher or developer.
    #[serde(default)]
    pub publisher: String,
    /// Comma separated genres.
    #[serde(default)]
    pub genres: String,
    /// Date the game was first played.
    #[serde(default)]
    pub first_played_at: String,
    /// Start date of the latest session.
    #[serde(default)]
    pub start_date: String,
    /// Date the game was finished.
    #[serde(default)]
    pub end_date: String,
    /// Hours played in the latest session.
    #[serde(default)]
    pub last_session_hours: Option<f64>,
    /// Year(s) the game was completed.
    #[serde(default)]
    pub years_played: String,
    /// Total hours played.
    #[serde(default)]
    pub total_hours: Option<f64>,
}

impl Game {
    /// Materialize a new record from user input, assigning identity and timestamp.
    pub fn create(input: GameInput) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::from_parts(id, created_at, input)
    }

    /// Assemble a record from an existing identity and the editable fields.
    pub fn from_parts(id: String, created_at: String, input: GameInput) -> Self {
        Self {
            id,
            title: input.title,
            platform: input.platform,
            status: input.status,
            ranking: input.ranking,
            comment: input.comment,
            created_at,
            release_date: input.release_date,
            publisher: input.publisher,
            genres: input.genres,
            first_played_at: input.first_played_at,
            start_date: input.start_date,
            end_date: input.end_date,
            last_session_hours: input.last_session_hours,
            years_played: input.years_played,
            total_hours: input.total_hours,
        }
    }

    /// Replace every editable field, keeping `id` and `created_at`.
    pub fn apply(&mut self, input: GameInput) {
        let id = std::mem::take(&mut self.id);
        let created_at = std::mem::take(&mut self.created_at);
        *self = Self::from_parts(id, created_at, input);
    }

    /// The editable fields of this record.
    pub fn to_input(&self) -> GameInput {
        GameInput {
            title: self.title.clone(),
            platform: self.platform.clone(),
            status: self.status,
            ranking: self.ranking,
            comment: self.comment.clone(),
            release_date: self.release_date.clone(),
            publisher: self.publisher.clone(),
            genres: self.genres.clone(),
            first_played_at: self.first_played_at.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            last_session_hours: self.last_session_hours,
            years_played: self.years_played.clone(),
            total_hours: self.total_hours,
        }
    }

    /// Parsed creation timestamp, when it is valid RFC 3339.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|value| value.with_timezone(&Utc))
    }
}

/// Editable fields of a [`Game`]; everything except `id` and `created_at`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInput {
    pub title: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub ranking: GameRanking,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub genres: String,
    #[serde(default)]
    pub first_played_at: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub last_session_hours: Option<f64>,
    #[serde(default)]
    pub years_played: String,
    #[serde(default)]
    pub total_hours: Option<f64>,
}

impl Default for GameInput {
    /// Values a blank entry form starts from.
    fn default() -> Self {
        Self {
            title: String::new(),
            platform: String::new(),
            status: GameStatus::InProgress,
            ranking: GameRanking::default(),
            comment: String::new(),
            release_date: String::new(),
            publisher: String::new(),
            genres: String::new(),
            first_played_at: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            last_session_hours: None,
            years_played: String::new(),
            total_hours: None,
        }
    }
}

impl GameInput {
    /// Convenience constructor used by importers and tests.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Trim surrounding whitespace from every text field.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.title,
            &mut self.platform,
            &mut self.comment,
            &mut self.release_date,
            &mut self.publisher,
            &mut self.genres,
            &mut self.first_played_at,
            &mut self.start_date,
            &mut self.end_date,
            &mut self.years_played,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self
    }

    /// Whether the only required field is present.
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_assigns_identity() {
        let game = Game::create(GameInput::titled("Hades"));
        assert!(!game.id.is_empty());
        assert!(game.created_at_utc().is_some());
        assert_eq!(game.title, "Hades");
        assert_eq!(game.status, GameStatus::InProgress);
        assert_eq!(game.ranking, GameRanking::G);
    }

    #[test]
    fn apply_keeps_identity() {
        let mut game = Game::create(GameInput::titled("Celeste"));
        let id = game.id.clone();
        let created = game.created_at.clone();

        let mut input = game.to_input();
        input.title = "Celeste (Farewell)".to_string();
        input.ranking = GameRanking::SPlus;
        input.total_hours = Some(41.5);
        game.apply(input);

        assert_eq!(game.id, id);
        assert_eq!(game.created_at, created);
        assert_eq!(game.title, "Celeste (Farewell)");
        assert_eq!(game.ranking, GameRanking::SPlus);
        assert_eq!(game.total_hours, Some(41.5));
    }

    #[test]
    fn serializes_camel_case_with_nulls() {
        let game = Game::create(GameInput::titled("Outer Wilds"));
        let value = serde_json::to_value(&game).expect("serialize game");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("firstPlayedAt").is_some());
        assert_eq!(value["lastSessionHours"], serde_json::Value::Null);
        assert_eq!(value["totalHours"], serde_json::Value::Null);
        assert_eq!(value["ranking"], "G");
        assert_eq!(value["status"], "Empezado");
    }

    #[test]
    fn normalized_trims_text() {
        let mut input = GameInput::titled("  Tunic ");
        input.platform = " PC ".to_string();
        let input = input.normalized();
        assert_eq!(input.title, "Tunic");
        assert_eq!(input.platform, "PC");
        assert!(input.has_title());
        assert!(!GameInput::titled("   ").has_title());
    }
}
