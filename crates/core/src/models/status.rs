use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Locale;

/// Play status of a game. A closed set; unknown input coerces to [`GameStatus::Tried`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// Every trophy/achievement earned.
    Platinum,
    /// All content played, maybe missing achievements.
    Completed,
    /// Main story finished.
    Finished,
    /// Started and intended to be finished.
    InProgress,
    /// Not played yet.
    NotStarted,
    /// Abandoned.
    Dropped,
    /// Only tried.
    #[default]
    Tried,
    /// Status does not apply.
    NotApplicable,
}

impl GameStatus {
    /// Every status, in display order.
    pub const ALL: [GameStatus; 8] = [
        GameStatus::Platinum,
        GameStatus::Completed,
        GameStatus::Finished,
        GameStatus::InProgress,
        GameStatus::Dropped,
        GameStatus::Tried,
        GameStatus::NotStarted,
        GameStatus::NotApplicable,
    ];

    /// Value written to storage, backups and spreadsheets.
    pub fn wire_value(self) -> &'static str {
        match self {
            GameStatus::Platinum => "Platino",
            GameStatus::Completed => "Completado",
            GameStatus::Finished => "Pasado",
            GameStatus::InProgress => "Empezado",
            GameStatus::NotStarted => "Sin probar",
            GameStatus::Dropped => "Abandonado",
            GameStatus::Tried => "Probado",
            GameStatus::NotApplicable => "No aplica",
        }
    }

    fn english_label(self) -> &'static str {
        match self {
            GameStatus::Platinum => "Platinum",
            GameStatus::Completed => "Completed",
            GameStatus::Finished => "Finished",
            GameStatus::InProgress => "In progress",
            GameStatus::NotStarted => "Not started",
            GameStatus::Dropped => "Dropped",
            GameStatus::Tried => "Tried",
            GameStatus::NotApplicable => "N/A",
        }
    }

    /// Human readable label.
    pub fn label(self, locale: Locale) -> &'static str {
        match locale {
            Locale::Es => self.wire_value(),
            Locale::En => self.english_label(),
        }
    }

    /// Legend text explaining when the status applies.
    pub fn description(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Es, GameStatus::Platinum) => "Tengo el platino.",
            (Locale::Es, GameStatus::Completed) => "Todo el contenido jugado, falta algún logro.",
            (Locale::Es, GameStatus::Finished) => "Historia pasada, no todo el secundario.",
            (Locale::Es, GameStatus::InProgress) => "Empezado y pretendo terminarlo.",
            (Locale::Es, GameStatus::Dropped) => "Lo abandoné por algún motivo.",
            (Locale::Es, GameStatus::Tried) => "Solo lo probé.",
            (Locale::Es, GameStatus::NotStarted) => "Aún no lo probé.",
            (Locale::Es, GameStatus::NotApplicable) => "No corresponde estado.",
            (Locale::En, GameStatus::Platinum) => "Platinum achieved.",
            (Locale::En, GameStatus::Completed) => {
                "All content played, maybe missing achievements."
            }
            (Locale::En, GameStatus::Finished) => "Main story finished, not all side content.",
            (Locale::En, GameStatus::InProgress) => "Started and intend to finish.",
            (Locale::En, GameStatus::Dropped) => "Dropped for some reason.",
            (Locale::En, GameStatus::Tried) => "Only tried it.",
            (Locale::En, GameStatus::NotStarted) => "Haven't played it yet.",
            (Locale::En, GameStatus::NotApplicable) => "State not applicable.",
        }
    }

    /// Strict parse of a wire value or English label, ignoring surrounding whitespace.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL.into_iter().find(|status| {
            status.wire_value() == trimmed || status.english_label().eq_ignore_ascii_case(trimmed)
        })
    }

    /// Lenient parse: anything outside the closed set becomes the default.
    pub fn coerce(input: &str) -> Self {
        Self::parse(input).unwrap_or_default()
    }

    /// Next status in display order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous status in display order, wrapping around.
    pub fn previous(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_value())
    }
}

impl Serialize for GameStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for GameStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::coerce).unwrap_or_default())
    }
}
