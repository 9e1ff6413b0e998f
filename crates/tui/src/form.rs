use std::collections::HashMap;

use backlog_core::{
    models::{Game, GameInput, GameRanking, GameStatus, Locale},
    sanitize::parse_hours,
    spreadsheet::Column,
};

const MAX_INPUT_LEN: usize = 256;

/// Single-line text input with a char-based cursor.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    value: String,
    cursor: usize,
}

impl LineInput {
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.value.len())
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.value.chars().count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn insert(&mut self, ch: char) {
        if ch.is_control() || self.value.chars().count() >= MAX_INPUT_LEN {
            return;
        }
        let index = self.byte_index(self.cursor);
        self.value.insert(index, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let index = self.byte_index(self.cursor);
        self.value.remove(index);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let index = self.byte_index(self.cursor);
            self.value.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

/// Form fields in display order.
pub const FIELDS: [Column; 14] = [
    Column::Title,
    Column::Platform,
    Column::Status,
    Column::Ranking,
    Column::Comment,
    Column::ReleaseDate,
    Column::Publisher,
    Column::Genres,
    Column::FirstPlayedAt,
    Column::StartDate,
    Column::EndDate,
    Column::LastSessionHours,
    Column::YearsPlayed,
    Column::TotalHours,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    MissingTitle,
    InvalidHours(Column),
}

impl FormError {
    pub fn message(&self, locale: Locale) -> String {
        match (self, locale) {
            (FormError::MissingTitle, Locale::Es) => "El nombre es obligatorio".to_string(),
            (FormError::MissingTitle, Locale::En) => "Title is required".to_string(),
            (FormError::InvalidHours(column), Locale::Es) => {
                format!("{} debe ser un número", column.header(locale))
            }
            (FormError::InvalidHours(column), Locale::En) => {
                format!("{} must be a number", column.header(locale))
            }
        }
    }
}

/// Add/edit form state.
#[derive(Debug, Clone)]
pub struct GameForm {
    editing: Option<String>,
    inputs: HashMap<Column, LineInput>,
    status: GameStatus,
    ranking: GameRanking,
    focus: usize,
    pub error: Option<FormError>,
}

impl GameForm {
    pub fn new() -> Self {
        Self::from_input(None, GameInput::default())
    }

    pub fn edit(game: &Game) -> Self {
        Self::from_input(Some(game.id.clone()), game.to_input())
    }

    fn from_input(editing: Option<String>, input: GameInput) -> Self {
        let hours = |value: Option<f64>| value.map(|hours| hours.to_string()).unwrap_or_default();
        let texts = [
            (Column::Title, input.title),
            (Column::Platform, input.platform),
            (Column::Comment, input.comment),
            (Column::ReleaseDate, input.release_date),
            (Column::Publisher, input.publisher),
            (Column::Genres, input.genres),
            (Column::FirstPlayedAt, input.first_played_at),
            (Column::StartDate, input.start_date),
            (Column::EndDate, input.end_date),
            (Column::LastSessionHours, hours(input.last_session_hours)),
            (Column::YearsPlayed, input.years_played),
            (Column::TotalHours, hours(input.total_hours)),
        ];
        Self {
            editing,
            inputs: texts
                .into_iter()
                .map(|(column, value)| (column, LineInput::with_value(value)))
                .collect(),
            status: input.status,
            ranking: input.ranking,
            focus: 0,
            error: None,
        }
    }

    /// Id of the record being edited; `None` when adding.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn focused(&self) -> Column {
        FIELDS[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % FIELDS.len();
    }

    pub fn focus_previous(&mut self) {
        self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len();
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.focused(), Column::Status | Column::Ranking)
    }

    /// Step the focused choice field. Positive steps move towards the end of
    /// the status list and towards better tiers.
    pub fn cycle(&mut self, forward: bool) {
        match self.focused() {
            Column::Status => {
                self.status = if forward {
                    self.status.next()
                } else {
                    self.status.previous()
                }
            }
            Column::Ranking => {
                self.ranking = if forward {
                    self.ranking.promoted()
                } else {
                    self.ranking.demoted()
                }
            }
            _ => {}
        }
    }

    pub fn focused_input(&mut self) -> Option<&mut LineInput> {
        let column = self.focused();
        self.inputs.get_mut(&column)
    }

    /// Label and rendered value for every field, in display order.
    pub fn rows(&self, locale: Locale) -> Vec<(Column, &'static str, String)> {
        FIELDS
            .iter()
            .map(|column| {
                let value = match column {
                    Column::Status => self.status.label(locale).to_string(),
                    Column::Ranking => self.ranking.label().to_string(),
                    other => self
                        .inputs
                        .get(other)
                        .map(|input| input.value().to_string())
                        .unwrap_or_default(),
                };
                (*column, column.header(locale), value)
            })
            .collect()
    }

    pub fn cursor_in_focus(&self) -> Option<usize> {
        self.inputs.get(&self.focused()).map(LineInput::cursor)
    }

    fn text(&self, column: Column) -> String {
        self.inputs
            .get(&column)
            .map(|input| input.value().to_string())
            .unwrap_or_default()
    }

    fn hours(&self, column: Column) -> Result<Option<f64>, FormError> {
        let raw = self.text(column);
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse_hours(&raw)
            .filter(|hours| *hours >= 0.0)
            .map(Some)
            .ok_or(FormError::InvalidHours(column))
    }

    /// Validate and build the record input.
    pub fn submit(&self) -> Result<GameInput, FormError> {
        let input = GameInput {
            title: self.text(Column::Title),
            platform: self.text(Column::Platform),
            status: self.status,
            ranking: self.ranking,
            comment: self.text(Column::Comment),
            release_date: self.text(Column::ReleaseDate),
            publisher: self.text(Column::Publisher),
            genres: self.text(Column::Genres),
            first_played_at: self.text(Column::FirstPlayedAt),
            start_date: self.text(Column::StartDate),
            end_date: self.text(Column::EndDate),
            last_session_hours: self.hours(Column::LastSessionHours)?,
            years_played: self.text(Column::YearsPlayed),
            total_hours: self.hours(Column::TotalHours)?,
        }
        .normalized();
        if !input.has_title() {
            return Err(FormError::MissingTitle);
        }
        Ok(input)
    }
}
