//! Spreadsheet import and export.
//!
//! Layout shared by both directions: two metadata rows, the header row at
//! [`HEADER_ROW`], then one record per row.

pub mod dates;
pub mod export;
pub mod import;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::Locale;

pub use export::{export_bytes, export_to_file};
pub use import::{map_rows, read_workbook, read_workbook_bytes};

/// Zero-based index of the header row.
pub const HEADER_ROW: usize = 2;

/// Default file name offered for spreadsheet exports.
pub const DEFAULT_EXPORT_NAME: &str = "gametracker-backup.xlsx";

/// Result alias for spreadsheet operations.
pub type SpreadsheetResult<T> = Result<T, SpreadsheetError>;

/// Failures while reading or writing spreadsheets.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    /// The workbook could not be opened or decoded.
    #[error("failed to open spreadsheet {path} (use the original file)")]
    Open {
        /// Source path or `memory`.
        path: String,
        #[source]
        source: calamine::Error,
    },
    /// The workbook has no sheets.
    #[error("spreadsheet has no sheets (use the original file)")]
    NoSheets,
    /// The first sheet could not be read.
    #[error("failed to read sheet `{sheet}` (use the original file)")]
    Sheet {
        /// Sheet name.
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    /// The header row has no title column.
    #[error("no title column in header row {row} (use the original file)")]
    MissingTitleColumn {
        /// One-based row number as shown by spreadsheet programs.
        row: usize,
    },
    /// Nothing to export.
    #[error("no games to export")]
    Empty,
    /// Writing the workbook failed.
    #[error("failed to write spreadsheet")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

/// A decoded cell, independent of the workbook library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Blank or error cell.
    Empty,
    /// Text cell.
    Text(String),
    /// Numeric cell; may also be a date serial.
    Number(f64),
    /// Native date cell.
    Date(NaiveDate),
    /// Boolean cell.
    Bool(bool),
}

impl Cell {
    /// Text form of the cell, trimmed. Whole numbers print without decimals.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(number) => number.to_string(),
            Cell::Date(date) => dates::format_date(*date),
            Cell::Bool(value) => value.to_string(),
        }
    }

    /// Whether the cell carries no usable content.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// Record fields that map to spreadsheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Game title.
    Title,
    /// Platform.
    Platform,
    /// Status.
    Status,
    /// Ranking tier.
    Ranking,
    /// Notes.
    Comment,
    /// Release date.
    ReleaseDate,
    /// Publisher.
    Publisher,
    /// Genres.
    Genres,
    /// First played date.
    FirstPlayedAt,
    /// Latest session start.
    StartDate,
    /// Finish date.
    EndDate,
    /// Hours in the latest session.
    LastSessionHours,
    /// Completion year(s).
    YearsPlayed,
    /// Total hours.
    TotalHours,
    /// Creation timestamp; export only.
    CreatedAt,
}

impl Column {
    /// Export column order.
    pub const EXPORT_ORDER: [Column; 15] = [
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
        Column::CreatedAt,
    ];

    /// Header written on export.
    pub fn header(self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::Es, Column::Title) => "Nombre",
            (Locale::Es, Column::Platform) => "Plataforma",
            (Locale::Es, Column::Status) => "Estado",
            (Locale::Es, Column::Ranking) => "Tier",
            (Locale::Es, Column::Comment) => "Notas",
            (Locale::Es, Column::ReleaseDate) => "Fecha de lanzamiento",
            (Locale::Es, Column::Publisher) => "Publisher",
            (Locale::Es, Column::Genres) => "Género(s)",
            (Locale::Es, Column::FirstPlayedAt) => "Fecha primera vez",
            (Locale::Es, Column::StartDate) => "Fecha de comienzo",
            (Locale::Es, Column::EndDate) => "Fecha de fin",
            (Locale::Es, Column::LastSessionHours) => "Horas jugadas (última partida)",
            (Locale::Es, Column::YearsPlayed) => "Año completado",
            (Locale::Es, Column::TotalHours) => "Horas totales",
            (Locale::Es, Column::CreatedAt) => "Creado el",
            (Locale::En, Column::Title) => "Title",
            (Locale::En, Column::Platform) => "Platform",
            (Locale::En, Column::Status) => "Status",
            (Locale::En, Column::Ranking) => "Tier",
            (Locale::En, Column::Comment) => "Notes",
            (Locale::En, Column::ReleaseDate) => "Release date",
            (Locale::En, Column::Publisher) => "Publisher",
            (Locale::En, Column::Genres) => "Genre(s)",
            (Locale::En, Column::FirstPlayedAt) => "First played",
            (Locale::En, Column::StartDate) => "Start date",
            (Locale::En, Column::EndDate) => "Finish date",
            (Locale::En, Column::LastSessionHours) => "Hours played (last session)",
            (Locale::En, Column::YearsPlayed) => "Completed year",
            (Locale::En, Column::TotalHours) => "Total hours",
            (Locale::En, Column::CreatedAt) => "Created at",
        }
    }

    /// Lower-case header prefixes recognised on import, most preferred first.
    ///
    /// For the completion year the current header is tried before the legacy
    /// "años pasado" / "years played" names.
    pub fn import_prefixes(self) -> &'static [&'static str] {
        match self {
            Column::Title => &["nombre", "title"],
            Column::Platform => &["plataforma", "platform"],
            Column::Status => &["estado", "status"],
            Column::Ranking => &["tier", "ranking"],
            Column::Comment => &["nota", "notes"],
            Column::ReleaseDate => &["fecha de lanzamiento", "release date"],
            Column::Publisher => &["publisher"],
            Column::Genres => &["género", "genero", "genre"],
            Column::FirstPlayedAt => &["fecha primera", "first played"],
            Column::StartDate => &["fecha de comienzo", "start date"],
            Column::EndDate => &["fecha de fin", "finish date", "end date"],
            Column::LastSessionHours => &["horas jugadas", "hours played"],
            Column::YearsPlayed => &[
                "año completado",
                "completed year",
                "años pasado",
                "years played",
            ],
            Column::TotalHours => &["horas totales", "total hours"],
            Column::CreatedAt => &[],
        }
    }
}

/// Sheet name used on export.
pub fn sheet_name(locale: Locale) -> &'static str {
    match locale {
        Locale::Es => "Juegos",
        Locale::En => "Games",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_matches_spreadsheet_display() {
        assert_eq!(Cell::Number(2018.0).text(), "2018");
        assert_eq!(Cell::Number(12.5).text(), "12.5");
        assert_eq!(Cell::Text("  PS5 ".into()).text(), "PS5");
        assert!(Cell::Text("   ".into()).is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn export_headers_are_importable() {
        for locale in [Locale::Es, Locale::En] {
            for column in Column::EXPORT_ORDER {
                if column == Column::CreatedAt {
                    continue;
                }
                let header = column.header(locale).to_lowercase();
                assert!(
                    column
                        .import_prefixes()
                        .iter()
                        .any(|prefix| header.starts_with(prefix)),
                    "{header} not recognised for {column:?}"
                );
            }
        }
    }
}
