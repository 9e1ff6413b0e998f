//! Writes the collection as a single-sheet workbook.

use std::path::Path;

use chrono::Local;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use crate::models::{Game, Locale};

use super::{sheet_name, Column, SpreadsheetError, SpreadsheetResult, HEADER_ROW};

/// Render `games` to xlsx bytes.
pub fn export_bytes(games: &[Game], locale: Locale) -> SpreadsheetResult<Vec<u8>> {
    let mut workbook = build_workbook(games, locale)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write `games` to an xlsx file at `path`.
pub fn export_to_file(
    games: &[Game],
    path: impl AsRef<Path>,
    locale: Locale,
) -> SpreadsheetResult<()> {
    let path = path.as_ref();
    let mut workbook = build_workbook(games, locale)?;
    workbook.save(path)?;
    info!(path = %path.display(), count = games.len(), "spreadsheet exported");
    Ok(())
}

fn build_workbook(games: &[Game], locale: Locale) -> SpreadsheetResult<Workbook> {
    if games.is_empty() {
        return Err(SpreadsheetError::Empty);
    }

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(locale))?;

    let (title, stamp_label) = match locale {
        Locale::Es => ("GameTracker: mis juegos", "Exportado el"),
        Locale::En => ("GameTracker: my games", "Exported at"),
    };
    sheet.write_string_with_format(0, 0, title, &bold)?;
    let stamp = Local::now().format("%d/%m/%Y %H:%M").to_string();
    sheet.write_string(1, 0, format!("{stamp_label}: {stamp}"))?;

    let header_row = HEADER_ROW as u32;
    for (col, column) in Column::EXPORT_ORDER.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(header_row, col, column.header(locale), &bold)?;
        sheet.set_column_width(col, column_width(*column))?;
    }

    for (offset, game) in games.iter().enumerate() {
        write_game(sheet, header_row + 1 + offset as u32, game, locale)?;
    }
    Ok(workbook)
}

fn write_game(
    sheet: &mut Worksheet,
    row: u32,
    game: &Game,
    locale: Locale,
) -> SpreadsheetResult<()> {
    for (col, column) in Column::EXPORT_ORDER.iter().enumerate() {
        let col = col as u16;
        let hours = match column {
            Column::LastSessionHours => Some(game.last_session_hours),
            Column::TotalHours => Some(game.total_hours),
            _ => None,
        };
        if let Some(hours) = hours {
            if let Some(value) = hours.filter(|value| value.is_finite()) {
                sheet.write_number(row, col, value)?;
            }
            continue;
        }

        let text = match column {
            Column::Title => game.title.as_str(),
            Column::Platform => game.platform.as_str(),
            Column::Status => game.status.label(locale),
            Column::Ranking => game.ranking.label(),
            Column::Comment => game.comment.as_str(),
            Column::ReleaseDate => game.release_date.as_str(),
            Column::Publisher => game.publisher.as_str(),
            Column::Genres => game.genres.as_str(),
            Column::FirstPlayedAt => game.first_played_at.as_str(),
            Column::StartDate => game.start_date.as_str(),
            Column::EndDate => game.end_date.as_str(),
            Column::YearsPlayed => game.years_played.as_str(),
            Column::CreatedAt => game.created_at.as_str(),
            Column::LastSessionHours | Column::TotalHours => "",
        };
        if !text.is_empty() {
            sheet.write_string(row, col, text)?;
        }
    }
    Ok(())
}

fn column_width(column: Column) -> f64 {
    match column {
        Column::Title => 36.0,
        Column::Comment => 40.0,
        Column::Platform | Column::Publisher | Column::Genres => 18.0,
        Column::CreatedAt => 26.0,
        _ => 14.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{GameInput, GameRanking, GameStatus},
        spreadsheet::read_workbook_bytes,
    };

    fn sample() -> Vec<Game> {
        vec![
            Game::from_parts(
                "a".into(),
                "2024-05-01T10:00:00.000Z".into(),
                GameInput {
                    platform: "Switch".into(),
                    status: GameStatus::Completed,
                    ranking: GameRanking::SPlus,
                    comment: "Perfect".into(),
                    release_date: "12/05/2023".into(),
                    genres: "Aventura".into(),
                    last_session_hours: Some(2.5),
                    years_played: "2023".into(),
                    total_hours: Some(120.0),
                    ..GameInput::titled("Tears of the Kingdom")
                },
            ),
            Game::from_parts(
                "b".into(),
                "2024-05-02T10:00:00.000Z".into(),
                GameInput {
                    status: GameStatus::NotStarted,
                    ..GameInput::titled("Ñandú Racing")
                },
            ),
        ]
    }

    #[test]
    fn refuses_empty_collection() {
        let err = export_bytes(&[], Locale::Es).expect_err("empty export");
        assert!(matches!(err, SpreadsheetError::Empty));
    }

    #[test]
    fn exported_workbook_reimports() {
        for locale in [Locale::Es, Locale::En] {
            let bytes = export_bytes(&sample(), locale).expect("export");
            let inputs = read_workbook_bytes(bytes).expect("import");
            assert_eq!(inputs.len(), 2);

            let first = &inputs[0];
            assert_eq!(first.title, "Tears of the Kingdom");
            assert_eq!(first.platform, "Switch");
            assert_eq!(first.status, GameStatus::Completed);
            assert_eq!(first.ranking, GameRanking::SPlus);
            assert_eq!(first.comment, "Perfect");
            assert_eq!(first.release_date, "12/05/2023");
            assert_eq!(first.genres, "Aventura");
            assert_eq!(first.last_session_hours, Some(2.5));
            assert_eq!(first.years_played, "2023");
            assert_eq!(first.total_hours, Some(120.0));

            let second = &inputs[1];
            assert_eq!(second.title, "Ñandú Racing");
            assert_eq!(second.status, GameStatus::NotStarted);
            assert_eq!(second.ranking, GameRanking::G);
            assert_eq!(second.total_hours, None);
        }
    }

    #[test]
    fn writes_file_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("backlog.xlsx");
        export_to_file(&sample(), &path, Locale::Es).expect("export");
        let inputs = crate::spreadsheet::read_workbook(&path).expect("import");
        assert_eq!(inputs.len(), 2);
    }
}
