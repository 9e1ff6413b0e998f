//! Reads the first sheet of a workbook into record inputs.

use std::{
    collections::HashMap,
    io::{Cursor, Read, Seek},
    path::Path,
};

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use tracing::{debug, info};

use crate::{
    models::{GameInput, GameRanking, GameStatus},
    sanitize::parse_hours,
};

use super::{
    dates::cell_to_date_string, Cell, Column, SpreadsheetError, SpreadsheetResult, HEADER_ROW,
};

/// Open a workbook on disk (xls, xlsx, xlsm, xlsb or ods) and map its first sheet.
pub fn read_workbook(path: impl AsRef<Path>) -> SpreadsheetResult<Vec<GameInput>> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|source| SpreadsheetError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let rows = first_sheet_rows(&mut workbook)?;
    let games = map_rows(&rows)?;
    info!(path = %path.display(), count = games.len(), "spreadsheet imported");
    Ok(games)
}

/// Same as [`read_workbook`] for a workbook already held in memory.
pub fn read_workbook_bytes(bytes: Vec<u8>) -> SpreadsheetResult<Vec<GameInput>> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|source| SpreadsheetError::Open {
            path: "memory".to_string(),
            source,
        })?;
    let rows = first_sheet_rows(&mut workbook)?;
    map_rows(&rows)
}

fn first_sheet_rows<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
) -> SpreadsheetResult<Vec<Vec<Cell>>> {
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SpreadsheetError::NoSheets)?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|source| SpreadsheetError::Sheet {
            sheet: sheet.clone(),
            source,
        })?;
    debug!(sheet = %sheet, "reading first sheet");
    Ok(absolute_rows(&range))
}

/// Rebuild the grid from A1 so header offsets stay meaningful even when the
/// sheet starts with blank rows or columns.
fn absolute_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let mut rows: Vec<Vec<Cell>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }
    rows
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::Bool(*value),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|datetime| Cell::Date(datetime.date()))
            .unwrap_or_else(|| Cell::Number(value.as_f64())),
        Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
    }
}

/// Column positions resolved from the header row.
struct HeaderMap {
    positions: HashMap<Column, usize>,
}

impl HeaderMap {
    fn from_header(header: &[Cell]) -> Self {
        let labels: Vec<String> = header
            .iter()
            .map(|cell| match cell {
                Cell::Text(text) => text.trim().to_lowercase(),
                _ => String::new(),
            })
            .collect();
        let mut positions = HashMap::new();
        for column in Column::EXPORT_ORDER {
            let found = column.import_prefixes().iter().find_map(|prefix| {
                labels
                    .iter()
                    .position(|label| !label.is_empty() && label.starts_with(prefix))
            });
            if let Some(index) = found {
                positions.insert(column, index);
            }
        }
        Self { positions }
    }

    fn cell<'a>(&self, row: &'a [Cell], column: Column) -> &'a Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.positions
            .get(&column)
            .and_then(|index| row.get(*index))
            .unwrap_or(EMPTY)
    }
}

/// Map a decoded grid to record inputs.
///
/// The header is read from [`HEADER_ROW`]; rows without a title are skipped.
pub fn map_rows(rows: &[Vec<Cell>]) -> SpreadsheetResult<Vec<GameInput>> {
    let header = rows.get(HEADER_ROW).map(Vec::as_slice).unwrap_or(&[]);
    let columns = HeaderMap::from_header(header);
    if !columns.positions.contains_key(&Column::Title) {
        return Err(SpreadsheetError::MissingTitleColumn {
            row: HEADER_ROW + 1,
        });
    }

    let mut games = Vec::new();
    for (offset, row) in rows.iter().skip(HEADER_ROW + 1).enumerate() {
        let title = columns.cell(row, Column::Title);
        if title.is_blank() {
            debug!(row = HEADER_ROW + 2 + offset, "skipping row without title");
            continue;
        }
        let text = |column| columns.cell(row, column).text();
        let date = |column| cell_to_date_string(columns.cell(row, column));
        let hours = |column| match columns.cell(row, column) {
            Cell::Number(value) if value.is_finite() => Some(*value),
            Cell::Text(value) => parse_hours(value),
            _ => None,
        };

        games.push(GameInput {
            title: title.text(),
            platform: text(Column::Platform),
            status: GameStatus::coerce(&text(Column::Status)),
            ranking: GameRanking::coerce(&text(Column::Ranking)),
            comment: text(Column::Comment),
            release_date: date(Column::ReleaseDate),
            publisher: text(Column::Publisher),
            genres: text(Column::Genres),
            first_played_at: date(Column::FirstPlayedAt),
            start_date: date(Column::StartDate),
            end_date: date(Column::EndDate),
            last_session_hours: hours(Column::LastSessionHours),
            years_played: text(Column::YearsPlayed),
            total_hours: hours(Column::TotalHours),
        });
    }
    Ok(games)
}
