//! Record sanitizing shared by every path that brings outside data into the store.
//!
//! Persisted slots, JSON imports and spreadsheet rows all funnel through here
//! so the closed-set fields always hold a valid value once in memory.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Game, GameRanking, GameStatus};

/// Keys a raw entry must carry to be kept.
pub const REQUIRED_KEYS: [&str; 3] = ["id", "title", "createdAt"];

/// Turn one raw JSON entry into a record, or `None` when it cannot be kept.
///
/// Missing or invalid `status`/`ranking` are defaulted, numeric optionals that
/// are not numbers become `None`, and other optional text defaults to empty.
pub fn sanitize_record(raw: &Value) -> Option<Game> {
    let object = raw.as_object()?;
    let id = required_text(object, "id")?;
    let title = required_text(object, "title")?;
    let created_at = required_text(object, "createdAt")?;

    Some(Game {
        id,
        title,
        platform: optional_text(object, "platform"),
        status: object
            .get("status")
            .and_then(Value::as_str)
            .map(GameStatus::coerce)
            .unwrap_or_default(),
        ranking: object
            .get("ranking")
            .and_then(Value::as_str)
            .map(GameRanking::coerce)
            .unwrap_or_default(),
        comment: optional_text(object, "comment"),
        created_at,
        release_date: optional_text(object, "releaseDate"),
        publisher: optional_text(object, "publisher"),
        genres: optional_text(object, "genres"),
        first_played_at: optional_text(object, "firstPlayedAt"),
        start_date: optional_text(object, "startDate"),
        end_date: optional_text(object, "endDate"),
        last_session_hours: optional_number(object, "lastSessionHours"),
        years_played: optional_text(object, "yearsPlayed"),
        total_hours: optional_number(object, "totalHours"),
    })
}

/// Sanitize a whole collection, dropping unusable entries and repeated ids.
///
/// The first occurrence of an id wins.
pub fn sanitize_collection(entries: &[Value]) -> Vec<Game> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut games = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match sanitize_record(entry) {
            Some(game) if seen.insert(game.id.clone()) => games.push(game),
            Some(game) => debug!(index, id = %game.id, "dropping duplicate record id"),
            None => debug!(index, "dropping malformed record"),
        }
    }
    games
}

fn required_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn optional_text(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

/// Lenient numeric coercion used for the hour fields.
pub fn coerce_hours(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => parse_hours(text),
        _ => None,
    }
}

/// Parse hour text, accepting a decimal comma (`12,5`).
pub fn parse_hours(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn optional_number(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object.get(key).and_then(coerce_hours)
}
