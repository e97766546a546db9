// SPDX-FileCopyrightText: 2026 Sebar Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the single-writer connection.

pub mod jobs;
pub mod schedules;

use chrono::{DateTime, SecondsFormat, Utc};

/// Serialize a timestamp to the RFC3339 millisecond form used in all
/// timestamp columns (matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ')`).
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp column value.
pub(crate) fn parse_ts(col: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    value.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

/// Parse an optional timestamp column value.
pub(crate) fn parse_ts_opt(
    col: usize,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| parse_ts(col, v)).transpose()
}

/// Map a serde_json error occurring while decoding a JSON column.
pub(crate) fn json_col_err(col: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse an enum stored as its lowercase string form.
pub(crate) fn parse_enum<T: std::str::FromStr>(
    col: usize,
    value: String,
) -> Result<T, rusqlite::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
