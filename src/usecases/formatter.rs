//! Renders provenance records for delivery back to the requester.
//!
//! Formatting is pure: the same hit always renders to byte-identical output.

use crate::domain::{
    ArchiveHit, ArchiveSender, DomainError, ProvenanceEntry, ProvenanceRecord, ReplyFormat,
};
use chrono::NaiveDateTime;

/// Reply sent when the archive holds nothing similar enough.
pub const NOT_FOUND: &str = "Not found similar entries";

/// Reply sent when the search backend cannot serve the query.
pub const SEARCH_UNAVAILABLE: &str = "Search is unavailable right now, please try again later";

/// Wall-clock rendering of the archived timestamp, e.g. `01 May 2023 at 14:30:00`.
const TIME_FORMAT: &str = "%d %b %Y at %H:%M:%S";

/// Accepted timestamp shapes besides RFC 3339.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Render the search outcome in the requested reply format.
pub fn format_response(
    hit: Option<&ArchiveHit>,
    format: ReplyFormat,
) -> Result<String, DomainError> {
    let record = build_record(hit)?;
    render(&record, format)
}

/// Shape a raw archive hit (or its absence) into a provenance record.
pub fn build_record(hit: Option<&ArchiveHit>) -> Result<ProvenanceRecord, DomainError> {
    let Some(hit) = hit else {
        return Ok(ProvenanceRecord::NotFound);
    };
    let time = parse_timestamp(&hit.timestamp)?
        .format(TIME_FORMAT)
        .to_string();
    Ok(ProvenanceRecord::Entry(ProvenanceEntry {
        chat: hit.chat.clone(),
        time,
        login: hit.sender.username.clone().unwrap_or_default(),
        name: display_name(&hit.sender),
        message: hit.message.clone(),
    }))
}

pub fn render(record: &ProvenanceRecord, format: ReplyFormat) -> Result<String, DomainError> {
    match (record, format) {
        (ProvenanceRecord::NotFound, _) => Ok(not_found(format)),
        (ProvenanceRecord::Entry(entry), ReplyFormat::Text) => Ok(render_text(entry)),
        (ProvenanceRecord::Entry(entry), ReplyFormat::Json) => to_json(entry),
    }
}

/// The not-found sentinel in the requested format. Cannot fail, so callers
/// may fall back to it when a hit turns out unusable.
pub fn not_found(format: ReplyFormat) -> String {
    sentinel(NOT_FOUND, format)
}

/// The backend-unavailable notice in the requested format.
pub fn unavailable(format: ReplyFormat) -> String {
    sentinel(SEARCH_UNAVAILABLE, format)
}

fn sentinel(text: &str, format: ReplyFormat) -> String {
    match format {
        ReplyFormat::Text => text.to_string(),
        ReplyFormat::Json => serde_json::Value::String(text.to_string()).to_string(),
    }
}

/// Parse the archived timestamp string, keeping the recorded wall-clock
/// reading verbatim. An RFC 3339 offset is accepted but never converted.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DomainError> {
    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(with_offset.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    Err(DomainError::MalformedHit(format!(
        "unparsable timestamp '{raw}'"
    )))
}

fn display_name(sender: &ArchiveSender) -> String {
    [sender.first_name.as_deref(), sender.last_name.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_text(entry: &ProvenanceEntry) -> String {
    format!(
        "chat: **{}**\ntime: **{}**\nlogin: **{}**\nname: **{}**\nmessage: **{}**",
        entry.chat, entry.time, entry.login, entry.name, entry.message
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, DomainError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DomainError::MalformedHit(format!("record not serializable: {e}")))
}
