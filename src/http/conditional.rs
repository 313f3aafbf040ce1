//! Conditional-GET helpers: HTTP dates and entity-tag matching.

use axum::http::{HeaderMap, header};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::time::SystemTime;

/// IMF-fixdate, the only HTTP-date form this server emits.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(HTTP_DATE).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE)
        .ok()
        .map(|naive| naive.and_utc())
}

/// `If-None-Match` list contains `etag` (weak comparison) or `*`.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Whether the request's validators show the client already has this entry.
///
/// `If-None-Match` wins when present. Otherwise the archive time must not be
/// newer than `If-Modified-Since`; one second of slack absorbs the sub-second
/// precision that HTTP dates drop.
pub fn is_not_modified(headers: &HeaderMap, etag: &str, modified: SystemTime) -> bool {
    if let Some(value) = headers.get(header::IF_NONE_MATCH) {
        return value.to_str().is_ok_and(|v| etag_matches(v, etag));
    }
    let Some(since) = headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date)
    else {
        return false;
    };
    DateTime::<Utc>::from(modified) < since + TimeDelta::seconds(1)
}
