//! Route keys group samples by `(method, path template)`.
//!
//! Numeric segments become `:id`, 24-char hex document ids become `:id`,
//! canonical UUIDs become `:uuid`. The numeric pass runs first.

use uuid::Uuid;

const SEPARATOR: char = ':';

/// `GET` + `/courses/42` → `GET:/courses/:id`
pub fn route_key(method: &str, path: &str) -> String {
    let mut key = String::with_capacity(method.len() + path.len() + 1);
    key.push_str(method);
    key.push(SEPARATOR);
    key.push_str(&normalize_path(path));
    key
}

/// Re-normalize a caller-supplied `METHOD:/path` key so a raw path
/// (`GET:/courses/42`) finds the bucket it was recorded under.
/// Anything that is not shaped like a route key is returned as is.
pub fn normalize_key(key: &str) -> String {
    match key.split_once(SEPARATOR) {
        Some((method, path))
            if !method.is_empty()
                && method.bytes().all(|b| b.is_ascii_alphabetic())
                && path.starts_with('/') =>
        {
            route_key(method, path)
        }
        _ => key.to_string(),
    }
}

/// Replace id-like segments of a request path with placeholders.
pub fn normalize_path(path: &str) -> String {
    let numeric = replace_segments(path, is_numeric, ":id");
    let hex = replace_segments(&numeric, is_object_id, ":id");
    replace_segments(&hex, is_canonical_uuid, ":uuid")
}

fn replace_segments(path: &str, matches: fn(&str) -> bool, placeholder: &str) -> String {
    path.split('/')
        .map(|seg| if matches(seg) { placeholder } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_numeric(seg: &str) -> bool {
    !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
}

/// Document-store id: exactly 24 hex digits.
fn is_object_id(seg: &str) -> bool {
    seg.len() == 24 && seg.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Only the hyphenated 8-4-4-4-12 form; `Uuid::try_parse` alone also
/// accepts simple, braced and urn forms.
fn is_canonical_uuid(seg: &str) -> bool {
    seg.len() == 36 && Uuid::try_parse(seg).is_ok()
}
