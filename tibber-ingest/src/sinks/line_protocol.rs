//! Influx line protocol encoding shared by the HTTP and TCP sinks.

use crate::point::{FieldValue, Point};

/// Characters that end a tag key, tag value or field key.
const IDENT_SPECIALS: &[char] = &[',', ' ', '='];

/// Measurements end at a comma or space; `=` is allowed unescaped.
const MEASUREMENT_SPECIALS: &[char] = &[',', ' '];

/// Backslash-escape `specials`, write control characters as `\n`, `\r`,
/// `\t` so a value never spans physical lines, and double a backslash that
/// precedes a special character or ends the value.
fn escape(s: &str, specials: &[char], out: &mut String) {
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => {
                let next_is_special = match chars.peek() {
                    None => true,
                    Some(&next) => next == '\\' || specials.contains(&next),
                };
                out.push('\\');
                if next_is_special {
                    out.push('\\');
                }
            }
            c if specials.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

fn escape_ident(s: &str, out: &mut String) {
    escape(s, IDENT_SPECIALS, out);
}

fn escape_measurement(s: &str, out: &mut String) {
    escape(s, MEASUREMENT_SPECIALS, out);
}

fn push_tag(out: &mut String, key: &str, value: &str) {
    out.push(',');
    escape_ident(key, out);
    out.push('=');
    escape_ident(value, out);
}

fn push_field(out: &mut String, first: &mut bool, key: &str, value: FieldValue) {
    if *first {
        *first = false;
    } else {
        out.push(',');
    }

    escape_ident(key, out);
    out.push('=');
    match value {
        FieldValue::Float(v) => out.push_str(&v.to_string()),
        FieldValue::Integer(v) => {
            out.push_str(&v.to_string());
            out.push('i');
        }
    }
}

fn is_encodable(value: &FieldValue) -> bool {
    match value {
        FieldValue::Float(v) => v.is_finite(),
        FieldValue::Integer(_) => true,
    }
}

/// Append one line (without the trailing newline) for `point`.
///
/// Tags with an empty key or value cannot be represented and are left out,
/// as are non-finite floats. Returns `false` and leaves `out` untouched when
/// no field survives, since a line without fields is rejected by the store.
pub fn write_line(point: &Point, out: &mut String) -> bool {
    if !point.fields.iter().any(|(k, v)| !k.is_empty() && is_encodable(v)) {
        return false;
    }

    escape_measurement(&point.measurement, out);

    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        push_tag(out, key, value);
    }

    out.push(' ');
    let mut first = true;
    for (key, value) in &point.fields {
        if key.is_empty() || !is_encodable(value) {
            continue;
        }
        push_field(out, &mut first, key, *value);
    }

    // timestamp (nanos)
    out.push(' ');
    out.push_str(&point.timestamp.unix_timestamp_nanos().to_string());
    true
}

/// Encode `points` as newline-terminated lines, returning the payload and
/// the number of lines it holds.
pub fn encode_batch(points: &[Point]) -> (String, usize) {
    // Heuristic capacity: ~320 bytes per line with the full address tag set.
    let mut s = String::with_capacity(points.len().saturating_mul(320));
    let mut lines = 0;
    for point in points {
        if write_line(point, &mut s) {
            s.push('\n');
            lines += 1;
        } else {
            tracing::warn!(measurement = %point.measurement, "dropping point without encodable fields");
        }
    }
    (s, lines)
}
