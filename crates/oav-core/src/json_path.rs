//! # JSON Path / JSON Pointer Conversion
//!
//! Payload locations travel in two spellings:
//!
//! - JSON path, dot/bracket form, optionally rooted at `$`:
//!   `.body.items[0]['odata.type']`, `$.items[0]`
//! - JSON Pointer (RFC 6901): `/body/items/0/odata.type`, `/items/0`
//!
//! Schema engines report pointers; issues keep both forms.

/// Convert an RFC 6901 pointer into an unrooted JSON path.
///
/// Numeric segments become `[n]`, identifier-like segments `.name`, anything
/// else `['name']`. The empty pointer (the document root) maps to `""`.
pub fn pointer_to_json_path(pointer: &str) -> String {
    let mut out = String::new();
    if pointer.is_empty() {
        return out;
    }
    for raw in pointer.trim_start_matches('/').split('/') {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            out.push('[');
            out.push_str(&segment);
            out.push(']');
        } else if is_identifier(&segment) {
            out.push('.');
            out.push_str(&segment);
        } else {
            out.push_str("['");
            out.push_str(&segment.replace('\\', "\\\\").replace('\'', "\\'"));
            out.push_str("']");
        }
    }
    out
}

/// Convert a JSON path (rooted at `$` or not) into an RFC 6901 pointer.
///
/// Malformed trailing input is kept as a final literal segment rather than
/// dropped, so no location information is lost.
pub fn json_path_to_pointer(path: &str) -> String {
    let mut pointer = String::new();
    for segment in segments(path.strip_prefix('$').unwrap_or(path)) {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
    }
    pointer
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn segments(path: &str) -> Vec<String> {
    let chars: Vec<char> = path.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '.' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
                    end += 1;
                }
                out.push(chars[start..end].iter().collect());
                i = end;
            }
            '[' if matches!(chars.get(i + 1), Some('\'') | Some('"')) => {
                let quote = chars[i + 1];
                let mut segment = String::new();
                let mut j = i + 2;
                while j < chars.len() && chars[j] != quote {
                    if chars[j] == '\\' && j + 1 < chars.len() {
                        j += 1;
                    }
                    segment.push(chars[j]);
                    j += 1;
                }
                out.push(segment);
                // Skip the closing quote and bracket.
                i = (j + 2).min(chars.len());
            }
            '[' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }
                out.push(chars[start..end].iter().collect());
                i = (end + 1).min(chars.len());
            }
            _ => {
                out.push(chars[i..].iter().collect());
                break;
            }
        }
    }
    out
}
