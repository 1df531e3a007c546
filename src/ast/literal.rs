//! String literal lexemes.
//!
//! The parser keeps string literals exactly as written: `"a\nb"` including the
//! quotes. These helpers convert between that lexeme and the byte contents.

/// Strip the delimiting quotes and resolve escape sequences.
///
/// Unknown escapes keep the escaped character (`\q` → `q`); a trailing lone
/// backslash is kept as-is.
pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(raw);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Inverse of [`unquote`]: escape and wrap in quotes.
pub fn quote(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len() + 2);
    out.push('"');
    for c in contents.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
