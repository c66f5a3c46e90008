//! String transforms shared by the loaders and the resolver.
//!
//! Translation sources escape control characters so that one entry fits on
//! one line; [`unescape`] undoes that at parse time. Lookup keys arrive from
//! hosts with inconsistent casing and stray whitespace, which [`normalize`]
//! folds away for the secondary lookup pass. The marker character tags text
//! the engine has already produced so it is never fed back through
//! resolution by a cooperating translator running in the same process.

/// Marker appended to resolved text. U+180E (Mongolian vowel separator) is
/// invisible in every font the target hosts ship, which is exactly why the
/// ecosystem settled on it as an "already translated" tag.
pub const MARKER: char = '\u{180e}';

/// Whitespace trimmed from keys during normalization. Wider than
/// `char::is_whitespace` trimming would suggest: hosts hand us keys with
/// ideographic spaces, zero-width spaces and BOMs attached. Deliberately
/// does not include [`MARKER`].
pub const WHITESPACE: &[char] = &[
    '\t', '\n', '\u{b}', '\u{c}', '\r', ' ', '\u{85}', '\u{a0}', '\u{1680}', '\u{2000}',
    '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}', '\u{2006}', '\u{2007}',
    '\u{2008}', '\u{2009}', '\u{200a}', '\u{200b}', '\u{2028}', '\u{2029}', '\u{3000}',
    '\u{feff}',
];

/// Fold a key for the secondary lookup pass: drop `\r`, `\n` and `\t`
/// anywhere in the string, trim the extended whitespace set from both ends,
/// and uppercase ASCII letters only.
///
/// The ASCII-only fold is intentional: it compensates for hosts that
/// upper-case tags like `[HF]` to `[hf]` in transit, without dragging in
/// locale-dependent Unicode case rules that source files never rely on.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect();
    stripped
        .trim_matches(|c| WHITESPACE.contains(&c))
        .to_ascii_uppercase()
}

/// Decode the escape sequences translation files use to keep an entry on a
/// single line. Recognizes `\n`, `\t`, `\r`, `\\`, `\"`, `\'` and `\0`;
/// an unrecognized escape is kept verbatim, backslash included, so a typo
/// in a source file degrades visibly instead of silently eating characters.
pub fn unescape(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('0') => out.push('\0'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// True if the text already carries the engine marker.
pub fn contains_marker(text: &str) -> bool {
    text.contains(MARKER)
}

/// Append the marker unless the text already carries one.
pub fn mark(text: String) -> String {
    if contains_marker(&text) {
        text
    } else {
        let mut marked = text;
        marked.push(MARKER);
        marked
    }
}

/// Remove every marker character. Translation values are scrubbed at parse
/// time so a marked string pasted into a source file cannot smuggle the
/// marker back into the dictionary.
pub fn strip_marker(s: String) -> String {
    if contains_marker(&s) {
        s.replace(MARKER, "")
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_linebreaks_and_uppercases() {
        assert_eq!(normalize("  he\r\nllo\t "), "HELLO");
    }

    #[test]
    fn test_normalize_trims_wide_whitespace() {
        assert_eq!(normalize("\u{3000}abc\u{feff}"), "ABC");
    }

    #[test]
    fn test_normalize_is_ascii_only_fold() {
        // Non-ASCII letters pass through unchanged.
        assert_eq!(normalize("müller"), "MüLLER");
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize(" A/b\tc ");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_unescape_standard_sequences() {
        assert_eq!(unescape(r#"a\nb\tc\\d\'e\" f"#), "a\nb\tc\\d'e\" f");
    }

    #[test]
    fn test_unescape_unknown_sequence_kept() {
        assert_eq!(unescape(r"a\qb"), r"a\qb");
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape("a\\"), "a\\");
    }

    #[test]
    fn test_unescape_no_escapes_is_copy() {
        assert_eq!(unescape("plain text"), "plain text");
    }

    #[test]
    fn test_mark_appends_once() {
        let marked = mark("hello".to_string());
        assert!(contains_marker(&marked));
        assert_eq!(mark(marked.clone()), marked);
    }

    #[test]
    fn test_strip_marker_removes_all() {
        let s = format!("a{}b{}", MARKER, MARKER);
        assert_eq!(strip_marker(s), "ab");
    }
}
