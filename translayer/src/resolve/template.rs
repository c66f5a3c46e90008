//! Placeholder expansion for regex-rule templates.
//!
//! Template grammar, scanned left to right:
//!
//! - `\$`: a literal dollar sign.
//! - `$1`, `$23`: a bare placeholder; consumes digits only.
//! - `${name}`, `${2}`: a braced placeholder; consumes up to the closing
//!   brace and may name a capture group or a numeric index.
//!
//! The scanner knows nothing about regexes: every placeholder body is
//! handed to a lookup callback and the returned text is spliced in. The
//! resolver's callback maps the body to a capture group and then runs the
//! captured text through the dictionary, which is what makes templates
//! compose with plain entries.

/// Expand every placeholder in `template` through `lookup`.
///
/// The callback receives the placeholder body (`"1"` for `$1`, `"name"`
/// for `${name}`) and returns the replacement text verbatim.
pub fn expand<F>(template: &str, mut lookup: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(template.len());
    let mut body = String::new();
    let mut inside = false;
    let mut braced = false;

    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'$') => {
                out.push('$');
                chars.next();
                continue;
            }
            '$' => {
                inside = true;
                continue;
            }
            '{' if inside => {
                braced = true;
                continue;
            }
            '}' if inside && !body.is_empty() => {
                out.push_str(&lookup(&body));
                body.clear();
                inside = false;
                braced = false;
                continue;
            }
            _ => {}
        }

        // A bare placeholder ends at the first non-digit.
        if inside && !braced && !c.is_ascii_digit() {
            out.push_str(&lookup(&body));
            body.clear();
            inside = false;
        }

        if inside {
            body.push(c);
        } else {
            out.push(c);
        }
    }

    // A placeholder that runs to the end of the template still expands.
    if inside && !body.is_empty() {
        out.push_str(&lookup(&body));
    }

    out
}
