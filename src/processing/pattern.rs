//! Regular-expression replacement.

use regex::{Regex, RegexBuilder};

use crate::config::RegexFlag;
use crate::error::{CleanError, CleanResult};
use crate::types::Sheet;

use super::map_strings;

/// Compile `pattern` under the union of `flags`.
///
/// `UNICODE` is accepted for compatibility; Unicode matching is always on.
pub fn build_regex(pattern: &str, flags: &[RegexFlag]) -> CleanResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    builder.unicode(true);
    for flag in flags {
        match flag {
            RegexFlag::Ignorecase => builder.case_insensitive(true),
            RegexFlag::Multiline => builder.multi_line(true),
            RegexFlag::Dotall => builder.dot_matches_new_line(true),
            RegexFlag::Unicode => builder.unicode(true),
        };
    }
    builder.build().map_err(|e| CleanError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Translate a backslash-style replacement template into the regex crate's `$` syntax.
///
/// Supported: `\N` / `\NN` group numbers, `\g<N>` and `\g<name>`, the character escapes
/// `\n \t \r \f \v \a \b \\`, and `\0` for NUL. A backslash before any other non-letter
/// stays literal. Every `$` in the template is literal. Group references must exist in `re`.
pub fn compile_replacement(replacement: &str, re: &Regex) -> CleanResult<String> {
    let invalid = |message: String| CleanError::InvalidReplacement {
        replacement: replacement.to_string(),
        message,
    };
    let group_count = re.captures_len();
    let group = |idx: usize| {
        if idx == 0 || idx < group_count {
            Ok(format!("${{{idx}}}"))
        } else {
            Err(invalid(format!("invalid group reference {idx}")))
        }
    };

    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            out.push_str("$$");
            continue;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err(invalid("bad escape (end of template)".to_string())),
            Some('0') => out.push('\0'),
            Some(d @ '1'..='9') => {
                let mut idx = d as usize - '0' as usize;
                if let Some(e) = chars.next_if(char::is_ascii_digit) {
                    idx = idx * 10 + (e as usize - '0' as usize);
                }
                out.push_str(&group(idx)?);
            }
            Some('g') => {
                if chars.next() != Some('<') {
                    return Err(invalid("missing < after \\g".to_string()));
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(invalid("missing >, unterminated name".to_string())),
                    }
                }
                if name.is_empty() {
                    return Err(invalid("missing group name".to_string()));
                }
                if let Ok(idx) = name.parse::<usize>() {
                    out.push_str(&group(idx)?);
                } else if re.capture_names().flatten().any(|n| n == name) {
                    out.push_str(&format!("${{{name}}}"));
                } else {
                    return Err(invalid(format!("unknown group name '{name}'")));
                }
            }
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{0c}'),
            Some('v') => out.push('\u{0b}'),
            Some('a') => out.push('\u{07}'),
            Some('b') => out.push('\u{08}'),
            Some('\\') => out.push('\\'),
            Some(other) if other.is_ascii_alphabetic() => {
                return Err(invalid(format!("bad escape \\{other}")));
            }
            Some('$') => out.push_str("\\$$"),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// Replace every match of `re` with `replacement` in string cells.
///
/// `replacement` is a backslash-style template (see [`compile_replacement`]); `$` is literal.
pub fn regex_replace(
    sheet: &mut Sheet,
    columns: &[String],
    re: &Regex,
    replacement: &str,
) -> CleanResult<usize> {
    let template = compile_replacement(replacement, re)?;
    Ok(map_strings(sheet, columns, |s| {
        re.is_match(s)
            .then(|| re.replace_all(s, template.as_str()).into_owned())
    }))
}
