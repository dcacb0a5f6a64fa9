// src/core/scalar.rs

//! # Scalar Analysis
//!
//! Decides how a single string is written: plain, double-quoted or as a literal block.
//! Single quotes are never produced; whenever plain style is not safe the scalar is
//! double-quoted.
//!
//! A plain scalar is unsafe when a YAML reader would resolve it to something other than a
//! string (booleans, nulls and numbers in both the 1.1 and 1.2 schemas), when it starts
//! with an indicator character, or when it contains a sequence that would end the scalar
//! early (`": "`, `" #"`, and flow indicators inside flow collections).

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Values a YAML 1.1 or 1.2 reader resolves to bool or null.
    static ref RESERVED_RE: Regex = Regex::new(
        r"^(?:~|null|Null|NULL|y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$"
    ).unwrap();

    // Integers (decimal, binary, octal, hex, sexagesimal) and floats, including the
    // special `.inf` / `.nan` spellings.
    static ref NUMBER_RE: Regex = Regex::new(
        r"^(?:[-+]?(?:0b[01_]+|0o?[0-7_]+|0x[0-9a-fA-F_]+|[0-9][0-9_]*(?::[0-5]?[0-9])+|(?:[0-9][0-9_]*)?\.?[0-9_]*(?:[eE][-+]?[0-9]+)?)|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$"
    ).unwrap();

    // Dates and timestamps resolved by YAML 1.1 readers.
    static ref TIMESTAMP_RE: Regex = Regex::new(
        r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}(?:(?:[Tt]|[ \t]+)[0-9]{1,2}:[0-9]{2}:[0-9]{2}(?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9]{1,2}(?::[0-9]{2})?))?)?$"
    ).unwrap();
}

/// Characters that may never open a plain scalar.
const LEADING_INDICATORS: &[char] = &[
    '#', ',', '[', ']', '{', '}', '&', '*', '!', '|', '>', '\'', '"', '%', '@', '`',
];

/// Characters that open a plain scalar only when followed by a non-space.
const CONDITIONAL_INDICATORS: &[char] = &['-', '?', ':'];

/// Characters that terminate a plain scalar inside a flow collection.
const FLOW_INDICATORS: &[char] = &[',', '[', ']', '{', '}'];

/// How a literal block treats the trailing line breaks of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chomping {
    /// Exactly one trailing newline: `|`.
    Clip,
    /// No trailing newline: `|-`.
    Strip,
    /// More than one trailing newline, all preserved: `|+`.
    Keep,
}

impl Chomping {
    /// Picks the chomping indicator that reproduces `value`'s trailing newlines.
    pub fn for_value(value: &str) -> Self {
        let trailing = value.chars().rev().take_while(|c| *c == '\n').count();
        match trailing {
            0 => Chomping::Strip,
            1 => Chomping::Clip,
            _ => Chomping::Keep,
        }
    }

    /// The indicator character written after `|`.
    pub fn indicator(self) -> &'static str {
        match self {
            Chomping::Clip => "",
            Chomping::Strip => "-",
            Chomping::Keep => "+",
        }
    }
}

/// Returns `true` when `value` may be written without quotes.
///
/// `in_flow` tightens the rules for scalars inside `[...]` and `{...}`.
pub fn is_plain_safe(value: &str, in_flow: bool) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };

    if RESERVED_RE.is_match(value) || NUMBER_RE.is_match(value) || TIMESTAMP_RE.is_match(value) {
        return false;
    }

    if LEADING_INDICATORS.contains(&first) {
        return false;
    }
    if CONDITIONAL_INDICATORS.contains(&first) {
        match value.chars().nth(1) {
            None => return false,
            Some(next) if next == ' ' || (in_flow && FLOW_INDICATORS.contains(&next)) => {
                return false;
            }
            Some(_) => {}
        }
    }

    if first.is_whitespace() || value.ends_with(char::is_whitespace) {
        return false;
    }
    if value.ends_with(':') || value.contains(": ") || value.contains(" #") {
        return false;
    }
    if in_flow && value.contains(FLOW_INDICATORS) {
        return false;
    }

    !value.chars().any(needs_escape)
}

/// Returns `true` when `value` can be written as a literal block: it has at least one
/// embedded line break, some content besides line breaks, and no other characters that
/// only a double-quoted scalar can carry. A block of nothing but line breaks reads back
/// as an empty string.
pub fn is_literal_candidate(value: &str) -> bool {
    value.contains('\n')
        && value.chars().any(|c| c != '\n')
        && !value.chars().any(|c| c != '\n' && c != '\t' && needs_escape(c))
}

/// Returns `true` when the first content line of a literal block starts with a space or is
/// empty, in which case the block needs an explicit indentation indicator.
pub fn needs_indentation_indicator(value: &str) -> bool {
    value.starts_with(' ') || value.starts_with('\n')
}

fn needs_escape(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}'..='\u{9f}' | '\u{2028}' | '\u{2029}' | '\u{feff}')
}

/// Writes `value` as a double-quoted scalar.
pub fn double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{0}' => out.push_str("\\0"),
            c if needs_escape(c) => {
                let code = u32::from(c);
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02X}", code));
                } else {
                    out.push_str(&format!("\\u{:04X}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Writes `value` plain when that is safe, double-quoted otherwise.
pub fn quote_if_needed(value: &str, in_flow: bool) -> String {
    if is_plain_safe(value, in_flow) {
        value.to_string()
    } else {
        double_quoted(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_words_are_plain() {
        assert!(is_plain_safe("compile", false));
        assert!(is_plain_safe("do setup", false));
        assert!(is_plain_safe("shell.exec", false));
        assert!(is_plain_safe("--suites=generational_fuzzer", false));
        assert!(is_plain_safe("${workdir}/src", false));
        assert!(is_plain_safe("a=1", false));
    }

    #[test]
    fn test_values_resolving_to_other_types_are_quoted() {
        for value in ["true", "false", "yes", "No", "null", "~", "1", "1800", "-3", "0x1f", "1.5", "1e3", ".inf", "2024-01-01"] {
            assert!(!is_plain_safe(value, false), "{} should need quotes", value);
        }
        assert_eq!(quote_if_needed("true", false), "\"true\"");
        assert_eq!(quote_if_needed("1", false), "\"1\"");
    }

    #[test]
    fn test_indicators_force_quotes() {
        assert!(!is_plain_safe("", false));
        assert!(!is_plain_safe("*alias", false));
        assert!(!is_plain_safe("- item", false));
        assert!(!is_plain_safe("-", false));
        assert!(!is_plain_safe("key: value", false));
        assert!(!is_plain_safe("value # comment", false));
        assert!(!is_plain_safe("trailing:", false));
        assert!(!is_plain_safe(" leading", false));
        assert!(!is_plain_safe("trailing ", false));
        assert!(!is_plain_safe("'quoted'", false));
    }

    #[test]
    fn test_flow_context_is_stricter() {
        assert!(is_plain_safe("a,b", false));
        assert!(!is_plain_safe("a,b", true));
        assert!(!is_plain_safe("x[0]", true));
        assert!(is_plain_safe("tag0", true));
    }

    #[test]
    fn test_double_quoted_escapes() {
        assert_eq!(double_quoted("say \"hi\""), r#""say \"hi\"""#);
        assert_eq!(double_quoted("a\\b"), r#""a\\b""#);
        assert_eq!(double_quoted("a\nb"), r#""a\nb""#);
        assert_eq!(double_quoted("bell\u{7}"), r#""bell\x07""#);
    }

    #[test]
    fn test_chomping_follows_trailing_newlines() {
        assert_eq!(Chomping::for_value("a=1\nb=2"), Chomping::Strip);
        assert_eq!(Chomping::for_value("a=1\nb=2\n"), Chomping::Clip);
        assert_eq!(Chomping::for_value("a=1\nb=2\n\n"), Chomping::Keep);
        assert_eq!(Chomping::Keep.indicator(), "+");
    }

    #[test]
    fn test_literal_candidates() {
        assert!(is_literal_candidate("a\nb"));
        assert!(is_literal_candidate("a\n\tb\n"));
        assert!(!is_literal_candidate("single line"));
        assert!(!is_literal_candidate("a\r\nb"));
        assert!(!is_literal_candidate("\n"));
        assert!(!is_literal_candidate("\n\n\n"));
        assert!(is_literal_candidate("\n x\n"));
    }
}
