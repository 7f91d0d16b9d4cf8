//! Key Pattern Module
//!
//! Glob-style matching for `keys(pattern)`: `*` matches any run of
//! characters, `?` exactly one, `[...]` a character class. Compiled once to
//! an anchored regex.

use regex::Regex;

use crate::error::{CacheError, Result};

// == Key Pattern ==
/// A compiled glob pattern over key names.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    regex: Regex,
}

impl KeyPattern {
    /// Compiles a glob pattern.
    ///
    /// Returns [`CacheError::InvalidPattern`] on an unterminated character
    /// class or an otherwise uncompilable pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let translated = translate(pattern)?;
        let regex = Regex::new(&translated).map_err(|e| CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Returns true if the key matches the pattern.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Translates a glob pattern into an anchored regex source string.
fn translate(pattern: &str) -> Result<String> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("\\A");

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::new();
                // Leading `!` negates, like fnmatch.
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                if chars.peek() == Some(&']') {
                    chars.next();
                    class.push(']');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    if c == '\\' || c == '^' {
                        class.push('\\');
                    }
                    class.push(c);
                }
                if !closed {
                    return Err(CacheError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: "unterminated character class".to_string(),
                    });
                }
                out.push('[');
                out.push_str(&class);
                out.push(']');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push_str("\\z");
    Ok(out)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_match() {
        let p = KeyPattern::new("session").unwrap();
        assert!(p.matches("session"));
        assert!(!p.matches("session:1"));
        assert!(!p.matches("a-session"));
    }

    #[test]
    fn test_star_matches_any_run() {
        let p = KeyPattern::new("user:*").unwrap();
        assert!(p.matches("user:"));
        assert!(p.matches("user:42"));
        assert!(p.matches("user:42:profile"));
        assert!(!p.matches("session:42"));
    }

    #[test]
    fn test_question_mark_matches_single_char() {
        let p = KeyPattern::new("k?y").unwrap();
        assert!(p.matches("key"));
        assert!(p.matches("kay"));
        assert!(!p.matches("ky"));
        assert!(!p.matches("keey"));
    }

    #[test]
    fn test_character_class() {
        let p = KeyPattern::new("item[0-9]").unwrap();
        assert!(p.matches("item7"));
        assert!(!p.matches("itemx"));

        let negated = KeyPattern::new("item[!0-9]").unwrap();
        assert!(negated.matches("itemx"));
        assert!(!negated.matches("item7"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = KeyPattern::new("a.b+c").unwrap();
        assert!(p.matches("a.b+c"));
        assert!(!p.matches("aXbbc"));
    }

    #[test]
    fn test_unterminated_class_is_an_error() {
        assert!(matches!(
            KeyPattern::new("item[0-9"),
            Err(CacheError::InvalidPattern { .. })
        ));
    }
}
