//! Abbreviated-command expansion for index `Command` patterns.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static COMPLETION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[(.+?)\]\]").unwrap());

/// Rewrite every `word[[suffix]]` into nested optional groups.
///
/// The user may then type any prefix of `word` + `suffix`:
/// `sh[[ow]]` becomes `sh(o(w)?)?`. Text outside `[[...]]` is kept verbatim
/// and treated as a regular expression.
pub fn expand_command(pattern: &str) -> String {
    COMPLETION_RE
        .replace_all(pattern, |caps: &Captures<'_>| {
            let suffix: Vec<String> = caps[1].chars().map(String::from).collect();
            format!("({}{}", suffix.join("("), ")?".repeat(suffix.len()))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchored(pattern: &str) -> Regex {
        Regex::new(&format!("^(?:{})$", expand_command(pattern))).unwrap()
    }

    #[test]
    fn test_expand_show() {
        assert_eq!(expand_command("sh[[ow]]"), "sh(o(w)?)?");
    }

    #[test]
    fn test_expand_multiple_words() {
        assert_eq!(
            expand_command("sh[[ow]] ve[[rsion]]"),
            "sh(o(w)?)? ve(r(s(i(o(n)?)?)?)?)?"
        );
    }

    #[test]
    fn test_plain_pattern_untouched() {
        assert_eq!(expand_command(r"show ip route \S+"), r"show ip route \S+");
    }

    #[test]
    fn test_anchored_matching() {
        let re = anchored("sh[[ow]]");
        assert!(re.is_match("sh"));
        assert!(re.is_match("sho"));
        assert!(re.is_match("show"));
        assert!(!re.is_match("showx"));
        assert!(!re.is_match("s"));
    }

    #[test]
    fn test_prefix_matching() {
        let re = Regex::new(&format!("^(?:{})", expand_command("sh[[ow]]"))).unwrap();
        assert!(re.is_match("show version"));
    }
}
