//! `Value` declarations: named capture slots and their options.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TemplateErrorKind;

/// Longest accepted value (and state) name.
pub(crate) const MAX_NAME_LEN: usize = 48;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

bitflags::bitflags! {
    /// Options controlling how a value aggregates, persists and displays.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ValueOptions: u8 {
        /// Record is dropped at emission if this value is empty.
        const REQUIRED = 1 << 0;
        /// Captures append to a list instead of overwriting.
        const LIST     = 1 << 1;
        /// Value survives record clears until captured again or Clearall.
        const FILLDOWN = 1 << 2;
        /// Part of the row identity.
        const KEY      = 1 << 3;
        /// Propagated backward into earlier empty rows.
        const FILLUP   = 1 << 4;
        /// Hidden from non-verbose projections.
        const VERBOSE  = 1 << 5;
        /// Matched but always emitted empty.
        const BLANK    = 1 << 6;
    }
}

impl ValueOptions {
    /// Look up an option by its template keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "Required" => Self::REQUIRED,
            "List" => Self::LIST,
            "Filldown" => Self::FILLDOWN,
            "Key" => Self::KEY,
            "Fillup" => Self::FILLUP,
            "Verbose" => Self::VERBOSE,
            "Blank" => Self::BLANK,
            _ => return None,
        })
    }

    /// Template keywords of the set options, in declaration-table order.
    pub fn keywords(&self) -> Vec<&'static str> {
        const ALL: [(ValueOptions, &str); 7] = [
            (ValueOptions::REQUIRED, "Required"),
            (ValueOptions::LIST, "List"),
            (ValueOptions::FILLDOWN, "Filldown"),
            (ValueOptions::KEY, "Key"),
            (ValueOptions::FILLUP, "Fillup"),
            (ValueOptions::VERBOSE, "Verbose"),
            (ValueOptions::BLANK, "Blank"),
        ];
        ALL.iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

/// A named capture slot declared by a `Value` line.
#[derive(Debug, Clone)]
pub struct Value {
    /// Value name, unique within the template.
    pub name: String,

    /// The parenthesised pattern as written in the template.
    pub pattern: String,

    /// Option set.
    pub options: ValueOptions,
}

impl Value {
    /// Parse a `Value [Options] Name (regex)` line.
    pub(crate) fn parse(line: &str) -> Result<Self, TemplateErrorKind> {
        let body = line
            .strip_prefix("Value")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .ok_or_else(|| invalid("line must start with 'Value '"))?;

        // Everything before the first token opening with '(' is options + name;
        // the pattern itself may contain whitespace.
        let mut head = Vec::new();
        let mut pattern = None;
        let mut rest = body.trim_start();
        while !rest.is_empty() {
            if rest.starts_with('(') {
                pattern = Some(rest.trim_end());
                break;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            head.push(&rest[..end]);
            rest = rest[end..].trim_start();
        }

        let pattern = pattern.ok_or_else(|| invalid("missing '(regex)' pattern"))?;
        if !pattern.ends_with(')') {
            return Err(invalid(format!("pattern '{pattern}' must be enclosed in parentheses")));
        }
        let name = head.pop().ok_or_else(|| invalid("missing value name"))?;
        if name.len() > MAX_NAME_LEN {
            return Err(invalid(format!(
                "name '{name}' exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if !NAME_RE.is_match(name) {
            return Err(invalid(format!("'{name}' is not a valid value name")));
        }

        let mut options = ValueOptions::empty();
        for keyword in head.iter().flat_map(|t| t.split(',')).filter(|k| !k.is_empty()) {
            let option = ValueOptions::from_keyword(keyword)
                .ok_or_else(|| invalid(format!("unknown option '{keyword}'")))?;
            if options.contains(option) {
                return Err(invalid(format!("duplicate option '{keyword}'")));
            }
            options |= option;
        }

        if options.contains(ValueOptions::BLANK) && options != ValueOptions::BLANK {
            return Err(invalid("'Blank' is a mutually exclusive option"));
        }
        if options.contains(ValueOptions::KEY | ValueOptions::VERBOSE) {
            return Err(invalid("options 'Key' and 'Verbose' are mutually exclusive"));
        }

        Regex::new(pattern)?;

        Ok(Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            options,
        })
    }

    /// Pattern rewritten as a named capture group, ready for rule substitution.
    pub(crate) fn capture_group(&self) -> String {
        format!("(?P<{}>{}", self.name, &self.pattern[1..])
    }

    /// Check whether an option is set.
    pub fn has(&self, option: ValueOptions) -> bool {
        self.options.contains(option)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keywords = self.options.keywords();
        if keywords.is_empty() {
            write!(f, "Value {} {}", self.name, self.pattern)
        } else {
            write!(f, "Value {} {} {}", keywords.join(","), self.name, self.pattern)
        }
    }
}

fn invalid(message: impl Into<String>) -> TemplateErrorKind {
    TemplateErrorKind::InvalidValue {
        message: message.into(),
    }
}
