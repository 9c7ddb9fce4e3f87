//! Rule lines: a substituted regex plus line/record actions and a transition.

use once_cell::sync::Lazy;
use regex::Regex;

use super::value::Value;
use crate::error::TemplateErrorKind;

static STATE_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

/// What to do with the input line after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineAction {
    /// Stop evaluating rules and read the next line.
    #[default]
    Next,
    /// Keep testing the following rules against the same line.
    Continue,
    /// Abort the run.
    Error,
}

impl LineAction {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Next" => Some(Self::Next),
            "Continue" => Some(Self::Continue),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// What to do with the in-progress record after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordAction {
    /// Leave the record alone.
    #[default]
    NoRecord,
    /// Emit the record, then clear non-Filldown values.
    Record,
    /// Clear non-Filldown values without emitting.
    Clear,
    /// Clear every value, Filldown included.
    Clearall,
}

impl RecordAction {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "NoRecord" => Some(Self::NoRecord),
            "Record" => Some(Self::Record),
            "Clear" => Some(Self::Clear),
            "Clearall" => Some(Self::Clearall),
            _ => None,
        }
    }
}

/// A compiled rule line.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The match text as written, before value substitution.
    pub source: String,

    /// Regex with every value reference replaced by its capture group.
    pub regex: Regex,

    /// Line action.
    pub line_action: LineAction,

    /// Record action.
    pub record_action: RecordAction,

    /// Target state, if the rule transitions.
    pub new_state: Option<String>,

    /// Message carried by an `Error` action.
    pub error_message: Option<String>,

    /// Template line number of this rule.
    pub line_num: usize,

    /// Indices (into the template's values) of the values this rule captures.
    pub(crate) captures: Vec<usize>,
}

impl Rule {
    /// Parse a rule line (leading indentation already stripped).
    pub(crate) fn parse(
        line: &str,
        line_num: usize,
        values: &[Value],
    ) -> Result<Self, TemplateErrorKind> {
        let line = line.trim();
        if !line.starts_with('^') {
            return Err(invalid("rule must begin with '^'"));
        }

        let (source, action) = match split_action(line) {
            Some((source, action)) => (source.trim_end(), Some(action.trim())),
            None => (line, None),
        };

        let (pattern, captures) = substitute(source, values)?;
        let mut rule = Self {
            source: source.to_string(),
            regex: Regex::new(&pattern)?,
            line_action: LineAction::default(),
            record_action: RecordAction::default(),
            new_state: None,
            error_message: None,
            line_num,
            captures,
        };
        if let Some(action) = action {
            rule.parse_action(action)?;
        }
        Ok(rule)
    }

    /// Parse `LineAction[.RecordAction] [State]`, `RecordAction [State]` or `State`.
    fn parse_action(&mut self, action: &str) -> Result<(), TemplateErrorKind> {
        if action.is_empty() {
            return Err(invalid("empty action after '->'"));
        }

        let (op, operand) = match action.find(char::is_whitespace) {
            Some(pos) => (&action[..pos], action[pos..].trim()),
            None => (action, ""),
        };

        let (first, second) = match op.split_once('.') {
            Some((first, second)) => (first, Some(second)),
            None => (op, None),
        };

        if let Some(line_action) = LineAction::from_keyword(first) {
            self.line_action = line_action;
            if let Some(second) = second {
                self.record_action = RecordAction::from_keyword(second)
                    .ok_or_else(|| invalid(format!("unknown record action '{second}'")))?;
            }
        } else if let Some(record_action) = RecordAction::from_keyword(first) {
            if second.is_some() {
                return Err(invalid(format!("malformed action '{op}'")));
            }
            self.record_action = record_action;
        } else {
            // A bare word is a transition with default actions.
            if second.is_some() || !operand.is_empty() {
                return Err(invalid(format!("malformed action '{action}'")));
            }
            return self.set_target(op);
        }

        if operand.is_empty() {
            return Ok(());
        }

        if self.line_action == LineAction::Error {
            let message = operand
                .strip_prefix('"')
                .and_then(|m| m.strip_suffix('"'))
                .unwrap_or(operand);
            self.error_message = Some(message.to_string());
            return Ok(());
        }
        if self.line_action == LineAction::Continue {
            return Err(invalid("'Continue' cannot be combined with a state transition"));
        }
        self.set_target(operand)
    }

    fn set_target(&mut self, state: &str) -> Result<(), TemplateErrorKind> {
        if !STATE_WORD_RE.is_match(state) {
            return Err(invalid(format!("'{state}' is not a valid state name")));
        }
        self.new_state = Some(state.to_string());
        Ok(())
    }
}

/// Split a rule at its last ` ->` separator.
fn split_action(line: &str) -> Option<(&str, &str)> {
    line.rmatch_indices("->").find_map(|(pos, _)| {
        let before = &line[..pos];
        before
            .ends_with(char::is_whitespace)
            .then(|| (before, &line[pos + 2..]))
    })
}

/// Replace `${Name}` / `$Name` references with capture groups; `$$` is a literal `$`.
///
/// Returns the expanded pattern and the indices of the referenced values.
fn substitute(source: &str, values: &[Value]) -> Result<(String, Vec<usize>), TemplateErrorKind> {
    let mut pattern = String::with_capacity(source.len() * 2);
    let mut captures = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '$' {
            pattern.push(c);
            continue;
        }

        let name = match chars.peek() {
            Some((_, '$')) => {
                chars.next();
                pattern.push('$');
                continue;
            }
            Some((_, '{')) => {
                chars.next();
                let start = pos + 2;
                let end = source[start..]
                    .find('}')
                    .map(|offset| start + offset)
                    .ok_or_else(|| invalid("unterminated '${' reference"))?;
                while chars.peek().is_some_and(|(p, _)| *p <= end) {
                    chars.next();
                }
                &source[start..end]
            }
            Some((_, next)) if next.is_ascii_alphabetic() || *next == '_' => {
                let start = pos + 1;
                let mut end = start;
                while let Some((p, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || *ch == '_' {
                        end = p + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                &source[start..end]
            }
            // A lone '$' (end anchor) passes through untouched.
            _ => {
                pattern.push('$');
                continue;
            }
        };

        let index = values
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| TemplateErrorKind::UndeclaredValue {
                name: name.to_string(),
            })?;
        pattern.push_str(&values[index].capture_group());
        captures.push(index);
    }

    Ok((pattern, captures))
}

fn invalid(message: impl Into<String>) -> TemplateErrorKind {
    TemplateErrorKind::InvalidRule {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Vec<Value> {
        vec![
            Value::parse(r"Value Interface (\S+)").unwrap(),
            Value::parse(r"Value Status (up|down)").unwrap(),
        ]
    }

    #[test]
    fn test_default_actions() {
        let rule = Rule::parse(r"^${Interface} is ${Status}", 5, &values()).unwrap();
        assert_eq!(rule.line_action, LineAction::Next);
        assert_eq!(rule.record_action, RecordAction::NoRecord);
        assert!(rule.new_state.is_none());
        assert_eq!(rule.captures, vec![0, 1]);
        assert_eq!(rule.line_num, 5);

        let caps = rule.regex.captures("Gi0/1 is up").unwrap();
        assert_eq!(&caps["Interface"], "Gi0/1");
        assert_eq!(&caps["Status"], "up");
    }

    #[test]
    fn test_dollar_forms() {
        let rule = Rule::parse(r"^$Interface ends$$", 1, &values()).unwrap();
        assert!(rule.regex.is_match("Gi0/1 ends"));
        assert!(!rule.regex.is_match("Gi0/1 ends here"));

        let rule = Rule::parse(r"^\s*$", 1, &values()).unwrap();
        assert!(rule.captures.is_empty());
        assert!(rule.regex.is_match("   "));
    }

    #[test]
    fn test_action_forms() {
        let rule = Rule::parse(r"^x -> Continue.Record", 1, &values()).unwrap();
        assert_eq!(rule.line_action, LineAction::Continue);
        assert_eq!(rule.record_action, RecordAction::Record);

        let rule = Rule::parse(r"^x -> Record Interfaces", 1, &values()).unwrap();
        assert_eq!(rule.record_action, RecordAction::Record);
        assert_eq!(rule.new_state.as_deref(), Some("Interfaces"));

        let rule = Rule::parse(r"^x -> Next.Clearall End", 1, &values()).unwrap();
        assert_eq!(rule.record_action, RecordAction::Clearall);
        assert_eq!(rule.new_state.as_deref(), Some("End"));

        let rule = Rule::parse(r"^x -> Body", 1, &values()).unwrap();
        assert_eq!(rule.line_action, LineAction::Next);
        assert_eq!(rule.new_state.as_deref(), Some("Body"));
    }

    #[test]
    fn test_error_action_message() {
        let rule = Rule::parse(r#"^% Invalid -> Error "bad command""#, 1, &values()).unwrap();
        assert_eq!(rule.line_action, LineAction::Error);
        assert_eq!(rule.error_message.as_deref(), Some("bad command"));
        assert!(rule.new_state.is_none());
    }

    #[test]
    fn test_arrow_inside_pattern() {
        let rule = Rule::parse(r"^a->b -> Record", 1, &values()).unwrap();
        assert_eq!(rule.source, "^a->b");
        assert_eq!(rule.record_action, RecordAction::Record);
    }

    #[test]
    fn test_last_spaced_arrow_is_action() {
        let rule = Rule::parse(r"^${Interface} -> ${Status} -> Next.Record", 1, &values()).unwrap();
        assert_eq!(rule.source, r"^${Interface} -> ${Status}");
        assert_eq!(rule.record_action, RecordAction::Record);
        assert!(rule.regex.is_match("ge-0/0/0 -> up"));
    }

    #[test]
    fn test_rejects_bad_rules() {
        assert!(Rule::parse(r"${Interface}", 1, &values()).is_err());
        assert!(Rule::parse(r"^x -> Continue Other", 1, &values()).is_err());
        assert!(Rule::parse(r"^x -> Next.Bogus", 1, &values()).is_err());
        assert!(Rule::parse(r"^x -> ", 1, &values()).is_err());
        assert!(Rule::parse(r"^x -> Record.Next", 1, &values()).is_err());
        assert!(Rule::parse(r"^([a- -> Record", 1, &values()).is_err());
    }

    #[test]
    fn test_undeclared_value() {
        let err = Rule::parse(r"^${Uptime}", 1, &values()).unwrap_err();
        assert!(matches!(err, TemplateErrorKind::UndeclaredValue { name } if name == "Uptime"));
    }
}
