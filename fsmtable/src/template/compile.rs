//! Template source parsing and validation.

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::rule::{LineAction, Rule};
use super::value::{MAX_NAME_LEN, Value};
use super::{CompiledTemplate, State};
use crate::error::{TemplateError, TemplateErrorKind};

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#").unwrap());
static STATE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());

/// Action keywords; a state with one of these names could never be entered.
const RESERVED_STATE_NAMES: [&str; 7] = [
    "Next", "Continue", "Error", "NoRecord", "Record", "Clear", "Clearall",
];

/// Line-by-line template reader that tracks the current line number.
struct TemplateParser<'a> {
    name: &'a str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line_num: usize,
}

impl<'a> TemplateParser<'a> {
    fn new(name: &'a str, source: &'a str) -> Self {
        Self {
            name,
            lines: source.lines().enumerate(),
            line_num: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        self.lines.next().map(|(idx, line)| {
            self.line_num = idx + 1;
            line.trim_end()
        })
    }

    fn error(&self, kind: TemplateErrorKind) -> TemplateError {
        TemplateError::new(self.name, self.line_num, kind)
    }

    /// Read `Value` lines up to the first blank line.
    fn parse_values(&mut self) -> Result<Vec<Value>, TemplateError> {
        let mut values: Vec<Value> = Vec::new();

        while let Some(line) = self.next_line() {
            if line.is_empty() {
                break;
            }
            if COMMENT_RE.is_match(line) {
                continue;
            }
            if !line.starts_with("Value ") {
                let message = if values.is_empty() {
                    "no Value definitions found"
                } else {
                    "expected blank line after last Value entry"
                };
                return Err(self.error(TemplateErrorKind::InvalidValue {
                    message: message.to_string(),
                }));
            }

            let value = Value::parse(line).map_err(|kind| self.error(kind))?;
            if values.iter().any(|v| v.name == value.name) {
                return Err(self.error(TemplateErrorKind::DuplicateValue { name: value.name }));
            }
            values.push(value);
        }

        Ok(values)
    }

    /// Read one state block; returns `None` once the source is exhausted.
    fn parse_state(&mut self, values: &[Value]) -> Result<Option<State>, TemplateError> {
        let header = loop {
            match self.next_line() {
                None => return Ok(None),
                Some(line) if line.is_empty() || COMMENT_RE.is_match(line) => continue,
                Some(line) => break line,
            }
        };

        if !STATE_NAME_RE.is_match(header) || header.len() > MAX_NAME_LEN {
            return Err(self.error(TemplateErrorKind::InvalidState {
                message: format!("invalid state name '{header}'"),
            }));
        }
        if RESERVED_STATE_NAMES.contains(&header) {
            return Err(self.error(TemplateErrorKind::InvalidState {
                message: format!("'{header}' is an action keyword, not a state name"),
            }));
        }

        let mut state = State {
            name: header.to_string(),
            rules: Vec::new(),
        };

        while let Some(line) = self.next_line() {
            if line.is_empty() {
                break;
            }
            if COMMENT_RE.is_match(line) {
                continue;
            }
            let rule_text = line.trim_start();
            if rule_text.len() == line.len() || !rule_text.starts_with('^') {
                return Err(self.error(TemplateErrorKind::InvalidRule {
                    message: "missing white space or caret ('^') before rule".to_string(),
                }));
            }
            let rule = Rule::parse(rule_text, self.line_num, values).map_err(|kind| self.error(kind))?;
            state.rules.push(rule);
        }

        Ok(Some(state))
    }
}

/// Compile template source into an immutable [`CompiledTemplate`].
pub(crate) fn compile(name: &str, source: &str) -> Result<CompiledTemplate, TemplateError> {
    let mut parser = TemplateParser::new(name, source);
    let values = parser.parse_values()?;

    let mut states: IndexMap<String, State> = IndexMap::new();
    while let Some(state) = parser.parse_state(&values)? {
        if states.contains_key(&state.name) {
            return Err(parser.error(TemplateErrorKind::InvalidState {
                message: format!("duplicate state name '{}'", state.name),
            }));
        }
        states.insert(state.name.clone(), state);
    }

    validate(name, &mut states)?;

    debug!(
        "Compiled template '{}': {} values, {} states",
        name,
        values.len(),
        states.len()
    );

    Ok(CompiledTemplate {
        name: name.to_string(),
        values,
        states,
    })
}

fn validate(name: &str, states: &mut IndexMap<String, State>) -> Result<(), TemplateError> {
    if !states.contains_key(super::START_STATE) {
        return Err(TemplateError::new(name, 0, TemplateErrorKind::MissingStart));
    }

    if let Some(end) = states.get(super::END_STATE) {
        if let Some(rule) = end.rules.first() {
            return Err(TemplateError::new(
                name,
                rule.line_num,
                TemplateErrorKind::InvalidState {
                    message: "non-empty 'End' state".to_string(),
                },
            ));
        }
    }
    states.shift_remove(super::END_STATE);

    for state in states.values() {
        for rule in &state.rules {
            if rule.line_action == LineAction::Error {
                continue;
            }
            let Some(target) = rule.new_state.as_deref() else {
                continue;
            };
            if target == super::END_STATE || target == super::EOF_STATE {
                continue;
            }
            if !states.contains_key(target) {
                return Err(TemplateError::new(
                    name,
                    rule.line_num,
                    TemplateErrorKind::UnknownState {
                        target: target.to_string(),
                        state: state.name.clone(),
                    },
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::RecordAction;

    const INTERFACES: &str = "\
# Interface status
Value Required Interface (\\S+)
Value Status (up|down)

Start
  ^Interface -> Interfaces

Interfaces
  # one row per interface
  ^${Interface}\\s+${Status} -> Record
";

    #[test]
    fn test_compile_states_in_order() {
        let template = compile("interfaces", INTERFACES).unwrap();
        assert_eq!(template.header(), vec!["Interface", "Status"]);
        let names: Vec<&str> = template.states().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Start", "Interfaces"]);

        let rules = &template.state("Interfaces").unwrap().rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].record_action, RecordAction::Record);
        assert_eq!(rules[0].line_num, 10);
    }

    #[test]
    fn test_missing_start() {
        let err = compile("t", "Value A (a)\n\nBody\n  ^${A} -> Record\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::MissingStart));
    }

    #[test]
    fn test_undeclared_reference_carries_line() {
        let err = compile("t", "Value A (a)\n\nStart\n  ^${B} -> Record\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::UndeclaredValue { .. }));
        assert_eq!(err.line, 4);
        assert_eq!(err.source_name, "t");
    }

    #[test]
    fn test_duplicate_value() {
        let err = compile("t", "Value A (a)\nValue A (b)\n\nStart\n  ^${A}\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::DuplicateValue { .. }));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unknown_target_state() {
        let err = compile("t", "Value A (a)\n\nStart\n  ^${A} -> Nowhere\n").unwrap_err();
        assert!(matches!(
            err.kind,
            TemplateErrorKind::UnknownState { ref target, .. } if target == "Nowhere"
        ));
    }

    #[test]
    fn test_reserved_targets_need_no_declaration() {
        assert!(compile("t", "Value A (a)\n\nStart\n  ^${A} -> End\n  ^b -> EOF\n").is_ok());
    }

    #[test]
    fn test_end_state_must_be_empty() {
        let err = compile("t", "Value A (a)\n\nStart\n  ^${A}\n\nEnd\n  ^x\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::InvalidState { .. }));

        let template = compile("t", "Value A (a)\n\nStart\n  ^${A}\n\nEnd\n").unwrap();
        assert!(template.state("End").is_none());
    }

    #[test]
    fn test_action_keyword_state_rejected() {
        for name in ["Record", "Next", "Continue", "Error", "Clear", "Clearall", "NoRecord"] {
            let source = format!("Value A (a)\n\nStart\n  ^${{A}}\n\n{name}\n  ^b\n");
            let err = compile("t", &source).unwrap_err();
            assert!(matches!(err.kind, TemplateErrorKind::InvalidState { .. }));
            assert_eq!(err.line, 6);
        }
    }

    #[test]
    fn test_rule_needs_indentation() {
        let err = compile("t", "Value A (a)\n\nStart\n^${A}\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::InvalidRule { .. }));
    }

    #[test]
    fn test_missing_blank_line_after_values() {
        let err = compile("t", "Value A (a)\nStart\n  ^${A}\n").unwrap_err();
        assert!(matches!(err.kind, TemplateErrorKind::InvalidValue { .. }));
    }
}
