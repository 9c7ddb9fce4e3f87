//! FSM execution engine.
//!
//! Runs a [`CompiledTemplate`] over raw command output, one line at a time:
//!
//! 1. The current state's rules are tried top to bottom against the line.
//! 2. A matching rule assigns its captures, applies its record action, then
//!    either stops (`Next`, taking any transition) or keeps testing the
//!    following rules against the same line (`Continue`).
//! 3. Lines that match no rule are skipped.
//! 4. Once input is exhausted the `EOF` state (if declared) runs against an
//!    empty line, otherwise the pending record is emitted.
//! 5. `Fillup` columns are back-filled.
//!
//! Execution owns all of its mutable state, so a single compiled template
//! may be executed from many threads at once.

mod record;

use log::trace;

use self::record::Record;
use crate::error::ParseError;
use crate::table::{Cell, Table};
use crate::template::{
    CompiledTemplate, END_STATE, EOF_STATE, LineAction, RecordAction, START_STATE, State,
    ValueOptions,
};

/// Run a template over raw text and return the emitted records.
pub fn execute(template: &CompiledTemplate, text: &str) -> Result<Table, ParseError> {
    let mut fsm = Fsm::new(template);

    for (idx, line) in text.lines().enumerate() {
        fsm.check_line(line, idx + 1)?;
        if fsm.state == END_STATE || fsm.state == EOF_STATE {
            break;
        }
    }

    fsm.finish(text.lines().count() + 1)?;

    let mut table = fsm.table;
    fill_up(template, &mut table);

    trace!(
        "Template '{}' produced {} rows",
        template.name(),
        table.len()
    );
    Ok(table)
}

/// Mutable run state for one execution.
struct Fsm<'t> {
    template: &'t CompiledTemplate,
    state: &'t str,
    record: Record<'t>,
    table: Table,
}

impl<'t> Fsm<'t> {
    fn new(template: &'t CompiledTemplate) -> Self {
        Self {
            template,
            state: START_STATE,
            record: Record::new(template.values()),
            table: Table::for_template(template),
        }
    }

    /// Evaluate the current state's rules against one line.
    fn check_line(&mut self, line: &str, line_number: usize) -> Result<(), ParseError> {
        let template = self.template;
        let Some(state) = template.state(self.state) else {
            return Ok(());
        };
        self.apply_rules(state, line, line_number)
    }

    fn apply_rules(
        &mut self,
        state: &'t State,
        line: &str,
        line_number: usize,
    ) -> Result<(), ParseError> {
        let template = self.template;
        let values = template.values();

        for rule in &state.rules {
            let Some(caps) = rule.regex.captures(line) else {
                continue;
            };

            for &index in &rule.captures {
                // Groups that did not participate leave the value untouched.
                if let Some(m) = caps.name(&values[index].name) {
                    self.record.assign(index, m.as_str());
                }
            }

            match rule.record_action {
                RecordAction::NoRecord => {}
                RecordAction::Record => self.emit(),
                RecordAction::Clear => self.record.clear(),
                RecordAction::Clearall => self.record.clear_all(),
            }

            match rule.line_action {
                LineAction::Continue => continue,
                LineAction::Error => {
                    return Err(ParseError {
                        template: template.name().to_string(),
                        state: state.name.clone(),
                        message: rule.error_message.clone(),
                        line_number,
                        line: line.to_string(),
                    });
                }
                LineAction::Next => {
                    if let Some(target) = rule.new_state.as_deref() {
                        trace!(
                            "{}: {} -> {} at line {}",
                            template.name(),
                            self.state,
                            target,
                            line_number
                        );
                        self.state = target;
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    /// Append the record to the table if it is complete, then clear it.
    fn emit(&mut self) {
        if !self.record.satisfies_required() {
            self.record.clear();
            return;
        }
        if self.record.is_empty() {
            return;
        }
        self.table.push_row(self.record.to_row());
        self.record.clear();
    }

    /// End-of-input handling: run `EOF` rules or emit the pending record.
    fn finish(&mut self, line_number: usize) -> Result<(), ParseError> {
        if self.state == END_STATE {
            return Ok(());
        }
        let template = self.template;
        match template.state(EOF_STATE) {
            Some(eof) => {
                self.state = EOF_STATE;
                self.apply_rules(eof, "", line_number)
            }
            None => {
                self.emit();
                Ok(())
            }
        }
    }
}

/// Copy each `Fillup` value backward into the empty cells above it.
fn fill_up(template: &CompiledTemplate, table: &mut Table) {
    let columns: Vec<usize> = template
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.has(ValueOptions::FILLUP))
        .map(|(i, _)| i)
        .collect();

    for col in columns {
        let mut carry: Option<Cell> = None;
        for row in table.rows_mut().iter_mut().rev() {
            if row[col].is_empty() {
                if let Some(cell) = &carry {
                    row[col] = cell.clone();
                }
            } else {
                carry = Some(row[col].clone());
            }
        }
    }
}
