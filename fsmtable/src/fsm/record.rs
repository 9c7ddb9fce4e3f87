//! The in-progress record mutated while rules match.

use crate::table::Cell;
use crate::template::{Value, ValueOptions};

/// Per-value capture state.
#[derive(Debug, Default, Clone)]
struct Slot {
    /// Latest scalar capture.
    value: Option<String>,

    /// Accumulated captures for `List` values.
    items: Vec<String>,

    /// Last capture of a `Filldown` value, restored on clear.
    remembered: Option<String>,
}

impl Slot {
    fn is_empty(&self, options: ValueOptions) -> bool {
        if options.contains(ValueOptions::LIST) {
            self.items.is_empty()
        } else {
            self.value.as_deref().is_none_or(str::is_empty)
        }
    }
}

/// Capture slots for every value of a template, in declaration order.
#[derive(Debug)]
pub(crate) struct Record<'t> {
    values: &'t [Value],
    slots: Vec<Slot>,
}

impl<'t> Record<'t> {
    pub(crate) fn new(values: &'t [Value]) -> Self {
        Self {
            values,
            slots: vec![Slot::default(); values.len()],
        }
    }

    /// Store a capture for the value at `index`.
    pub(crate) fn assign(&mut self, index: usize, capture: &str) {
        let options = self.values[index].options;
        let slot = &mut self.slots[index];
        slot.value = Some(capture.to_string());
        if options.contains(ValueOptions::LIST) {
            slot.items.push(capture.to_string());
        }
        if options.contains(ValueOptions::FILLDOWN) {
            slot.remembered = Some(capture.to_string());
        }
    }

    /// Reset every value except the remembered `Filldown` ones.
    pub(crate) fn clear(&mut self) {
        for (slot, value) in self.slots.iter_mut().zip(self.values) {
            if value.has(ValueOptions::FILLDOWN) {
                slot.value = slot.remembered.clone();
            } else {
                slot.value = None;
                slot.items.clear();
            }
        }
    }

    /// Reset every value, `Filldown` included.
    pub(crate) fn clear_all(&mut self) {
        self.slots.fill(Slot::default());
    }

    /// Check if no value holds data.
    pub(crate) fn is_empty(&self) -> bool {
        self.slots
            .iter()
            .zip(self.values)
            .all(|(slot, value)| slot.is_empty(value.options))
    }

    /// Check if every `Required` value holds data.
    pub(crate) fn satisfies_required(&self) -> bool {
        self.slots
            .iter()
            .zip(self.values)
            .filter(|(_, value)| value.has(ValueOptions::REQUIRED))
            .all(|(slot, value)| !slot.is_empty(value.options))
    }

    /// Snapshot the record as table cells.
    pub(crate) fn to_row(&self) -> Vec<Cell> {
        self.slots
            .iter()
            .zip(self.values)
            .map(|(slot, value)| {
                if value.has(ValueOptions::BLANK) {
                    Cell::empty()
                } else if value.has(ValueOptions::LIST) {
                    Cell::List(slot.items.clone())
                } else {
                    Cell::Text(slot.value.clone().unwrap_or_default())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Vec<Value> {
        vec![
            Value::parse(r"Value Filldown Chassis (\S+)").unwrap(),
            Value::parse(r"Value Required Slot (\d+)").unwrap(),
            Value::parse(r"Value List Ports (\S+)").unwrap(),
        ]
    }

    #[test]
    fn test_clear_keeps_filldown() {
        let values = values();
        let mut record = Record::new(&values);
        record.assign(0, "mx960");
        record.assign(1, "3");
        record.assign(2, "xe-3/0/0");
        record.assign(2, "xe-3/0/1");

        assert_eq!(
            record.to_row(),
            vec![
                Cell::from("mx960"),
                Cell::from("3"),
                Cell::List(vec!["xe-3/0/0".to_string(), "xe-3/0/1".to_string()]),
            ]
        );

        record.clear();
        assert!(!record.is_empty());
        assert!(!record.satisfies_required());
        assert_eq!(
            record.to_row(),
            vec![Cell::from("mx960"), Cell::empty(), Cell::List(vec![])]
        );

        record.clear_all();
        assert!(record.is_empty());
    }

    #[test]
    fn test_empty_capture_fails_required() {
        let values = values();
        let mut record = Record::new(&values);
        record.assign(1, "");
        assert!(!record.satisfies_required());
        assert!(record.is_empty());
    }
}
