//! Per-device command output and formatting results.

use indexmap::IndexMap;

use crate::error::Error;
use crate::index::{COMMAND_COLUMN, HOSTNAME_COLUMN};
use crate::table::Table;

/// Raw output of one command on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutput {
    /// Device name, used as the `Hostname` attribute and the merged `Host` cell.
    pub device: String,

    /// The command that produced the output.
    pub command: String,

    /// Extra index attributes (e.g. `Vendor`, `Model`).
    pub attributes: IndexMap<String, String>,

    /// Captured command output.
    pub data: String,
}

impl DeviceOutput {
    /// Create a device output without extra attributes.
    pub fn new(device: impl Into<String>, command: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            command: command.into(),
            attributes: IndexMap::new(),
            data: data.into(),
        }
    }

    /// Add an index attribute.
    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Attributes used for index selection: `Hostname`, `Command`, then the
    /// extra attributes in insertion order.
    pub fn select_attributes(&self) -> Vec<(&str, &str)> {
        let mut attributes = vec![
            (HOSTNAME_COLUMN, self.device.as_str()),
            (COMMAND_COLUMN, self.command.as_str()),
        ];
        attributes.extend(self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        attributes
    }
}

/// What became of one device output.
#[derive(Debug)]
pub enum Outcome {
    /// A template applied.
    Parsed {
        /// Device name.
        device: String,
        /// Parsed table.
        table: Table,
    },

    /// No template applies; the output is passed through unchanged.
    Raw(DeviceOutput),

    /// Template execution or extension failed.
    Failed {
        /// Device name.
        device: String,
        /// The failure.
        error: Error,
    },
}

/// Collated result of formatting a batch of device outputs.
#[derive(Debug, Default)]
pub struct Formatted {
    /// Merged tables, one per distinct column list.
    pub tables: Vec<Table>,

    /// Outputs no template applied to, in input order.
    pub raw: Vec<DeviceOutput>,

    /// Per-device failures, in input order.
    pub failures: Vec<(String, Error)>,
}

impl Formatted {
    /// Check if every device produced a table.
    pub fn is_complete(&self) -> bool {
        self.raw.is_empty() && self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_attributes_order() {
        let output = DeviceOutput::new("r1", "show version", "")
            .with_attribute("Vendor", "Juniper")
            .with_attribute("Model", "mx960");
        assert_eq!(
            output.select_attributes(),
            vec![
                ("Hostname", "r1"),
                ("Command", "show version"),
                ("Vendor", "Juniper"),
                ("Model", "mx960"),
            ]
        );
    }

    #[test]
    fn test_formatted_complete() {
        let mut formatted = Formatted::default();
        assert!(formatted.is_complete());
        formatted.raw.push(DeviceOutput::new("r1", "ping", "!!!!!"));
        assert!(!formatted.is_complete());
    }
}
