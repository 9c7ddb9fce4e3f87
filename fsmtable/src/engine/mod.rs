//! Configured parsing façade.
//!
//! An [`Engine`] ties an index, the registered template sources and a cache of
//! compiled templates together. It turns a batch of [`DeviceOutput`]s into
//! merged tables, passing through outputs no template applies to.
//!
//! # Example
//!
//! ```rust
//! use fsmtable::engine::{DeviceOutput, EngineBuilder};
//!
//! # fn example() -> Result<(), fsmtable::Error> {
//! let engine = EngineBuilder::new()
//!     .index("Template, Hostname, Command\nversion, .*, sh[[ow]] ve[[rsion]]\n")
//!     .template("version", "Value Version (\\S+)\n\nStart\n  ^Version ${Version}\n")
//!     .build()?;
//!
//! let formatted = engine.format(vec![
//!     DeviceOutput::new("r1", "show version", "Version 1.2\n"),
//!     DeviceOutput::new("r2", "sh ver", "Version 1.3\n"),
//! ]);
//! assert_eq!(formatted.tables[0].len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod batch;
mod builder;
mod cache;
mod config;
mod device;

pub use builder::EngineBuilder;
pub use cache::TemplateCache;
pub use config::EngineConfig;
pub use device::{DeviceOutput, Formatted, Outcome};

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Result, TemplateError, TemplateErrorKind};
use crate::fsm::execute;
use crate::index::Index;
use crate::merge::{check_mergeable, merge_checked, project};
use crate::table::Table;
use crate::template::CompiledTemplate;

/// Index-driven parser for device command output.
///
/// Create one with [`EngineBuilder`]. The engine is `Send + Sync`; wrap it in
/// an `Arc` to share it with [`batch::format_concurrent`].
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    index: Index,
    sources: IndexMap<String, String>,
    cache: TemplateCache,
}

impl Engine {
    /// Output configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The loaded index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Names of the registered templates, in registration order.
    pub fn template_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    /// Get a compiled template by name.
    pub fn template(&self, name: &str) -> Result<Arc<CompiledTemplate>> {
        let source = self.sources.get(name).ok_or_else(|| {
            TemplateError::new(
                name,
                0,
                TemplateErrorKind::InvalidIndex {
                    message: format!("template '{name}' is not registered"),
                },
            )
        })?;
        Ok(self.cache.get_or_compile(name, source)?)
    }

    /// Select the template(s) for one device output and parse it.
    ///
    /// When the index row names several templates, the first template's
    /// table is extended with the columns of the others.
    pub fn parse(&self, output: &DeviceOutput) -> Result<Table> {
        let row = self.index.select_with(&output.select_attributes())?;
        debug!(
            "Parsing '{}' from {} with {}",
            output.command,
            output.device,
            row.templates().join(":")
        );
        self.parse_with(row.templates(), &output.data)
    }

    /// Parse `data` with the named templates, extending the first table by
    /// the later ones on the first template's Key columns.
    pub fn parse_with<S: AsRef<str>>(&self, names: &[S], data: &str) -> Result<Table> {
        let Some((first, rest)) = names.split_first() else {
            return Ok(Table::default());
        };

        let template = self.template(first.as_ref())?;
        let mut table = execute(&template, data)?;
        let keys = template.keys();

        for name in rest {
            let other = execute(&*self.template(name.as_ref())?, data)?;
            table.extend(&other, &keys)?;
        }
        Ok(table)
    }

    /// Parse one device output, classifying the result.
    pub fn outcome(&self, output: DeviceOutput) -> Outcome {
        match self.parse(&output) {
            Ok(table) => Outcome::Parsed {
                device: output.device,
                table,
            },
            Err(e) if e.is_not_found() => {
                debug!("No template for '{}' on {}, passing through", output.command, output.device);
                Outcome::Raw(output)
            }
            Err(error) => Outcome::Failed {
                device: output.device,
                error,
            },
        }
    }

    /// Parse a batch of device outputs and merge the resulting tables.
    pub fn format<I>(&self, outputs: I) -> Formatted
    where
        I: IntoIterator<Item = DeviceOutput>,
    {
        let outcomes: Vec<Outcome> = outputs.into_iter().map(|o| self.outcome(o)).collect();
        self.collate(outcomes)
    }

    /// Merge parsed tables, then apply verbosity and sorting.
    ///
    /// A table carrying its own `Host` column is reported as a failure for
    /// its device instead of being merged.
    pub(crate) fn collate(&self, outcomes: Vec<Outcome>) -> Formatted {
        let mut parsed = Vec::new();
        let mut formatted = Formatted::default();

        for outcome in outcomes {
            match outcome {
                Outcome::Parsed { device, table } => match check_mergeable(&device, &table) {
                    Ok(()) => parsed.push((device, table)),
                    Err(e) => {
                        warn!("Cannot merge output from {}: {}", device, e);
                        formatted.failures.push((device, e.into()));
                    }
                },
                Outcome::Raw(output) => formatted.raw.push(output),
                Outcome::Failed { device, error } => {
                    warn!("Failed to parse output from {}: {}", device, error);
                    formatted.failures.push((device, error));
                }
            }
        }

        formatted.tables = merge_checked(parsed)
            .iter()
            .map(|table| {
                let mut table = project(table, self.config.verbose);
                if self.config.sort {
                    table.sort_by_keys();
                }
                table
            })
            .collect();
        formatted
    }
}
