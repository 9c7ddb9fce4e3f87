//! # fsmtable
//!
//! Template-driven state machine parser for network device CLI output.
//!
//! fsmtable turns semi-structured command output into tables, in the style of
//! TextFSM templates and clitable indexes.
//!
//! ## Features
//!
//! - Template compiler with `Value` options (Required, List, Filldown, Key,
//!   Fillup, Verbose, Blank) and typed rule actions
//! - Line-by-line FSM execution over shared, immutable compiled templates
//! - Index selection by hostname, vendor, command and any extra attribute,
//!   with `sh[[ow]]` style command abbreviations
//! - Per-device table merging with a leading `Host` column
//! - Cached engine façade and concurrent batch formatting on tokio
//!
//! ## Quick Start
//!
//! ```rust
//! use fsmtable::{compile_template, execute};
//!
//! # fn main() -> Result<(), fsmtable::Error> {
//! let template = compile_template(
//!     "Value Interface (\\S+)\nValue Status (up|down)\n\nStart\n  ^${Interface}\\s+${Status} -> Record\n",
//! )?;
//!
//! let table = execute(&template, "eth0 up\neth1 down\n")?;
//! assert_eq!(table.header(), vec!["Interface", "Status"]);
//! assert_eq!(table.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod fsm;
pub mod index;
pub mod merge;
pub mod table;
pub mod template;

// Re-export main types for convenience
pub use engine::{DeviceOutput, Engine, EngineBuilder, EngineConfig, Formatted, Outcome};
pub use error::{Error, ParseError, Result, TableError, TemplateError, TemplateNotFound};
pub use fsm::execute;
pub use index::{Index, IndexRow, expand_command, load_index, select_template};
pub use merge::{merge, project};
pub use table::{Cell, Column, Table};
pub use template::{CompiledTemplate, ValueOptions};

/// Name given to templates compiled without one.
pub const ANONYMOUS_TEMPLATE: &str = "template";

/// Compile template source.
///
/// Errors are reported against [`ANONYMOUS_TEMPLATE`]; use
/// [`CompiledTemplate::compile`] to give the template a name.
pub fn compile_template(source: &str) -> std::result::Result<CompiledTemplate, TemplateError> {
    CompiledTemplate::compile(ANONYMOUS_TEMPLATE, source)
}
