//! Builder for creating parsing engines.

use indexmap::IndexMap;

use super::Engine;
use super::cache::TemplateCache;
use super::config::EngineConfig;
use crate::error::{Result, TemplateError, TemplateErrorKind};
use crate::index::Index;

/// Builder for constructing an [`Engine`].
///
/// # Example
///
/// ```rust
/// use fsmtable::engine::EngineBuilder;
///
/// # fn example() -> Result<(), fsmtable::Error> {
/// let engine = EngineBuilder::new()
///     .index("Template, Hostname, Command\nversion, .*, sh[[ow]] ve[[rsion]]\n")
///     .template("version", "Value Version (\\S+)\n\nStart\n  ^Version ${Version}\n")
///     .sort(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct EngineBuilder {
    index: Option<String>,
    templates: IndexMap<String, String>,
    config: EngineConfig,
}

impl EngineBuilder {
    /// Create a new engine builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the index source.
    pub fn index(mut self, source: impl Into<String>) -> Self {
        self.index = Some(source.into());
        self
    }

    /// Register a template source under the name the index refers to.
    ///
    /// Registering the same name twice replaces the earlier source.
    pub fn template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    /// Keep `Verbose` columns in formatted output (default: false).
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Sort merged rows by Key columns (default: false).
    pub fn sort(mut self, sort: bool) -> Self {
        self.config.sort = sort;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the engine.
    ///
    /// Parses the index and compiles every registered template, so a
    /// malformed index, a malformed template or an index row naming an
    /// unregistered template fails here rather than at parse time.
    pub fn build(self) -> Result<Engine> {
        let source = self.index.ok_or_else(|| {
            TemplateError::new(
                "index",
                0,
                TemplateErrorKind::InvalidIndex {
                    message: "Index is required".to_string(),
                },
            )
        })?;
        let index = Index::parse(&source)?;

        for row in index.rows() {
            if let Some(missing) = row.templates().iter().find(|t| !self.templates.contains_key(*t)) {
                return Err(TemplateError::new(
                    "index",
                    row.line(),
                    TemplateErrorKind::InvalidIndex {
                        message: format!("template '{missing}' is not registered"),
                    },
                )
                .into());
            }
        }

        let cache = TemplateCache::new();
        for (name, source) in &self.templates {
            cache.get_or_compile(name, source)?;
        }

        Ok(Engine {
            config: self.config,
            index,
            sources: self.templates,
            cache,
        })
    }
}
