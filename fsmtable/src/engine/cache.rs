//! Compiled template cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::error::TemplateError;
use crate::template::CompiledTemplate;

/// Name-keyed store of compiled templates, shared across executions.
///
/// Lookups take the read lock only; compilation happens outside the lock and
/// the first inserted template wins if two threads race on the same name.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
}

impl TemplateCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Get a cached template.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        templates.get(name).cloned()
    }

    /// Get a cached template, compiling `source` on a miss.
    pub fn get_or_compile(&self, name: &str, source: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if let Some(template) = self.get(name) {
            debug!("Template cache hit: {}", name);
            return Ok(template);
        }

        debug!("Template cache miss: {}", name);
        let compiled = Arc::new(CompiledTemplate::compile(name, source)?);
        Ok(self.insert(compiled))
    }

    /// Store a compiled template under its own name.
    ///
    /// Returns the cached entry, which is the existing one if the name was
    /// already present.
    pub fn insert(&self, template: Arc<CompiledTemplate>) -> Arc<CompiledTemplate> {
        let mut templates = self.templates.write().unwrap_or_else(|e| e.into_inner());
        templates
            .entry(template.name().to_string())
            .or_insert(template)
            .clone()
    }

    /// Check if a template is cached.
    pub fn contains(&self, name: &str) -> bool {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        templates.contains_key(name)
    }

    /// Number of cached templates.
    pub fn len(&self) -> usize {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        templates.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the cached templates, sorted.
    pub fn names(&self) -> Vec<String> {
        let templates = self.templates.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = templates.keys().cloned().collect();
        names.sort();
        names
    }
}
