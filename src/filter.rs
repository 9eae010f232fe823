//! Stat and module selection
//!
//! `--select-stat` values are regex fragments joined into one alternation
//! and searched anywhere in a counter name. `--select-module` values are
//! exact module names.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// Filter that decides which counter names are kept
#[derive(Debug, Clone, Default)]
pub struct StatFilter {
    /// Compiled alternation of the selected patterns (None = keep all)
    pattern: Option<Regex>,
}

impl StatFilter {
    /// Create a filter that keeps every counter
    pub fn all() -> Self {
        Self { pattern: None }
    }

    /// Build a filter from `--select-stat` style patterns
    ///
    /// An empty pattern list is match-all and is never compiled.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        if parts.is_empty() {
            return Ok(Self::all());
        }

        let joined = parts.join("|");
        let pattern = Regex::new(&joined)
            .with_context(|| format!("Invalid stat selection pattern: {}", joined))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// Check if a counter should be kept
    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            None => true,
            Some(re) => re.is_match(name),
        }
    }

    /// True when no selection is active
    pub fn is_match_all(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Filter on the module a job was compiled for
#[derive(Debug, Clone, Default)]
pub struct ModuleFilter {
    /// Set of module names to include (empty = all modules)
    include: BTreeSet<String>,
}

impl ModuleFilter {
    /// Create a filter that includes all modules
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a module should be included
    pub fn matches(&self, module: &str) -> bool {
        self.include.is_empty() || self.include.contains(module)
    }

    pub fn is_match_all(&self) -> bool {
        self.include.is_empty()
    }
}
