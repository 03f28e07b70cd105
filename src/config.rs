//! Configuration for the search service.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::highlight::HighlightConfig;

/// Configuration for searching and highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Index field searched.
    pub field: String,
    /// Context distance used when a request asks for 0.
    pub default_proximity_distance: u32,
    /// Requests with a larger context distance are rejected.
    pub max_proximity_distance: u32,
    /// Lowercase query words (never applied to regex words).
    pub lowercase_queries: bool,
    /// Highlight markup configuration.
    pub highlight: HighlightConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            field: "text".to_string(),
            default_proximity_distance: 10,
            max_proximity_distance: 100,
            lowercase_queries: true,
            highlight: HighlightConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file. Missing keys take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SearchError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Set the searched field.
    pub fn field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = field.into();
        self
    }

    /// Set the default context distance.
    pub fn default_proximity_distance(mut self, distance: u32) -> Self {
        self.default_proximity_distance = distance;
        self
    }

    /// Set the maximum context distance.
    pub fn max_proximity_distance(mut self, distance: u32) -> Self {
        self.max_proximity_distance = distance;
        self
    }

    /// Enable or disable query lowercasing.
    pub fn lowercase_queries(mut self, lowercase: bool) -> Self {
        self.lowercase_queries = lowercase;
        self
    }

    /// Set the highlight configuration.
    pub fn highlight(mut self, highlight: HighlightConfig) -> Self {
        self.highlight = highlight;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(SearchError::config("field must not be empty"));
        }
        if self.default_proximity_distance == 0 {
            return Err(SearchError::config(
                "default_proximity_distance must be greater than 0",
            ));
        }
        if self.default_proximity_distance > self.max_proximity_distance {
            return Err(SearchError::config(format!(
                "default_proximity_distance {} exceeds max_proximity_distance {}",
                self.default_proximity_distance, self.max_proximity_distance
            )));
        }
        self.highlight.validate()
    }

    /// Context distance for a request, substituting the default for 0.
    pub fn proximity_distance(&self, requested: u32) -> Result<u32> {
        match requested {
            0 => Ok(self.default_proximity_distance),
            d if d > self.max_proximity_distance => Err(SearchError::query(format!(
                "proximity distance {d} exceeds the maximum of {}",
                self.max_proximity_distance
            ))),
            d => Ok(d),
        }
    }
}
