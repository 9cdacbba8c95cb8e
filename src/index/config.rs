//! # Index Configuration Module
//!
//! Configuration for the indexing stage: target collection name and vector
//! dimensionality. Defaults match the deployment this pipeline was tuned
//! for: the `school_pages` collection at 1536 dimensions.

/// Default collection name
pub const DEFAULT_COLLECTION: &str = "school_pages";

/// Configuration for the indexer
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Vector dimensionality of the collection
    pub dimensions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { dimensions: 1536 }
    }
}

impl IndexConfig {
    /// Create a new builder
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }
}

/// Builder for IndexConfig
#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    /// Set the vector dimensionality
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.config.dimensions = dimensions;
        self
    }

    /// Build the configuration
    pub fn build(self) -> IndexConfig {
        self.config
    }
}
