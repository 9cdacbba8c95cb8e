//! # Processor Configuration Module
//!
//! Configuration for the normalization/chunking stage. The defaults match
//! the deployment this pipeline was tuned for: 1000-character chunks with
//! 100 characters of overlap and a 50-character minimum before a page is
//! considered worth indexing.

/// Configuration for chunking text
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Maximum size of each chunk, in characters
    pub chunk_size: usize,

    /// Overlap between adjacent chunks, in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Configuration for the processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Options for chunking
    pub chunk_options: ChunkOptions,

    /// Normalized pages shorter than this are skipped as noise
    pub min_content_chars: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_options: ChunkOptions::default(),
            min_content_chars: 50,
        }
    }
}

impl ProcessorConfig {
    /// Create a new builder
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }
}

/// Builder for ProcessorConfig
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the chunk size in characters
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_options.chunk_size = chunk_size;
        self
    }

    /// Set the chunk overlap in characters
    pub fn chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.config.chunk_options.chunk_overlap = chunk_overlap;
        self
    }

    /// Set the minimum content length in characters
    pub fn min_content_chars(mut self, min_content_chars: usize) -> Self {
        self.config.min_content_chars = min_content_chars;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ProcessorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = ProcessorConfig::default();
        assert_eq!(config.chunk_options.chunk_size, 1000);
        assert_eq!(config.chunk_options.chunk_overlap, 100);
        assert_eq!(config.min_content_chars, 50);
    }

    #[test]
    fn test_builder() {
        let config = ProcessorConfig::builder()
            .chunk_size(400)
            .chunk_overlap(40)
            .min_content_chars(10)
            .build();
        assert_eq!(config.chunk_options.chunk_size, 400);
        assert_eq!(config.chunk_options.chunk_overlap, 40);
        assert_eq!(config.min_content_chars, 10);
    }
}
