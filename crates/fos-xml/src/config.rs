//! Store Configuration

/// Store configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Records to pre-allocate in the arena
    pub initial_capacity: usize,

    /// XML version recorded on new documents
    pub version: Option<String>,

    /// Encoding declared by new documents
    pub encoding: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            version: Some("1.0".to_string()),
            encoding: None,
        }
    }
}

impl StoreConfig {
    /// Set the arena pre-allocation
    pub fn with_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Set the version recorded on new documents
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the encoding declared by new documents
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}
