//! Configuration for the vault engine.

/// Default payload streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Configuration for a [`crate::BlockVault`].
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Chunk size for streaming payloads to and from the large-object
    /// space. Bounds peak memory per transfer; not otherwise semantically
    /// significant. Must be nonzero.
    pub chunk_size: usize,
}

impl VaultConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the streaming chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = VaultConfig::new().with_chunk_size(1024);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(VaultConfig::default().chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
