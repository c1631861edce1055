// src/config.rs
//! Store configuration

/// Environment variable overriding the author recorded on saved states
pub const AUTHOR_ENV: &str = "STOWAGE_AUTHOR";

/// Author used when neither the override nor `USER` is set
pub const DEFAULT_AUTHOR: &str = "stowage";

/// Options applied to a live store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Author recorded on every saved state this store creates
    pub author: String,
}

impl StoreOptions {
    /// Options from the process environment
    ///
    /// `STOWAGE_AUTHOR` wins over `USER`; both fall back to [`DEFAULT_AUTHOR`].
    pub fn from_env() -> Self {
        let author = std::env::var(AUTHOR_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var("USER").ok().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        Self { author }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            author: DEFAULT_AUTHOR.to_string(),
        }
    }
}
