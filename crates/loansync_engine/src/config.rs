//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for replica synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Root of the data directory.
    pub data_directory: PathBuf,
    /// Maximum number of objects held in the read cache.
    pub cache_capacity: usize,
    /// Objects requested per bulk-import page.
    pub page_size: usize,
    /// Stop the bulk import once this many objects are stored.
    pub import_limit: Option<usize>,
    /// Default log filter directive.
    pub log_level: String,
    /// Object type whose events are reconciled.
    pub object_type: String,
    /// Name of the remote collection feed.
    pub feed_name: String,
    /// Totals above this value are treated as unknown.
    pub total_count_cap: u64,
}

impl SyncConfig {
    /// Creates a configuration with defaults rooted at `data_directory`.
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            cache_capacity: 1000,
            page_size: 10,
            import_limit: None,
            log_level: "info".to_string(),
            object_type: "Loan".to_string(),
            feed_name: "LoansFeed".to_string(),
            total_count_cap: 1000,
        }
    }

    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if a numeric variable does not
    /// parse.
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// Recognized keys: `DATA_DIRECTORY`, `LOAN_CACHE_CAPACITY`,
    /// `LOAN_IMPORT_PAGE_SIZE`, `LOAN_IMPORT_LIMIT` and `LOG_LEVEL`. Empty
    /// values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if a numeric variable does not
    /// parse.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::new(get("DATA_DIRECTORY").unwrap_or_else(|| "data".to_string()));
        if let Some(value) = get("LOAN_CACHE_CAPACITY") {
            config.cache_capacity = parse_number("LOAN_CACHE_CAPACITY", &value)?;
        }
        if let Some(value) = get("LOAN_IMPORT_PAGE_SIZE") {
            config.page_size = parse_number("LOAN_IMPORT_PAGE_SIZE", &value)?;
            if config.page_size == 0 {
                return Err(SyncError::InvalidConfig(
                    "LOAN_IMPORT_PAGE_SIZE must be positive".to_string(),
                ));
            }
        }
        if let Some(value) = get("LOAN_IMPORT_LIMIT") {
            config.import_limit = Some(parse_number("LOAN_IMPORT_LIMIT", &value)?);
        }
        if let Some(value) = get("LOG_LEVEL") {
            config.log_level = value;
        }
        Ok(config)
    }

    /// Sets the read cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the bulk-import page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Sets the bulk-import cap.
    pub fn with_import_limit(mut self, limit: usize) -> Self {
        self.import_limit = Some(limit);
        self
    }

    /// Sets the default log filter.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Sets the reconciled object type.
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self
    }

    /// Sets the remote feed name.
    pub fn with_feed_name(mut self, feed_name: impl Into<String>) -> Self {
        self.feed_name = feed_name.into();
        self
    }

    /// Sets the largest trusted total count.
    pub fn with_total_count_cap(mut self, cap: u64) -> Self {
        self.total_count_cap = cap;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> SyncResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SyncError::InvalidConfig(format!("{key} is not a number: {value:?}")))
}
