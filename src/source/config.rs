//! Source configuration.
//!
//! Connection parameters are injected explicitly instead of being read from
//! process-wide environment defaults, so two pipelines can point at two
//! different tables without touching global state.

use std::path::{Path, PathBuf};

/// Default table name used by the seeding workflow.
pub const DEFAULT_TABLE_NAME: &str = "user_data";

/// Where a [`UserTable`](crate::source::UserTable) lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    data_dir: PathBuf,
    table: String,
}

impl SourceConfig {
    /// Configuration for the default `user_data` table under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }

    /// Use a different table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Path of the backing table file.
    pub fn table_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.tbl", self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_name() {
        let config = SourceConfig::new("/tmp/data");
        assert_eq!(config.table(), "user_data");
        assert_eq!(config.table_path(), PathBuf::from("/tmp/data/user_data.tbl"));
    }

    #[test]
    fn test_custom_table_name() {
        let config = SourceConfig::new("/tmp/data").with_table("accounts");
        assert_eq!(config.table(), "accounts");
        assert_eq!(config.table_path(), PathBuf::from("/tmp/data/accounts.tbl"));
    }
}
