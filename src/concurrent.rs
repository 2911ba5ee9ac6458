//! Concurrent queries against one table.
//!
//! Usage example rather than core contract: two full passes run at the same
//! time, each on its own independently opened table handle. Handles are
//! never shared across tasks, so cancelling one query cannot close a handle
//! another query is reading from.

use crate::error::{PipelineError, PipelineResult};
use crate::row::UserRow;
use crate::source::{SourceConfig, UserTable};
use crate::stream::RowStream;

/// Results of [`fetch_users_concurrently`].
#[derive(Debug)]
pub struct ConcurrentFetch {
    /// Every row of the table.
    pub all_users: Vec<UserRow>,
    /// Rows with `age >= 40`.
    pub older_users: Vec<UserRow>,
}

/// Run the all-users and users-40-and-over queries concurrently.
pub async fn fetch_users_concurrently(config: &SourceConfig) -> PipelineResult<ConcurrentFetch> {
    let all_config = config.clone();
    let older_config = config.clone();

    let all_task = tokio::task::spawn_blocking(move || -> PipelineResult<Vec<UserRow>> {
        let table = UserTable::open(&all_config)?;
        RowStream::open(&table)?.collect()
    });
    let older_task = tokio::task::spawn_blocking(move || -> PipelineResult<Vec<UserRow>> {
        let table = UserTable::open(&older_config)?;
        RowStream::open(&table)?
            .filter(|row| row.as_ref().map(|r| r.age >= 40).unwrap_or(true))
            .collect()
    });

    let (all_users, older_users) = tokio::try_join!(all_task, older_task)
        .map_err(|e| PipelineError::Task(e.to_string()))?;
    Ok(ConcurrentFetch {
        all_users: all_users?,
        older_users: older_users?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::UserRow;
    use tempfile::tempdir;

    fn seed(config: &SourceConfig) -> PipelineResult<UserTable> {
        let table = UserTable::create(config)?;
        table.insert_many(vec![
            UserRow::new("u1", "Alice Johnson", "alice@example.com", 28),
            UserRow::new("u2", "Bob Smith", "bob@example.com", 45),
            UserRow::new("u3", "Charlie Brown", "charlie@example.com", 22),
            UserRow::new("u4", "Diana Prince", "diana@example.com", 42),
        ])?;
        Ok(table)
    }

    #[tokio::test]
    async fn test_concurrent_fetch() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = SourceConfig::new(dir.path());
        seed(&config)?;

        let fetched = fetch_users_concurrently(&config).await?;
        assert_eq!(fetched.all_users.len(), 4);
        assert_eq!(fetched.older_users.len(), 2);
        assert!(fetched.older_users.iter().all(|row| row.age >= 40));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_fetch_missing_table() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = SourceConfig::new(dir.path());

        let result = fetch_users_concurrently(&config).await;
        assert!(matches!(result, Err(PipelineError::Connection { .. })));
        Ok(())
    }
}
