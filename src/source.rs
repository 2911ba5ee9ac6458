//! Row source layer.
//!
//! A [`RowSource`] is the boundary to the backing `user_data` table. It hands
//! out forward-only cursors for full scans and answers bounded page queries.
//! Everything above this layer (streams, batches, pages, aggregates) is
//! storage-agnostic and works against the traits defined here.

use crate::error::PipelineResult;
use crate::row::UserRow;

pub mod config;
pub mod cursor;
pub mod table;

pub use config::SourceConfig;
pub use cursor::TableCursor;
pub use table::{LoadReport, UserTable};

/// A table that can be scanned sequentially or read page by page.
pub trait RowSource {
    /// Open a fresh forward-only cursor over the whole table.
    ///
    /// Each call is an independent pass. Fails with
    /// [`PipelineError::Connection`](crate::error::PipelineError::Connection)
    /// when the backing table is unreachable; no retry is attempted.
    fn open(&self) -> PipelineResult<Box<dyn RowCursor>>;

    /// Read up to `page_size` rows starting at `offset`, opening and closing
    /// a private handle for just this call. No resources are held between
    /// calls.
    fn fetch_page(&self, page_size: usize, offset: usize) -> PipelineResult<Vec<UserRow>>;
}

/// A forward-only handle for sequential row retrieval.
///
/// Cursors are single-pass and not restartable. They must not be shared
/// between concurrent consumers; each pipeline instance owns its own.
pub trait RowCursor {
    /// Get the next row, or `None` once the table is exhausted.
    fn next_row(&mut self) -> PipelineResult<Option<UserRow>>;

    /// Release the underlying handle. Safe to call more than once and after
    /// partial iteration.
    fn close(&mut self) -> PipelineResult<()>;
}
