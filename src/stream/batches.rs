//! Fixed-size batch streaming.

use crate::error::{PipelineError, PipelineResult};
use crate::row::UserRow;
use crate::source::RowSource;
use crate::stream::RowStream;

/// An ordered group of consecutive rows, at most `batch_size` long.
pub type Batch = Vec<UserRow>;

/// Lazy sequence of row batches.
///
/// Rows accumulate from the underlying [`RowStream`] until `batch_size` is
/// reached; the stream's leftover rows form a final short batch. An empty
/// batch is never yielded. Owns its row stream, so the cursor-release
/// contract of [`RowStream`] carries over unchanged.
pub struct BatchStream {
    rows: RowStream,
    batch_size: usize,
}

impl BatchStream {
    /// Open a fresh batched pass over `source`.
    ///
    /// Rejects `batch_size == 0` before any I/O happens.
    pub fn open<S: RowSource + ?Sized>(source: &S, batch_size: usize) -> PipelineResult<Self> {
        if batch_size == 0 {
            return Err(PipelineError::InvalidArgument(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            rows: RowStream::open(source)?,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Iterator for BatchStream {
    type Item = PipelineResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.rows.next() {
                Some(Ok(row)) => batch.push(row),
                Some(Err(e)) => return Some(Err(e)),
                None => break,
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
