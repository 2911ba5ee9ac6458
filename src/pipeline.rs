//! High-level pipeline facade.

use crate::aggregate;
use crate::error::PipelineResult;
use crate::page::{self, Page, Paginator};
use crate::row::UserRow;
use crate::source::RowSource;
use crate::stream::{BatchStream, FilteredRows, RowStream};

/// One row source with all consumption modes hanging off it.
///
/// Every call opens a fresh pass; the returned streams are single-pass and
/// independent of each other, each owning its own cursor.
pub struct Pipeline<S: RowSource> {
    source: S,
}

impl<S: RowSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stream rows one at a time.
    pub fn stream_rows(&self) -> PipelineResult<RowStream> {
        RowStream::open(&self.source)
    }

    /// Stream rows grouped into batches of `batch_size`.
    pub fn stream_batches(&self, batch_size: usize) -> PipelineResult<BatchStream> {
        BatchStream::open(&self.source, batch_size)
    }

    /// Stream the rows matching `predicate`, batched internally by
    /// `batch_size`.
    pub fn filter_rows<P>(&self, predicate: P, batch_size: usize) -> PipelineResult<FilteredRows<P>>
    where
        P: FnMut(&UserRow) -> bool,
    {
        FilteredRows::open(&self.source, predicate, batch_size)
    }

    /// Fetch one page of rows at `offset`.
    pub fn fetch_page(&self, page_size: usize, offset: usize) -> PipelineResult<Page> {
        page::fetch_page(&self.source, page_size, offset)
    }

    /// Lazily paginate the table from offset 0.
    pub fn paginate(&self, page_size: usize) -> PipelineResult<Paginator<'_, S>> {
        Paginator::new(&self.source, page_size)
    }

    /// Average the `age` column in one streaming pass. `None` means the
    /// table is empty.
    pub fn average_age(&self) -> PipelineResult<Option<f64>> {
        aggregate::average_age(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::stream::rows::testing::{users, SpySource};

    #[test]
    fn test_facade_wires_all_modes() -> anyhow::Result<()> {
        let pipeline = Pipeline::new(SpySource::new(users(8)));

        assert_eq!(pipeline.stream_rows()?.count(), 8);
        assert_eq!(pipeline.stream_batches(3)?.count(), 3);
        assert_eq!(pipeline.fetch_page(5, 5)?.len(), 3);
        assert_eq!(pipeline.paginate(4)?.count(), 2);
        assert!(pipeline.average_age()?.is_some());

        let over_25 = pipeline
            .filter_rows(|row| row.age > 25, 4)?
            .collect::<PipelineResult<Vec<_>>>()?;
        assert!(over_25.iter().all(|row| row.age > 25));
        Ok(())
    }

    #[test]
    fn test_invalid_sizes_surface_unchanged() {
        let pipeline = Pipeline::new(SpySource::new(users(2)));
        assert!(matches!(
            pipeline.stream_batches(0),
            Err(PipelineError::InvalidArgument(_))
        ));
        assert!(matches!(
            pipeline.paginate(0),
            Err(PipelineError::InvalidArgument(_))
        ));
    }
}
