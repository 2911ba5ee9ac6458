//! Predicate filtering over batched streaming.

use crate::error::PipelineResult;
use crate::row::UserRow;
use crate::source::RowSource;
use crate::stream::BatchStream;

/// Rows matching a caller-supplied predicate, streamed in table order.
///
/// Internally the rows travel in batches of `batch_size`; the batching is an
/// implementation grouping and is invisible here, where matching rows come
/// out one at a time with intra- and inter-batch order preserved.
pub struct FilteredRows<P> {
    batches: BatchStream,
    current: std::vec::IntoIter<UserRow>,
    predicate: P,
}

impl<P> FilteredRows<P>
where
    P: FnMut(&UserRow) -> bool,
{
    /// Open a fresh filtered pass over `source`.
    pub fn open<S: RowSource + ?Sized>(
        source: &S,
        predicate: P,
        batch_size: usize,
    ) -> PipelineResult<Self> {
        Ok(Self {
            batches: BatchStream::open(source, batch_size)?,
            current: Vec::new().into_iter(),
            predicate,
        })
    }
}

impl<P> Iterator for FilteredRows<P>
where
    P: FnMut(&UserRow) -> bool,
{
    type Item = PipelineResult<UserRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            for row in self.current.by_ref() {
                if (self.predicate)(&row) {
                    return Some(Ok(row));
                }
            }
            match self.batches.next()? {
                Ok(batch) => self.current = batch.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
