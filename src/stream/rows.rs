//! One-row-at-a-time streaming.

use crate::error::PipelineResult;
use crate::row::UserRow;
use crate::source::{RowCursor, RowSource};

/// Lazy sequence of single rows over one open cursor.
///
/// Opening the stream opens a fresh cursor, so two streams are two
/// independent passes; one stream can only be iterated once. The cursor is
/// held open for the whole iteration and released exactly once: on natural
/// exhaustion, on the first error, or when the stream is dropped early.
pub struct RowStream {
    cursor: Option<Box<dyn RowCursor>>,
}

impl RowStream {
    /// Open a fresh pass over `source`.
    pub fn open<S: RowSource + ?Sized>(source: &S) -> PipelineResult<Self> {
        Ok(Self {
            cursor: Some(source.open()?),
        })
    }

    /// Release the cursor now instead of waiting for drop. Idempotent.
    pub fn close(&mut self) -> PipelineResult<()> {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close()?;
        }
        Ok(())
    }

    /// Whether the underlying cursor has been released.
    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }
}

impl Iterator for RowStream {
    type Item = PipelineResult<UserRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                let _ = self.close();
                None
            }
            Err(e) => {
                // A failed read ends the pass; release the cursor before
                // surfacing the error.
                let _ = self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        let _ = self.close();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{users, SpySource};
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_streams_all_rows_in_order() -> anyhow::Result<()> {
        let source = SpySource::new(users(5));
        let rows: Vec<UserRow> = RowStream::open(&source)?.collect::<PipelineResult<_>>()?;
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].user_id, "u0");
        assert_eq!(rows[4].user_id, "u4");
        Ok(())
    }

    #[test]
    fn test_empty_source() -> anyhow::Result<()> {
        let source = SpySource::new(Vec::new());
        let mut stream = RowStream::open(&source)?;
        assert!(stream.next().is_none());
        assert!(stream.is_closed());
        Ok(())
    }

    #[test]
    fn test_exhaustion_closes_exactly_once() -> anyhow::Result<()> {
        let source = SpySource::new(users(3));
        {
            let stream = RowStream::open(&source)?;
            assert_eq!(stream.count(), 3);
        }
        // Drop after exhaustion must not close a second time.
        assert_eq!(source.close_count(), 1);
        Ok(())
    }

    #[test]
    fn test_early_abandonment_closes_exactly_once() -> anyhow::Result<()> {
        let source = SpySource::new(users(10));
        {
            let mut stream = RowStream::open(&source)?;
            let first = stream.next().unwrap()?;
            assert_eq!(first.user_id, "u0");
            // Consumer walks away after one of ten rows.
        }
        assert_eq!(source.close_count(), 1);
        Ok(())
    }

    #[test]
    fn test_error_closes_cursor_and_ends_stream() -> anyhow::Result<()> {
        let mut source = SpySource::new(users(5));
        source.fail_at = Some(2);

        let mut stream = RowStream::open(&source)?;
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap();
        assert!(matches!(err, Err(PipelineError::Data(_))));
        assert!(stream.is_closed());
        assert!(stream.next().is_none());
        assert_eq!(source.close_count(), 1);
        Ok(())
    }

    #[test]
    fn test_two_streams_are_independent_passes() -> anyhow::Result<()> {
        let source = SpySource::new(users(4));
        let first: Vec<_> = RowStream::open(&source)?.collect::<PipelineResult<_>>()?;
        let second: Vec<_> = RowStream::open(&source)?.collect::<PipelineResult<_>>()?;
        assert_eq!(first, second);
        assert_eq!(source.close_count(), 2);
        Ok(())
    }
}
