//! Offset-based lazy pagination.
//!
//! Unlike the streaming layer, pagination never holds a cursor between
//! pulls: every page is one fresh bounded query against the source, traded
//! for the per-page open/close overhead. The flip side is inherited from
//! offset pagination everywhere: if the table is appended to between page
//! fetches, pages may skip or repeat rows. That limitation is documented,
//! not fixed.

use crate::error::{PipelineError, PipelineResult};
use crate::row::UserRow;
use crate::source::RowSource;

/// One offset-limited read result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based row offset this page starts at.
    pub offset: usize,
    /// At most `page_size` rows in table order.
    pub rows: Vec<UserRow>,
}

impl Page {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fetch one page of up to `page_size` rows starting at `offset`.
///
/// Opens and closes its own handle; nothing is held afterwards.
pub fn fetch_page<S: RowSource + ?Sized>(
    source: &S,
    page_size: usize,
    offset: usize,
) -> PipelineResult<Page> {
    if page_size == 0 {
        return Err(PipelineError::InvalidArgument(
            "page_size must be at least 1".to_string(),
        ));
    }
    let rows = source.fetch_page(page_size, offset)?;
    Ok(Page { offset, rows })
}

/// Lazy sequence of pages, advancing the offset by `page_size` per pull.
///
/// The first empty page terminates the sequence and is itself never
/// yielded. Not restartable; a fresh paginator starts over at offset 0.
pub struct Paginator<'a, S: RowSource + ?Sized> {
    source: &'a S,
    page_size: usize,
    offset: usize,
    done: bool,
}

impl<'a, S: RowSource + ?Sized> Paginator<'a, S> {
    /// Start paginating `source` from offset 0.
    ///
    /// Rejects `page_size == 0` before any query is issued.
    pub fn new(source: &'a S, page_size: usize) -> PipelineResult<Self> {
        if page_size == 0 {
            return Err(PipelineError::InvalidArgument(
                "page_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            source,
            page_size,
            offset: 0,
            done: false,
        })
    }
}

impl<S: RowSource + ?Sized> Iterator for Paginator<'_, S> {
    type Item = PipelineResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.fetch_page(self.page_size, self.offset) {
            Ok(rows) if rows.is_empty() => {
                self.done = true;
                None
            }
            Ok(rows) => {
                let page = Page {
                    offset: self.offset,
                    rows,
                };
                self.offset += self.page_size;
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
