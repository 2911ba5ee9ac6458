//! Streaming layer.
//!
//! Pull-based lazy sequences over one open cursor: single rows, fixed-size
//! batches, and predicate-filtered rows. Each stream suspends between pulls,
//! so memory stays bounded by the batch size regardless of table size. Every
//! stream is single-pass; a new pass means opening a new stream.

pub mod batches;
pub mod filter;
pub mod rows;

pub use batches::{Batch, BatchStream};
pub use filter::FilteredRows;
pub use rows::RowStream;
