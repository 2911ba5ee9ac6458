pub mod aggregate;
pub mod concurrent;
pub mod error;
pub mod page;
pub mod pipeline;
pub mod row;
pub mod source;
pub mod stream;
