//! Typed row representation for the `user_data` table.
//!
//! The backing table is dynamically typed at the storage boundary; the row
//! shape is fixed here once and for all:
//!
//! | column    | type   |
//! |-----------|--------|
//! | `user_id` | string |
//! | `name`    | string |
//! | `email`   | string |
//! | `age`     | u32    |
//!
//! Rows are yielded by value. The pipeline never keeps a reference to a row
//! after handing it to the consumer.

use serde::{Deserialize, Serialize};

/// One record from the `user_data` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub age: u32,
}

impl UserRow {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        age: u32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
            age,
        }
    }
}
