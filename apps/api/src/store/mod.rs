//! Persistence adapter for sessions and answers.
//!
//! All SQL lives here. Functions take `&mut SqliteConnection` so callers can
//! compose several of them inside one transaction (`&mut *tx`). JSON columns
//! are encoded on write in these functions and decoded on read by the row
//! adapters in `crate::models`.

pub mod answers;
pub mod sessions;
