//! Position lifecycle manager: the canonical local position set and its
//! open / tick / expire / close operations.

mod book;
mod manager;

pub use book::PositionBook;
pub use manager::{CloseOutcome, LifecycleManager, MAX_LEVERAGE, MIN_LEVERAGE};
