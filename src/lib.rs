//! Margindesk - leveraged position simulation for practice-trading platforms.
//!
//! The core of a paper-trading service: users open leveraged positions,
//! the positions track live market quotes, margin and PnL are recomputed on
//! every tick, positions expire on schedule, and privileged operators can
//! override position fields with a mandatory audit trail.
//!
//! # Architecture
//!
//! Data flows feed → engine → calc:
//!
//! - **[`feed`]** - Price feed adapter. An ordered chain of transport
//!   strategies serves every quote request; a synthetic generator anchored to
//!   last-known-good prices is the guaranteed-last link, so consumers always
//!   receive a quote, tagged live or synthetic.
//! - **[`engine`]** - Position lifecycle manager. Owns the local position
//!   book, applies quotes in arrival order per symbol, freezes positions at
//!   expiry, and finalizes closes through the backing store.
//! - **[`calc`]** - Pure margin and PnL math, including the aggregate risk
//!   snapshot (free margin, margin level).
//! - **[`audit`]** - Administrative modifications: typed field diffs, a
//!   mandatory justification, and immutable per-field audit records.
//! - **[`store`]** - The backing-store boundary as an async trait, with an
//!   in-memory implementation for tests and demos.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use margindesk::domain::InstrumentCatalog;
//! use margindesk::engine::LifecycleManager;
//! use margindesk::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = LifecycleManager::new(store, InstrumentCatalog::new());
//! ```

pub mod audit;
pub mod calc;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod feed;
pub mod store;
