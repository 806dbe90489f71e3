//! The backing-store boundary.
//!
//! Concrete transport is out of scope; the core talks to whatever persists
//! positions through this trait. Every write returns a typed result and the
//! core never panics across the boundary.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::domain::{
    Amount, FieldChange, NewPosition, OwnerId, Position, PositionId, PositionModification,
    PositionStatus, Price,
};
use crate::error::StoreError;

/// Who is asking. Reads are filtered to the scope; the audit layer never
/// widens a scope the position query already enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A single user's own positions.
    Owner(OwnerId),
    /// A mentor's assigned clients.
    Mentor(Vec<OwnerId>),
    /// Everything.
    Admin,
}

impl Scope {
    /// Whether this scope covers positions owned by `owner`.
    #[must_use]
    pub fn permits(&self, owner: &OwnerId) -> bool {
        match self {
            Scope::Owner(me) => me == owner,
            Scope::Mentor(clients) => clients.contains(owner),
            Scope::Admin => true,
        }
    }
}

/// Result of a successful close: the owner's refreshed balance.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseReceipt {
    pub new_balance: Amount,
}

/// Storage operations for positions and their audit history.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Positions visible to `scope`, optionally filtered by status.
    async fn positions(
        &self,
        scope: &Scope,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError>;

    /// One position by id, if `scope` covers it.
    async fn position(
        &self,
        scope: &Scope,
        id: PositionId,
    ) -> Result<Option<Position>, StoreError>;

    /// Persist a new position. The store assigns the id and verifies the
    /// owner's balance covers the stake.
    async fn open(&self, new: NewPosition) -> Result<Position, StoreError>;

    /// Finalize a position at the given price and profit, returning capital
    /// to the owner's balance.
    async fn close(
        &self,
        id: PositionId,
        close_price: Price,
        profit: Amount,
        stake: Amount,
    ) -> Result<CloseReceipt, StoreError>;

    /// Apply field changes and append their audit records atomically.
    /// Either everything persists or nothing does.
    async fn modify(
        &self,
        id: PositionId,
        changes: &[FieldChange],
        records: Vec<PositionModification>,
    ) -> Result<Position, StoreError>;

    /// Audit history visible to `scope`, optionally for one position.
    async fn modifications(
        &self,
        scope: &Scope,
        position_id: Option<PositionId>,
    ) -> Result<Vec<PositionModification>, StoreError>;

    /// Current capital balance for an owner.
    async fn balance(&self, owner: &OwnerId) -> Result<Amount, StoreError>;
}
