//! In-memory store for tests and the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{
    Amount, FieldChange, InstrumentCatalog, NewPosition, OwnerId, Position, PositionId,
    PositionModification, PositionStatus, Price,
};
use crate::error::StoreError;

use super::{CloseReceipt, PositionStore, Scope};

#[derive(Debug, Default)]
struct State {
    positions: HashMap<PositionId, Position>,
    modifications: Vec<PositionModification>,
    balances: HashMap<OwnerId, Amount>,
}

/// Memory-backed `PositionStore`.
pub struct MemoryStore {
    state: Mutex<State>,
    catalog: InstrumentCatalog,
    default_balance: Amount,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            catalog: InstrumentCatalog::new(),
            default_balance: Decimal::from(10_000),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: InstrumentCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Seed an owner's balance.
    #[must_use]
    pub fn with_balance(self, owner: OwnerId, balance: Amount) -> Self {
        self.state.lock().balances.insert(owner, balance);
        self
    }

    fn balance_of(state: &State, owner: &OwnerId, default: Amount) -> Amount {
        state.balances.get(owner).copied().unwrap_or(default)
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn positions(
        &self,
        scope: &Scope,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        let state = self.state.lock();
        let mut positions: Vec<Position> = state
            .positions
            .values()
            .filter(|p| scope.permits(p.owner()))
            .filter(|p| status.map_or(true, |s| p.status() == s))
            .cloned()
            .collect();
        positions.sort_by_key(Position::opened_at);
        Ok(positions)
    }

    async fn position(
        &self,
        scope: &Scope,
        id: PositionId,
    ) -> Result<Option<Position>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .positions
            .get(&id)
            .filter(|p| scope.permits(p.owner()))
            .cloned())
    }

    async fn open(&self, new: NewPosition) -> Result<Position, StoreError> {
        let mut state = self.state.lock();
        let balance = Self::balance_of(&state, &new.owner, self.default_balance);
        if new.stake > balance {
            return Err(StoreError::Rejected(format!(
                "stake {} exceeds balance {balance}",
                new.stake
            )));
        }

        let contract_size = self.catalog.contract_size(&new.symbol);
        let owner = new.owner.clone();
        let position = Position::open(PositionId::generate(), new, contract_size, Utc::now());

        state.balances.insert(owner, balance - position.stake());
        state.positions.insert(position.id(), position.clone());
        Ok(position)
    }

    async fn close(
        &self,
        id: PositionId,
        close_price: Price,
        profit: Amount,
        stake: Amount,
    ) -> Result<CloseReceipt, StoreError> {
        let mut state = self.state.lock();
        let position = state
            .positions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if position.status().is_terminal() {
            return Err(StoreError::Conflict(id.to_string()));
        }

        position.set_current_price_raw(close_price);
        position.terminate(PositionStatus::Closed);
        let owner = position.owner().clone();

        let balance = Self::balance_of(&state, &owner, self.default_balance);
        let new_balance = balance + stake + profit;
        state.balances.insert(owner, new_balance);
        Ok(CloseReceipt { new_balance })
    }

    async fn modify(
        &self,
        id: PositionId,
        changes: &[FieldChange],
        records: Vec<PositionModification>,
    ) -> Result<Position, StoreError> {
        let mut state = self.state.lock();
        let position = state
            .positions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if position.status().is_terminal() {
            return Err(StoreError::Conflict(id.to_string()));
        }

        for change in changes {
            change.apply_to(position);
        }
        let contract_size = self.catalog.contract_size(position.symbol());
        position.recompute(contract_size);
        let updated = position.clone();

        state.modifications.extend(records);
        Ok(updated)
    }

    async fn modifications(
        &self,
        scope: &Scope,
        position_id: Option<PositionId>,
    ) -> Result<Vec<PositionModification>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .modifications
            .iter()
            .filter(|m| position_id.map_or(true, |id| m.position_id() == id))
            .filter(|m| {
                state
                    .positions
                    .get(&m.position_id())
                    .is_some_and(|p| scope.permits(p.owner()))
            })
            .cloned()
            .collect())
    }

    async fn balance(&self, owner: &OwnerId) -> Result<Amount, StoreError> {
        let state = self.state.lock();
        Ok(Self::balance_of(&state, owner, self.default_balance))
    }
}
