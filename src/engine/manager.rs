//! Position lifecycle management.
//!
//! Owns the canonical local position set. Opens, refreshes, expires, and
//! closes positions; reconciles with the backing store. The store is the
//! source of truth for balance; between syncs the book optimistically
//! reflects price and profit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::calc::{self, AggregateRiskSnapshot};
use crate::domain::{
    Amount, InstrumentCatalog, NewPosition, OwnerId, Position, PositionId, Price, PriceQuote,
    Symbol,
};
use crate::error::{Error, StoreError, ValidationError};
use crate::store::{PositionStore, Scope};

use super::book::PositionBook;

/// Allowed leverage range.
pub const MIN_LEVERAGE: u32 = 1;
pub const MAX_LEVERAGE: u32 = 1000;

/// Outcome of a close request.
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Finalized; capital returned.
    Closed { new_balance: Amount },
    /// The position was already terminal or gone; the request was discarded.
    AlreadyClosed,
}

impl CloseOutcome {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, CloseOutcome::Closed { .. })
    }
}

/// Lifecycle manager over a backing store.
pub struct LifecycleManager<S> {
    store: Arc<S>,
    catalog: InstrumentCatalog,
    book: Mutex<PositionBook>,
    /// Close requests in flight. Ticks for these positions are skipped until
    /// the close resolves.
    pending_close: Mutex<HashSet<PositionId>>,
    last_prices: Mutex<HashMap<Symbol, Price>>,
}

impl<S: PositionStore> LifecycleManager<S> {
    #[must_use]
    pub fn new(store: Arc<S>, catalog: InstrumentCatalog) -> Self {
        Self {
            store,
            catalog,
            book: Mutex::new(PositionBook::new()),
            pending_close: Mutex::new(HashSet::new()),
            last_prices: Mutex::new(HashMap::new()),
        }
    }

    /// Reload the local book from the store. Terminal positions are not
    /// cached locally.
    pub async fn refresh(&self, scope: &Scope) -> Result<usize, StoreError> {
        let positions = self.store.positions(scope, None).await?;
        let live: Vec<Position> = positions
            .into_iter()
            .filter(|p| !p.status().is_terminal())
            .collect();
        let count = live.len();
        self.book.lock().reload(live);
        info!(count, "position book refreshed");
        Ok(count)
    }

    fn validate_open(&self, params: &NewPosition, capital: Amount) -> Result<(), ValidationError> {
        if !(MIN_LEVERAGE..=MAX_LEVERAGE).contains(&params.leverage) {
            return Err(ValidationError::LeverageOutOfRange(
                params.leverage,
                MIN_LEVERAGE,
                MAX_LEVERAGE,
            ));
        }
        if params.open_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveOpenPrice(params.open_price));
        }
        if params.stake <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveStake(params.stake));
        }
        if params.lot_size <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveLotSize(params.lot_size));
        }
        if params.duration.value() == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        if params.capital_fraction <= Decimal::ZERO || params.capital_fraction > Decimal::ONE {
            return Err(ValidationError::CapitalFractionOutOfRange(
                params.capital_fraction,
            ));
        }

        let contract_size = self.catalog.contract_size(&params.symbol);
        let metrics = calc::lot_metrics(
            params.open_price,
            contract_size,
            params.lot_size,
            params.leverage,
        );
        let allotted = params.capital_fraction * capital;
        if metrics.margin_required > allotted {
            return Err(ValidationError::InsufficientCapital {
                required: metrics.margin_required,
                allotted,
            });
        }
        Ok(())
    }

    /// Open a position. On store rejection nothing is cached locally.
    ///
    /// When a live quote for the instrument is already known, the new
    /// position is reconciled to it immediately so the first frame is not
    /// stale at the open price.
    pub async fn open(&self, params: NewPosition) -> Result<PositionId, Error> {
        let capital = self.store.balance(&params.owner).await?;
        self.validate_open(&params, capital)?;

        let symbol = params.symbol.clone();
        let mut position = self.store.open(params).await?;

        let known_price = self.last_prices.lock().get(&symbol).copied();
        if let Some(price) = known_price {
            let contract_size = self.catalog.contract_size(&symbol);
            position.apply_price(price, contract_size, Utc::now());
        }

        let id = position.id();
        info!(position = %id, symbol = %symbol, "position opened");
        self.book.lock().insert(position);
        Ok(id)
    }

    /// Apply one price tick to every open, unexpired position on the symbol.
    /// Expired and terminal positions are untouched; positions with a close
    /// in flight are skipped.
    pub fn apply_quote(&self, symbol: &Symbol, price: Price) {
        self.last_prices.lock().insert(symbol.clone(), price);

        let contract_size = self.catalog.contract_size(symbol);
        let now = Utc::now();
        let pending = self.pending_close.lock();
        let mut book = self.book.lock();

        let mut applied = 0usize;
        for position in book.on_symbol_mut(symbol) {
            if pending.contains(&position.id()) {
                continue;
            }
            if position.apply_price(price, contract_size, now) {
                applied += 1;
            }
        }
        debug!(symbol = %symbol, applied, "quote applied");
    }

    /// Convenience for feed consumers.
    pub fn apply_price_quote(&self, quote: &PriceQuote) {
        self.apply_quote(&quote.symbol, quote.price);
    }

    /// Close a position at its last known price.
    ///
    /// While the close is in flight the position ignores ticks; on failure
    /// it stays active and ticks resume. A position already gone (locally or
    /// store-side) resolves to `AlreadyClosed` and the stale request is
    /// discarded.
    pub async fn close(&self, id: PositionId) -> Result<CloseOutcome, Error> {
        let (close_price, profit, stake) = {
            // Lock order everywhere: pending before book.
            let mut pending = self.pending_close.lock();
            let book = self.book.lock();
            let Some(position) = book.get(id) else {
                return Ok(CloseOutcome::AlreadyClosed);
            };
            if !pending.insert(id) {
                // A close for this position is already in flight.
                return Ok(CloseOutcome::AlreadyClosed);
            }
            (position.current_price(), position.profit(), position.stake())
        };

        match self.store.close(id, close_price, profit, stake).await {
            Ok(receipt) => {
                self.book.lock().remove(id);
                self.pending_close.lock().remove(&id);
                info!(position = %id, profit = %profit, "position closed");
                Ok(CloseOutcome::Closed {
                    new_balance: receipt.new_balance,
                })
            }
            Err(StoreError::NotFound(_) | StoreError::Conflict(_)) => {
                // Already terminal on the server: drop our stale copy.
                self.book.lock().remove(id);
                self.pending_close.lock().remove(&id);
                Ok(CloseOutcome::AlreadyClosed)
            }
            Err(error) => {
                self.pending_close.lock().remove(&id);
                warn!(position = %id, error = %error, "close failed, position stays active");
                Err(error.into())
            }
        }
    }

    /// Freeze every position whose duration has elapsed. Local transition
    /// only; the store is not written.
    pub fn expire_due(&self) -> usize {
        let now = Utc::now();
        let mut book = self.book.lock();
        let mut expired = 0usize;
        for position in book.iter_mut() {
            if position.mark_expired(now) {
                expired += 1;
                info!(position = %position.id(), "position expired");
            }
        }
        expired
    }

    /// Snapshot of one position.
    #[must_use]
    pub fn position(&self, id: PositionId) -> Option<Position> {
        self.book.lock().get(id).cloned()
    }

    /// Snapshot of every cached position.
    #[must_use]
    pub fn positions(&self) -> Vec<Position> {
        self.book.lock().iter().cloned().collect()
    }

    /// Aggregate risk picture for one owner, against their store balance.
    pub async fn risk_snapshot(&self, owner: &OwnerId) -> Result<AggregateRiskSnapshot, Error> {
        let balance = self.store.balance(owner).await?;
        let positions = self.book.lock().owned_by(owner);
        let committed: Amount = positions
            .iter()
            .filter(|p| !p.status().is_terminal())
            .map(Position::stake)
            .sum();
        Ok(calc::aggregate(&positions, balance + committed))
    }

    /// Replace the cached copy of a position the store just updated.
    /// No-op when the position is not cached (e.g. another operator's scope).
    pub(crate) fn admit_update(&self, updated: Position) {
        let mut book = self.book.lock();
        if updated.status().is_terminal() {
            book.remove(updated.id());
        } else if book.get(updated.id()).is_some() {
            book.insert(updated);
        }
    }

    /// The backing store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The instrument catalog in use.
    #[must_use]
    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }
}
