//! End-to-end lifecycle behavior against the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use tokio::sync::Notify;

use margindesk::domain::{
    Amount, Direction, DurationUnit, FieldChange, HoldDuration, InstrumentCatalog, NewPosition,
    OwnerId, Position, PositionId, PositionModification, PositionStatus, Price, Symbol,
};
use margindesk::engine::{CloseOutcome, LifecycleManager};
use margindesk::error::StoreError;
use margindesk::store::{CloseReceipt, MemoryStore, PositionStore, Scope};

fn params(owner: &str, symbol: &str, lot_size: rust_decimal::Decimal) -> NewPosition {
    NewPosition {
        owner: OwnerId::new(owner),
        symbol: Symbol::new(symbol),
        direction: Direction::Long,
        open_price: dec!(43250),
        stake: dec!(1000),
        leverage: 100,
        capital_fraction: dec!(0.5),
        lot_size,
        duration: HoldDuration::new(1, DurationUnit::Hour),
        stop_loss: None,
        take_profit: None,
    }
}

/// Margin round-trip for one instrument of each contract-size class.
#[tokio::test]
async fn margin_round_trip_per_contract_class() {
    let engine = LifecycleManager::new(Arc::new(MemoryStore::new()), InstrumentCatalog::new());

    // Crypto: contract size 1.
    let id = engine
        .open(params("alice", "BTCUSD", dec!(0.001)))
        .await
        .unwrap();
    let p = engine.position(id).unwrap();
    assert_eq!(p.margin_required(), dec!(43250) * dec!(1) * dec!(0.001) / dec!(100));

    // Fiat pair: contract size 100_000.
    let mut fiat = params("alice", "EURUSD", dec!(0.0001));
    fiat.open_price = dec!(1.08);
    fiat.leverage = 30;
    let id = engine.open(fiat).await.unwrap();
    let p = engine.position(id).unwrap();
    assert_eq!(
        p.margin_required(),
        dec!(1.08) * dec!(100000) * dec!(0.0001) / dec!(30)
    );

    // Metal: contract size 100.
    let mut metal = params("alice", "XAUUSD", dec!(0.01));
    metal.open_price = dec!(2040);
    metal.leverage = 20;
    let id = engine.open(metal).await.unwrap();
    let p = engine.position(id).unwrap();
    assert_eq!(
        p.margin_required(),
        dec!(2040) * dec!(100) * dec!(0.01) / dec!(20)
    );
}

/// The documented BTC scenario, end to end.
#[tokio::test]
async fn btc_long_scenario() {
    let engine = LifecycleManager::new(Arc::new(MemoryStore::new()), InstrumentCatalog::new());

    let id = engine
        .open(params("alice", "BTCUSD", dec!(0.001)))
        .await
        .unwrap();

    let p = engine.position(id).unwrap();
    assert_eq!(p.position_value(), dec!(43.25));
    assert_eq!(p.margin_required(), dec!(0.4325));

    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(44000));
    let p = engine.position(id).unwrap();
    assert!(p.profit() > dec!(17.34) && p.profit() < dec!(17.35));
    assert_eq!(p.direction(), Direction::Long);
}

/// A store whose close blocks until released, to race a tick against an
/// in-flight close.
struct GatedStore {
    inner: MemoryStore,
    gate: Notify,
    hold_close: AtomicBool,
}

#[async_trait]
impl PositionStore for GatedStore {
    async fn positions(
        &self,
        scope: &Scope,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        self.inner.positions(scope, status).await
    }

    async fn position(
        &self,
        scope: &Scope,
        id: PositionId,
    ) -> Result<Option<Position>, StoreError> {
        self.inner.position(scope, id).await
    }

    async fn open(&self, new: NewPosition) -> Result<Position, StoreError> {
        self.inner.open(new).await
    }

    async fn close(
        &self,
        id: PositionId,
        close_price: Price,
        profit: Amount,
        stake: Amount,
    ) -> Result<CloseReceipt, StoreError> {
        if self.hold_close.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.inner.close(id, close_price, profit, stake).await
    }

    async fn modify(
        &self,
        id: PositionId,
        changes: &[FieldChange],
        records: Vec<PositionModification>,
    ) -> Result<Position, StoreError> {
        self.inner.modify(id, changes, records).await
    }

    async fn modifications(
        &self,
        scope: &Scope,
        position_id: Option<PositionId>,
    ) -> Result<Vec<PositionModification>, StoreError> {
        self.inner.modifications(scope, position_id).await
    }

    async fn balance(&self, owner: &OwnerId) -> Result<Amount, StoreError> {
        self.inner.balance(owner).await
    }
}

/// A tick arriving while a close is in flight must neither change the close
/// price nor re-materialize the position after the close confirms.
#[tokio::test]
async fn tick_during_pending_close_is_ignored() {
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate: Notify::new(),
        hold_close: AtomicBool::new(true),
    });
    let engine = Arc::new(LifecycleManager::new(
        Arc::clone(&store),
        InstrumentCatalog::new(),
    ));

    let id = engine
        .open(params("alice", "BTCUSD", dec!(0.001)))
        .await
        .unwrap();
    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(44000));
    let profit_at_close = engine.position(id).unwrap().profit();

    let closer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.close(id).await })
    };
    tokio::task::yield_now().await;

    // Tick while the close is parked in the store call.
    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(99999));
    if let Some(p) = engine.position(id) {
        assert_eq!(p.profit(), profit_at_close);
    }

    store.gate.notify_one();
    let outcome = closer.await.unwrap().unwrap();
    assert!(outcome.is_closed());

    // Late ticks must not resurrect the closed position.
    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(12345));
    assert!(engine.position(id).is_none());
}

/// A store that fails its first close, then recovers.
struct FlakyStore {
    inner: MemoryStore,
    fail_next_close: AtomicBool,
}

#[async_trait]
impl PositionStore for FlakyStore {
    async fn positions(
        &self,
        scope: &Scope,
        status: Option<PositionStatus>,
    ) -> Result<Vec<Position>, StoreError> {
        self.inner.positions(scope, status).await
    }

    async fn position(
        &self,
        scope: &Scope,
        id: PositionId,
    ) -> Result<Option<Position>, StoreError> {
        self.inner.position(scope, id).await
    }

    async fn open(&self, new: NewPosition) -> Result<Position, StoreError> {
        self.inner.open(new).await
    }

    async fn close(
        &self,
        id: PositionId,
        close_price: Price,
        profit: Amount,
        stake: Amount,
    ) -> Result<CloseReceipt, StoreError> {
        if self.fail_next_close.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store offline".into()));
        }
        self.inner.close(id, close_price, profit, stake).await
    }

    async fn modify(
        &self,
        id: PositionId,
        changes: &[FieldChange],
        records: Vec<PositionModification>,
    ) -> Result<Position, StoreError> {
        self.inner.modify(id, changes, records).await
    }

    async fn modifications(
        &self,
        scope: &Scope,
        position_id: Option<PositionId>,
    ) -> Result<Vec<PositionModification>, StoreError> {
        self.inner.modifications(scope, position_id).await
    }

    async fn balance(&self, owner: &OwnerId) -> Result<Amount, StoreError> {
        self.inner.balance(owner).await
    }
}

/// A failed close leaves the position active and ticking; a retry succeeds.
#[tokio::test]
async fn failed_close_keeps_position_active() {
    let engine = LifecycleManager::new(
        Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            fail_next_close: AtomicBool::new(true),
        }),
        InstrumentCatalog::new(),
    );

    let id = engine
        .open(params("alice", "BTCUSD", dec!(0.001)))
        .await
        .unwrap();

    assert!(engine.close(id).await.is_err());
    assert!(engine.position(id).is_some());

    // Ticks resume after the failure.
    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(44000));
    assert_eq!(engine.position(id).unwrap().current_price(), dec!(44000));

    let outcome = engine.close(id).await.unwrap();
    assert!(matches!(outcome, CloseOutcome::Closed { .. }));
    assert!(engine.position(id).is_none());
}

/// Closing finalizes profit into the owner's balance.
#[tokio::test]
async fn close_refreshes_owner_balance() {
    let store = Arc::new(MemoryStore::new().with_balance(OwnerId::new("alice"), dec!(5000)));
    let engine = LifecycleManager::new(Arc::clone(&store), InstrumentCatalog::new());

    let id = engine
        .open(params("alice", "BTCUSD", dec!(0.001)))
        .await
        .unwrap();
    engine.apply_quote(&Symbol::new("BTCUSD"), dec!(44000));
    let profit = engine.position(id).unwrap().profit();

    let outcome = engine.close(id).await.unwrap();
    match outcome {
        CloseOutcome::Closed { new_balance } => {
            assert_eq!(new_balance, dec!(5000) + profit);
        }
        CloseOutcome::AlreadyClosed => panic!("expected a finalized close"),
    }
}
