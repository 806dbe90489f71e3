//! The leveraged position aggregate and its lifecycle states.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::{Amount, OwnerId, PositionId, Price, Symbol};
use crate::calc;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Profit sign convention: long +1, short -1.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Unit for a position's holding duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Minute,
    Hour,
    Day,
}

/// How long a position stays live before it freezes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldDuration {
    value: u32,
    unit: DurationUnit,
}

impl HoldDuration {
    #[must_use]
    pub fn new(value: u32, unit: DurationUnit) -> Self {
        Self { value, unit }
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    #[must_use]
    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Convert to a chrono duration.
    #[must_use]
    pub fn to_duration(self) -> Duration {
        let value = i64::from(self.value);
        match self.unit {
            DurationUnit::Minute => Duration::minutes(value),
            DurationUnit::Hour => Duration::hours(value),
            DurationUnit::Day => Duration::days(value),
        }
    }
}

/// Status of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    /// Live: price ticks mutate it.
    Open,
    /// Duration elapsed: frozen until explicitly closed.
    Expired,
    /// Terminated by the owner or the system; profit finalized.
    Closed,
    /// Terminated by a risk or operator decision.
    Liquidated,
}

impl PositionStatus {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, PositionStatus::Open)
    }

    #[must_use]
    pub fn is_expired(self) -> bool {
        matches!(self, PositionStatus::Expired)
    }

    /// Closed or liquidated: no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PositionStatus::Closed | PositionStatus::Liquidated)
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => write!(f, "open"),
            PositionStatus::Expired => write!(f, "expired"),
            PositionStatus::Closed => write!(f, "closed"),
            PositionStatus::Liquidated => write!(f, "liquidated"),
        }
    }
}

/// Parameters for opening a position, validated by the lifecycle manager
/// before a `Position` is constructed.
#[derive(Debug, Clone)]
pub struct NewPosition {
    pub owner: OwnerId,
    pub symbol: Symbol,
    pub direction: Direction,
    pub open_price: Price,
    pub stake: Amount,
    pub leverage: u32,
    pub capital_fraction: Decimal,
    pub lot_size: Decimal,
    pub duration: HoldDuration,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
}

/// A leveraged exposure to one instrument.
///
/// All mutation goes through methods that honor the lifecycle gates; the
/// fields themselves are never written from outside this type.
#[derive(Debug, Clone)]
pub struct Position {
    id: PositionId,
    owner: OwnerId,
    symbol: Symbol,
    direction: Direction,
    open_price: Price,
    current_price: Price,
    stake: Amount,
    notional: Amount,
    leverage: u32,
    capital_fraction: Decimal,
    lot_size: Decimal,
    margin_required: Amount,
    position_value: Amount,
    opened_at: DateTime<Utc>,
    duration: HoldDuration,
    status: PositionStatus,
    profit: Amount,
    profit_pct: Decimal,
    stop_loss: Option<Price>,
    take_profit: Option<Price>,
}

impl Position {
    /// Construct a freshly opened position from validated parameters.
    ///
    /// `contract_size` must already be resolved for the symbol's class.
    #[must_use]
    pub fn open(
        id: PositionId,
        params: NewPosition,
        contract_size: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        let metrics = calc::lot_metrics(
            params.open_price,
            contract_size,
            params.lot_size,
            params.leverage,
        );
        Self {
            id,
            owner: params.owner,
            symbol: params.symbol,
            direction: params.direction,
            open_price: params.open_price,
            current_price: params.open_price,
            stake: params.stake,
            notional: params.stake * Decimal::from(params.leverage),
            leverage: params.leverage,
            capital_fraction: params.capital_fraction,
            lot_size: params.lot_size,
            margin_required: metrics.margin_required,
            position_value: metrics.position_value,
            opened_at,
            duration: params.duration,
            status: PositionStatus::Open,
            profit: Decimal::ZERO,
            profit_pct: Decimal::ZERO,
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
        }
    }

    #[must_use]
    pub fn id(&self) -> PositionId {
        self.id
    }

    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn open_price(&self) -> Price {
        self.open_price
    }

    #[must_use]
    pub fn current_price(&self) -> Price {
        self.current_price
    }

    #[must_use]
    pub fn stake(&self) -> Amount {
        self.stake
    }

    #[must_use]
    pub fn notional(&self) -> Amount {
        self.notional
    }

    #[must_use]
    pub fn leverage(&self) -> u32 {
        self.leverage
    }

    #[must_use]
    pub fn capital_fraction(&self) -> Decimal {
        self.capital_fraction
    }

    #[must_use]
    pub fn lot_size(&self) -> Decimal {
        self.lot_size
    }

    #[must_use]
    pub fn margin_required(&self) -> Amount {
        self.margin_required
    }

    #[must_use]
    pub fn position_value(&self) -> Amount {
        self.position_value
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    #[must_use]
    pub fn duration(&self) -> HoldDuration {
        self.duration
    }

    #[must_use]
    pub fn status(&self) -> PositionStatus {
        self.status
    }

    #[must_use]
    pub fn profit(&self) -> Amount {
        self.profit
    }

    #[must_use]
    pub fn profit_pct(&self) -> Decimal {
        self.profit_pct
    }

    #[must_use]
    pub fn stop_loss(&self) -> Option<Price> {
        self.stop_loss
    }

    #[must_use]
    pub fn take_profit(&self) -> Option<Price> {
        self.take_profit
    }

    /// When this position's duration elapses.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.opened_at + self.duration.to_duration()
    }

    /// Whether the duration has elapsed at `now`.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Whether price ticks may still mutate this position at `now`.
    #[must_use]
    pub fn accepts_ticks(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && !self.is_past_expiry(now)
    }

    /// Apply a price tick, recomputing value, margin, and profit.
    ///
    /// No-op unless the position is open and unexpired at `now`. Returns
    /// whether the tick was applied.
    pub fn apply_price(
        &mut self,
        price: Price,
        contract_size: Decimal,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.accepts_ticks(now) {
            return false;
        }
        self.current_price = price;
        let metrics = calc::lot_metrics(price, contract_size, self.lot_size, self.leverage);
        self.position_value = metrics.position_value;
        self.margin_required = metrics.margin_required;
        let pnl = calc::unrealized_pnl(self.direction, self.open_price, price, self.stake);
        self.profit = pnl.profit;
        self.profit_pct = pnl.profit_pct;
        true
    }

    /// Freeze the position once its duration has elapsed. Returns whether a
    /// transition happened.
    pub fn mark_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_open() && self.is_past_expiry(now) {
            self.status = PositionStatus::Expired;
            return true;
        }
        false
    }

    /// Terminate with the given status, finalizing the current profit.
    pub fn terminate(&mut self, status: PositionStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
    }

    pub(crate) fn set_open_price(&mut self, price: Price) {
        self.open_price = price;
    }

    pub(crate) fn set_current_price_raw(&mut self, price: Price) {
        self.current_price = price;
    }

    pub(crate) fn set_stake(&mut self, stake: Amount) {
        self.stake = stake;
    }

    pub(crate) fn set_leverage(&mut self, leverage: u32) {
        self.leverage = leverage;
    }

    pub(crate) fn set_lot_size(&mut self, lot_size: Decimal) {
        self.lot_size = lot_size;
    }

    pub(crate) fn set_stop_loss(&mut self, level: Option<Price>) {
        self.stop_loss = level;
    }

    pub(crate) fn set_take_profit(&mut self, level: Option<Price>) {
        self.take_profit = level;
    }

    pub(crate) fn set_status(&mut self, status: PositionStatus) {
        self.status = status;
    }

    /// Recompute every derived field from the primary ones. Used after an
    /// administrative modification touches an input of the lot math.
    pub(crate) fn recompute(&mut self, contract_size: Decimal) {
        let metrics =
            calc::lot_metrics(self.current_price, contract_size, self.lot_size, self.leverage);
        self.position_value = metrics.position_value;
        self.margin_required = metrics.margin_required;
        self.notional = self.stake * Decimal::from(self.leverage);
        let pnl =
            calc::unrealized_pnl(self.direction, self.open_price, self.current_price, self.stake);
        self.profit = pnl.profit;
        self.profit_pct = pnl.profit_pct;
    }
}
