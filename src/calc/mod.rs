//! Margin and PnL math.
//!
//! Pure functions, deterministic given inputs, no I/O. Division edge cases
//! clamp to safe values instead of propagating errors: a zero open price
//! yields zero profit (creation with a zero open price is rejected upstream)
//! and a zero used margin yields a margin level of 0, never NaN.

use rust_decimal::Decimal;

use crate::domain::{Amount, Direction, Position, Price};

/// Value, margin, and lot size of a position at a given price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotMetrics {
    pub position_value: Amount,
    pub margin_required: Amount,
    pub lot_size: Decimal,
}

/// Unrealized profit of a position at a given price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pnl {
    pub profit: Amount,
    pub profit_pct: Decimal,
}

/// Risk picture across a set of positions. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRiskSnapshot {
    pub total_capital: Amount,
    pub used_margin: Amount,
    pub unrealized_pnl: Amount,
    pub free_margin: Amount,
    /// Free margin over used margin, as a percentage. 0 when no margin is in
    /// use.
    pub margin_level: Decimal,
}

/// Position value and required margin for one lot position.
///
/// `position_value = price * contract_size * lot_size`,
/// `margin_required = position_value / leverage`.
#[must_use]
pub fn lot_metrics(
    price: Price,
    contract_size: Decimal,
    lot_size: Decimal,
    leverage: u32,
) -> LotMetrics {
    let position_value = price * contract_size * lot_size;
    let margin_required = if leverage == 0 {
        position_value
    } else {
        position_value / Decimal::from(leverage)
    };
    LotMetrics {
        position_value,
        margin_required,
        lot_size,
    }
}

/// Unrealized PnL under the sign convention long = +1, short = -1.
///
/// `profit = sign * ((current - open) / open) * stake`.
#[must_use]
pub fn unrealized_pnl(
    direction: Direction,
    open_price: Price,
    current_price: Price,
    stake: Amount,
) -> Pnl {
    if open_price.is_zero() {
        return Pnl {
            profit: Decimal::ZERO,
            profit_pct: Decimal::ZERO,
        };
    }
    let relative_move = (current_price - open_price) / open_price;
    let signed_move = direction.sign() * relative_move;
    Pnl {
        profit: signed_move * stake,
        profit_pct: signed_move * Decimal::from(100),
    }
}

/// Aggregate the risk picture over `positions`.
///
/// Non-terminal positions (open or expired-awaiting-close) count toward used
/// margin and unrealized PnL: expiry freezes a position but its capital stays
/// committed until an explicit close. Free margin is floor-clamped at zero.
#[must_use]
pub fn aggregate(positions: &[Position], total_capital: Amount) -> AggregateRiskSnapshot {
    let mut used_margin = Decimal::ZERO;
    let mut unrealized_pnl = Decimal::ZERO;
    for position in positions.iter().filter(|p| !p.status().is_terminal()) {
        used_margin += position.margin_required();
        unrealized_pnl += position.profit();
    }

    let free_margin = (total_capital - used_margin + unrealized_pnl).max(Decimal::ZERO);
    let margin_level = if used_margin > Decimal::ZERO {
        free_margin / used_margin * Decimal::from(100)
    } else {
        Decimal::ZERO
    };

    AggregateRiskSnapshot {
        total_capital,
        used_margin,
        unrealized_pnl,
        free_margin,
        margin_level,
    }
}
