//! Typed field-level modifications and their immutable audit records.
//!
//! Each supported field has an explicit variant so the diff is exhaustive:
//! adding a field without wiring its comparator fails to compile.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{ActorId, Position, PositionId, PositionStatus, Price};

/// The set of position fields an operator may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionField {
    OpenPrice,
    CurrentPrice,
    Stake,
    Leverage,
    LotSize,
    StopLoss,
    TakeProfit,
    Status,
}

impl PositionField {
    /// Stable name used in audit history.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PositionField::OpenPrice => "open_price",
            PositionField::CurrentPrice => "current_price",
            PositionField::Stake => "stake",
            PositionField::Leverage => "leverage",
            PositionField::LotSize => "lot_size",
            PositionField::StopLoss => "stop_loss",
            PositionField::TakeProfit => "take_profit",
            PositionField::Status => "status",
        }
    }
}

impl fmt::Display for PositionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A typed field value, old or new side of a change.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Decimal(Decimal),
    Leverage(u32),
    Threshold(Option<Price>),
    Status(PositionStatus),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Decimal(v) => write!(f, "{v}"),
            FieldValue::Leverage(v) => write!(f, "{v}"),
            FieldValue::Threshold(Some(v)) => write!(f, "{v}"),
            FieldValue::Threshold(None) => write!(f, "none"),
            FieldValue::Status(s) => write!(f, "{s}"),
        }
    }
}

/// One accepted change to one field: the field plus its old and new values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: PositionField,
    pub old: FieldValue,
    pub new: FieldValue,
}

impl FieldChange {
    /// Write the new value into the position. Derived fields are recomputed
    /// by the caller once all changes of a request are applied.
    pub(crate) fn apply_to(&self, position: &mut Position) {
        match (self.field, &self.new) {
            (PositionField::OpenPrice, FieldValue::Decimal(v)) => position.set_open_price(*v),
            (PositionField::CurrentPrice, FieldValue::Decimal(v)) => {
                position.set_current_price_raw(*v);
            }
            (PositionField::Stake, FieldValue::Decimal(v)) => position.set_stake(*v),
            (PositionField::Leverage, FieldValue::Leverage(v)) => position.set_leverage(*v),
            (PositionField::LotSize, FieldValue::Decimal(v)) => position.set_lot_size(*v),
            (PositionField::StopLoss, FieldValue::Threshold(v)) => position.set_stop_loss(*v),
            (PositionField::TakeProfit, FieldValue::Threshold(v)) => {
                position.set_take_profit(*v);
            }
            (PositionField::Status, FieldValue::Status(s)) => position.set_status(*s),
            // Field/value mismatch cannot be built through the diff layer.
            _ => debug_assert!(false, "field/value mismatch in {}", self.field),
        }
    }
}

/// Immutable audit record: one field-level change, its justification, and its
/// author. Append-only; never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionModification {
    id: Uuid,
    position_id: PositionId,
    field: PositionField,
    old_value: FieldValue,
    new_value: FieldValue,
    reason: String,
    actor: ActorId,
    actor_name: String,
    timestamp: DateTime<Utc>,
}

impl PositionModification {
    /// Record a change. All records of one request share `reason`, `actor`,
    /// and `timestamp`.
    #[must_use]
    pub fn record(
        position_id: PositionId,
        change: &FieldChange,
        reason: impl Into<String>,
        actor: ActorId,
        actor_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            position_id,
            field: change.field,
            old_value: change.old.clone(),
            new_value: change.new.clone(),
            reason: reason.into(),
            actor,
            actor_name: actor_name.into(),
            timestamp,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn position_id(&self) -> PositionId {
        self.position_id
    }

    #[must_use]
    pub fn field(&self) -> PositionField {
        self.field
    }

    #[must_use]
    pub fn old_value(&self) -> &FieldValue {
        &self.old_value
    }

    #[must_use]
    pub fn new_value(&self) -> &FieldValue {
        &self.new_value
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    #[must_use]
    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn field_names_are_stable() {
        assert_eq!(PositionField::OpenPrice.name(), "open_price");
        assert_eq!(PositionField::StopLoss.name(), "stop_loss");
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Decimal(dec!(1.5)).to_string(), "1.5");
        assert_eq!(FieldValue::Threshold(None).to_string(), "none");
        assert_eq!(
            FieldValue::Status(PositionStatus::Liquidated).to_string(),
            "liquidated"
        );
    }

    #[test]
    fn record_carries_change_and_reason() {
        let change = FieldChange {
            field: PositionField::Stake,
            old: FieldValue::Decimal(dec!(1000)),
            new: FieldValue::Decimal(dec!(1500)),
        };
        let rec = PositionModification::record(
            PositionId::generate(),
            &change,
            "balance correction",
            ActorId::new("admin-1"),
            "Admin One",
            Utc::now(),
        );

        assert_eq!(rec.field(), PositionField::Stake);
        assert_eq!(rec.old_value(), &FieldValue::Decimal(dec!(1000)));
        assert_eq!(rec.new_value(), &FieldValue::Decimal(dec!(1500)));
        assert_eq!(rec.reason(), "balance correction");
        assert_eq!(rec.actor_name(), "Admin One");
    }
}
