//! Administrative position modification with a mandatory audit trail.
//!
//! Operators propose new values for an existing position. Only fields whose
//! value actually differs enter the diff; an empty diff or an empty reason
//! rejects the request before any write. Accepted changes persist atomically
//! with one immutable audit record per changed field.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{
    ActorId, FieldChange, FieldValue, Position, PositionField, PositionId, PositionModification,
    PositionStatus, Price,
};
use crate::engine::LifecycleManager;
use crate::error::{Error, StoreError, ValidationError};
use crate::store::{PositionStore, Scope};

/// New values proposed for a position. `None` means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct ProposedValues {
    pub open_price: Option<Decimal>,
    pub current_price: Option<Decimal>,
    pub stake: Option<Decimal>,
    pub leverage: Option<u32>,
    pub lot_size: Option<Decimal>,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub status: Option<PositionStatus>,
}

/// Compare proposed values against the position, field by field. Fields equal
/// by value are excluded even when present in the proposal.
#[must_use]
pub fn diff(position: &Position, proposed: &ProposedValues) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    let mut push_decimal = |field: PositionField, old: Decimal, new: Option<Decimal>| {
        if let Some(new) = new {
            if new != old {
                changes.push(FieldChange {
                    field,
                    old: FieldValue::Decimal(old),
                    new: FieldValue::Decimal(new),
                });
            }
        }
    };
    push_decimal(PositionField::OpenPrice, position.open_price(), proposed.open_price);
    push_decimal(
        PositionField::CurrentPrice,
        position.current_price(),
        proposed.current_price,
    );
    push_decimal(PositionField::Stake, position.stake(), proposed.stake);
    push_decimal(PositionField::LotSize, position.lot_size(), proposed.lot_size);

    if let Some(new) = proposed.leverage {
        if new != position.leverage() {
            changes.push(FieldChange {
                field: PositionField::Leverage,
                old: FieldValue::Leverage(position.leverage()),
                new: FieldValue::Leverage(new),
            });
        }
    }
    if let Some(new) = proposed.stop_loss {
        if Some(new) != position.stop_loss() {
            changes.push(FieldChange {
                field: PositionField::StopLoss,
                old: FieldValue::Threshold(position.stop_loss()),
                new: FieldValue::Threshold(Some(new)),
            });
        }
    }
    if let Some(new) = proposed.take_profit {
        if Some(new) != position.take_profit() {
            changes.push(FieldChange {
                field: PositionField::TakeProfit,
                old: FieldValue::Threshold(position.take_profit()),
                new: FieldValue::Threshold(Some(new)),
            });
        }
    }
    if let Some(new) = proposed.status {
        if new != position.status() {
            changes.push(FieldChange {
                field: PositionField::Status,
                old: FieldValue::Status(position.status()),
                new: FieldValue::Status(new),
            });
        }
    }
    changes
}

/// Operator-facing modification service.
///
/// Writes go through the lifecycle manager's store and the updated position
/// is reflected back into the local book.
pub struct ModificationService<S> {
    engine: Arc<LifecycleManager<S>>,
}

impl<S: PositionStore> ModificationService<S> {
    #[must_use]
    pub fn new(engine: Arc<LifecycleManager<S>>) -> Self {
        Self { engine }
    }

    /// Propose new values for a position.
    ///
    /// Rejection order: empty reason first (before any diff is computed),
    /// then scope/lookup, then empty diff. On acceptance the store persists
    /// values and audit records together; the returned records all share one
    /// reason and timestamp.
    pub async fn propose(
        &self,
        scope: &Scope,
        actor: ActorId,
        actor_name: &str,
        position_id: PositionId,
        proposed: &ProposedValues,
        reason: &str,
    ) -> Result<Vec<PositionModification>, Error> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyReason.into());
        }

        let position = self
            .engine
            .store()
            .position(scope, position_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(position_id.to_string()))?;

        let changes = diff(&position, proposed);
        if changes.is_empty() {
            return Err(ValidationError::NoChanges.into());
        }

        let timestamp = Utc::now();
        let records: Vec<PositionModification> = changes
            .iter()
            .map(|change| {
                PositionModification::record(
                    position_id,
                    change,
                    reason,
                    actor.clone(),
                    actor_name,
                    timestamp,
                )
            })
            .collect();

        let updated = self
            .engine
            .store()
            .modify(position_id, &changes, records.clone())
            .await?;
        self.engine.admit_update(updated);

        info!(
            position = %position_id,
            actor = %actor,
            fields = changes.len(),
            "position modified"
        );
        Ok(records)
    }

    /// Audit history visible to `scope`, optionally narrowed to one position.
    /// The scope the position query enforced is honored, never widened.
    pub async fn history(
        &self,
        scope: &Scope,
        position_id: Option<PositionId>,
    ) -> Result<Vec<PositionModification>, Error> {
        Ok(self.engine.store().modifications(scope, position_id).await?)
    }
}
