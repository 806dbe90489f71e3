//! Exchange-agnostic domain types: identifiers, money, instruments,
//! positions, quotes, and audit records.

pub mod ids;
pub mod instrument;
pub mod modification;
pub mod money;
pub mod position;
pub mod quote;

pub use ids::{ActorId, OwnerId, PositionId, Symbol};
pub use instrument::{InstrumentCatalog, InstrumentClass};
pub use modification::{FieldChange, FieldValue, PositionField, PositionModification};
pub use money::{Amount, Price};
pub use position::{
    Direction, DurationUnit, HoldDuration, NewPosition, Position, PositionStatus,
};
pub use quote::{Candle, PriceQuote, QuoteFreshness};
