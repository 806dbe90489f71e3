//! Arena-style registry of the locally cached positions.
//!
//! The book is the read model every calculator works from. It is owned by
//! the lifecycle manager and mutated only through its operations.

use std::collections::HashMap;

use crate::domain::{OwnerId, Position, PositionId, Symbol};

/// Active position set, keyed by id.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<PositionId, Position>,
}

impl PositionBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole book with a freshly loaded set.
    pub fn reload(&mut self, positions: Vec<Position>) {
        self.positions = positions.into_iter().map(|p| (p.id(), p)).collect();
    }

    pub fn insert(&mut self, position: Position) {
        self.positions.insert(position.id(), position);
    }

    pub fn remove(&mut self, id: PositionId) -> Option<Position> {
        self.positions.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn get_mut(&mut self, id: PositionId) -> Option<&mut Position> {
        self.positions.get_mut(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Position> {
        self.positions.values_mut()
    }

    /// Mutable view of the positions on one symbol.
    pub fn on_symbol_mut<'a>(
        &'a mut self,
        symbol: &'a Symbol,
    ) -> impl Iterator<Item = &'a mut Position> + 'a {
        self.positions
            .values_mut()
            .filter(move |p| p.symbol() == symbol)
    }

    /// Snapshot of the positions owned by `owner`.
    #[must_use]
    pub fn owned_by(&self, owner: &OwnerId) -> Vec<Position> {
        self.positions
            .values()
            .filter(|p| p.owner() == owner)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, DurationUnit, HoldDuration, NewPosition};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn position(owner: &str, symbol: &str) -> Position {
        Position::open(
            PositionId::generate(),
            NewPosition {
                owner: OwnerId::new(owner),
                symbol: Symbol::new(symbol),
                direction: Direction::Long,
                open_price: dec!(100),
                stake: dec!(50),
                leverage: 10,
                capital_fraction: dec!(1),
                lot_size: dec!(0.01),
                duration: HoldDuration::new(1, DurationUnit::Day),
                stop_loss: None,
                take_profit: None,
            },
            dec!(1),
            Utc::now(),
        )
    }

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut book = PositionBook::new();
        let p = position("alice", "BTCUSD");
        let id = p.id();

        book.insert(p);
        assert!(book.get(id).is_some());
        assert_eq!(book.len(), 1);

        assert!(book.remove(id).is_some());
        assert!(book.is_empty());
    }

    #[test]
    fn on_symbol_mut_filters() {
        let mut book = PositionBook::new();
        book.insert(position("alice", "BTCUSD"));
        book.insert(position("bob", "BTCUSD"));
        book.insert(position("alice", "EURUSD"));

        let btc = Symbol::new("BTCUSD");
        assert_eq!(book.on_symbol_mut(&btc).count(), 2);
    }

    #[test]
    fn owned_by_snapshots() {
        let mut book = PositionBook::new();
        book.insert(position("alice", "BTCUSD"));
        book.insert(position("bob", "EURUSD"));

        assert_eq!(book.owned_by(&OwnerId::new("alice")).len(), 1);
        assert_eq!(book.owned_by(&OwnerId::new("carol")).len(), 0);
    }
}
