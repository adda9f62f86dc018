//! Price ladder: the sorted set of occupied prices for one side of the book
//!
//! Asks are kept ascending, bids descending, so the best price is always
//! at index 0.

use crate::domain::{Price, Side};

/// Sort direction of a ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderOrder {
    /// Lowest price first (asks)
    Ascending,
    /// Highest price first (bids)
    Descending,
}

impl LadderOrder {
    /// Ladder order used for resting orders of `side`
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Buy => LadderOrder::Descending,
            Side::Sell => LadderOrder::Ascending,
        }
    }
}

/// Sorted list of distinct prices
#[derive(Debug, Clone)]
pub struct PriceLadder {
    prices: Vec<Price>,
    order: LadderOrder,
}

impl PriceLadder {
    pub fn new(order: LadderOrder) -> Self {
        Self {
            prices: Vec::new(),
            order,
        }
    }

    fn search(&self, price: Price) -> Result<usize, usize> {
        match self.order {
            LadderOrder::Ascending => self.prices.binary_search(&price),
            LadderOrder::Descending => self.prices.binary_search_by(|p| price.cmp(p)),
        }
    }

    /// Insert a price. Inserting a price already present is a no-op.
    pub fn insert(&mut self, price: Price) {
        if let Err(pos) = self.search(price) {
            self.prices.insert(pos, price);
        }
    }

    /// Remove a price; returns whether it was present
    pub fn remove(&mut self, price: Price) -> bool {
        match self.search(price) {
            Ok(pos) => {
                self.prices.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Best price (lowest ask / highest bid)
    pub fn best(&self) -> Option<Price> {
        self.prices.first().copied()
    }

    pub fn contains(&self, price: Price) -> bool {
        self.search(price).is_ok()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Prices best first
    pub fn iter(&self) -> impl Iterator<Item = Price> + '_ {
        self.prices.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_insert_keeps_order() {
        let mut ladder = PriceLadder::new(LadderOrder::Ascending);
        for p in [105, 100, 110, 102] {
            ladder.insert(p);
        }
        assert_eq!(ladder.iter().collect::<Vec<_>>(), vec![100, 102, 105, 110]);
        assert_eq!(ladder.best(), Some(100));
    }

    #[test]
    fn test_descending_insert_keeps_order() {
        let mut ladder = PriceLadder::new(LadderOrder::Descending);
        for p in [105, 100, 110, 102] {
            ladder.insert(p);
        }
        assert_eq!(ladder.iter().collect::<Vec<_>>(), vec![110, 105, 102, 100]);
        assert_eq!(ladder.best(), Some(110));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut ladder = PriceLadder::new(LadderOrder::Ascending);
        ladder.insert(100);
        ladder.insert(100);
        ladder.insert(100);
        assert_eq!(ladder.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut ladder = PriceLadder::new(LadderOrder::Descending);
        ladder.insert(100);
        ladder.insert(99);

        assert!(ladder.remove(100));
        assert!(!ladder.remove(100));
        assert_eq!(ladder.best(), Some(99));
        assert!(!ladder.contains(100));

        assert!(ladder.remove(99));
        assert!(ladder.is_empty());
        assert_eq!(ladder.best(), None);
    }

    #[test]
    fn test_ladder_order_for_side() {
        assert_eq!(LadderOrder::for_side(Side::Buy), LadderOrder::Descending);
        assert_eq!(LadderOrder::for_side(Side::Sell), LadderOrder::Ascending);
    }
}
