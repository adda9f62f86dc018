//! Price level queue
//!
//! FIFO of order slots at one price. Slots are not removed when the order
//! they point at fills: the head index is advanced lazily past dead slots
//! and the vector is compacted once the dead prefix gets large.

use std::collections::HashMap;

use crate::domain::{OrderId, Qty, RestingOrder, Seq};

/// Order index shared by both sides of a book
pub type OrderIndex = HashMap<OrderId, RestingOrder>;

/// Compaction only kicks in once the head has passed this many slots
pub const COMPACT_MIN_HEAD: usize = 64;

/// Queue entry pointing at a resting order in the index
///
/// The seq distinguishes a slot from a later order that reuses the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSlot {
    pub order_id: OrderId,
    pub seq: Seq,
}

impl QueueSlot {
    fn resolve<'a>(&self, orders: &'a OrderIndex) -> Option<&'a RestingOrder> {
        orders
            .get(&self.order_id)
            .filter(|o| o.seq == self.seq && o.qty_remaining > 0)
    }
}

/// FIFO queue of resting orders sharing one price
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    slots: Vec<QueueSlot>,
    head: usize,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back (time priority)
    pub fn push(&mut self, order_id: OrderId, seq: Seq) {
        self.slots.push(QueueSlot { order_id, seq });
    }

    /// Skip slots whose order is filled or gone
    pub fn advance_head(&mut self, orders: &OrderIndex) {
        while let Some(slot) = self.slots.get(self.head) {
            if slot.resolve(orders).is_some() {
                return;
            }
            self.head += 1;
        }
    }

    /// Oldest live order at this level
    pub fn peek_front(&mut self, orders: &OrderIndex) -> Option<OrderId> {
        self.advance_head(orders);
        self.slots.get(self.head).map(|slot| slot.order_id.clone())
    }

    /// Drop the dead prefix when it is both long and the larger part
    pub fn compact(&mut self) {
        if self.head < COMPACT_MIN_HEAD || self.head * 2 < self.slots.len() {
            return;
        }
        self.slots.drain(..self.head);
        self.head = 0;
    }

    /// Remove the slot for `order_id`; returns whether it was found
    pub fn remove(&mut self, order_id: &str) -> bool {
        match self.slots[self.head..]
            .iter()
            .position(|slot| slot.order_id == order_id)
        {
            Some(offset) => {
                self.slots.remove(self.head + offset);
                true
            }
            None => false,
        }
    }

    /// True once no slot remains at or after the head
    pub fn is_exhausted(&self) -> bool {
        self.head >= self.slots.len()
    }

    /// Live orders in FIFO order
    pub fn iter_live<'a>(
        &'a self,
        orders: &'a OrderIndex,
    ) -> impl Iterator<Item = &'a RestingOrder> + 'a {
        self.slots[self.head..]
            .iter()
            .filter_map(move |slot| slot.resolve(orders))
    }

    /// Total live quantity
    pub fn total_qty(&self, orders: &OrderIndex) -> Qty {
        self.iter_live(orders).map(|o| o.qty_remaining).sum()
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Side;

    fn rest(orders: &mut OrderIndex, level: &mut PriceLevel, id: &str, qty: Qty, seq: Seq) {
        orders.insert(
            id.to_string(),
            RestingOrder {
                order_id: id.to_string(),
                side: Side::Sell,
                price: 100,
                qty_remaining: qty,
                seq,
            },
        );
        level.push(id.to_string(), seq);
    }

    #[test]
    fn test_fifo_peek() {
        let mut orders = OrderIndex::new();
        let mut level = PriceLevel::new();
        rest(&mut orders, &mut level, "a", 5, 1);
        rest(&mut orders, &mut level, "b", 7, 2);

        assert_eq!(level.peek_front(&orders).as_deref(), Some("a"));
        orders.remove("a");
        assert_eq!(level.peek_front(&orders).as_deref(), Some("b"));
        assert_eq!(level.head(), 1);
    }

    #[test]
    fn test_zero_quantity_slot_is_skipped() {
        let mut orders = OrderIndex::new();
        let mut level = PriceLevel::new();
        rest(&mut orders, &mut level, "a", 5, 1);
        rest(&mut orders, &mut level, "b", 7, 2);

        orders.get_mut("a").unwrap().qty_remaining = 0;
        assert_eq!(level.peek_front(&orders).as_deref(), Some("b"));
    }

    #[test]
    fn test_reused_id_does_not_revive_stale_slot() {
        let mut orders = OrderIndex::new();
        let mut level = PriceLevel::new();
        rest(&mut orders, &mut level, "a", 5, 1);
        rest(&mut orders, &mut level, "b", 5, 2);

        // "a" fills, then a new "a" arrives behind "b"
        orders.remove("a");
        rest(&mut orders, &mut level, "a", 3, 3);

        assert_eq!(level.peek_front(&orders).as_deref(), Some("b"));
        let live: Vec<_> = level.iter_live(&orders).map(|o| o.seq).collect();
        assert_eq!(live, vec![2, 3]);
    }

    #[test]
    fn test_remove_and_exhaust() {
        let mut orders = OrderIndex::new();
        let mut level = PriceLevel::new();
        rest(&mut orders, &mut level, "a", 5, 1);

        assert!(!level.remove("zzz"));
        assert!(level.remove("a"));
        assert!(level.is_exhausted());
    }

    #[test]
    fn test_compaction_threshold() {
        let mut orders = OrderIndex::new();
        let mut level = PriceLevel::new();
        for i in 0..200u128 {
            rest(&mut orders, &mut level, &format!("o-{i}"), 1, i + 1);
        }

        for i in 0..63u128 {
            orders.remove(&format!("o-{i}"));
        }
        level.advance_head(&orders);
        level.compact();
        assert_eq!(level.head(), 63, "below the minimum head, no compaction");

        orders.remove("o-63");
        level.advance_head(&orders);
        level.compact();
        assert_eq!(level.head(), 64, "dead prefix is not yet half the queue");

        for i in 64..100u128 {
            orders.remove(&format!("o-{i}"));
        }
        level.advance_head(&orders);
        level.compact();
        assert_eq!(level.head(), 0);
        assert_eq!(level.slot_count(), 100);
        assert_eq!(level.total_qty(&orders), 100);
    }
}
