//! O(1) z-order promotion for swap-compacted stores
//!
//! Records later in a store are drawn later, i.e. on top. The tracker keeps
//! the slot that the next promoted record should move into. Each promotion
//! swaps the target into that slot and walks the front one slot down, so
//! repeated promotions (hover, highlight) stack without sorting.

/// Two slots whose records were exchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSwap {
    pub a: usize,
    pub b: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrontTracker {
    front: Option<usize>,
}

impl FrontTracker {
    /// The newest record becomes the front.
    pub fn on_create(&mut self, id: usize) {
        self.front = Some(id);
    }

    /// Keep the front inside the live range after a removal.
    pub fn on_remove(&mut self, count: usize) {
        self.front = match (self.front, count) {
            (_, 0) => None,
            (Some(front), _) if front >= count => Some(count - 1),
            (front, _) => front,
        };
    }

    /// After a frame the topmost slot is the last live one again.
    pub fn on_render(&mut self, count: usize) {
        self.front = count.checked_sub(1);
    }

    /// Promote `id`. Returns the swap the caller must apply to its record
    /// storage and slot maps, if any.
    pub fn bring_to_front(&mut self, id: usize) -> Option<SlotSwap> {
        let front = self.front?;
        let swap = (front > id).then_some(SlotSwap { a: id, b: front });
        if front > 0 {
            self.front = Some(front - 1);
        }
        swap
    }

    #[inline]
    pub fn front(&self) -> Option<usize> {
        self.front
    }

    pub fn reset(&mut self) {
        self.front = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotions_fill_front_downwards() {
        let mut tracker = FrontTracker::default();
        for id in 0..5 {
            tracker.on_create(id);
        }
        assert_eq!(tracker.front(), Some(4));

        assert_eq!(tracker.bring_to_front(1), Some(SlotSwap { a: 1, b: 4 }));
        assert_eq!(tracker.front(), Some(3));
        assert_eq!(tracker.bring_to_front(0), Some(SlotSwap { a: 0, b: 3 }));
        assert_eq!(tracker.front(), Some(2));
    }

    #[test]
    fn promoting_a_record_already_in_front_does_not_swap() {
        let mut tracker = FrontTracker::default();
        tracker.on_render(3);
        assert_eq!(tracker.bring_to_front(2), None);
        assert_eq!(tracker.front(), Some(1));
    }

    #[test]
    fn empty_tracker_is_inert() {
        let mut tracker = FrontTracker::default();
        tracker.on_render(0);
        assert_eq!(tracker.bring_to_front(0), None);
        assert_eq!(tracker.front(), None);
    }

    #[test]
    fn removal_clamps_front() {
        let mut tracker = FrontTracker::default();
        tracker.on_render(4);
        tracker.on_remove(2);
        assert_eq!(tracker.front(), Some(1));
        tracker.on_remove(0);
        assert_eq!(tracker.front(), None);
    }
}
