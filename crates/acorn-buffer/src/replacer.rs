//! Page replacement policies for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Trait for page replacement algorithms.
///
/// The pool decides evictability (a frame with pins outstanding must
/// never be evicted) and passes that check in as a predicate, so the
/// replacer keeps no duplicate pin bookkeeping.
pub trait Replacer: Send + Sync {
    /// Records that the given frame was accessed.
    fn record_access(&self, frame_id: FrameId);

    /// Selects a victim among frames for which `can_evict` returns true,
    /// or None if every candidate is ineligible.
    fn evict(&self, can_evict: &dyn Fn(FrameId) -> bool) -> Option<FrameId>;

    /// Forgets any access history for a frame (it was freed).
    fn remove(&self, frame_id: FrameId);
}

/// Clock (second-chance) replacement.
///
/// One reference bit per frame, set on access. The clock hand sweeps
/// the frames; a set bit buys the frame one more rotation, a clear bit
/// on an evictable frame makes it the victim.
pub struct ClockReplacer {
    reference_bits: Vec<AtomicBool>,
    clock_hand: Mutex<usize>,
}

impl ClockReplacer {
    /// Creates a clock replacer for the given number of frames.
    pub fn new(num_frames: usize) -> Self {
        Self {
            reference_bits: (0..num_frames).map(|_| AtomicBool::new(false)).collect(),
            clock_hand: Mutex::new(0),
        }
    }

    /// Returns the number of frames tracked.
    pub fn capacity(&self) -> usize {
        self.reference_bits.len()
    }
}

impl Replacer for ClockReplacer {
    fn record_access(&self, frame_id: FrameId) {
        if let Some(bit) = self.reference_bits.get(frame_id.0 as usize) {
            bit.store(true, Ordering::Relaxed);
        }
    }

    fn evict(&self, can_evict: &dyn Fn(FrameId) -> bool) -> Option<FrameId> {
        let num_frames = self.reference_bits.len();
        if num_frames == 0 {
            return None;
        }

        let mut hand = self.clock_hand.lock();
        // Two full rotations: the first may only clear reference bits.
        for _ in 0..(2 * num_frames) {
            let idx = *hand;
            *hand = (idx + 1) % num_frames;

            let frame_id = FrameId(idx as u32);
            if !can_evict(frame_id) {
                continue;
            }
            if self.reference_bits[idx].swap(false, Ordering::Relaxed) {
                continue;
            }
            return Some(frame_id);
        }
        None
    }

    fn remove(&self, frame_id: FrameId) {
        if let Some(bit) = self.reference_bits.get(frame_id.0 as usize) {
            bit.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evict_nothing_eligible() {
        let replacer = ClockReplacer::new(4);
        assert!(replacer.evict(&|_| false).is_none());
    }

    #[test]
    fn test_evict_prefers_unreferenced() {
        let replacer = ClockReplacer::new(3);

        replacer.record_access(FrameId(0));
        replacer.record_access(FrameId(1));

        // Frame 2 has no reference bit, so it goes first.
        assert_eq!(replacer.evict(&|_| true), Some(FrameId(2)));
    }

    #[test]
    fn test_evict_after_clearing_bits() {
        let replacer = ClockReplacer::new(3);

        for i in 0..3 {
            replacer.record_access(FrameId(i));
        }

        // All bits set: the first rotation clears them, the second finds
        // a victim.
        assert!(replacer.evict(&|_| true).is_some());
    }

    #[test]
    fn test_evict_skips_pinned() {
        let replacer = ClockReplacer::new(3);

        let victim = replacer.evict(&|f| f != FrameId(0));
        assert!(victim.is_some());
        assert_ne!(victim, Some(FrameId(0)));
    }

    #[test]
    fn test_second_chance() {
        let replacer = ClockReplacer::new(2);

        replacer.record_access(FrameId(0));
        // Frame 1 is the victim; frame 0's bit is spent in the process.
        assert_eq!(replacer.evict(&|_| true), Some(FrameId(1)));
        assert_eq!(replacer.evict(&|f| f == FrameId(0)), Some(FrameId(0)));
    }

    #[test]
    fn test_remove_clears_bit() {
        let replacer = ClockReplacer::new(2);
        replacer.record_access(FrameId(0));
        replacer.remove(FrameId(0));
        assert_eq!(replacer.evict(&|f| f == FrameId(0)), Some(FrameId(0)));
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let replacer = ClockReplacer::new(2);
        replacer.record_access(FrameId(100));
        replacer.remove(FrameId(100));
        assert_eq!(replacer.capacity(), 2);
    }
}
