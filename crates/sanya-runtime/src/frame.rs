//! Frame descriptors (§4.E "Frame descriptor construction", §4.C stack
//! walking).
//!
//! A frame descriptor is a single packed machine word: a small size
//! field (the live slot count, current cap 48 per §9's open question)
//! and a bitmap with bit `i` set iff stack slot `i` currently holds a
//! managed pointer. Both the collector's stack walk and the code
//! generator's call-site bookkeeping share this exact bit layout.

/// Current cap on the number of stack slots one frame descriptor can
/// describe. §9 notes this is not fundamental -- widening it only
/// requires widening [`FrameDescr`]'s backing word.
pub const MAX_FRAME_SLOTS: usize = 48;

const SIZE_BITS: u32 = 8;
const SIZE_MASK: u64 = (1 << SIZE_BITS) - 1;

/// A packed frame descriptor: low 8 bits are the frame size (slot
/// count), the remaining bits are a pointer bitmap, one bit per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescr(u64);

impl FrameDescr {
    /// The descriptor for an empty frame -- used as the sentinel
    /// handed to `main` by the entry trampoline, since there is no
    /// caller frame below it for the stack walker to continue into.
    pub const EMPTY: FrameDescr = FrameDescr(0);

    /// Pack a frame's pointer-slot bitmap (`flags[i]` true iff slot `i`
    /// holds a managed pointer) into a descriptor.
    ///
    /// # Panics
    /// If `flags.len()` exceeds [`MAX_FRAME_SLOTS`].
    #[must_use]
    pub fn new(flags: &[bool]) -> FrameDescr {
        assert!(
            flags.len() <= MAX_FRAME_SLOTS,
            "frame has {} slots, cap is {MAX_FRAME_SLOTS}",
            flags.len()
        );
        let mut bitmap: u64 = 0;
        for (i, &is_ptr) in flags.iter().enumerate() {
            if is_ptr {
                bitmap |= 1 << i;
            }
        }
        FrameDescr(((bitmap << SIZE_BITS) | flags.len() as u64) as u64)
    }

    #[must_use]
    pub fn from_raw(word: u64) -> FrameDescr {
        FrameDescr(word)
    }

    #[must_use]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn frame_size(self) -> usize {
        (self.0 & SIZE_MASK) as usize
    }

    #[must_use]
    pub fn is_ptr(self, slot: usize) -> bool {
        debug_assert!(slot < self.frame_size());
        (self.0 >> (SIZE_BITS as usize + slot)) & 1 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_raw() {
        let fd = FrameDescr::new(&[true, false, true]);
        assert_eq!(fd.frame_size(), 3);
        assert!(fd.is_ptr(0));
        assert!(!fd.is_ptr(1));
        assert!(fd.is_ptr(2));
        assert_eq!(FrameDescr::from_raw(fd.to_raw()), fd);
    }

    #[test]
    fn empty_descriptor_has_zero_size() {
        assert_eq!(FrameDescr::EMPTY.frame_size(), 0);
    }

    #[test]
    #[should_panic]
    fn rejects_oversized_frame() {
        FrameDescr::new(&[true; MAX_FRAME_SLOTS + 1]);
    }
}
