//! Named, monotonically growing byte regions and symbol placements.
//!
//! A `MemSegment` is a simple bump region: within one layout pass its size
//! only ever grows, and distinct segments never overlap (the frame engine
//! assigns each a disjoint base when it finalizes). A `SymbolAlloc` binds one
//! symbol to one segment and an offset within it, created once and immutable
//! for the rest of codegen.

use crate::types::align_up;

/// Bytes guaranteed untouched below SP by asynchronous signal handling.
/// Tracked as a segment kind but never part of the frame size.
pub const RED_ZONE_BYTES: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Incoming formals the caller already placed on its outgoing stack; the
    /// segment exists only to record those caller-fixed offsets.
    ArgsStkPassed,
    /// Home slots for incoming register formals; always reserved because an
    /// unoptimized tier materializes every incoming register to memory.
    ArgsRegPassed,
    /// Automatic locals.
    Locals,
    /// Pseudo-register spill slots (low optimization tiers only).
    SpillReg,
    /// Outgoing argument area for the calls this function makes.
    ArgsToStkPass,
    /// Variadic general-register save area.
    GrSaveArea,
    /// Variadic vector-register save area.
    VrSaveArea,
    /// Rarely-executed locals, placed furthest from the frame pointer.
    Cold,
    /// Scratch region below SP; see `RED_ZONE_BYTES`.
    RedZone,
}

impl SegmentKind {
    pub fn name(self) -> &'static str {
        match self {
            SegmentKind::ArgsStkPassed => "args-stk-passed",
            SegmentKind::ArgsRegPassed => "args-reg-passed",
            SegmentKind::Locals => "locals",
            SegmentKind::SpillReg => "spill-reg",
            SegmentKind::ArgsToStkPass => "args-to-stk-pass",
            SegmentKind::GrSaveArea => "gr-save-area",
            SegmentKind::VrSaveArea => "vr-save-area",
            SegmentKind::Cold => "cold",
            SegmentKind::RedZone => "red-zone",
        }
    }
}

/// A named byte region whose size grows monotonically during layout.
#[derive(Debug, Clone, Copy)]
pub struct MemSegment {
    kind: SegmentKind,
    size: u32,
}

impl MemSegment {
    pub fn new(kind: SegmentKind) -> Self {
        MemSegment { kind, size: 0 }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Set the segment size. Shrinking is a bookkeeping bug, so it panics.
    pub fn set_size(&mut self, size: u32) {
        assert!(
            size >= self.size,
            "segment {} shrank from {} to {}",
            self.kind.name(),
            self.size,
            size
        );
        self.size = size;
    }

    /// Round the segment up to `align` and append `size` bytes, returning the
    /// aligned offset the new bytes start at.
    pub fn bump(&mut self, size: u32, align: u32) -> u32 {
        let align = align.max(1);
        let offset = align_up(self.size as u64, align as u64) as u32;
        self.size = offset + size;
        offset
    }
}

/// One symbol's home: which segment, and where within it. Immutable once
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAlloc {
    segment: SegmentKind,
    offset: u32,
}

impl SymbolAlloc {
    pub fn new(segment: SegmentKind, offset: u32) -> Self {
        SymbolAlloc { segment, offset }
    }

    pub fn segment(&self) -> SegmentKind {
        self.segment
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_aligns_then_grows() {
        // bool(1), ptr(8), int(4) land at 0, 8, 16 and the segment ends
        // at 20.
        let mut seg = MemSegment::new(SegmentKind::Locals);
        assert_eq!(seg.bump(1, 1), 0);
        assert_eq!(seg.bump(8, 8), 8);
        assert_eq!(seg.bump(4, 4), 16);
        assert_eq!(seg.size(), 20);
    }

    #[test]
    fn set_size_grows_monotonically() {
        let mut seg = MemSegment::new(SegmentKind::GrSaveArea);
        seg.set_size(32);
        seg.set_size(32);
        assert_eq!(seg.size(), 32);
    }

    #[test]
    #[should_panic(expected = "shrank")]
    fn shrinking_a_segment_panics() {
        let mut seg = MemSegment::new(SegmentKind::Locals);
        seg.set_size(16);
        seg.set_size(8);
    }

    #[test]
    fn alloc_is_plain_data() {
        let alloc = SymbolAlloc::new(SegmentKind::ArgsRegPassed, 24);
        assert_eq!(alloc.segment(), SegmentKind::ArgsRegPassed);
        assert_eq!(alloc.offset(), 24);
    }
}
