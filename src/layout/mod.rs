//! Frame layout: the segment/allocation data model and the five-phase
//! engine that assembles one function's stack frame.

pub mod frame;
pub mod segments;

pub use frame::{FrameLayoutEngine, STACK_ALIGN};
pub use segments::{MemSegment, SegmentKind, SymbolAlloc, RED_ZONE_BYTES};
