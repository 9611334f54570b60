//! ABI resolution for an AArch64 code generator.
//!
//! Given a typed function signature and a calling convention, this crate
//! decides where every parameter and return value lives (which physical
//! register, or which byte offset in memory), and assembles each function's
//! locals, spill slots, saved registers, and outgoing-call argument space
//! into one aligned stack frame.
//!
//! The pieces, leaves first:
//!
//! - [`types::TypeFactsTable`] — size/alignment/shape facts per type,
//!   populated by the front-end and only read here.
//! - [`abi::classify`] — pure per-convention classification of a value type
//!   into ABI classes.
//! - [`abi::CallConvEngine`] — the per-pass state machine: parameters are
//!   resolved strictly in declaration order against cursors that only ever
//!   advance.
//! - [`layout::FrameLayoutEngine`] — five fixed phases that place formals,
//!   locals, and spill slots, size the outgoing-call area, and fix the final
//!   frame, exposing signed frame-pointer-relative offsets.
//!
//! Everything is per-function: a driver may lay out many functions
//! concurrently, but one engine instance must be driven from one thread in
//! the documented order. Errors are fail-fast — a classification gap aborts
//! the function's compilation; there is no best-effort fallback that could
//! silently miscompile a call.

pub mod abi;
pub mod error;
pub mod ir;
pub mod layout;
pub mod regs;
pub mod types;

pub use abi::{ArgClass, CallConv, CallConvEngine, ParamLocation, RegisterCursor};
pub use error::{LayoutError, LayoutResult};
pub use layout::{FrameLayoutEngine, SegmentKind, STACK_ALIGN};
pub use types::{TypeFacts, TypeFactsTable, TypeIdx, ValueTy};
