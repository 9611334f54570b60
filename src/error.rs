//! Typed failure taxonomy for ABI resolution and frame layout.
//!
//! All three kinds are compiler-internal conditions, not user diagnostics:
//! the per-function compilation driver aborts the function on the first one.
//! There is no retry and no partial-result mode; ABI correctness is
//! all-or-nothing per function.

use thiserror::Error;

use crate::abi::conventions::CallConv;
use crate::ir::SymbolIdx;
use crate::types::ValueTy;

pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The active convention's classifier does not implement this value
    /// type/size/class combination. Indicates a backend gap, never a user
    /// error.
    #[error("calling convention `{cc}` cannot pass a value of type `{ty}`: {reason}")]
    UnsupportedType {
        cc: CallConv,
        ty: ValueTy,
        reason: &'static str,
    },

    /// A segment or offset was read before the phase that owns it finished,
    /// or a cursor was driven out of its documented order.
    #[error("sequencing violation: {0}")]
    SequencingViolation(&'static str),

    /// A symbol was looked up that layout never allocated.
    #[error("unknown symbol {0:?}")]
    UnknownSymbol(SymbolIdx),
}
