//! Pure per-convention classification of value types into ABI classes.
//!
//! Classification decides *what kind* of home a value wants (which register
//! file, or memory, or a pointer to an out-of-line copy); the engine in
//! `abi::engine` then decides *which* home, by walking its cursor. Keeping
//! the two apart keeps this half a pure function of (convention, type facts,
//! value type), which is what makes it testable in isolation.
//!
//! The two cross-cutting ABI rules that are easy to scatter ("the first
//! logical parameter may really be a hidden return pointer", "returns that
//! do not fit inline go through memory") both bottom out in `classify_ret`
//! here; no other module re-derives them.

use smallvec::{smallvec, SmallVec};

use crate::error::{LayoutError, LayoutResult};
use crate::types::{TypeFactsTable, TypeIdx, ValueTy};

use super::conventions::{CallConv, ConventionSpec};
use super::{ArgClass, MAX_LOC_REGS};

/// Register slots wanted by one classified value: the ABI class of each slot
/// and the primitive the register carries.
pub type RegSlots = SmallVec<[(ArgClass, ValueTy); 4]>;

/// How one argument travels under one convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassStyle {
    /// Zero-sized (class `NoClass`); the value occupies nothing.
    Ignore,
    /// One register slot per entry, allocated in order by the engine.
    Registers(RegSlots),
    /// The value itself is placed in the outgoing argument area.
    Memory { size: u64, align: u64 },
    /// A caller-side copy lives out of line; a pointer to the copy is what
    /// actually travels (as an ordinary Pointer-class value).
    PointerToCopy { copy_size: u64, copy_align: u64 },
}

/// Where a return value comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetHome {
    /// Nothing comes back (void or size-0 aggregate).
    Empty,
    /// In the convention's fixed first return registers, one slot per entry.
    Registers(RegSlots),
    /// Through memory: the caller passes the destination address as a hidden
    /// first parameter in the convention's indirect result register.
    Indirect,
}

fn unsupported(
    spec: &ConventionSpec,
    ty: ValueTy,
    reason: &'static str,
) -> LayoutError {
    LayoutError::UnsupportedType {
        cc: spec.kind,
        ty,
        reason,
    }
}

/// Classify one argument type. Pure: consults only the convention spec and
/// the facts table, never allocation state.
pub fn classify_arg(
    spec: &ConventionSpec,
    facts: &TypeFactsTable,
    ty: ValueTy,
) -> LayoutResult<PassStyle> {
    match ty {
        ValueTy::Void => Err(unsupported(spec, ty, "void is not a value")),
        ValueTy::I8
        | ValueTy::I16
        | ValueTy::I32
        | ValueTy::I64
        | ValueTy::U8
        | ValueTy::U16
        | ValueTy::U32
        | ValueTy::U64 => {
            Ok(PassStyle::Registers(smallvec![(ArgClass::Integer, ty)]))
        }
        ValueTy::Ptr => {
            Ok(PassStyle::Registers(smallvec![(ArgClass::Pointer, ty)]))
        }
        ValueTy::F32 | ValueTy::F64 => {
            if spec.floats_to_memory {
                Ok(PassStyle::Memory {
                    size: ty.size(facts),
                    align: ty.align(facts),
                })
            } else {
                Ok(PassStyle::Registers(smallvec![(ArgClass::Float, ty)]))
            }
        }
        ValueTy::V64 | ValueTy::V128 => {
            if spec.fp_args.is_empty() {
                return Err(unsupported(
                    spec,
                    ty,
                    "convention has no vector register file",
                ));
            }
            let class = if ty == ValueTy::V64 {
                ArgClass::ShortVector
            } else {
                ArgClass::Vector
            };
            Ok(PassStyle::Registers(smallvec![(class, ty)]))
        }
        ValueTy::Agg(idx) => classify_aggregate(spec, facts, ty, idx),
    }
}

fn classify_aggregate(
    spec: &ConventionSpec,
    facts: &TypeFactsTable,
    ty: ValueTy,
    idx: TypeIdx,
) -> LayoutResult<PassStyle> {
    if spec.kind == CallConv::Interp {
        return Err(unsupported(
            spec,
            ty,
            "aggregates are not supported by the interpreter convention",
        ));
    }

    // A flexible tail array makes the true size unknowable at the call, so
    // the aggregate can only travel by reference.
    if facts.has_flexible_array(idx) {
        return Ok(PassStyle::PointerToCopy {
            copy_size: facts.size(idx),
            copy_align: facts.align(idx),
        });
    }

    let size = facts.size(idx);
    if size == 0 {
        return Ok(PassStyle::Ignore);
    }

    if let Some(slots) = homogeneous_slots(facts, idx) {
        return Ok(PassStyle::Registers(slots));
    }

    if size <= 8 {
        return Ok(PassStyle::Registers(smallvec![(
            ArgClass::Integer,
            ValueTy::U64
        )]));
    }
    if size <= spec.max_byval_reg_bytes {
        // Two eightbyte halves, each Integer class.
        return Ok(PassStyle::Registers(smallvec![
            (ArgClass::Integer, ValueTy::U64),
            (ArgClass::Integer, ValueTy::U64),
        ]));
    }

    Ok(PassStyle::PointerToCopy {
        copy_size: size,
        copy_align: facts.align(idx),
    })
}

/// HFA/HVA detection: an aggregate of 1-4 fields all sharing one float or
/// short-vector type gets one FP register slot per field.
fn homogeneous_slots(facts: &TypeFactsTable, idx: TypeIdx) -> Option<RegSlots> {
    let elem = facts.homogeneous_field(idx)?;
    let count = facts.field_count(idx);
    if count == 0 || count as usize > MAX_LOC_REGS {
        return None;
    }
    let class = match elem {
        ValueTy::F32 | ValueTy::F64 => ArgClass::CompositeHfa,
        ValueTy::V64 | ValueTy::V128 => ArgClass::CompositeHva,
        _ => return None,
    };
    Some((0..count).map(|_| (class, elem)).collect())
}

/// Classify a return type. The single home of the inline-return vs
/// return-through-memory decision.
pub fn classify_ret(
    spec: &ConventionSpec,
    facts: &TypeFactsTable,
    ty: ValueTy,
) -> LayoutResult<RetHome> {
    match ty {
        ValueTy::Void => Ok(RetHome::Empty),
        ValueTy::I8
        | ValueTy::I16
        | ValueTy::I32
        | ValueTy::I64
        | ValueTy::U8
        | ValueTy::U16
        | ValueTy::U32
        | ValueTy::U64 => {
            Ok(RetHome::Registers(smallvec![(ArgClass::Integer, ty)]))
        }
        ValueTy::Ptr => {
            Ok(RetHome::Registers(smallvec![(ArgClass::Pointer, ty)]))
        }
        // Floating results always come back in the first FP return register;
        // the interpreter convention reroutes float *arguments* only.
        ValueTy::F32 | ValueTy::F64 => {
            Ok(RetHome::Registers(smallvec![(ArgClass::Float, ty)]))
        }
        ValueTy::V64 => Ok(RetHome::Registers(smallvec![(
            ArgClass::ShortVector,
            ty
        )])),
        ValueTy::V128 => {
            Ok(RetHome::Registers(smallvec![(ArgClass::Vector, ty)]))
        }
        ValueTy::Agg(idx) => {
            if spec.kind == CallConv::Interp {
                return Err(unsupported(
                    spec,
                    ty,
                    "aggregates are not supported by the interpreter convention",
                ));
            }
            let size = facts.size(idx);
            if size == 0 {
                return Ok(RetHome::Empty);
            }
            if facts.has_flexible_array(idx) {
                return Ok(RetHome::Indirect);
            }
            if let Some(slots) = homogeneous_slots(facts, idx) {
                return Ok(RetHome::Registers(slots));
            }
            if size <= spec.max_inline_ret_bytes {
                let eightbytes = size.div_ceil(8) as usize;
                return Ok(RetHome::Registers(
                    (0..eightbytes)
                        .map(|_| (ArgClass::Integer, ValueTy::U64))
                        .collect(),
                ));
            }
            Ok(RetHome::Indirect)
        }
    }
}
