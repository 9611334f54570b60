//! Calling-convention kinds and their static register-set tables.
//!
//! Each convention is pure configuration: a `ConventionSpec` value selected
//! by the closed `CallConv` enum. Engines borrow a spec; nothing here is
//! mutable or ambient, and dispatch is a `match`, never a vtable.

use std::fmt;

use crate::regs::{self, PhysReg};

/// The closed set of calling conventions this backend implements. Selected
/// once per function or call site from a front-end attribute; never changes
/// mid-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConv {
    /// AAPCS64-flavored standard C convention.
    Standard,
    /// Interpreter-call variant: integers and pointers ride the GP file,
    /// every floating value is forced to memory.
    Interp,
    /// Tail-call-heavy variant: arguments live in registers only.
    TailCall,
}

impl CallConv {
    pub fn spec(self) -> &'static ConventionSpec {
        match self {
            CallConv::Standard => &STANDARD,
            CallConv::Interp => &INTERP,
            CallConv::TailCall => &TAIL_CALL,
        }
    }
}

impl fmt::Display for CallConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallConv::Standard => write!(f, "standard"),
            CallConv::Interp => write!(f, "interp"),
            CallConv::TailCall => write!(f, "tailcall"),
        }
    }
}

/// Static description of one convention: register files, return homes, and
/// the knobs classification consults. Plain data so tests can build ad-hoc
/// conventions (e.g. a six-register file) without touching the closed enum.
#[derive(Debug)]
pub struct ConventionSpec {
    pub kind: CallConv,
    /// GP argument registers, in allocation order.
    pub gp_args: &'static [PhysReg],
    /// FP/SIMD argument registers, in allocation order.
    pub fp_args: &'static [PhysReg],
    /// GP return registers, first registers of the file fixed.
    pub gp_rets: &'static [PhysReg],
    /// FP return registers.
    pub fp_rets: &'static [PhysReg],
    /// Register carrying the hidden destination address of an in-memory
    /// return value.
    pub indirect_result_reg: PhysReg,
    /// Largest aggregate returned inline in `gp_rets`.
    pub max_inline_ret_bytes: u64,
    /// Largest aggregate passed by value in GP registers; bigger ones are
    /// passed as a pointer to an out-of-line copy.
    pub max_byval_reg_bytes: u64,
    /// Floating values are denied FP registers and forced to memory.
    pub floats_to_memory: bool,
    /// Whether exhausted or Memory-class values may spill to the outgoing
    /// stack. When false, such values are unsupported under this convention.
    pub allows_stack_args: bool,
    /// Whether variadic signatures are accepted.
    pub supports_variadic: bool,
    pub callee_saved_gp: &'static [PhysReg],
    pub callee_saved_fp: &'static [PhysReg],
}

pub static STANDARD: ConventionSpec = ConventionSpec {
    kind: CallConv::Standard,
    gp_args: regs::GP_ARG_REGS,
    fp_args: regs::FP_ARG_REGS,
    gp_rets: regs::GP_RET_REGS,
    fp_rets: regs::FP_RET_REGS,
    indirect_result_reg: regs::INDIRECT_RESULT_REG,
    max_inline_ret_bytes: 16,
    max_byval_reg_bytes: 16,
    floats_to_memory: false,
    allows_stack_args: true,
    supports_variadic: true,
    callee_saved_gp: regs::GP_CALLEE_SAVED,
    callee_saved_fp: regs::FP_CALLEE_SAVED,
};

pub static INTERP: ConventionSpec = ConventionSpec {
    kind: CallConv::Interp,
    gp_args: regs::GP_ARG_REGS,
    fp_args: &[],
    gp_rets: regs::GP_RET_REGS,
    fp_rets: regs::FP_RET_REGS,
    indirect_result_reg: regs::INDIRECT_RESULT_REG,
    max_inline_ret_bytes: 8,
    max_byval_reg_bytes: 0,
    floats_to_memory: true,
    allows_stack_args: true,
    supports_variadic: false,
    callee_saved_gp: regs::GP_CALLEE_SAVED,
    callee_saved_fp: regs::FP_CALLEE_SAVED,
};

pub static TAIL_CALL: ConventionSpec = ConventionSpec {
    kind: CallConv::TailCall,
    gp_args: regs::GP_ARG_REGS,
    fp_args: regs::FP_ARG_REGS,
    gp_rets: regs::GP_RET_REGS,
    fp_rets: regs::FP_RET_REGS,
    indirect_result_reg: regs::INDIRECT_RESULT_REG,
    max_inline_ret_bytes: 16,
    max_byval_reg_bytes: 16,
    floats_to_memory: false,
    allows_stack_args: false,
    supports_variadic: false,
    callee_saved_gp: regs::GP_CALLEE_SAVED,
    callee_saved_fp: regs::FP_CALLEE_SAVED,
};
