//! The per-pass calling-convention state machine.
//!
//! One `CallConvEngine` serves exactly one resolution pass: a function's
//! formals, or one call site's actuals. It is fed one parameter at a time, in
//! declaration order, through `locate_next_parm`; `locate_ret_val` resolves
//! the return value and never touches the stack cursor. The engine has two
//! states, fresh (right after `init`) and advancing, and only ever moves
//! forward; the pass ends when the caller stops feeding it.

use log::trace;

use crate::error::{LayoutError, LayoutResult};
use crate::types::{TypeFactsTable, ValueTy, POINTER_SIZE};

use super::classify::{classify_arg, classify_ret, PassStyle, RetHome};
use super::conventions::{CallConv, ConventionSpec};
use super::{ParamLocation, RegisterCursor};

pub struct CallConvEngine<'a> {
    spec: &'static ConventionSpec,
    facts: &'a TypeFactsTable,
    cursor: RegisterCursor,
    /// Bytes of out-of-line by-value copies this pass has demanded.
    copy_bytes: u32,
}

impl<'a> CallConvEngine<'a> {
    pub fn new(cc: CallConv, facts: &'a TypeFactsTable) -> Self {
        CallConvEngine::with_spec(cc.spec(), facts)
    }

    /// Build an engine over an explicit spec. The convention set is closed,
    /// but tests exercise ad-hoc register files through this entry.
    pub fn with_spec(spec: &'static ConventionSpec, facts: &'a TypeFactsTable) -> Self {
        CallConvEngine {
            spec,
            facts,
            cursor: RegisterCursor::new(),
            copy_bytes: 0,
        }
    }

    /// Reset to the fresh state. Called once per resolution pass; passes may
    /// not share a cursor.
    pub fn init(&mut self) {
        self.cursor = RegisterCursor::new();
        self.copy_bytes = 0;
    }

    pub fn convention(&self) -> CallConv {
        self.spec.kind
    }

    pub fn spec(&self) -> &'static ConventionSpec {
        self.spec
    }

    /// GP argument registers consumed so far in this pass.
    pub fn gp_used(&self) -> u8 {
        self.cursor.gp_used()
    }

    /// FP argument registers consumed so far in this pass.
    pub fn fp_used(&self) -> u8 {
        self.cursor.fp_used()
    }

    /// Outgoing-stack bytes consumed so far in this pass.
    pub fn stack_bytes(&self) -> u32 {
        self.cursor.stack_bytes()
    }

    /// Bytes of caller-side out-of-line copies demanded so far.
    pub fn copy_bytes(&self) -> u32 {
        self.copy_bytes
    }

    /// Whether `ret` comes back through memory, making the first logical
    /// parameter a hidden destination pointer.
    pub fn ret_is_indirect(&self, ret: ValueTy) -> LayoutResult<bool> {
        Ok(matches!(
            classify_ret(self.spec, self.facts, ret)?,
            RetHome::Indirect
        ))
    }

    /// Resolve the next parameter, in declaration order.
    ///
    /// `is_first` marks the first *logical* parameter: when the enclosing
    /// signature (`fn_ret`) returns an aggregate too large to come back
    /// inline, that parameter is the hidden destination pointer and lives in
    /// the convention's indirect result register, checked before any normal
    /// classification.
    pub fn locate_next_parm(
        &mut self,
        ty: ValueTy,
        is_first: bool,
        fn_ret: ValueTy,
    ) -> LayoutResult<ParamLocation> {
        let mut loc = ParamLocation::new();

        if is_first && self.ret_is_indirect(fn_ret)? {
            loc.push_reg(self.spec.indirect_result_reg, ValueTy::Ptr);
            trace!(
                "[{}] hidden return pointer -> {}",
                self.spec.kind,
                self.spec.indirect_result_reg.name()
            );
            return Ok(loc);
        }

        match classify_arg(self.spec, self.facts, ty)? {
            PassStyle::Ignore => Ok(loc),
            PassStyle::Registers(slots) => {
                self.assign_register_slots(ty, &slots, &mut loc)?;
                Ok(loc)
            }
            PassStyle::Memory { size, align } => {
                self.spill_to_stack(ty, size, align, &mut loc)?;
                Ok(loc)
            }
            PassStyle::PointerToCopy {
                copy_size,
                copy_align,
            } => {
                self.account_copy(ty, copy_size, copy_align)?;
                loc.indirect = true;
                // The pointer itself is an ordinary GP-file value.
                if let Some(reg) = self.cursor.take_gp(self.spec.gp_args) {
                    loc.push_reg(reg, ValueTy::Ptr);
                } else {
                    self.cursor.close_gp(self.spec.gp_args);
                    self.spill_to_stack(ty, POINTER_SIZE, POINTER_SIZE, &mut loc)?;
                }
                trace!(
                    "[{}] {} by reference ({} byte copy)",
                    self.spec.kind,
                    ty,
                    copy_size
                );
                Ok(loc)
            }
        }
    }

    /// Resolve the return value. Size-0 results yield an empty location;
    /// this never allocates from the stack cursor.
    pub fn locate_ret_val(&self, ty: ValueTy) -> LayoutResult<ParamLocation> {
        let mut loc = ParamLocation::new();
        match classify_ret(self.spec, self.facts, ty)? {
            RetHome::Empty => Ok(loc),
            RetHome::Registers(slots) => {
                for (i, &(class, prim)) in slots.iter().enumerate() {
                    let file = if class.uses_fp_file() {
                        self.spec.fp_rets
                    } else {
                        self.spec.gp_rets
                    };
                    let reg = file.get(i).copied().ok_or(
                        LayoutError::UnsupportedType {
                            cc: self.spec.kind,
                            ty,
                            reason: "return value exceeds the return register file",
                        },
                    )?;
                    loc.push_reg(reg, prim);
                }
                Ok(loc)
            }
            RetHome::Indirect => {
                loc.indirect = true;
                loc.mem_size = ty.size(self.facts) as u32;
                Ok(loc)
            }
        }
    }

    /// Give each wanted slot the next register of its file, all or nothing:
    /// if the file cannot seat every slot, the file is closed and the whole
    /// value goes to the stack.
    fn assign_register_slots(
        &mut self,
        ty: ValueTy,
        slots: &[(super::ArgClass, ValueTy)],
        loc: &mut ParamLocation,
    ) -> LayoutResult<()> {
        let wants_fp = slots[0].0.uses_fp_file();
        let (free, file) = if wants_fp {
            (
                self.spec.fp_args.len() - self.cursor.fp_used() as usize,
                self.spec.fp_args,
            )
        } else {
            (
                self.spec.gp_args.len() - self.cursor.gp_used() as usize,
                self.spec.gp_args,
            )
        };

        if slots.len() <= free {
            for &(_, prim) in slots {
                let reg = if wants_fp {
                    self.cursor.take_fp(file)
                } else {
                    self.cursor.take_gp(file)
                };
                // Guarded by the `free` check above.
                loc.push_reg(reg.expect("register file underflow"), prim);
            }
            trace!(
                "[{}] {} -> {}",
                self.spec.kind,
                ty,
                loc.regs()
                    .iter()
                    .map(|r| r.name())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            return Ok(());
        }

        // File exhausted: no later value of this class may take a register,
        // and this one is passed in the outgoing area instead.
        if wants_fp {
            self.cursor.close_fp(file);
        } else {
            self.cursor.close_gp(file);
        }
        self.spill_to_stack(ty, ty.size(self.facts), ty.align(self.facts), loc)
    }

    fn spill_to_stack(
        &mut self,
        ty: ValueTy,
        size: u64,
        align: u64,
        loc: &mut ParamLocation,
    ) -> LayoutResult<()> {
        if !self.spec.allows_stack_args {
            return Err(LayoutError::UnsupportedType {
                cc: self.spec.kind,
                ty,
                reason: "value needs memory but the convention forbids stack arguments",
            });
        }
        let offset = self.cursor.bump_stack(size as u32, align as u32);
        loc.mem_offset = offset;
        loc.mem_size = size as u32;
        trace!(
            "[{}] {} -> stack +{} ({} bytes)",
            self.spec.kind,
            ty,
            offset,
            size
        );
        Ok(())
    }

    fn account_copy(
        &mut self,
        ty: ValueTy,
        copy_size: u64,
        copy_align: u64,
    ) -> LayoutResult<()> {
        if !self.spec.allows_stack_args {
            return Err(LayoutError::UnsupportedType {
                cc: self.spec.kind,
                ty,
                reason: "by-value copy needs caller stack but the convention forbids it",
            });
        }
        let align = copy_align.max(8) as u32;
        let base = crate::types::align_up(self.copy_bytes as u64, align as u64) as u32;
        self.copy_bytes = base + copy_size as u32;
        Ok(())
    }
}
