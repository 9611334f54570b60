//! Stack frame assembly: five fixed phases over one function.
//!
//! Phase order is part of the contract: formal parameters, then locals, then
//! pseudo-register spills, then outgoing-call area sizing, then finalize.
//! Each phase fully grows its segments before the next phase reads them, and
//! offset queries are refused until `finalize` has fixed every segment base.
//! One engine instance serves one function; nothing here is shared across
//! functions.

use log::debug;
use rustc_hash::FxHashMap;

use crate::abi::engine::CallConvEngine;
use crate::abi::ParamLocation;
use crate::error::{LayoutError, LayoutResult};
use crate::ir::{Function, OptLevel, StorageKind, SymbolIdx};
use crate::regs::PhysReg;
use crate::types::{align_up, TypeFactsTable, ValueTy, POINTER_SIZE};

use super::segments::{MemSegment, SegmentKind, SymbolAlloc};

/// Required stack-pointer multiple at call boundaries.
pub const STACK_ALIGN: u32 = 16;

/// The saved fp/lr pair anchoring every frame.
const FRAME_RECORD_BYTES: u32 = 16;

/// Layout progress marker; phases run strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Created,
    Formals,
    Locals,
    Spills,
    Outgoing,
    Final,
}

pub struct FrameLayoutEngine<'a> {
    func: &'a Function,
    facts: &'a TypeFactsTable,
    opt: OptLevel,
    phase: Phase,

    seg_args_stk: MemSegment,
    seg_args_reg: MemSegment,
    seg_locals: MemSegment,
    seg_spill: MemSegment,
    seg_args_to_stk: MemSegment,
    seg_gr_save: MemSegment,
    seg_vr_save: MemSegment,
    seg_cold: MemSegment,

    allocs: FxHashMap<SymbolIdx, SymbolAlloc>,
    /// Resolved location of each declared formal, in order.
    formal_locs: Vec<ParamLocation>,
    /// Location of the hidden return pointer, when the signature returns
    /// through memory.
    hidden_ret_loc: Option<ParamLocation>,
    callee_saved: Vec<PhysReg>,
    frame_size: i64,
}

impl<'a> FrameLayoutEngine<'a> {
    pub fn new(func: &'a Function, facts: &'a TypeFactsTable, opt: OptLevel) -> Self {
        FrameLayoutEngine {
            func,
            facts,
            opt,
            phase: Phase::Created,
            seg_args_stk: MemSegment::new(SegmentKind::ArgsStkPassed),
            seg_args_reg: MemSegment::new(SegmentKind::ArgsRegPassed),
            seg_locals: MemSegment::new(SegmentKind::Locals),
            seg_spill: MemSegment::new(SegmentKind::SpillReg),
            seg_args_to_stk: MemSegment::new(SegmentKind::ArgsToStkPass),
            seg_gr_save: MemSegment::new(SegmentKind::GrSaveArea),
            seg_vr_save: MemSegment::new(SegmentKind::VrSaveArea),
            seg_cold: MemSegment::new(SegmentKind::Cold),
            allocs: FxHashMap::default(),
            formal_locs: Vec::new(),
            hidden_ret_loc: None,
            callee_saved: Vec::new(),
            frame_size: 0,
        }
    }

    /// Run all five phases in their fixed order.
    pub fn run(&mut self) -> LayoutResult<()> {
        self.layout_formal_params()?;
        self.layout_local_vars()?;
        self.layout_spill_slots()?;
        self.find_largest_actual_area()?;
        self.finalize()
    }

    fn advance(&mut self, from: Phase, to: Phase, what: &'static str) -> LayoutResult<()> {
        if self.phase != from {
            return Err(LayoutError::SequencingViolation(what));
        }
        self.phase = to;
        Ok(())
    }

    /// Phase 1: resolve every formal in declaration order and give each a
    /// home. Register-resident formals get a spill-home slot in the
    /// args-reg-passed segment; memory-resident formals record the offset the
    /// caller already fixed.
    pub fn layout_formal_params(&mut self) -> LayoutResult<()> {
        self.advance(
            Phase::Created,
            Phase::Formals,
            "formal-parameter placement ran out of order",
        )?;
        let sig = &self.func.sig;
        let spec = sig.cc.spec();
        if sig.is_variadic && !spec.supports_variadic {
            return Err(LayoutError::UnsupportedType {
                cc: sig.cc,
                ty: sig.ret,
                reason: "convention does not support variadic signatures",
            });
        }

        let mut engine = CallConvEngine::new(sig.cc, self.facts);
        engine.init();
        let indirect_ret = engine.ret_is_indirect(sig.ret)?;
        if indirect_ret {
            self.hidden_ret_loc =
                Some(engine.locate_next_parm(ValueTy::Ptr, true, sig.ret)?);
        }

        for (i, &sym_idx) in self.func.formals.iter().enumerate() {
            let sym = self
                .func
                .symtab
                .get(sym_idx)
                .ok_or(LayoutError::UnknownSymbol(sym_idx))?;
            let loc = engine.locate_next_parm(sym.ty, !indirect_ret && i == 0, sig.ret)?;

            if loc.in_registers() {
                // The home slot holds the materialized value, or just the
                // pointer for by-reference aggregates.
                let (size, align) = if loc.indirect {
                    (POINTER_SIZE, POINTER_SIZE)
                } else {
                    (sym.ty.size(self.facts), sym.ty.align(self.facts))
                };
                let size = align_up(size.max(1), 8) as u32;
                let align = align.max(8) as u32;
                let offset = self.seg_args_reg.bump(size, align);
                self.allocs
                    .insert(sym_idx, SymbolAlloc::new(SegmentKind::ArgsRegPassed, offset));
            } else if loc.on_stack() {
                let end = loc.mem_offset + loc.mem_size;
                let cur = self.seg_args_stk.size();
                self.seg_args_stk.set_size(cur.max(end));
                self.allocs.insert(
                    sym_idx,
                    SymbolAlloc::new(SegmentKind::ArgsStkPassed, loc.mem_offset),
                );
            } else {
                // Zero-sized formal: a zero-byte home keeps it addressable.
                let offset = self.seg_args_reg.bump(0, 1);
                self.allocs
                    .insert(sym_idx, SymbolAlloc::new(SegmentKind::ArgsRegPassed, offset));
            }
            self.formal_locs.push(loc);
        }

        // Variadic save areas are sized from the cursor the formal pass left
        // behind: whatever the named parameters did not consume must be
        // dumped by the prologue for va_arg to find.
        if sig.is_variadic {
            let gp_left = spec.gp_args.len() as u32 - engine.gp_used() as u32;
            let fp_left = spec.fp_args.len() as u32 - engine.fp_used() as u32;
            self.seg_gr_save.set_size(gp_left * 8);
            self.seg_vr_save.set_size(fp_left * 16);
        }

        debug!(
            "{}: formals placed, args-reg={}B args-stk={}B gr-save={}B vr-save={}B",
            self.func.name,
            self.seg_args_reg.size(),
            self.seg_args_stk.size(),
            self.seg_gr_save.size(),
            self.seg_vr_save.size()
        );
        Ok(())
    }

    /// Phase 2: place every live automatic local consecutively, aligned.
    pub fn layout_local_vars(&mut self) -> LayoutResult<()> {
        self.advance(
            Phase::Formals,
            Phase::Locals,
            "local-variable placement ran out of order",
        )?;
        for (idx, sym) in self.func.symtab.iter() {
            if sym.deleted || sym.kind != StorageKind::Auto {
                continue;
            }
            let size = sym.ty.size(self.facts) as u32;
            let align = sym.ty.align(self.facts) as u32;
            let (seg, kind) = if sym.cold {
                (&mut self.seg_cold, SegmentKind::Cold)
            } else {
                (&mut self.seg_locals, SegmentKind::Locals)
            };
            let offset = seg.bump(size, align);
            self.allocs.insert(idx, SymbolAlloc::new(kind, offset));
        }
        debug!(
            "{}: locals={}B cold={}B",
            self.func.name,
            self.seg_locals.size(),
            self.seg_cold.size()
        );
        Ok(())
    }

    /// Phase 3: at low optimization levels, every pseudo-register gets a
    /// stable spill slot.
    pub fn layout_spill_slots(&mut self) -> LayoutResult<()> {
        self.advance(
            Phase::Locals,
            Phase::Spills,
            "spill-slot placement ran out of order",
        )?;
        if !self.opt.spills_pseudo_regs() {
            return Ok(());
        }
        for (idx, sym) in self.func.symtab.iter() {
            if sym.deleted || !matches!(sym.kind, StorageKind::Spill(_)) {
                continue;
            }
            let size = sym.ty.size(self.facts) as u32;
            let align = sym.ty.align(self.facts) as u32;
            let offset = self.seg_spill.bump(size, align);
            self.allocs
                .insert(idx, SymbolAlloc::new(SegmentKind::SpillReg, offset));
        }
        Ok(())
    }

    /// Phase 4: replay classification for every call site in the body and
    /// size the outgoing area by the worst case: the largest stack-argument
    /// extent plus the largest by-value copy extent, rounded to twice the
    /// pointer width.
    pub fn find_largest_actual_area(&mut self) -> LayoutResult<()> {
        self.advance(
            Phase::Spills,
            Phase::Outgoing,
            "outgoing-area sizing ran out of order",
        )?;
        let mut max_stack: u32 = 0;
        let mut max_copy: u32 = 0;
        for call in &self.func.call_sites {
            let mut engine = CallConvEngine::new(call.cc, self.facts);
            engine.init();
            let indirect_ret = engine.ret_is_indirect(call.ret)?;
            if indirect_ret {
                engine.locate_next_parm(ValueTy::Ptr, true, call.ret)?;
            }
            for (i, &ty) in call.args.iter().enumerate() {
                engine.locate_next_parm(ty, !indirect_ret && i == 0, call.ret)?;
            }
            max_stack = max_stack.max(engine.stack_bytes());
            max_copy = max_copy.max(engine.copy_bytes());
        }
        let total =
            align_up((max_stack + max_copy) as u64, 2 * POINTER_SIZE) as u32;
        self.seg_args_to_stk.set_size(total);
        debug!(
            "{}: outgoing area {}B (stack {}B, copies {}B over {} calls)",
            self.func.name,
            total,
            max_stack,
            max_copy,
            self.func.call_sites.len()
        );
        Ok(())
    }

    /// Phase 5: fix the total frame size. After this, every offset query is
    /// stable for the rest of the function's compilation.
    pub fn finalize(&mut self) -> LayoutResult<()> {
        self.advance(Phase::Outgoing, Phase::Final, "finalize ran out of order")?;
        let below = self.below_fp_bytes();
        self.frame_size =
            align_up((FRAME_RECORD_BYTES + below) as u64, STACK_ALIGN as u64) as i64;
        debug!("{}: frame size {}B", self.func.name, self.frame_size);
        Ok(())
    }

    /// Bytes between the frame record and SP. Every segment is padded to the
    /// stack alignment so each region's base stays 16-byte aligned.
    fn below_fp_bytes(&self) -> u32 {
        self.callee_saved_size()
            + padded(&self.seg_args_reg)
            + padded(&self.seg_gr_save)
            + padded(&self.seg_vr_save)
            + padded(&self.seg_locals)
            + padded(&self.seg_spill)
            + padded(&self.seg_cold)
            + padded(&self.seg_args_to_stk)
    }

    /// Signed fp-relative base of one segment. Valid only after `finalize`.
    fn segment_base(&self, kind: SegmentKind) -> i64 {
        let cs = self.callee_saved_size() as i64;
        let args_reg = padded(&self.seg_args_reg) as i64;
        let gr = padded(&self.seg_gr_save) as i64;
        let vr = padded(&self.seg_vr_save) as i64;
        let locals = padded(&self.seg_locals) as i64;
        let spill = padded(&self.seg_spill) as i64;
        let cold = padded(&self.seg_cold) as i64;
        match kind {
            // Incoming stack args sit above the saved fp/lr pair.
            SegmentKind::ArgsStkPassed => FRAME_RECORD_BYTES as i64,
            SegmentKind::ArgsRegPassed => -(cs + args_reg),
            SegmentKind::GrSaveArea => -(cs + args_reg + gr),
            SegmentKind::VrSaveArea => -(cs + args_reg + gr + vr),
            SegmentKind::Locals => -(cs + args_reg + gr + vr + locals),
            SegmentKind::SpillReg => -(cs + args_reg + gr + vr + locals + spill),
            SegmentKind::Cold => {
                -(cs + args_reg + gr + vr + locals + spill + cold)
            }
            SegmentKind::ArgsToStkPass => {
                -(self.frame_size - FRAME_RECORD_BYTES as i64)
            }
            SegmentKind::RedZone => {
                panic!("red zone has no frame-pointer-relative base")
            }
        }
    }

    /// Signed byte offset of `sym` from the frame pointer. Stable once
    /// layout has finalized.
    pub fn get_base_offset(&self, sym: SymbolIdx) -> LayoutResult<i64> {
        if self.phase != Phase::Final {
            return Err(LayoutError::SequencingViolation(
                "frame offsets queried before finalize",
            ));
        }
        let alloc = self
            .allocs
            .get(&sym)
            .ok_or(LayoutError::UnknownSymbol(sym))?;
        match alloc.segment() {
            SegmentKind::ArgsStkPassed
            | SegmentKind::ArgsRegPassed
            | SegmentKind::Locals
            | SegmentKind::SpillReg
            | SegmentKind::Cold => {
                Ok(self.segment_base(alloc.segment()) + alloc.offset() as i64)
            }
            other => panic!(
                "symbol {:?} allocated in non-layout segment {}",
                sym,
                other.name()
            ),
        }
    }

    /// Total frame size, a multiple of `STACK_ALIGN`.
    pub fn frame_size(&self) -> LayoutResult<i64> {
        if self.phase != Phase::Final {
            return Err(LayoutError::SequencingViolation(
                "frame size queried before finalize",
            ));
        }
        Ok(self.frame_size)
    }

    pub fn args_to_stack_pass_size(&self) -> u32 {
        self.seg_args_to_stk.size()
    }

    pub fn locals_size(&self) -> u32 {
        self.seg_locals.size()
    }

    /// Resolved location of the i-th declared formal.
    pub fn formal_location(&self, i: usize) -> Option<&ParamLocation> {
        self.formal_locs.get(i)
    }

    pub fn formal_locations(&self) -> &[ParamLocation] {
        &self.formal_locs
    }

    /// Location of the hidden return pointer, when the return value travels
    /// through memory.
    pub fn hidden_ret_location(&self) -> Option<&ParamLocation> {
        self.hidden_ret_loc.as_ref()
    }

    /// Record that `reg` must be preserved by this function. Duplicates are
    /// collapsed; the set is consumed when the frame is finalized.
    pub fn add_callee_saved(&mut self, reg: PhysReg) -> LayoutResult<()> {
        if self.phase == Phase::Final {
            return Err(LayoutError::SequencingViolation(
                "callee-saved registers added after finalize",
            ));
        }
        if !self.callee_saved.contains(&reg) {
            self.callee_saved.push(reg);
        }
        Ok(())
    }

    pub fn callee_saved(&self) -> &[PhysReg] {
        &self.callee_saved
    }

    /// Bytes of the callee-saved area, kept 16-byte aligned (registers are
    /// stored in pairs).
    pub fn callee_saved_size(&self) -> u32 {
        align_up(self.callee_saved.len() as u64 * 8, 16) as u32
    }

    /// fp-relative base of the variadic general-register save area.
    pub fn gr_save_area_base(&self) -> LayoutResult<i64> {
        if self.phase != Phase::Final {
            return Err(LayoutError::SequencingViolation(
                "save-area base queried before finalize",
            ));
        }
        Ok(self.segment_base(SegmentKind::GrSaveArea))
    }

    /// fp-relative base of the variadic vector-register save area.
    pub fn vr_save_area_base(&self) -> LayoutResult<i64> {
        if self.phase != Phase::Final {
            return Err(LayoutError::SequencingViolation(
                "save-area base queried before finalize",
            ));
        }
        Ok(self.segment_base(SegmentKind::VrSaveArea))
    }

    pub fn gr_save_area_size(&self) -> u32 {
        self.seg_gr_save.size()
    }

    pub fn vr_save_area_size(&self) -> u32 {
        self.seg_vr_save.size()
    }
}

/// Segment extent padded to the stack alignment, so segment bases below the
/// frame pointer stay 16-byte aligned.
fn padded(seg: &MemSegment) -> u32 {
    align_up(seg.size() as u64, STACK_ALIGN as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::conventions::CallConv;
    use crate::ir::{CallSite, FnSig};
    use crate::regs::{gp, INDIRECT_RESULT_REG};
    use crate::types::{TypeFacts, TypeIdx};
    use assert_matches::assert_matches;

    fn laid_out(func: &Function, facts: &TypeFactsTable, opt: OptLevel) -> i64 {
        let mut layout = FrameLayoutEngine::new(func, facts, opt);
        layout.run().unwrap();
        layout.frame_size().unwrap()
    }

    #[test]
    fn locals_are_placed_consecutively_aligned() {
        // bool at 0, pointer rounded up to 8, int at 16; segment size 20.
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let b = func.add_local("flag", ValueTy::U8);
        let p = func.add_local("cursor", ValueTy::Ptr);
        let n = func.add_local("count", ValueTy::I32);

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();

        assert_eq!(layout.locals_size(), 20);
        let base = layout.get_base_offset(b).unwrap();
        assert_eq!(layout.get_base_offset(p).unwrap(), base + 8);
        assert_eq!(layout.get_base_offset(n).unwrap(), base + 16);
        // Alignment law: absolute offsets honor each type's alignment.
        assert_eq!(layout.get_base_offset(p).unwrap() % 8, 0);
        assert_eq!(layout.get_base_offset(n).unwrap() % 4, 0);
        // Offsets are stable once finalized.
        assert_eq!(layout.get_base_offset(p).unwrap(), base + 8);
        // Frame-size law.
        assert_eq!(layout.frame_size().unwrap() % STACK_ALIGN as i64, 0);
    }

    #[test]
    fn register_formals_get_home_slots() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(
            vec![ValueTy::I32, ValueTy::F64],
            ValueTy::Void,
            CallConv::Standard,
        );
        let func = Function::new("f", sig);
        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O0);
        layout.run().unwrap();

        let a = layout.get_base_offset(func.formals[0]).unwrap();
        let b = layout.get_base_offset(func.formals[1]).unwrap();
        assert!(a < 0 && b < 0);
        assert_eq!(b, a + 8);
        assert_eq!(layout.formal_location(0).unwrap().regs(), &[gp(0)]);
    }

    #[test]
    fn stack_passed_formals_keep_caller_fixed_offsets() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![ValueTy::I64; 10], ValueTy::Void, CallConv::Standard);
        let func = Function::new("f", sig);
        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();

        // Eight in registers, the ninth and tenth past the frame record at
        // the offsets the caller chose.
        assert_eq!(layout.get_base_offset(func.formals[8]).unwrap(), 16);
        assert_eq!(layout.get_base_offset(func.formals[9]).unwrap(), 24);
        assert!(layout.formal_location(8).unwrap().on_stack());
    }

    #[test]
    fn outgoing_area_takes_the_worst_call_site() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        // Eleven pointers: three spill past the eight-register file, so this
        // site needs 3 * pointer_size rounded to twice the pointer width.
        func.add_call_site(CallSite {
            cc: CallConv::Standard,
            args: vec![ValueTy::Ptr; 11],
            ret: ValueTy::Void,
        });
        func.add_call_site(CallSite {
            cc: CallConv::Standard,
            args: vec![ValueTy::I32, ValueTy::I32],
            ret: ValueTy::I32,
        });

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();
        assert_eq!(layout.args_to_stack_pass_size(), 32);
    }

    #[test]
    fn outgoing_area_adds_the_largest_copy() {
        let mut facts = TypeFactsTable::new();
        facts.add(TypeIdx(0), TypeFacts::aggregate(64, 8, 8));
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let mut args = vec![ValueTy::I64; 9];
        args.push(ValueTy::Agg(TypeIdx(0)));
        func.add_call_site(CallSite {
            cc: CallConv::Standard,
            args,
            ret: ValueTy::Void,
        });

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();
        // The ninth i64 and the aggregate's pointer spill (16B of stack
        // arguments) plus the 64-byte out-of-line copy.
        assert_eq!(layout.args_to_stack_pass_size(), 80);
    }

    #[test]
    fn variadic_save_areas_cover_the_unnamed_registers() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(
            vec![ValueTy::I32, ValueTy::F64],
            ValueTy::Void,
            CallConv::Standard,
        )
        .variadic();
        let func = Function::new("printf_like", sig);
        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();

        // One named GP and one named FP argument are already consumed.
        assert_eq!(layout.gr_save_area_size(), 7 * 8);
        assert_eq!(layout.vr_save_area_size(), 7 * 16);
        // args-reg homes (16B) pad to 16; the GR area (56B) pads to 64.
        assert_eq!(layout.gr_save_area_base().unwrap(), -(16 + 64));
        assert_eq!(layout.vr_save_area_base().unwrap(), -(16 + 64 + 112));
        assert_eq!(layout.frame_size().unwrap(), 16 + 16 + 64 + 112);
    }

    #[test]
    fn variadic_is_rejected_off_the_standard_convention() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![ValueTy::I64], ValueTy::Void, CallConv::TailCall)
            .variadic();
        let func = Function::new("f", sig);
        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        assert_matches!(
            layout.layout_formal_params(),
            Err(LayoutError::UnsupportedType { cc: CallConv::TailCall, .. })
        );
    }

    #[test]
    fn hidden_return_pointer_is_exposed() {
        let mut facts = TypeFactsTable::new();
        facts.add(TypeIdx(0), TypeFacts::aggregate(32, 8, 4));
        let sig = FnSig::new(
            vec![ValueTy::I32],
            ValueTy::Agg(TypeIdx(0)),
            CallConv::Standard,
        );
        let func = Function::new("f", sig);
        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();

        let hidden = layout.hidden_ret_location().unwrap();
        assert_eq!(hidden.regs(), &[INDIRECT_RESULT_REG]);
        assert_eq!(layout.formal_location(0).unwrap().regs(), &[gp(0)]);
    }

    #[test]
    fn spill_slots_exist_only_at_low_optimization() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let s0 = func.add_spill_slot(0, ValueTy::I64);
        let s1 = func.add_spill_slot(1, ValueTy::F64);

        let mut at_o0 = FrameLayoutEngine::new(&func, &facts, OptLevel::O0);
        at_o0.run().unwrap();
        let a = at_o0.get_base_offset(s0).unwrap();
        let b = at_o0.get_base_offset(s1).unwrap();
        assert_eq!(b, a + 8);

        let mut at_o2 = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        at_o2.run().unwrap();
        assert_matches!(
            at_o2.get_base_offset(s0),
            Err(LayoutError::UnknownSymbol(_))
        );
    }

    #[test]
    fn deleted_locals_are_skipped() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let dead = func.add_local("dead", ValueTy::I64);
        func.symtab.mark_deleted(dead);
        let live = func.add_local("live", ValueTy::I32);

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();
        assert_eq!(layout.locals_size(), 4);
        assert_matches!(
            layout.get_base_offset(dead),
            Err(LayoutError::UnknownSymbol(_))
        );
        layout.get_base_offset(live).unwrap();
    }

    #[test]
    fn cold_locals_sit_past_ordinary_locals() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let hot = func.add_local("hot", ValueTy::I64);
        let cold = func.add_local("cold_buf", ValueTy::I64);
        func.symtab.mark_cold(cold);

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        layout.run().unwrap();
        let hot_off = layout.get_base_offset(hot).unwrap();
        let cold_off = layout.get_base_offset(cold).unwrap();
        assert!(cold_off < hot_off, "cold data goes further from fp");
    }

    #[test]
    fn callee_saved_bookkeeping_shifts_the_frame() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let mut func = Function::new("f", sig);
        let v = func.add_local("v", ValueTy::I64);

        let mut plain = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        plain.run().unwrap();
        let plain_off = plain.get_base_offset(v).unwrap();
        let plain_size = plain.frame_size().unwrap();

        let mut saved = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        saved.add_callee_saved(gp(19)).unwrap();
        saved.add_callee_saved(gp(20)).unwrap();
        saved.add_callee_saved(gp(19)).unwrap(); // duplicate collapses
        saved.run().unwrap();
        assert_eq!(saved.callee_saved().len(), 2);
        assert_eq!(saved.callee_saved_size(), 16);
        assert_eq!(saved.get_base_offset(v).unwrap(), plain_off - 16);
        assert_eq!(saved.frame_size().unwrap(), plain_size + 16);
    }

    #[test]
    fn phases_refuse_to_run_out_of_order() {
        let facts = TypeFactsTable::new();
        let sig = FnSig::new(vec![], ValueTy::Void, CallConv::Standard);
        let func = Function::new("f", sig);

        let mut layout = FrameLayoutEngine::new(&func, &facts, OptLevel::O2);
        assert_matches!(
            layout.layout_local_vars(),
            Err(LayoutError::SequencingViolation(_))
        );
        assert_matches!(
            layout.frame_size(),
            Err(LayoutError::SequencingViolation(_))
        );
        layout.layout_formal_params().unwrap();
        assert_matches!(
            layout.find_largest_actual_area(),
            Err(LayoutError::SequencingViolation(_))
        );
        layout.layout_local_vars().unwrap();
        layout.layout_spill_slots().unwrap();
        layout.find_largest_actual_area().unwrap();
        layout.finalize().unwrap();
        // Finalize fixed the frame; the callee-saved set is closed.
        assert_matches!(
            layout.add_callee_saved(gp(19)),
            Err(LayoutError::SequencingViolation(_))
        );
        // And a second finalize is itself out of order.
        assert_matches!(
            layout.finalize(),
            Err(LayoutError::SequencingViolation(_))
        );
    }

    #[test]
    fn frame_size_law_holds_across_mixes() {
        let mut facts = TypeFactsTable::new();
        facts.add(TypeIdx(0), TypeFacts::aggregate(24, 8, 3));
        let cases: Vec<Function> = vec![
            Function::new(
                "empty",
                FnSig::new(vec![], ValueTy::Void, CallConv::Standard),
            ),
            {
                let mut f = Function::new(
                    "mixed",
                    FnSig::new(
                        vec![ValueTy::I32, ValueTy::Agg(TypeIdx(0))],
                        ValueTy::I64,
                        CallConv::Standard,
                    ),
                );
                f.add_local("a", ValueTy::U8);
                f.add_local("b", ValueTy::V128);
                f.add_call_site(CallSite {
                    cc: CallConv::Interp,
                    args: vec![ValueTy::I64, ValueTy::F64],
                    ret: ValueTy::I64,
                });
                f
            },
        ];
        for func in &cases {
            let size = laid_out(func, &facts, OptLevel::O0);
            assert_eq!(size % STACK_ALIGN as i64, 0, "{}", func.name);
        }
    }
}
