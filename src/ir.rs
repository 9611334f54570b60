//! The slice of front-end IR this crate consumes.
//!
//! ABI resolution reads exactly three things from a function: its signature
//! (ordered formal types, return type, variadic flag, calling convention),
//! its symbol table (formals, automatic locals, spill slots backing
//! pseudo-registers), and the call sites in its body (per-site convention and
//! actual argument types). Nothing else of a real IR is modeled here.

use rustc_hash::FxHashMap;

use crate::abi::conventions::CallConv;
use crate::types::ValueTy;

/// Index of a symbol within one function's symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolIdx(pub u32);

/// Storage class of a symbol, as far as frame layout cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Formal parameter, with its position in the declared parameter list.
    Formal(u32),
    /// Automatic (function-local) variable.
    Auto,
    /// Spill slot backing the pseudo-register with this id.
    Spill(u32),
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: ValueTy,
    pub kind: StorageKind,
    /// Deleted symbols are skipped by layout; front-ends may retract
    /// temporaries after optimization.
    pub deleted: bool,
    /// Rarely-executed data, placed in the cold segment.
    pub cold: bool,
}

/// Per-function symbol table. Append-only; symbols are identified by index
/// for the rest of codegen.
#[derive(Debug, Default)]
pub struct SymbolTable {
    syms: Vec<Symbol>,
    by_name: FxHashMap<String, SymbolIdx>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn add(&mut self, sym: Symbol) -> SymbolIdx {
        let idx = SymbolIdx(self.syms.len() as u32);
        self.by_name.insert(sym.name.clone(), idx);
        self.syms.push(sym);
        idx
    }

    pub fn get(&self, idx: SymbolIdx) -> Option<&Symbol> {
        self.syms.get(idx.0 as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolIdx> {
        self.by_name.get(name).copied()
    }

    pub fn mark_deleted(&mut self, idx: SymbolIdx) {
        if let Some(sym) = self.syms.get_mut(idx.0 as usize) {
            sym.deleted = true;
        }
    }

    pub fn mark_cold(&mut self, idx: SymbolIdx) {
        if let Some(sym) = self.syms.get_mut(idx.0 as usize) {
            sym.cold = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolIdx, &Symbol)> {
        self.syms
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolIdx(i as u32), s))
    }

    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }
}

/// A typed function signature plus its calling convention.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<ValueTy>,
    pub ret: ValueTy,
    pub is_variadic: bool,
    pub cc: CallConv,
}

impl FnSig {
    pub fn new(params: Vec<ValueTy>, ret: ValueTy, cc: CallConv) -> Self {
        FnSig {
            params,
            ret,
            is_variadic: false,
            cc,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }
}

/// One call-like statement in a function body: the convention it uses and the
/// types of its actual arguments. This is all outgoing-area sizing needs.
#[derive(Debug, Clone)]
pub struct CallSite {
    pub cc: CallConv,
    pub args: Vec<ValueTy>,
    pub ret: ValueTy,
}

/// Optimization level of the surrounding codegen tier. Low tiers materialize
/// every pseudo-register to a stable stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    O0,
    O1,
    O2,
}

impl OptLevel {
    /// Whether pseudo-registers get spill slots in the frame.
    pub fn spills_pseudo_regs(self) -> bool {
        matches!(self, OptLevel::O0)
    }
}

/// A function as seen by ABI resolution: signature, symbols, call sites.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub sig: FnSig,
    pub symtab: SymbolTable,
    /// Formal symbols in declaration order.
    pub formals: Vec<SymbolIdx>,
    pub call_sites: Vec<CallSite>,
}

impl Function {
    /// Build a function shell from its signature; one formal symbol is
    /// created per declared parameter, in order.
    pub fn new(name: impl Into<String>, sig: FnSig) -> Self {
        let mut symtab = SymbolTable::new();
        let mut formals = Vec::with_capacity(sig.params.len());
        for (i, &ty) in sig.params.iter().enumerate() {
            formals.push(symtab.add(Symbol {
                name: format!("arg{}", i),
                ty,
                kind: StorageKind::Formal(i as u32),
                deleted: false,
                cold: false,
            }));
        }
        Function {
            name: name.into(),
            sig,
            symtab,
            formals,
            call_sites: Vec::new(),
        }
    }

    pub fn add_local(&mut self, name: &str, ty: ValueTy) -> SymbolIdx {
        self.symtab.add(Symbol {
            name: name.to_string(),
            ty,
            kind: StorageKind::Auto,
            deleted: false,
            cold: false,
        })
    }

    /// Create the spill-slot symbol backing pseudo-register `preg`.
    pub fn add_spill_slot(&mut self, preg: u32, ty: ValueTy) -> SymbolIdx {
        self.symtab.add(Symbol {
            name: format!("spill.{}", preg),
            ty,
            kind: StorageKind::Spill(preg),
            deleted: false,
            cold: false,
        })
    }

    pub fn add_call_site(&mut self, call: CallSite) {
        self.call_sites.push(call);
    }
}
