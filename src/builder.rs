//! Program assembly: shared state, frame stack and finalization

use crate::context::Context;
use crate::error::BuilderError;
use crate::program::{Op, Program};
use crate::symbol::SymbolTable;

use tracing::{debug, trace};

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

#[derive(Debug, Default)]
/// Mutable program state shared by every handle of one builder.
///
/// `root` is the program body; `nested` holds the frames opened while a
/// control-flow construct records its condition and branch bodies. The
/// topmost open frame is the active one.
pub(crate) struct ProgramState {
    symbols: SymbolTable,
    root: Vec<Op>,
    nested: Vec<Vec<Op>>,
    sealed: bool,
}

impl ProgramState {
    /// Fail with [`BuilderError::Sealed`] once the program is finalized.
    pub(crate) fn check_open(&self) -> Result<(), BuilderError> {
        if self.sealed {
            Err(BuilderError::Sealed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Append a record to the active frame.
    pub(crate) fn push_op(&mut self, op: Op) {
        self.active_frame().push(op);
    }

    /// Open a fresh frame for a condition or branch body.
    pub(crate) fn push_frame(&mut self) {
        self.nested.push(Vec::new());
        trace!(depth = self.nested.len(), "frame opened");
    }

    /// Close the active frame and return its records.
    pub(crate) fn pop_frame(&mut self) -> Vec<Op> {
        debug_assert!(!self.nested.is_empty(), "pop without a matching push");
        let ops = self.nested.pop().unwrap_or_default();
        trace!(depth = self.nested.len(), ops = ops.len(), "frame closed");
        ops
    }

    fn active_frame(&mut self) -> &mut Vec<Op> {
        self.nested.last_mut().unwrap_or(&mut self.root)
    }
}

#[derive(Debug, Default)]
/// Assembles one data-parallel program.
///
/// The builder owns the symbol directories and the frame stack; values and
/// [`Context`] handles created from it share that state. It is
/// single-threaded and accepts operations until [`ProgramBuilder::finalize`]
/// seals it.
pub struct ProgramBuilder {
    state: Rc<RefCell<ProgramState>>,
}

impl ProgramBuilder {
    /// Create an empty open program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to this program.
    ///
    /// Contexts are cheap; each keeps its own name namespace while sharing
    /// the program state.
    pub fn context(&self) -> Context {
        Context::new(Rc::clone(&self.state))
    }

    /// Return `true` once [`ProgramBuilder::finalize`] has sealed the
    /// program.
    pub fn is_sealed(&self) -> bool {
        self.state.borrow().sealed
    }

    /// Number of tokens allocated so far.
    pub fn token_count(&self) -> u32 {
        self.state.borrow().symbols.token_count()
    }

    /// Number of labels allocated so far.
    pub fn label_count(&self) -> u32 {
        self.state.borrow().symbols.label_count()
    }

    /// Seal the program and emit its document.
    ///
    /// Fails with [`BuilderError::UnbalancedFrames`] if a control-flow
    /// frame is still open (a condition or body closure errored out), and
    /// with [`BuilderError::Sealed`] on a second call.
    pub fn finalize(&self) -> Result<Program, BuilderError> {
        let mut state = self.state.borrow_mut();
        state.check_open()?;
        if !state.nested.is_empty() {
            return Err(BuilderError::UnbalancedFrames(state.nested.len()));
        }
        state.sealed = true;

        let tokens = state.symbols.token_count();
        let labels = state.symbols.label_count();
        let operation = mem::take(&mut state.root);
        let (symbol, storage, input, output) = mem::take(&mut state.symbols).into_directories();
        debug!(tokens, labels, operations = operation.len(), "program finalized");

        Ok(Program::new(symbol, storage, input, output, operation))
    }
}
