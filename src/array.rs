//! Array handles: indexed loads and stores, length queries

use crate::builder::ProgramState;
use crate::error::BuilderError;
use crate::program::Op;
use crate::symbol::TokenId;
use crate::types::DataType;
use crate::value::{Operand, Value};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
/// Handle to a declared array of one program.
///
/// Obtained from [`crate::context::Context::array`]; every access records
/// an operation in the active frame. Indices are `U32` operands, stored
/// values must match the element type.
pub struct Array {
    state: Rc<RefCell<ProgramState>>,
    ty: DataType,
    tid: TokenId,
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("element", &self.ty)
            .field("token", &self.tid)
            .finish()
    }
}

impl Array {
    pub(crate) const fn new(state: Rc<RefCell<ProgramState>>, ty: DataType, tid: TokenId) -> Self {
        Self { state, ty, tid }
    }

    /// Element type of the array.
    pub const fn element_type(&self) -> DataType {
        self.ty
    }

    /// Token id of the array.
    pub const fn token(&self) -> TokenId {
        self.tid
    }

    /// Read `self[index]` into a fresh slot of the element type.
    pub fn load(&self, index: impl Into<Operand>) -> Result<Value, BuilderError> {
        let index = self.index_slot("ArrayLoad", index.into())?;
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(self.ty);
        program.push_op(Op::ArrayLoad(tid, self.tid, index));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), self.ty, tid))
    }

    /// Write `value` into `self[index]`.
    pub fn store(
        &self,
        index: impl Into<Operand>,
        value: impl Into<Operand>,
    ) -> Result<(), BuilderError> {
        let index = self.index_slot("ArrayStore", index.into())?;
        let value = self.element_slot(value.into())?;
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        program.push_op(Op::ArrayStore(self.tid, index, value));
        Ok(())
    }

    /// Current length of the array as a fresh `U32` slot.
    pub fn len(&self) -> Result<Value, BuilderError> {
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(DataType::U32);
        program.push_op(Op::ArrayLen(tid, self.tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), DataType::U32, tid))
    }

    /// Materialize an index operand and require it to be a same-program
    /// `U32` slot.
    fn index_slot(&self, op: &'static str, index: Operand) -> Result<TokenId, BuilderError> {
        let index = Value::materialize(&self.state, index)?;
        if !Rc::ptr_eq(index.state(), &self.state) {
            return Err(BuilderError::CrossProgramOperand);
        }
        if index.data_type() != DataType::U32 {
            return Err(BuilderError::InvalidType {
                op,
                found: index.data_type(),
            });
        }
        Ok(index.token())
    }

    /// Materialize a stored operand and require it to match the element
    /// type.
    fn element_slot(&self, value: Operand) -> Result<TokenId, BuilderError> {
        let value = Value::materialize(&self.state, value)?;
        if !Rc::ptr_eq(value.state(), &self.state) {
            return Err(BuilderError::CrossProgramOperand);
        }
        if value.data_type() != self.ty {
            return Err(BuilderError::TypeMismatch {
                expected: self.ty,
                found: value.data_type(),
            });
        }
        Ok(value.token())
    }
}
