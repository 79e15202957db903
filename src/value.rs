//! Typed value handles and the operation algebra

use crate::builder::ProgramState;
use crate::error::BuilderError;
use crate::program::{Literal, Op};
use crate::symbol::TokenId;
use crate::types::DataType;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
/// Right-hand side accepted by the operator surface: an existing value or
/// a host literal to materialize first.
pub enum Operand {
    /// Already-built value of the same program.
    Value(Value),
    /// Host integer literal; non-negative ones materialize as `U32`,
    /// negative ones as `I32`.
    Int(i64),
    /// Host float literal, materialized as `F32`.
    Float(f32),
    /// Host boolean literal.
    Bool(bool),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        Self::Value(value.clone())
    }
}

impl From<i64> for Operand {
    fn from(raw: i64) -> Self {
        Self::Int(raw)
    }
}

impl From<i32> for Operand {
    fn from(raw: i32) -> Self {
        Self::Int(raw as i64)
    }
}

impl From<u32> for Operand {
    fn from(raw: u32) -> Self {
        Self::Int(raw as i64)
    }
}

impl From<f32> for Operand {
    fn from(raw: f32) -> Self {
        Self::Float(raw)
    }
}

impl From<bool> for Operand {
    fn from(raw: bool) -> Self {
        Self::Bool(raw)
    }
}

#[derive(Clone)]
/// Handle to a single-assignment typed slot of one program.
///
/// Values are cheap: a type tag, a token id and a pointer to the shared
/// program state. Every operator method records an operation in the
/// active frame and returns the handle of the fresh result slot.
pub struct Value {
    state: Rc<RefCell<ProgramState>>,
    ty: DataType,
    tid: TokenId,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.ty)
            .field("token", &self.tid)
            .finish()
    }
}

impl Value {
    pub(crate) const fn new(state: Rc<RefCell<ProgramState>>, ty: DataType, tid: TokenId) -> Self {
        Self { state, ty, tid }
    }

    /// Data type of the slot.
    pub const fn data_type(&self) -> DataType {
        self.ty
    }

    /// Token id of the slot.
    pub const fn token(&self) -> TokenId {
        self.tid
    }

    pub(crate) const fn state(&self) -> &Rc<RefCell<ProgramState>> {
        &self.state
    }

    /// Return `true` if both handles belong to the same builder.
    pub fn same_program(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Turn an operand into a value of the program owning `state`,
    /// emitting a `Constant` record for host literals.
    pub(crate) fn materialize(
        state: &Rc<RefCell<ProgramState>>,
        operand: Operand,
    ) -> Result<Value, BuilderError> {
        match operand {
            Operand::Value(value) => Ok(value),
            Operand::Int(raw) => {
                let literal = if raw >= 0 {
                    if raw >= 1 << 32 {
                        return Err(BuilderError::LiteralOutOfRange(raw));
                    }
                    Literal::U32(raw as u32)
                } else {
                    if raw < -(1 << 31) {
                        return Err(BuilderError::LiteralOutOfRange(raw));
                    }
                    Literal::I32(raw as i32)
                };
                Self::constant(state, literal)
            }
            Operand::Float(raw) => Self::constant(state, Literal::F32(raw)),
            Operand::Bool(raw) => Self::constant(state, Literal::Bool(raw)),
        }
    }

    /// Emit a `Constant` record and return its slot.
    pub(crate) fn constant(
        state: &Rc<RefCell<ProgramState>>,
        literal: Literal,
    ) -> Result<Value, BuilderError> {
        let ty = literal.data_type();
        let mut program = state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(ty);
        program.push_op(Op::Constant(tid, literal));
        drop(program);
        Ok(Value::new(Rc::clone(state), ty, tid))
    }

    /// Record a conversion to `target`, or share the token when the types
    /// already agree.
    pub(crate) fn convert(&self, target: DataType, op: &'static str) -> Result<Value, BuilderError> {
        if self.ty == target {
            return Ok(self.clone());
        }
        let record = match (self.ty, target) {
            (DataType::U32, DataType::I32) => Op::I32FromU32 as fn(TokenId, TokenId) -> Op,
            (DataType::F32, DataType::I32) => Op::I32FromF32,
            (DataType::I32, DataType::U32) => Op::U32FromI32,
            (DataType::F32, DataType::U32) => Op::U32FromF32,
            (DataType::I32, DataType::F32) => Op::F32FromI32,
            (DataType::U32, DataType::F32) => Op::F32FromU32,
            (found, _) => return Err(BuilderError::InvalidType { op, found }),
        };
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(target);
        program.push_op(record(tid, self.tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), target, tid))
    }

    fn coerced(&self, operand: Operand) -> Result<Value, BuilderError> {
        let rhs = Self::materialize(&self.state, operand)?;
        if !self.same_program(&rhs) {
            return Err(BuilderError::CrossProgramOperand);
        }
        Ok(rhs)
    }

    fn binary(
        &self,
        op: &'static str,
        other: Operand,
        admits: fn(DataType) -> bool,
        result: DataType,
        record: fn(TokenId, TokenId, TokenId) -> Op,
    ) -> Result<Value, BuilderError> {
        let rhs = self.coerced(other)?;
        if self.ty != rhs.ty {
            return Err(BuilderError::OperandMismatch {
                op,
                lhs: self.ty,
                rhs: rhs.ty,
            });
        }
        if !admits(self.ty) {
            return Err(BuilderError::InvalidType { op, found: self.ty });
        }
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(result);
        program.push_op(record(tid, self.tid, rhs.tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), result, tid))
    }

    fn unary(
        &self,
        op: &'static str,
        admits: fn(DataType) -> bool,
        record: fn(TokenId, TokenId) -> Op,
    ) -> Result<Value, BuilderError> {
        if !admits(self.ty) {
            return Err(BuilderError::InvalidType { op, found: self.ty });
        }
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(self.ty);
        program.push_op(record(tid, self.tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), self.ty, tid))
    }

    /// Record an addition of two equally-typed numeric operands.
    pub fn add(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Add", other.into(), DataType::is_numeric, self.ty, Op::Add)
    }

    /// Record a subtraction of two equally-typed numeric operands.
    pub fn sub(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Sub", other.into(), DataType::is_numeric, self.ty, Op::Sub)
    }

    /// Record a multiplication of two equally-typed numeric operands.
    pub fn mul(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Mul", other.into(), DataType::is_numeric, self.ty, Op::Mul)
    }

    /// Record a division; integer operands divide as integers, rounding
    /// for floats is the executor's choice.
    pub fn div(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Div", other.into(), DataType::is_numeric, self.ty, Op::Div)
    }

    /// Record a remainder, following the sign of the dividend on signed
    /// operands.
    pub fn rem(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Rem", other.into(), DataType::is_numeric, self.ty, Op::Rem)
    }

    /// Record a left shift on integer operands.
    pub fn shl(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Shl", other.into(), DataType::is_integer, self.ty, Op::Shl)
    }

    /// Record a right shift on integer operands.
    pub fn shr(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Shr", other.into(), DataType::is_integer, self.ty, Op::Shr)
    }

    /// Record a conjunction: bitwise on integers, logical on booleans.
    pub fn bitand(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary(
            "BitAnd",
            other.into(),
            DataType::is_bitwise,
            self.ty,
            Op::BitAnd,
        )
    }

    /// Record a disjunction: bitwise on integers, logical on booleans.
    pub fn bitor(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary(
            "BitOr",
            other.into(),
            DataType::is_bitwise,
            self.ty,
            Op::BitOr,
        )
    }

    /// Record an exclusive or: bitwise on integers, logical on booleans.
    pub fn bitxor(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary(
            "BitXor",
            other.into(),
            DataType::is_bitwise,
            self.ty,
            Op::BitXor,
        )
    }

    /// Record a complement: bitwise on integers, logical negation on
    /// booleans.
    pub fn not(&self) -> Result<Value, BuilderError> {
        self.unary("Not", DataType::is_bitwise, Op::Not)
    }

    /// Record a numeric negation.
    pub fn neg(&self) -> Result<Value, BuilderError> {
        self.unary("Neg", DataType::is_numeric, Op::Neg)
    }

    /// Record an equality comparison; the result is a `Bool` slot.
    pub fn eq(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary(
            "Eq",
            other.into(),
            DataType::is_comparable,
            DataType::Bool,
            Op::Eq,
        )
    }

    /// Record an inequality comparison; the result is a `Bool` slot.
    pub fn ne(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary(
            "Ne",
            other.into(),
            DataType::is_comparable,
            DataType::Bool,
            Op::Ne,
        )
    }

    /// Record a strict less-than on numeric operands.
    pub fn lt(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Lt", other.into(), DataType::is_numeric, DataType::Bool, Op::Lt)
    }

    /// Record a less-or-equal on numeric operands.
    pub fn le(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Le", other.into(), DataType::is_numeric, DataType::Bool, Op::Le)
    }

    /// Record a strict greater-than on numeric operands.
    pub fn gt(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Gt", other.into(), DataType::is_numeric, DataType::Bool, Op::Gt)
    }

    /// Record a greater-or-equal on numeric operands.
    pub fn ge(&self, other: impl Into<Operand>) -> Result<Value, BuilderError> {
        self.binary("Ge", other.into(), DataType::is_numeric, DataType::Bool, Op::Ge)
    }
}
