//! User-facing program surface: named slots, casts and control flow

use crate::array::Array;
use crate::builder::ProgramState;
use crate::error::BuilderError;
use crate::program::{Literal, Op};
use crate::symbol::{StorageEntry, TokenId};
use crate::types::{DataType, IoType};
use crate::value::{Operand, Value};

use tracing::trace;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Variable,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct NamedSlot {
    tid: TokenId,
    ty: DataType,
    kind: SlotKind,
}

/// User surface of one program.
///
/// A context associates names with variables and arrays and records
/// operations into the builder's active frame. Several contexts may share
/// one builder; each keeps its own name namespace, while input and output
/// bindings stay unique program-wide.
pub struct Context {
    state: Rc<RefCell<ProgramState>>,
    slots: HashMap<String, NamedSlot>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl Context {
    pub(crate) fn new(state: Rc<RefCell<ProgramState>>) -> Self {
        Self {
            state,
            slots: HashMap::new(),
        }
    }

    /// Declare a named scalar variable.
    ///
    /// Records its storage entry and, for `input`/`output` declarations,
    /// binds the name in the matching I/O directory. Emits no operation.
    pub fn decl_variable(
        &mut self,
        name: &str,
        ty: DataType,
        io: IoType,
    ) -> Result<(), BuilderError> {
        if self.slots.contains_key(name) {
            return Err(BuilderError::NameConflict(name.to_string()));
        }
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        if io.is_shared() && program.symbols().is_io_bound(name) {
            return Err(BuilderError::NameConflict(name.to_string()));
        }
        let tid = program.symbols_mut().declare_variable(ty);
        program.symbols_mut().put_storage(tid, StorageEntry::Variable(ty));
        if io.is_shared() {
            program.symbols_mut().bind_io(name, tid, io)?;
        }
        drop(program);
        self.slots.insert(
            name.to_string(),
            NamedSlot {
                tid,
                ty,
                kind: SlotKind::Variable,
            },
        );
        trace!(name, %ty, %io, tid, "variable declared");
        Ok(())
    }

    /// Declare a named array of `size` elements (a `U32` operand) with a
    /// compile-time maximum length.
    ///
    /// Emits the `ArrayNew` record; `input`/`output` arrays are marked
    /// shared and bound in the matching I/O directory, private arrays
    /// stay unbound.
    pub fn decl_array(
        &mut self,
        name: &str,
        ty: DataType,
        io: IoType,
        size: impl Into<Operand>,
        max_size: u32,
    ) -> Result<(), BuilderError> {
        let size = self.operand_value(size.into())?;
        if self.slots.contains_key(name) {
            return Err(BuilderError::NameConflict(name.to_string()));
        }
        if size.data_type() != DataType::U32 {
            return Err(BuilderError::InvalidType {
                op: "ArrayNew",
                found: size.data_type(),
            });
        }
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        if io.is_shared() && program.symbols().is_io_bound(name) {
            return Err(BuilderError::NameConflict(name.to_string()));
        }
        let tid = program.symbols_mut().declare_array(ty);
        program.push_op(Op::ArrayNew(tid, size.token(), ty, max_size, io.is_shared()));
        let entry = if io.is_shared() {
            StorageEntry::SharedArray(ty, max_size)
        } else {
            StorageEntry::PrivateArray(ty, max_size)
        };
        program.symbols_mut().put_storage(tid, entry);
        if io.is_shared() {
            program.symbols_mut().bind_io(name, tid, io)?;
        }
        drop(program);
        self.slots.insert(
            name.to_string(),
            NamedSlot {
                tid,
                ty,
                kind: SlotKind::Array,
            },
        );
        trace!(name, %ty, %io, tid, max_size, "array declared");
        Ok(())
    }

    /// Load the current value of a named variable into a fresh slot.
    pub fn get(&self, name: &str) -> Result<Value, BuilderError> {
        let slot = self.variable_slot(name)?;
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(slot.ty);
        program.push_op(Op::Load(tid, slot.tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), slot.ty, tid))
    }

    /// Store a value into a named variable.
    ///
    /// The first store through an undeclared name creates a private
    /// variable of the value's type; later stores must match that type.
    pub fn set(&mut self, name: &str, value: impl Into<Operand>) -> Result<(), BuilderError> {
        let value = self.operand_value(value.into())?;
        match self.slots.get(name).copied() {
            Some(slot) if slot.kind == SlotKind::Array => {
                Err(BuilderError::NotAVariable(name.to_string()))
            }
            Some(slot) => {
                if slot.ty != value.data_type() {
                    return Err(BuilderError::TypeMismatch {
                        expected: slot.ty,
                        found: value.data_type(),
                    });
                }
                let mut program = self.state.borrow_mut();
                program.check_open()?;
                program.push_op(Op::Store(slot.tid, value.token()));
                Ok(())
            }
            None => {
                let ty = value.data_type();
                let mut program = self.state.borrow_mut();
                program.check_open()?;
                let tid = program.symbols_mut().declare_variable(ty);
                program.symbols_mut().put_storage(tid, StorageEntry::Variable(ty));
                program.push_op(Op::Store(tid, value.token()));
                drop(program);
                self.slots.insert(
                    name.to_string(),
                    NamedSlot {
                        tid,
                        ty,
                        kind: SlotKind::Variable,
                    },
                );
                trace!(name, %ty, tid, "variable declared implicitly");
                Ok(())
            }
        }
    }

    /// Handle to a named array.
    pub fn array(&self, name: &str) -> Result<Array, BuilderError> {
        let slot = self
            .slots
            .get(name)
            .copied()
            .ok_or_else(|| BuilderError::UnknownName(name.to_string()))?;
        if slot.kind != SlotKind::Array {
            return Err(BuilderError::NotAnArray(name.to_string()));
        }
        Ok(Array::new(Rc::clone(&self.state), slot.ty, slot.tid))
    }

    /// Index of the executing worker, as a fresh `U32` slot.
    pub fn worker_id(&self) -> Result<Value, BuilderError> {
        self.nullary(|tid| Op::WorkerId((tid,)))
    }

    /// Total number of workers, as a fresh `U32` slot.
    pub fn num_workers(&self) -> Result<Value, BuilderError> {
        self.nullary(|tid| Op::NumWorkers((tid,)))
    }

    /// Materialize an `I32` literal or convert a value to `I32`.
    ///
    /// Converting an `I32` value shares its token. Integer literals must
    /// fit two's-complement 32 bits.
    pub fn int32(&self, operand: impl Into<Operand>) -> Result<Value, BuilderError> {
        match operand.into() {
            Operand::Value(value) => {
                self.own_value(&value)?;
                value.convert(DataType::I32, "int32")
            }
            Operand::Int(raw) => {
                if raw < -(1 << 31) || raw >= 1 << 31 {
                    return Err(BuilderError::LiteralOutOfRange(raw));
                }
                Value::constant(&self.state, Literal::I32(raw as i32))
            }
            Operand::Float(_) => Err(BuilderError::InvalidType {
                op: "int32",
                found: DataType::F32,
            }),
            Operand::Bool(_) => Err(BuilderError::InvalidType {
                op: "int32",
                found: DataType::Bool,
            }),
        }
    }

    /// Materialize a `U32` literal or convert a value to `U32`.
    pub fn uint32(&self, operand: impl Into<Operand>) -> Result<Value, BuilderError> {
        match operand.into() {
            Operand::Value(value) => {
                self.own_value(&value)?;
                value.convert(DataType::U32, "uint32")
            }
            Operand::Int(raw) => {
                if !(0..1 << 32).contains(&raw) {
                    return Err(BuilderError::LiteralOutOfRange(raw));
                }
                Value::constant(&self.state, Literal::U32(raw as u32))
            }
            Operand::Float(_) => Err(BuilderError::InvalidType {
                op: "uint32",
                found: DataType::F32,
            }),
            Operand::Bool(_) => Err(BuilderError::InvalidType {
                op: "uint32",
                found: DataType::Bool,
            }),
        }
    }

    /// Materialize an `F32` literal or convert a value to `F32`.
    ///
    /// Integer literals are accepted and materialized as floats.
    pub fn float32(&self, operand: impl Into<Operand>) -> Result<Value, BuilderError> {
        match operand.into() {
            Operand::Value(value) => {
                self.own_value(&value)?;
                value.convert(DataType::F32, "float32")
            }
            Operand::Int(raw) => Value::constant(&self.state, Literal::F32(raw as f32)),
            Operand::Float(raw) => Value::constant(&self.state, Literal::F32(raw)),
            Operand::Bool(_) => Err(BuilderError::InvalidType {
                op: "float32",
                found: DataType::Bool,
            }),
        }
    }

    /// Materialize a `Bool` literal or pass a `Bool` value through.
    ///
    /// There is no conversion from the numeric types.
    pub fn bool(&self, operand: impl Into<Operand>) -> Result<Value, BuilderError> {
        match operand.into() {
            Operand::Value(value) => {
                self.own_value(&value)?;
                if value.data_type() != DataType::Bool {
                    return Err(BuilderError::InvalidType {
                        op: "bool",
                        found: value.data_type(),
                    });
                }
                Ok(value)
            }
            Operand::Bool(raw) => Value::constant(&self.state, Literal::Bool(raw)),
            Operand::Int(raw) => Err(BuilderError::InvalidType {
                op: "bool",
                // Same sign rule the literal would materialize under.
                found: if raw >= 0 { DataType::U32 } else { DataType::I32 },
            }),
            Operand::Float(_) => Err(BuilderError::InvalidType {
                op: "bool",
                found: DataType::F32,
            }),
        }
    }

    /// Record a conditional: `cond` then `then_body`, each into its own
    /// frame.
    ///
    /// Both closures run exactly once, in order; the condition must
    /// produce a `Bool` value of this program.
    pub fn if_<C, T>(&mut self, cond: C, then_body: T) -> Result<(), BuilderError>
    where
        C: FnOnce(&mut Context) -> Result<Value, BuilderError>,
        T: FnOnce(&mut Context) -> Result<(), BuilderError>,
    {
        let (cond_ops, cond_slot) = self.record_condition("If", cond)?;
        let then_ops = self.record_body(then_body)?;
        let mut program = self.state.borrow_mut();
        let cond_end = program.symbols_mut().next_label();
        let then_end = program.symbols_mut().next_label();
        program.push_op(Op::If(cond_ops, cond_slot, cond_end, then_ops, then_end));
        Ok(())
    }

    /// Record a two-branch conditional.
    pub fn if_else<C, T, E>(
        &mut self,
        cond: C,
        then_body: T,
        else_body: E,
    ) -> Result<(), BuilderError>
    where
        C: FnOnce(&mut Context) -> Result<Value, BuilderError>,
        T: FnOnce(&mut Context) -> Result<(), BuilderError>,
        E: FnOnce(&mut Context) -> Result<(), BuilderError>,
    {
        let (cond_ops, cond_slot) = self.record_condition("IfElse", cond)?;
        let then_ops = self.record_body(then_body)?;
        let else_ops = self.record_body(else_body)?;
        let mut program = self.state.borrow_mut();
        let cond_end = program.symbols_mut().next_label();
        let then_end = program.symbols_mut().next_label();
        let else_end = program.symbols_mut().next_label();
        program.push_op(Op::IfElse(
            cond_ops, cond_slot, cond_end, then_ops, then_end, else_ops, else_end,
        ));
        Ok(())
    }

    /// Record a loop: `cond` is re-evaluated before every iteration of
    /// `body`.
    pub fn while_<C, B>(&mut self, cond: C, body: B) -> Result<(), BuilderError>
    where
        C: FnOnce(&mut Context) -> Result<Value, BuilderError>,
        B: FnOnce(&mut Context) -> Result<(), BuilderError>,
    {
        let (cond_ops, cond_slot) = self.record_condition("While", cond)?;
        let body_ops = self.record_body(body)?;
        let mut program = self.state.borrow_mut();
        let head = program.symbols_mut().next_label();
        let cond_end = program.symbols_mut().next_label();
        let exit = program.symbols_mut().next_label();
        program.push_op(Op::While(
            head, cond_ops, cond_slot, cond_end, body_ops, exit,
        ));
        Ok(())
    }

    /// Run a condition closure in a fresh frame and return its records
    /// plus the `Bool` slot it produced.
    ///
    /// An error from the closure propagates without closing the frame,
    /// which `finalize` later reports as unbalanced.
    fn record_condition<C>(
        &mut self,
        op: &'static str,
        cond: C,
    ) -> Result<(Vec<Op>, TokenId), BuilderError>
    where
        C: FnOnce(&mut Context) -> Result<Value, BuilderError>,
    {
        self.state.borrow_mut().check_open()?;
        self.state.borrow_mut().push_frame();
        let value = cond(self)?;
        self.own_value(&value)?;
        if value.data_type() != DataType::Bool {
            return Err(BuilderError::InvalidType {
                op,
                found: value.data_type(),
            });
        }
        let ops = self.state.borrow_mut().pop_frame();
        Ok((ops, value.token()))
    }

    /// Run a branch-body closure in a fresh frame and return its records.
    fn record_body<B>(&mut self, body: B) -> Result<Vec<Op>, BuilderError>
    where
        B: FnOnce(&mut Context) -> Result<(), BuilderError>,
    {
        self.state.borrow_mut().push_frame();
        body(self)?;
        Ok(self.state.borrow_mut().pop_frame())
    }

    fn nullary(&self, record: fn(TokenId) -> Op) -> Result<Value, BuilderError> {
        let mut program = self.state.borrow_mut();
        program.check_open()?;
        let tid = program.symbols_mut().declare_constant(DataType::U32);
        program.push_op(record(tid));
        drop(program);
        Ok(Value::new(Rc::clone(&self.state), DataType::U32, tid))
    }

    /// Materialize an operand into this program, rejecting values of
    /// other builders.
    fn operand_value(&self, operand: Operand) -> Result<Value, BuilderError> {
        let value = Value::materialize(&self.state, operand)?;
        self.own_value(&value)?;
        Ok(value)
    }

    fn own_value(&self, value: &Value) -> Result<(), BuilderError> {
        if Rc::ptr_eq(value.state(), &self.state) {
            Ok(())
        } else {
            Err(BuilderError::CrossProgramOperand)
        }
    }

    fn variable_slot(&self, name: &str) -> Result<NamedSlot, BuilderError> {
        let slot = self
            .slots
            .get(name)
            .copied()
            .ok_or_else(|| BuilderError::UnknownName(name.to_string()))?;
        if slot.kind == SlotKind::Array {
            return Err(BuilderError::NotAVariable(name.to_string()));
        }
        Ok(slot)
    }
}
