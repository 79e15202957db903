//! Builder and document error definitions

use crate::symbol::{LabelId, TokenId};
use crate::types::DataType;

use thiserror::Error;

/// Errors reported synchronously by the builder surface.
///
/// All of them are recoverable: the offending call appends nothing, though
/// token or label ids burned before the offense was detected are not
/// reclaimed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    /// The name is already declared in this context or bound in an I/O
    /// directory of the program.
    #[error("name `{0}` is already declared")]
    NameConflict(String),
    /// The name was read before any declaration or store.
    #[error("name `{0}` is not declared")]
    UnknownName(String),
    /// The named slot holds an array, not a scalar variable.
    #[error("name `{0}` refers to an array")]
    NotAVariable(String),
    /// The named slot holds a scalar variable, not an array.
    #[error("name `{0}` does not refer to an array")]
    NotAnArray(String),
    /// Two operands of different types were combined.
    #[error("operand types {lhs} and {rhs} do not agree for `{op}`")]
    OperandMismatch {
        /// Operation tag that rejected the operands.
        op: &'static str,
        /// Type of the left operand.
        lhs: DataType,
        /// Type of the right operand.
        rhs: DataType,
    },
    /// The operand type is outside the set the operation accepts.
    #[error("type {found} is not accepted by `{op}`")]
    InvalidType {
        /// Operation tag that rejected the operand.
        op: &'static str,
        /// Offending operand type.
        found: DataType,
    },
    /// A value was stored into a cell of a different type.
    #[error("cannot store a {found} value into a {expected} cell")]
    TypeMismatch {
        /// Declared type of the destination.
        expected: DataType,
        /// Type of the stored value.
        found: DataType,
    },
    /// Operands of two distinct builders were combined.
    #[error("operands belong to different programs")]
    CrossProgramOperand,
    /// The literal does not fit the representable range of its target type.
    #[error("literal {0} is out of the representable range")]
    LiteralOutOfRange(i64),
    /// `finalize` was called while control-flow frames were still open.
    #[error("{0} control-flow frame(s) still open at finalize")]
    UnbalancedFrames(usize),
    /// Mutation was attempted after `finalize` sealed the program.
    #[error("program is sealed")]
    Sealed,
}

/// Inconsistencies detected in an emitted program document.
///
/// The builder cannot produce a document that fails these checks; they
/// exist for downstream tooling that manipulates documents directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An operation references a token without a symbol entry.
    #[error("token {0} is referenced but has no symbol entry")]
    MissingSymbol(TokenId),
    /// Token ids do not form a dense prefix starting at 0.
    #[error("token ids are not dense: {count} symbols, highest id {highest}")]
    SparseTokens {
        /// Number of symbol entries.
        count: usize,
        /// Highest token id present.
        highest: TokenId,
    },
    /// A label is used by more than one control construct.
    #[error("label {0} is used more than once")]
    DuplicateLabel(LabelId),
    /// Label ids do not form a dense prefix starting at 1.
    #[error("label ids are not dense: {count} labels, highest id {highest}")]
    SparseLabels {
        /// Number of distinct labels.
        count: usize,
        /// Highest label id present.
        highest: LabelId,
    },
    /// A constant slot is the result of more than one operation.
    #[error("constant slot {token} is assigned {assignments} times")]
    ConstantReassigned {
        /// Offending token id.
        token: TokenId,
        /// Number of operations writing it.
        assignments: usize,
    },
    /// A constant slot is never the result of any operation.
    #[error("constant slot {0} is never assigned")]
    ConstantUnassigned(TokenId),
}
