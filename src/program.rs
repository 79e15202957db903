//! Serialized program document and operation records

use crate::error::ValidationError;
use crate::symbol::{LabelId, StorageEntry, Symbol, TokenId};
use crate::types::DataType;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Literal payload of a `Constant` record, tagged by its type.
pub enum Literal {
    /// Signed 32-bit integer literal.
    I32(i32),
    /// Unsigned 32-bit integer literal.
    U32(u32),
    /// Single precision float literal.
    F32(f32),
    /// Boolean literal.
    Bool(bool),
}

impl Literal {
    /// Data type the literal materializes as.
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::I32(_) => DataType::I32,
            Self::U32(_) => DataType::U32,
            Self::F32(_) => DataType::F32,
            Self::Bool(_) => DataType::Bool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Single operation record of the program body.
///
/// The serialized form is a single-key object whose key is the variant
/// name and whose value is the positional argument list, e.g.
/// `{"Add": [2, 0, 1]}`, which is exactly what executors consume. Expression
/// records carry their result slot first; control-flow records carry the
/// nested operation lists of their bodies.
pub enum Op {
    /// `[result, lhs, rhs]`: numeric addition.
    Add(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: numeric subtraction.
    Sub(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: numeric multiplication.
    Mul(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: division; rounding is the executor's call.
    Div(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: remainder, sign of the dividend.
    Rem(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: left shift on integer types.
    Shl(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: right shift on integer types.
    Shr(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: bitwise or logical conjunction.
    BitAnd(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: bitwise or logical disjunction.
    BitOr(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: bitwise or logical exclusive or.
    BitXor(TokenId, TokenId, TokenId),
    /// `[result, operand]`: bitwise complement, logical not on `Bool`.
    Not(TokenId, TokenId),
    /// `[result, operand]`: numeric negation.
    Neg(TokenId, TokenId),
    /// `[result, lhs, rhs]`: equality, `Bool` result.
    Eq(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: inequality, `Bool` result.
    Ne(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: strictly less, `Bool` result.
    Lt(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: less or equal, `Bool` result.
    Le(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: strictly greater, `Bool` result.
    Gt(TokenId, TokenId, TokenId),
    /// `[result, lhs, rhs]`: greater or equal, `Bool` result.
    Ge(TokenId, TokenId, TokenId),
    /// `[result, {tag: value}]`: materialized literal.
    Constant(TokenId, Literal),
    /// `[result, variable]`: read a variable into a fresh slot.
    Load(TokenId, TokenId),
    /// `[variable, value]`: write a slot into a variable.
    Store(TokenId, TokenId),
    /// `[array, size, element tag, max size, shared]`: array declaration
    /// with its runtime length slot.
    ArrayNew(TokenId, TokenId, DataType, u32, bool),
    /// `[array, index, value]`: indexed write.
    ArrayStore(TokenId, TokenId, TokenId),
    /// `[result, array, index]`: indexed read into a fresh slot.
    ArrayLoad(TokenId, TokenId, TokenId),
    /// `[result, array]`: runtime length as a `U32` slot.
    ArrayLen(TokenId, TokenId),
    /// `[result]`: index of the executing worker. The one-element
    /// argument list is kept on the wire like every other record.
    WorkerId((TokenId,)),
    /// `[result]`: total number of workers.
    NumWorkers((TokenId,)),
    /// `[result, operand]`: reinterpreting conversion from `U32`.
    #[serde(rename = "I32fromU32")]
    I32FromU32(TokenId, TokenId),
    /// `[result, operand]`: truncating conversion from `F32`.
    #[serde(rename = "I32fromF32")]
    I32FromF32(TokenId, TokenId),
    /// `[result, operand]`: reinterpreting conversion from `I32`.
    #[serde(rename = "U32fromI32")]
    U32FromI32(TokenId, TokenId),
    /// `[result, operand]`: truncating conversion from `F32`.
    #[serde(rename = "U32fromF32")]
    U32FromF32(TokenId, TokenId),
    /// `[result, operand]`: widening conversion from `I32`.
    #[serde(rename = "F32fromI32")]
    F32FromI32(TokenId, TokenId),
    /// `[result, operand]`: widening conversion from `U32`.
    #[serde(rename = "F32fromU32")]
    F32FromU32(TokenId, TokenId),
    /// `[cond ops, cond slot, label, then ops, label]`.
    If(Vec<Op>, TokenId, LabelId, Vec<Op>, LabelId),
    /// `[cond ops, cond slot, label, then ops, label, else ops, label]`.
    IfElse(
        Vec<Op>,
        TokenId,
        LabelId,
        Vec<Op>,
        LabelId,
        Vec<Op>,
        LabelId,
    ),
    /// `[head label, cond ops, cond slot, label, body ops, exit label]`.
    While(LabelId, Vec<Op>, TokenId, LabelId, Vec<Op>, LabelId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Finalized, self-describing program document.
///
/// This is the contract with the downstream executor: four directories
/// plus the ordered root operation list.
pub struct Program {
    symbol: BTreeMap<TokenId, Symbol>,
    storage: BTreeMap<TokenId, StorageEntry>,
    input: BTreeMap<String, TokenId>,
    output: BTreeMap<String, TokenId>,
    operation: Vec<Op>,
}

impl Program {
    pub(crate) const fn new(
        symbol: BTreeMap<TokenId, Symbol>,
        storage: BTreeMap<TokenId, StorageEntry>,
        input: BTreeMap<String, TokenId>,
        output: BTreeMap<String, TokenId>,
        operation: Vec<Op>,
    ) -> Self {
        Self {
            symbol,
            storage,
            input,
            output,
            operation,
        }
    }

    /// Kind and type directory, keyed by token id.
    pub const fn symbols(&self) -> &BTreeMap<TokenId, Symbol> {
        &self.symbol
    }

    /// Layout directory of variables and arrays.
    pub const fn storage(&self) -> &BTreeMap<TokenId, StorageEntry> {
        &self.storage
    }

    /// Host-visible input bindings.
    pub const fn inputs(&self) -> &BTreeMap<String, TokenId> {
        &self.input
    }

    /// Host-visible output bindings.
    pub const fn outputs(&self) -> &BTreeMap<String, TokenId> {
        &self.output
    }

    /// Ordered root operation list.
    pub fn operations(&self) -> &[Op] {
        self.operation.as_slice()
    }

    /// Serialize the document to its JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Check the internal consistency of the document: every referenced
    /// token has a symbol entry, token and label ids are dense, labels are
    /// unique and every constant slot is assigned exactly once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut referenced = Vec::new();
        let mut assigned = Vec::new();
        let mut labels = Vec::new();
        collect(&self.operation, &mut referenced, &mut assigned, &mut labels);

        for &tid in referenced.iter().chain(assigned.iter()) {
            if !self.symbol.contains_key(&tid) {
                return Err(ValidationError::MissingSymbol(tid));
            }
        }

        if let Some((&highest, _)) = self.symbol.iter().next_back() {
            if highest as usize + 1 != self.symbol.len() {
                return Err(ValidationError::SparseTokens {
                    count: self.symbol.len(),
                    highest,
                });
            }
        }

        if let Some(&label) = labels.iter().duplicates().next() {
            return Err(ValidationError::DuplicateLabel(label));
        }
        if let Some(&highest) = labels.iter().max() {
            if highest as usize != labels.len() {
                return Err(ValidationError::SparseLabels {
                    count: labels.len(),
                    highest,
                });
            }
        }

        for (token, assignments) in assigned.iter().copied().counts() {
            if assignments > 1 {
                return Err(ValidationError::ConstantReassigned { token, assignments });
            }
        }
        let assigned: HashSet<TokenId> = assigned.into_iter().collect();
        for (&tid, symbol) in &self.symbol {
            if symbol.is_constant() && !assigned.contains(&tid) {
                return Err(ValidationError::ConstantUnassigned(tid));
            }
        }

        Ok(())
    }
}

/// Walk an operation tree, collecting referenced tokens, assigned result
/// slots and control-flow labels.
fn collect(
    ops: &[Op],
    referenced: &mut Vec<TokenId>,
    assigned: &mut Vec<TokenId>,
    labels: &mut Vec<LabelId>,
) {
    for op in ops {
        match op {
            Op::Add(result, lhs, rhs)
            | Op::Sub(result, lhs, rhs)
            | Op::Mul(result, lhs, rhs)
            | Op::Div(result, lhs, rhs)
            | Op::Rem(result, lhs, rhs)
            | Op::Shl(result, lhs, rhs)
            | Op::Shr(result, lhs, rhs)
            | Op::BitAnd(result, lhs, rhs)
            | Op::BitOr(result, lhs, rhs)
            | Op::BitXor(result, lhs, rhs)
            | Op::Eq(result, lhs, rhs)
            | Op::Ne(result, lhs, rhs)
            | Op::Lt(result, lhs, rhs)
            | Op::Le(result, lhs, rhs)
            | Op::Gt(result, lhs, rhs)
            | Op::Ge(result, lhs, rhs) => {
                assigned.push(*result);
                referenced.extend([*lhs, *rhs]);
            }
            Op::Not(result, operand)
            | Op::Neg(result, operand)
            | Op::Load(result, operand)
            | Op::ArrayLen(result, operand)
            | Op::I32FromU32(result, operand)
            | Op::I32FromF32(result, operand)
            | Op::U32FromI32(result, operand)
            | Op::U32FromF32(result, operand)
            | Op::F32FromI32(result, operand)
            | Op::F32FromU32(result, operand) => {
                assigned.push(*result);
                referenced.push(*operand);
            }
            Op::Constant(result, _) => assigned.push(*result),
            Op::Store(variable, value) => referenced.extend([*variable, *value]),
            Op::ArrayNew(array, size, _, _, _) => referenced.extend([*array, *size]),
            Op::ArrayStore(array, index, value) => referenced.extend([*array, *index, *value]),
            Op::ArrayLoad(result, array, index) => {
                assigned.push(*result);
                referenced.extend([*array, *index]);
            }
            Op::WorkerId((result,)) | Op::NumWorkers((result,)) => assigned.push(*result),
            Op::If(cond, slot, cond_end, then, then_end) => {
                referenced.push(*slot);
                labels.extend([*cond_end, *then_end]);
                collect(cond, referenced, assigned, labels);
                collect(then, referenced, assigned, labels);
            }
            Op::IfElse(cond, slot, cond_end, then, then_end, otherwise, else_end) => {
                referenced.push(*slot);
                labels.extend([*cond_end, *then_end, *else_end]);
                collect(cond, referenced, assigned, labels);
                collect(then, referenced, assigned, labels);
                collect(otherwise, referenced, assigned, labels);
            }
            Op::While(head, cond, slot, cond_end, body, exit) => {
                referenced.push(*slot);
                labels.extend([*head, *cond_end, *exit]);
                collect(cond, referenced, assigned, labels);
                collect(body, referenced, assigned, labels);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_symbol(tid: TokenId) -> (TokenId, Symbol) {
        (tid, Symbol::Constant(DataType::U32))
    }

    #[test]
    fn validate_rejects_missing_symbols() {
        let program = Program::new(
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            vec![Op::Constant(0, Literal::U32(7))],
        );
        assert_eq!(program.validate(), Err(ValidationError::MissingSymbol(0)));
    }

    #[test]
    fn validate_rejects_sparse_tokens() {
        let program = Program::new(
            [constant_symbol(0), constant_symbol(2)].into_iter().collect(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            vec![
                Op::Constant(0, Literal::U32(7)),
                Op::Constant(2, Literal::U32(9)),
            ],
        );
        assert_eq!(
            program.validate(),
            Err(ValidationError::SparseTokens {
                count: 2,
                highest: 2
            })
        );
    }

    #[test]
    fn validate_rejects_double_assignment() {
        let program = Program::new(
            [constant_symbol(0)].into_iter().collect(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            vec![
                Op::Constant(0, Literal::U32(7)),
                Op::Constant(0, Literal::U32(9)),
            ],
        );
        assert_eq!(
            program.validate(),
            Err(ValidationError::ConstantReassigned {
                token: 0,
                assignments: 2
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_labels() {
        let mut symbol = BTreeMap::new();
        symbol.insert(0, Symbol::Constant(DataType::Bool));
        let cond = vec![Op::Constant(0, Literal::Bool(true))];
        let program = Program::new(
            symbol,
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            vec![Op::If(cond, 0, 1, vec![], 1)],
        );
        assert_eq!(program.validate(), Err(ValidationError::DuplicateLabel(1)));
    }
}
