//! Token and label allocation, symbol and storage directories

use crate::error::BuilderError;
use crate::types::{DataType, IoType};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

/// Identifier of a constant slot, variable or array within one program.
///
/// Ids are dense, start at 0 and are never reused.
pub type TokenId = u32;

/// Identifier of a control-flow point within one program.
///
/// Labels live in their own namespace, dense and starting at 1.
pub type LabelId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Kind and type of a token, as recorded in the `symbol` directory.
pub enum Symbol {
    /// Single-assignment slot produced by an expression.
    Constant(DataType),
    /// Mutable scalar cell accessed through `Load`/`Store`.
    Variable(DataType),
    /// Mutable indexed collection.
    Array(DataType),
}

impl Symbol {
    /// Data type carried by the token.
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Constant(ty) | Self::Variable(ty) | Self::Array(ty) => *ty,
        }
    }

    /// Return `true` for single-assignment slots.
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Layout of a variable or array in the `storage` directory.
///
/// Constant slots never appear in storage.
pub enum StorageEntry {
    /// Scalar cell.
    Variable(DataType),
    /// Array internal to the program, with its maximum length.
    PrivateArray(DataType, u32),
    /// Array visible to the host as input or output, with its maximum
    /// length.
    SharedArray(DataType, u32),
}

#[derive(Debug, Default, Clone)]
/// Per-program symbol bookkeeping: id counters plus the `symbol`,
/// `storage`, `input` and `output` directories of the document.
///
/// The directories are ordered maps so a program serializes
/// deterministically.
pub struct SymbolTable {
    token_id: TokenId,
    label_id: LabelId,
    symbol: BTreeMap<TokenId, Symbol>,
    storage: BTreeMap<TokenId, StorageEntry>,
    input: BTreeMap<String, TokenId>,
    output: BTreeMap<String, TokenId>,
}

impl SymbolTable {
    fn next_token(&mut self) -> TokenId {
        let tid = self.token_id;
        self.token_id += 1;
        tid
    }

    /// Allocate a fresh label id.
    pub fn next_label(&mut self) -> LabelId {
        self.label_id += 1;
        self.label_id
    }

    /// Allocate a token and record it as a constant slot.
    pub fn declare_constant(&mut self, ty: DataType) -> TokenId {
        let tid = self.next_token();
        self.symbol.insert(tid, Symbol::Constant(ty));
        tid
    }

    /// Allocate a token and record it as a mutable variable.
    pub fn declare_variable(&mut self, ty: DataType) -> TokenId {
        let tid = self.next_token();
        self.symbol.insert(tid, Symbol::Variable(ty));
        tid
    }

    /// Allocate a token and record it as an array.
    pub fn declare_array(&mut self, ty: DataType) -> TokenId {
        let tid = self.next_token();
        self.symbol.insert(tid, Symbol::Array(ty));
        tid
    }

    /// Record the storage layout of a variable or array token.
    pub fn put_storage(&mut self, tid: TokenId, entry: StorageEntry) {
        self.storage.insert(tid, entry);
    }

    /// Bind `name` to `tid` in the input or output directory.
    ///
    /// Private declarations are never bound. Names are unique across both
    /// directories.
    pub fn bind_io(&mut self, name: &str, tid: TokenId, io: IoType) -> Result<(), BuilderError> {
        if self.is_io_bound(name) {
            return Err(BuilderError::NameConflict(name.to_string()));
        }
        match io {
            IoType::Input => {
                self.input.insert(name.to_string(), tid);
            }
            IoType::Output => {
                self.output.insert(name.to_string(), tid);
            }
            IoType::Private => {}
        }
        Ok(())
    }

    /// Return `true` if `name` is present in either I/O directory.
    pub fn is_io_bound(&self, name: &str) -> bool {
        self.input.contains_key(name) || self.output.contains_key(name)
    }

    /// Kind and type of a token, if allocated.
    pub fn symbol(&self, tid: TokenId) -> Option<&Symbol> {
        self.symbol.get(&tid)
    }

    /// Number of tokens allocated so far.
    pub const fn token_count(&self) -> u32 {
        self.token_id
    }

    /// Number of labels allocated so far.
    pub const fn label_count(&self) -> u32 {
        self.label_id
    }

    /// Decompose into the four document directories.
    #[allow(clippy::type_complexity)]
    pub(crate) fn into_directories(
        self,
    ) -> (
        BTreeMap<TokenId, Symbol>,
        BTreeMap<TokenId, StorageEntry>,
        BTreeMap<String, TokenId>,
        BTreeMap<String, TokenId>,
    ) {
        (self.symbol, self.storage, self.input, self.output)
    }
}
