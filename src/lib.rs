//! Host-embedded builder for data-parallel compute programs.
//!
//! A [`builder::ProgramBuilder`] assembles a single kernel-like body as
//! typed IR; [`ProgramBuilder::finalize`](builder::ProgramBuilder::finalize)
//! emits it as a self-describing JSON document for a downstream executor.

// `Array::len` records a length query; emptiness is a runtime property
// the builder can't answer.
#![allow(clippy::len_without_is_empty)]

pub mod array;
pub mod builder;
pub mod context;
pub mod error;
pub mod program;
pub mod symbol;
pub mod types;
pub mod value;

pub mod prelude {
    //! Re-exports of the user-facing surface.

    pub use crate::array::Array;
    pub use crate::builder::ProgramBuilder;
    pub use crate::context::Context;
    pub use crate::error::{BuilderError, ValidationError};
    pub use crate::program::{Literal, Op, Program};
    pub use crate::symbol::{LabelId, StorageEntry, Symbol, SymbolTable, TokenId};
    pub use crate::types::{DataType, IoType};
    pub use crate::value::{Operand, Value};
}
