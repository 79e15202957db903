//! Primitive data types and I/O classes of the program IR

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, strum::Display)]
/// Primitive type of a slot, variable or array element.
///
/// The variant names are the stable tags used by the serialized document.
pub enum DataType {
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// IEEE-754 single precision float.
    F32,
    /// Boolean.
    Bool,
}

impl DataType {
    /// Return `true` if the type is accepted by arithmetic, negation and
    /// ordering operations.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::I32 | Self::U32 | Self::F32)
    }

    /// Return `true` if the type is accepted by shift operations.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::I32 | Self::U32)
    }

    /// Return `true` if the type is accepted by `BitAnd`/`BitOr`/`BitXor`
    /// and `Not`.
    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::I32 | Self::U32 | Self::Bool)
    }

    /// Return `true` if the type is accepted by `Eq`/`Ne`; every type
    /// compares for equality.
    pub const fn is_comparable(self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
/// Visibility class of a declared variable or array.
pub enum IoType {
    /// Bound by the host before execution.
    Input,
    /// Read back by the host after execution.
    Output,
    /// Internal to the program, never bound by name.
    Private,
}

impl IoType {
    /// Return `true` if the declaration is visible to the host.
    pub const fn is_shared(self) -> bool {
        !matches!(self, Self::Private)
    }
}
