use serde::Serialize;

use crate::ast::BinOp;
use crate::errors::{Result, SourceLocation};
use crate::type_error;

/// The language's type tree. Pointer and array nesting is unbounded; a
/// type is owned by the node or declaration that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CType {
    Void,
    Int,
    Char,
    /// `size: None` means the size is pending initializer-driven
    /// inference; once backfilled it is never changed again.
    Array { elem: Box<CType>, size: Option<usize> },
    Pointer(Box<CType>),
}

impl CType {
    pub fn pointer_to(inner: CType) -> CType {
        CType::Pointer(Box::new(inner))
    }

    pub fn array_of(elem: CType, size: Option<usize>) -> CType {
        CType::Array {
            elem: Box::new(elem),
            size,
        }
    }

    /// Total order over the variant tags, used only to pick a canonical
    /// "larger" operand when combining two types for an operator.
    pub fn rank(&self) -> u8 {
        match self {
            CType::Void => 0,
            CType::Int => 1,
            CType::Char => 2,
            CType::Array { .. } => 3,
            CType::Pointer(_) => 4,
        }
    }

    /// Array-to-pointer decay: `[n]T` becomes `*T`, everything else is
    /// unchanged.
    pub fn decay(&self) -> CType {
        match self {
            CType::Array { elem, .. } => CType::Pointer(elem.clone()),
            other => other.clone(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CType::Array { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    /// True if any array dimension in the type is still unsized.
    pub fn has_unknown_size(&self) -> bool {
        match self {
            CType::Array { elem, size } => size.is_none() || elem.has_unknown_size(),
            _ => false,
        }
    }
}

/// Computes the result type of `op` applied to operands of types `a` and
/// `b`, or fails with an incompatible-operands error naming the pre-decay
/// types.
pub fn result_type(op: BinOp, a: &CType, b: &CType, loc: &SourceLocation) -> Result<CType> {
    combine_ranked(op, &a.decay(), &b.decay()).ok_or_else(|| {
        type_error!(
            loc.clone(),
            "incompatible operands: {}: <{}> and <{}>",
            op,
            a,
            b
        )
    })
}

fn combine_ranked(op: BinOp, a: &CType, b: &CType) -> Option<CType> {
    let (a, b) = if a.rank() > b.rank() { (b, a) } else { (a, b) };

    if b.is_pointer() {
        // Assignment reports the smaller-ranked operand's type.
        if op == BinOp::Assign {
            return Some(a.clone());
        }
        if op != BinOp::Add && op != BinOp::Sub {
            return None;
        }
        if *a != CType::Int {
            return None;
        }
        return Some(b.clone());
    }

    match a {
        CType::Void => None,
        CType::Int | CType::Char => match b {
            CType::Int | CType::Char => Some(CType::Int),
            // Operands arrive decayed; the Array arm keeps the table
            // total if a call site ever skips decay.
            CType::Array { .. } | CType::Pointer(_) => Some(b.clone()),
            CType::Void => None,
        },
        CType::Array { .. } => None,
        CType::Pointer(_) => None,
    }
}
