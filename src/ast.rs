use serde::Serialize;

use crate::context::Context;
use crate::errors::{Result, SourceLocation};
use crate::types::{result_type, CType};
use crate::{internal_error, type_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Assign,
    Eq,
    Lt,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Binding strength for precedence climbing, low to high.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Assign => 1,
            BinOp::Eq => 2,
            BinOp::Lt | BinOp::Gt => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div => 5,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        self == BinOp::Assign
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    AddressOf,
    Deref,
    PostInc,
    PostDec,
}

/// AST produced by the parser. Expression kinds carry their resolved type
/// (see [`Ast::ctype`]); statement kinds do not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Ast {
    IntLiteral(i64),
    CharLiteral(char),
    StringLiteral {
        value: String,
        label: String,
    },
    LocalVar {
        ctype: CType,
        name: String,
    },
    GlobalVar {
        ctype: CType,
        name: String,
        /// Storage label: the name itself for external globals, a
        /// generated label for file-local statics.
        label: String,
    },
    FuncCall {
        ctype: CType,
        name: String,
        args: Vec<Ast>,
    },
    FuncDef {
        rettype: CType,
        name: String,
        params: Vec<Ast>,
        locals: Vec<Ast>,
        body: Vec<Ast>,
    },
    Decl {
        var: Box<Ast>,
        init: Option<Box<Ast>>,
    },
    ArrayInit(Vec<Ast>),
    Unary {
        op: UnaryOp,
        ctype: CType,
        operand: Box<Ast>,
    },
    Binary {
        op: BinOp,
        ctype: CType,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    If {
        cond: Box<Ast>,
        then: Vec<Ast>,
        els: Option<Vec<Ast>>,
    },
    For {
        init: Option<Box<Ast>>,
        cond: Option<Box<Ast>>,
        step: Option<Box<Ast>>,
        body: Vec<Ast>,
    },
    Return(Box<Ast>),
}

impl Ast {
    /// The resolved type of an expression node; `None` for statement-only
    /// nodes (Decl, ArrayInit, If, For, Return, FuncDef).
    pub fn ctype(&self) -> Option<CType> {
        match self {
            Ast::IntLiteral(_) => Some(CType::Int),
            Ast::CharLiteral(_) => Some(CType::Char),
            Ast::StringLiteral { value, .. } => {
                Some(CType::array_of(CType::Char, Some(value.len() + 1)))
            }
            Ast::LocalVar { ctype, .. }
            | Ast::GlobalVar { ctype, .. }
            | Ast::FuncCall { ctype, .. }
            | Ast::Unary { ctype, .. }
            | Ast::Binary { ctype, .. } => Some(ctype.clone()),
            Ast::FuncDef { .. }
            | Ast::Decl { .. }
            | Ast::ArrayInit(_)
            | Ast::If { .. }
            | Ast::For { .. }
            | Ast::Return(_) => None,
        }
    }

    pub(crate) fn expr_ctype(&self) -> Result<CType> {
        self.ctype()
            .ok_or_else(|| internal_error!("expression expected, but got {}", self))
    }

    /// A node may appear on the left of `=`, under unary `&`, or under
    /// postfix `++`/`--` iff it is a variable reference or a dereference.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Ast::LocalVar { .. }
                | Ast::GlobalVar { .. }
                | Ast::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        )
    }

    pub fn ensure_lvalue(&self, loc: &SourceLocation) -> Result<()> {
        if self.is_lvalue() {
            return Ok(());
        }
        Err(type_error!(
            loc.clone(),
            "lvalue expected, but got {}",
            self
        ))
    }

    pub(crate) fn var_name(&self) -> Option<&str> {
        match self {
            Ast::LocalVar { name, .. } | Ast::GlobalVar { name, .. } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn set_ctype(&mut self, new: CType) {
        if let Ast::LocalVar { ctype, .. } | Ast::GlobalVar { ctype, .. } = self {
            *ctype = new;
        }
    }

    pub fn int(value: i64) -> Ast {
        Ast::IntLiteral(value)
    }

    pub fn char_literal(c: char) -> Ast {
        Ast::CharLiteral(c)
    }

    /// Builds a string literal typed `[len+1]char`, allocates its storage
    /// label and registers it in the compile-wide globals list.
    pub fn string(ctx: &mut Context, value: impl Into<String>) -> Ast {
        let node = Ast::StringLiteral {
            value: value.into(),
            label: ctx.next_label(),
        };
        ctx.add_global(node.clone());
        node
    }

    /// Builds a local variable reference and registers it with the open
    /// function body, if any (parameter declarators pass through before a
    /// body is open and are not registered).
    pub fn local_var(ctx: &mut Context, ctype: CType, name: impl Into<String>) -> Ast {
        let node = Ast::LocalVar {
            ctype,
            name: name.into(),
        };
        ctx.add_local(node.clone());
        node
    }

    pub fn global_var(
        ctx: &mut Context,
        ctype: CType,
        name: impl Into<String>,
        file_local: bool,
    ) -> Ast {
        let name = name.into();
        let label = if file_local {
            ctx.next_label()
        } else {
            name.clone()
        };
        let node = Ast::GlobalVar { ctype, name, label };
        ctx.add_global(node.clone());
        node
    }

    /// `ctype` is the caller-declared return type; the language has no
    /// declared-function table, so call sites must supply it.
    pub fn func_call(ctype: CType, name: impl Into<String>, args: Vec<Ast>) -> Ast {
        Ast::FuncCall {
            ctype,
            name: name.into(),
            args,
        }
    }

    pub fn func_def(
        rettype: CType,
        name: impl Into<String>,
        params: Vec<Ast>,
        locals: Vec<Ast>,
        body: Vec<Ast>,
    ) -> Ast {
        Ast::FuncDef {
            rettype,
            name: name.into(),
            params,
            locals,
            body,
        }
    }

    pub fn decl(var: Ast, init: Option<Ast>) -> Ast {
        Ast::Decl {
            var: Box::new(var),
            init: init.map(Box::new),
        }
    }

    pub fn array_init(elems: Vec<Ast>) -> Ast {
        Ast::ArrayInit(elems)
    }

    pub fn address_of(operand: Ast, loc: &SourceLocation) -> Result<Ast> {
        operand.ensure_lvalue(loc)?;
        let ctype = CType::pointer_to(operand.expr_ctype()?);
        Ok(Ast::Unary {
            op: UnaryOp::AddressOf,
            ctype,
            operand: Box::new(operand),
        })
    }

    pub fn deref(operand: Ast, loc: &SourceLocation) -> Result<Ast> {
        match operand.expr_ctype()?.decay() {
            CType::Pointer(inner) => Ok(Ast::Unary {
                op: UnaryOp::Deref,
                ctype: *inner,
                operand: Box::new(operand),
            }),
            other => Err(type_error!(
                loc.clone(),
                "pointer type expected, but got {}",
                other
            )),
        }
    }

    pub fn postfix(op: UnaryOp, operand: Ast, loc: &SourceLocation) -> Result<Ast> {
        debug_assert!(matches!(op, UnaryOp::PostInc | UnaryOp::PostDec));
        operand.ensure_lvalue(loc)?;
        let ctype = operand.expr_ctype()?;
        Ok(Ast::Unary {
            op,
            ctype,
            operand: Box::new(operand),
        })
    }

    /// Builds a binary node with its type computed from the original
    /// operand order. When the operator is not `=` and exactly the right
    /// operand decays to a pointer, the stored operands are swapped so the
    /// pointer side always comes first.
    pub fn binary(op: BinOp, left: Ast, right: Ast, loc: &SourceLocation) -> Result<Ast> {
        if op == BinOp::Assign {
            left.ensure_lvalue(loc)?;
        }
        let ltype = left.expr_ctype()?;
        let rtype = right.expr_ctype()?;
        let ctype = result_type(op, &ltype, &rtype, loc)?;
        let (left, right) =
            if op != BinOp::Assign && !ltype.decay().is_pointer() && rtype.decay().is_pointer() {
                (right, left)
            } else {
                (left, right)
            };
        Ok(Ast::Binary {
            op,
            ctype,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn if_stmt(cond: Ast, then: Vec<Ast>, els: Option<Vec<Ast>>) -> Ast {
        Ast::If {
            cond: Box::new(cond),
            then,
            els,
        }
    }

    pub fn for_stmt(init: Option<Ast>, cond: Option<Ast>, step: Option<Ast>, body: Vec<Ast>) -> Ast {
        Ast::For {
            init: init.map(Box::new),
            cond: cond.map(Box::new),
            step: step.map(Box::new),
            body,
        }
    }

    pub fn ret(value: Ast) -> Ast {
        Ast::Return(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::unknown()
    }

    fn int_var(name: &str) -> Ast {
        Ast::LocalVar {
            ctype: CType::Int,
            name: name.to_string(),
        }
    }

    fn ptr_var(name: &str) -> Ast {
        Ast::LocalVar {
            ctype: CType::pointer_to(CType::Int),
            name: name.to_string(),
        }
    }

    #[test]
    fn literals_carry_their_natural_type() {
        assert_eq!(Ast::int(42).ctype(), Some(CType::Int));
        assert_eq!(Ast::char_literal('a').ctype(), Some(CType::Char));
    }

    #[test]
    fn string_registers_a_labeled_global() {
        let mut ctx = Context::new();
        let s = Ast::string(&mut ctx, "abc");
        assert_eq!(
            s.ctype(),
            Some(CType::array_of(CType::Char, Some(4)))
        );
        match &s {
            Ast::StringLiteral { label, .. } => assert_eq!(label, ".L0"),
            other => panic!("expected string literal, got {:?}", other),
        }
        assert_eq!(ctx.globals(), [s].as_slice());
    }

    #[test]
    fn file_local_globals_get_generated_labels() {
        let mut ctx = Context::new();
        let ext = Ast::global_var(&mut ctx, CType::Int, "x", false);
        let stat = Ast::global_var(&mut ctx, CType::Int, "y", true);
        match &ext {
            Ast::GlobalVar { label, .. } => assert_eq!(label, "x"),
            other => panic!("expected global, got {:?}", other),
        }
        match &stat {
            Ast::GlobalVar { label, .. } => assert_eq!(label, ".L0"),
            other => panic!("expected global, got {:?}", other),
        }
        assert_eq!(ctx.globals().len(), 2);
    }

    // Pins the swap invariant: a mixed pointer/non-pointer operand pair
    // under a non-assignment operator stores the pointer side first.
    #[test]
    fn mixed_operands_store_the_pointer_first() {
        let node = Ast::binary(BinOp::Add, Ast::int(1), ptr_var("p"), &loc()).unwrap();
        match node {
            Ast::Binary {
                op, ctype, left, ..
            } => {
                assert_eq!(op, BinOp::Add);
                assert_eq!(ctype, CType::pointer_to(CType::Int));
                assert_eq!(*left, ptr_var("p"));
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn pointer_left_operand_is_not_swapped() {
        let node = Ast::binary(BinOp::Add, ptr_var("p"), Ast::int(1), &loc()).unwrap();
        match node {
            Ast::Binary { left, right, .. } => {
                assert_eq!(*left, ptr_var("p"));
                assert_eq!(*right, Ast::int(1));
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn assignment_never_swaps() {
        let node = Ast::binary(BinOp::Assign, int_var("x"), ptr_var("p"), &loc()).unwrap();
        match node {
            Ast::Binary { left, ctype, .. } => {
                assert_eq!(*left, int_var("x"));
                // The smaller-ranked operand's type, i.e. the left side here.
                assert_eq!(ctype, CType::Int);
            }
            other => panic!("expected binary node, got {:?}", other),
        }
    }

    #[test]
    fn assignment_to_non_lvalue_is_rejected() {
        let err = Ast::binary(BinOp::Assign, Ast::int(1), int_var("x"), &loc()).unwrap_err();
        assert!(err.to_string().contains("lvalue expected"));
    }

    #[test]
    fn address_of_requires_an_lvalue() {
        assert!(Ast::address_of(Ast::int(1), &loc()).is_err());
        let node = Ast::address_of(int_var("x"), &loc()).unwrap();
        assert_eq!(node.ctype(), Some(CType::pointer_to(CType::Int)));
    }

    #[test]
    fn postfix_requires_an_lvalue() {
        assert!(Ast::postfix(UnaryOp::PostInc, Ast::int(1), &loc()).is_err());
        let node = Ast::postfix(UnaryOp::PostDec, int_var("x"), &loc()).unwrap();
        assert_eq!(node.ctype(), Some(CType::Int));
        assert!(!node.is_lvalue());
    }

    #[test]
    fn deref_requires_a_pointer_and_is_an_lvalue() {
        let err = Ast::deref(int_var("x"), &loc()).unwrap_err();
        assert!(err.to_string().contains("pointer type expected"));

        let node = Ast::deref(ptr_var("p"), &loc()).unwrap();
        assert_eq!(node.ctype(), Some(CType::Int));
        assert!(node.is_lvalue());
    }

    #[test]
    fn deref_through_an_array_yields_the_element_type() {
        let arr = Ast::LocalVar {
            ctype: CType::array_of(CType::Char, Some(3)),
            name: "a".to_string(),
        };
        let node = Ast::deref(arr, &loc()).unwrap();
        assert_eq!(node.ctype(), Some(CType::Char));
    }

    #[test]
    fn statement_nodes_have_no_type() {
        let decl = Ast::decl(int_var("x"), None);
        assert_eq!(decl.ctype(), None);
        let ret = Ast::ret(Ast::int(0));
        assert_eq!(ret.ctype(), None);
        let func = Ast::func_def(CType::Int, "f", vec![], vec![], vec![]);
        assert_eq!(func.ctype(), None);
    }
}
