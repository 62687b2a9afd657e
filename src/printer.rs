//! Canonical textual rendering of types and AST nodes, used by tests and
//! the driver's debug output. The format is deterministic: a binary node
//! renders as `(<op> <left> <right>)`, a block as `{<stmt>;<stmt>;}`, a
//! declaration as `(decl <type> <name> <init>?)`.

use std::fmt;

use crate::ast::{Ast, BinOp, UnaryOp};
use crate::types::CType;

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => f.write_str("void"),
            CType::Int => f.write_str("int"),
            CType::Char => f.write_str("char"),
            CType::Pointer(inner) => write!(f, "*{}", inner),
            CType::Array {
                elem,
                size: Some(size),
            } => write!(f, "[{}]{}", size, elem),
            CType::Array { elem, size: None } => write!(f, "[]{}", elem),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Assign => "=",
            BinOp::Eq => "==",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };
        f.write_str(s)
    }
}

fn fmt_block(f: &mut fmt::Formatter<'_>, stmts: &[Ast]) -> fmt::Result {
    f.write_str("{")?;
    for stmt in stmts {
        write!(f, "{};", stmt)?;
    }
    f.write_str("}")
}

fn fmt_opt(f: &mut fmt::Formatter<'_>, node: &Option<Box<Ast>>) -> fmt::Result {
    match node {
        Some(node) => write!(f, "{}", node),
        None => f.write_str("(null)"),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::IntLiteral(value) => write!(f, "{}", value),
            Ast::CharLiteral(c) => write!(f, "'{}'", c),
            Ast::StringLiteral { value, .. } => write!(f, "\"{}\"", quote(value)),
            Ast::LocalVar { name, .. } => f.write_str(name),
            Ast::GlobalVar { name, .. } => f.write_str(name),
            Ast::FuncCall { ctype, name, args } => {
                write!(f, "({}){}(", ctype, name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Ast::FuncDef {
                rettype,
                name,
                params,
                body,
                ..
            } => {
                write!(f, "({}){}(", rettype, name)?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match param.ctype() {
                        Some(ctype) => write!(f, "{} {}", ctype, param)?,
                        None => write!(f, "{}", param)?,
                    }
                }
                f.write_str(")")?;
                fmt_block(f, body)
            }
            Ast::Decl { var, init } => {
                f.write_str("(decl")?;
                if let Some(ctype) = var.ctype() {
                    write!(f, " {}", ctype)?;
                }
                write!(f, " {}", var)?;
                if let Some(init) = init {
                    write!(f, " {}", init)?;
                }
                f.write_str(")")
            }
            Ast::ArrayInit(elems) => {
                f.write_str("{")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", elem)?;
                }
                f.write_str("}")
            }
            Ast::Unary { op, operand, .. } => match op {
                UnaryOp::AddressOf => write!(f, "(& {})", operand),
                UnaryOp::Deref => write!(f, "(* {})", operand),
                UnaryOp::PostInc => write!(f, "({} ++)", operand),
                UnaryOp::PostDec => write!(f, "({} --)", operand),
            },
            Ast::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", op, left, right),
            Ast::If { cond, then, els } => {
                write!(f, "(if {} ", cond)?;
                fmt_block(f, then)?;
                if let Some(els) = els {
                    f.write_str(" ")?;
                    fmt_block(f, els)?;
                }
                f.write_str(")")
            }
            Ast::For {
                init,
                cond,
                step,
                body,
            } => {
                f.write_str("(for ")?;
                fmt_opt(f, init)?;
                f.write_str(" ")?;
                fmt_opt(f, cond)?;
                f.write_str(" ")?;
                fmt_opt(f, step)?;
                f.write_str(" ")?;
                fmt_block(f, body)?;
                f.write_str(")")
            }
            Ast::Return(value) => write!(f, "(return {})", value),
        }
    }
}
