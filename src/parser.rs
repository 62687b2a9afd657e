use log::debug;
use serde::Serialize;

use crate::ast::{Ast, BinOp, UnaryOp};
use crate::context::Context;
use crate::errors::{Result, SourceLocation};
use crate::lexer::{describe, Lexer, Punct, Token};
use crate::types::{result_type, CType};
use crate::{syntax_error, type_error};

/// Upper bound on call arguments.
pub const MAX_ARGS: usize = 6;

/// A parsed translation unit: the function definitions in source order,
/// plus the compile-wide globals list (string literals and file-local
/// statics) that code generation consumes alongside them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub functions: Vec<Ast>,
    pub globals: Vec<Ast>,
}

/// Parses a complete translation unit.
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source).parse_program()
}

/// Recursive-descent parser with precedence climbing for expressions.
/// Static semantics (lvalue rules, operand typing, array decay) are
/// resolved during the parse; there is no separate checking pass.
pub struct Parser<'a> {
    tokens: Lexer<'a>,
    ctx: Context,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            tokens: Lexer::new(source),
            ctx: Context::new(),
        }
    }

    pub fn with_file(source: &'a str, file: impl Into<String>) -> Self {
        Self {
            tokens: Lexer::with_file(source, file),
            ctx: Context::new(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut functions = Vec::new();
        while let Some(func) = self.read_func_def()? {
            functions.push(func);
        }
        Ok(Program {
            functions,
            globals: self.ctx.take_globals(),
        })
    }

    fn loc(&self) -> SourceLocation {
        self.tokens.location()
    }

    fn next(&mut self) -> Result<Option<Token>> {
        self.tokens.read()
    }

    fn expect(&mut self, p: Punct) -> Result<()> {
        let tok = self.next()?;
        match tok {
            Some(ref tok) if tok.is_punct(p) => Ok(()),
            other => Err(syntax_error!(
                self.loc(),
                "'{}' expected but got {}",
                p,
                describe(other.as_ref())
            )),
        }
    }

    /// Consumes the next token if it is `p`.
    fn next_is(&mut self, p: Punct) -> Result<bool> {
        match self.next()? {
            Some(tok) if tok.is_punct(p) => Ok(true),
            Some(tok) => {
                self.tokens.unget(tok);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn peek_is(&mut self, p: Punct) -> Result<bool> {
        Ok(matches!(self.tokens.peek()?, Some(tok) if tok.is_punct(p)))
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.next()? {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(syntax_error!(
                self.loc(),
                "{} expected, but got {}",
                what,
                describe(other.as_ref())
            )),
        }
    }

    // ----- toplevel ------------------------------------------------------

    fn read_func_def(&mut self) -> Result<Option<Ast>> {
        if self.tokens.peek()?.is_none() {
            return Ok(None);
        }
        let rettype = self.read_decl_spec()?;
        let name = self.expect_ident("Function name")?;
        self.expect(Punct::LParen)?;
        let params = self.read_params()?;
        self.expect(Punct::LBrace)?;
        self.ctx.begin_function(params);
        let body = self.read_block()?;
        let (params, locals) = self.ctx.end_function();
        debug!("parsed function `{}` ({} statements)", name, body.len());
        Ok(Some(Ast::func_def(rettype, name, params, locals, body)))
    }

    fn read_params(&mut self) -> Result<Vec<Ast>> {
        let mut params = Vec::new();
        if self.next_is(Punct::RParen)? {
            return Ok(params);
        }
        loop {
            let spec = self.read_decl_spec()?;
            let name = self.expect_ident("Identifier")?;
            let mut ctype = self.read_array_dimensions(spec)?;
            // Parameters are never true arrays.
            if ctype.is_array() {
                ctype = ctype.decay();
            }
            params.push(Ast::local_var(&mut self.ctx, ctype, name));
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::RParen) => return Ok(params),
                Some(tok) if tok.is_punct(Punct::Comma) => {}
                other => {
                    return Err(syntax_error!(
                        self.loc(),
                        "Comma expected, but got {}",
                        describe(other.as_ref())
                    ))
                }
            }
        }
    }

    // ----- statements and blocks -----------------------------------------

    fn read_block(&mut self) -> Result<Vec<Ast>> {
        let mut stmts = Vec::new();
        loop {
            // A bare `;` ends the block without adding a node; the closing
            // brace is still consumed as the block terminator.
            if self.next_is(Punct::Semicolon)? {
                self.next_is(Punct::RBrace)?;
                break;
            }
            let stmt = match self.read_decl_or_stmt()? {
                Some(stmt) => stmt,
                None => break,
            };
            stmts.push(stmt);
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::RBrace) => break,
                Some(tok) => self.tokens.unget(tok),
                None => break,
            }
        }
        Ok(stmts)
    }

    fn read_decl_or_stmt(&mut self) -> Result<Option<Ast>> {
        let tok = match self.tokens.peek()? {
            Some(tok) => tok,
            None => return Ok(None),
        };
        if ctype_for(&tok).is_some() {
            self.read_decl().map(Some)
        } else {
            self.read_stmt().map(Some)
        }
    }

    fn read_stmt(&mut self) -> Result<Ast> {
        let tok = match self.next()? {
            Some(tok) => tok,
            None => return Err(syntax_error!(self.loc(), "unexpected end of input")),
        };
        if tok.is_ident("if") {
            return self.read_if_stmt();
        }
        if tok.is_ident("for") {
            return self.read_for_stmt();
        }
        if tok.is_ident("return") {
            return self.read_return_stmt();
        }
        self.tokens.unget(tok);
        let expr = self.read_expr(0)?;
        self.expect(Punct::Semicolon)?;
        Ok(expr)
    }

    fn read_if_stmt(&mut self) -> Result<Ast> {
        self.expect(Punct::LParen)?;
        let cond = self.read_expr(0)?;
        self.expect(Punct::RParen)?;
        self.expect(Punct::LBrace)?;
        let then = self.read_block()?;
        // `else` is matched by spelling, right after the then-block closes.
        match self.next()? {
            Some(tok) if tok.is_ident("else") => {
                self.expect(Punct::LBrace)?;
                let els = self.read_block()?;
                Ok(Ast::if_stmt(cond, then, Some(els)))
            }
            Some(tok) => {
                self.tokens.unget(tok);
                Ok(Ast::if_stmt(cond, then, None))
            }
            None => Ok(Ast::if_stmt(cond, then, None)),
        }
    }

    fn read_for_stmt(&mut self) -> Result<Ast> {
        self.expect(Punct::LParen)?;
        let init = self.read_opt_decl_or_stmt()?;
        let cond = self.read_opt_expr()?;
        let step = if self.peek_is(Punct::RParen)? {
            None
        } else {
            Some(self.read_expr(0)?)
        };
        self.expect(Punct::RParen)?;
        self.expect(Punct::LBrace)?;
        let body = self.read_block()?;
        Ok(Ast::for_stmt(init, cond, step, body))
    }

    fn read_opt_decl_or_stmt(&mut self) -> Result<Option<Ast>> {
        if self.next_is(Punct::Semicolon)? {
            return Ok(None);
        }
        self.read_decl_or_stmt()
    }

    fn read_opt_expr(&mut self) -> Result<Option<Ast>> {
        if self.next_is(Punct::Semicolon)? {
            return Ok(None);
        }
        let expr = self.read_expr(0)?;
        self.expect(Punct::Semicolon)?;
        Ok(Some(expr))
    }

    fn read_return_stmt(&mut self) -> Result<Ast> {
        let retval = self.read_expr(0)?;
        self.expect(Punct::Semicolon)?;
        Ok(Ast::ret(retval))
    }

    // ----- declarations ---------------------------------------------------

    fn read_decl_spec(&mut self) -> Result<CType> {
        let tok = self.next()?;
        let mut ctype = match tok.as_ref().and_then(ctype_for) {
            Some(ctype) => ctype,
            None => {
                return Err(syntax_error!(
                    self.loc(),
                    "Type expected, but got {}",
                    describe(tok.as_ref())
                ))
            }
        };
        while self.next_is(Punct::Star)? {
            ctype = CType::pointer_to(ctype);
        }
        Ok(ctype)
    }

    fn read_array_dimensions(&mut self, base: CType) -> Result<CType> {
        let mut dims: Vec<Option<usize>> = Vec::new();
        while self.next_is(Punct::LBracket)? {
            let dim = if self.peek_is(Punct::RBracket)? {
                None
            } else {
                let size = self.read_expr(0)?;
                match size {
                    Ast::IntLiteral(v) if v >= 0 => Some(v as usize),
                    other => {
                        return Err(syntax_error!(
                            self.loc(),
                            "Integer expected, but got {}",
                            other
                        ))
                    }
                }
            };
            self.expect(Punct::RBracket)?;
            dims.push(dim);
        }
        // Only the outermost dimension may be left unsized.
        for pair in dims.windows(2) {
            if pair[0].is_none() && pair[1].is_none() {
                return Err(syntax_error!(self.loc(), "Array size is not specified"));
            }
        }
        let mut ctype = base;
        for dim in dims.into_iter().rev() {
            ctype = CType::array_of(ctype, dim);
        }
        Ok(ctype)
    }

    fn read_decl(&mut self) -> Result<Ast> {
        let spec = self.read_decl_spec()?;
        let name = self.expect_ident("Identifier")?;
        let ctype = self.read_array_dimensions(spec)?;
        let var = Ast::local_var(&mut self.ctx, ctype.clone(), name);
        if self.next_is(Punct::Assign)? {
            return self.read_decl_init(var);
        }
        if ctype.has_unknown_size() {
            return Err(type_error!(self.loc(), "Array size is not specified"));
        }
        self.expect(Punct::Semicolon)?;
        Ok(Ast::decl(var, None))
    }

    fn read_decl_init(&mut self, mut var: Ast) -> Result<Ast> {
        let ctype = var.expr_ctype()?;
        let init = match ctype {
            CType::Array { elem, size } => {
                let init = self.read_array_initializer(&elem)?;
                let length = match &init {
                    Ast::StringLiteral { value, .. } => value.len() + 1,
                    Ast::ArrayInit(elems) => elems.len(),
                    other => {
                        return Err(crate::internal_error!(
                            "array initializer expected, but got {}",
                            other
                        ))
                    }
                };
                match size {
                    None => {
                        let resolved = CType::array_of(*elem, Some(length));
                        var.set_ctype(resolved.clone());
                        self.ctx.update_last_local(resolved);
                    }
                    Some(declared) if declared != length => {
                        return Err(type_error!(
                            self.loc(),
                            "Invalid array initializer: expected {} items but got {}",
                            declared,
                            length
                        ));
                    }
                    Some(_) => {}
                }
                init
            }
            _ => self.read_expr(0)?,
        };
        self.expect(Punct::Semicolon)?;
        Ok(Ast::decl(var, Some(init)))
    }

    fn read_array_initializer(&mut self, elem: &CType) -> Result<Ast> {
        let tok = self.next()?;
        match tok {
            Some(Token::Str(s)) if *elem == CType::Char => Ok(Ast::string(&mut self.ctx, s)),
            Some(ref tok) if tok.is_punct(Punct::LBrace) => self.read_initializer_list(elem),
            other => Err(syntax_error!(
                self.loc(),
                "Expected an initializer list, but got {}",
                describe(other.as_ref())
            )),
        }
    }

    fn read_initializer_list(&mut self, elem: &CType) -> Result<Ast> {
        let mut elems = Vec::new();
        loop {
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::RBrace) => break,
                Some(tok) => self.tokens.unget(tok),
                None => return Err(syntax_error!(self.loc(), "unexpected end of input")),
            }
            let init = self.read_expr(0)?;
            let init_ctype = init.expr_ctype()?;
            result_type(BinOp::Assign, &init_ctype, elem, &self.loc())?;
            elems.push(init);
            // Separators are tolerated, not required.
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::Comma) => {}
                Some(tok) => self.tokens.unget(tok),
                None => {}
            }
        }
        Ok(Ast::array_init(elems))
    }

    // ----- expressions ----------------------------------------------------

    fn read_expr(&mut self, prec: u8) -> Result<Ast> {
        let mut ast = self.read_unary_expr()?;
        loop {
            let tok = match self.next()? {
                Some(tok) => tok,
                None => return Ok(ast),
            };
            let op = match binop_for(&tok) {
                Some(op) => op,
                None => {
                    self.tokens.unget(tok);
                    return Ok(ast);
                }
            };
            if op.precedence() < prec {
                self.tokens.unget(tok);
                return Ok(ast);
            }
            if op == BinOp::Assign {
                ast.ensure_lvalue(&self.loc())?;
            }
            let next_prec = if op.is_right_assoc() {
                op.precedence()
            } else {
                op.precedence() + 1
            };
            let rest = self.read_expr(next_prec)?;
            ast = Ast::binary(op, ast, rest, &self.loc())?;
        }
    }

    fn read_unary_expr(&mut self) -> Result<Ast> {
        let tok = match self.next()? {
            Some(tok) => tok,
            None => return Err(syntax_error!(self.loc(), "unexpected end of input")),
        };
        match tok {
            Token::Punct(Punct::LParen) => {
                let expr = self.read_expr(0)?;
                self.expect(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::Amp) => {
                let operand = self.read_unary_expr()?;
                Ast::address_of(operand, &self.loc())
            }
            Token::Punct(Punct::Star) => {
                let operand = self.read_unary_expr()?;
                Ast::deref(operand, &self.loc())
            }
            Token::Punct(_) => {
                self.tokens.unget(tok);
                self.read_prim()
            }
            _ => {
                self.tokens.unget(tok);
                self.read_postfix_expr()
            }
        }
    }

    fn read_postfix_expr(&mut self) -> Result<Ast> {
        let mut ast = self.read_prim()?;
        loop {
            let tok = match self.next()? {
                Some(tok) => tok,
                None => return Ok(ast),
            };
            if tok.is_punct(Punct::LBracket) {
                ast = self.read_subscript_expr(ast)?;
            } else if tok.is_punct(Punct::Inc) {
                // A single trailing postfix operator ends the expression.
                return Ast::postfix(UnaryOp::PostInc, ast, &self.loc());
            } else if tok.is_punct(Punct::Dec) {
                return Ast::postfix(UnaryOp::PostDec, ast, &self.loc());
            } else {
                self.tokens.unget(tok);
                return Ok(ast);
            }
        }
    }

    /// `a[i]` desugars to `*(a + i)`, so the result is an lvalue of the
    /// element type.
    fn read_subscript_expr(&mut self, base: Ast) -> Result<Ast> {
        let index = self.read_expr(0)?;
        self.expect(Punct::RBracket)?;
        let sum = Ast::binary(BinOp::Add, base, index, &self.loc())?;
        Ast::deref(sum, &self.loc())
    }

    fn read_prim(&mut self) -> Result<Ast> {
        let tok = match self.next()? {
            Some(tok) => tok,
            None => return Err(syntax_error!(self.loc(), "unexpected end of input")),
        };
        match tok {
            Token::Ident(name) => self.read_ident_or_call(name),
            Token::Int(value) => Ok(Ast::int(value)),
            Token::Char(c) => Ok(Ast::char_literal(c)),
            Token::Str(s) => Ok(Ast::string(&mut self.ctx, s)),
            Token::Punct(p) => Err(syntax_error!(self.loc(), "unexpected character: '{}'", p)),
        }
    }

    fn read_ident_or_call(&mut self, name: String) -> Result<Ast> {
        if self.next_is(Punct::LParen)? {
            return self.read_func_args(name);
        }
        match self.ctx.resolve(&name) {
            Some(var) => Ok(var.clone()),
            None => Err(syntax_error!(self.loc(), "Undefined variable: {}", name)),
        }
    }

    fn read_func_args(&mut self, fname: String) -> Result<Ast> {
        let mut args = Vec::new();
        loop {
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::RParen) => break,
                Some(tok) => self.tokens.unget(tok),
                None => return Err(syntax_error!(self.loc(), "unexpected end of input")),
            }
            args.push(self.read_expr(0)?);
            match self.next()? {
                Some(tok) if tok.is_punct(Punct::RParen) => break,
                Some(tok) if tok.is_punct(Punct::Comma) => {}
                other => {
                    return Err(syntax_error!(
                        self.loc(),
                        "Unexpected token: {}",
                        describe(other.as_ref())
                    ))
                }
            }
        }
        if args.len() > MAX_ARGS {
            return Err(syntax_error!(self.loc(), "Too many arguments: {}", fname));
        }
        // No declared-function table exists, so every call is typed int.
        Ok(Ast::func_call(CType::Int, fname, args))
    }
}

fn ctype_for(tok: &Token) -> Option<CType> {
    match tok {
        Token::Ident(name) if name == "int" => Some(CType::Int),
        Token::Ident(name) if name == "char" => Some(CType::Char),
        _ => None,
    }
}

fn binop_for(tok: &Token) -> Option<BinOp> {
    let Token::Punct(p) = tok else { return None };
    match p {
        Punct::Assign => Some(BinOp::Assign),
        Punct::Eq => Some(BinOp::Eq),
        Punct::Lt => Some(BinOp::Lt),
        Punct::Gt => Some(BinOp::Gt),
        Punct::Plus => Some(BinOp::Add),
        Punct::Minus => Some(BinOp::Sub),
        Punct::Star => Some(BinOp::Mul),
        Punct::Slash => Some(BinOp::Div),
        _ => None,
    }
}
