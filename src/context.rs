use crate::ast::Ast;
use crate::types::CType;

/// Per-compile mutable state: the compile-wide globals list, the current
/// function's parameters and locals, and the label counter. One context
/// per compile; independent compiles never share one.
#[derive(Debug, Default)]
pub struct Context {
    globals: Vec<Ast>,
    params: Vec<Ast>,
    locals: Option<Vec<Ast>>,
    label_seq: usize,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next internal label, `.L0`, `.L1`, ... The counter
    /// never resets for the lifetime of the context.
    pub fn next_label(&mut self) -> String {
        let seq = self.label_seq;
        self.label_seq += 1;
        format!(".L{}", seq)
    }

    /// Globals are append-only and grow for the whole compile: external
    /// declarations, file-local statics and string-literal temporaries.
    pub fn add_global(&mut self, node: Ast) {
        self.globals.push(node);
    }

    /// Locals are only collected while a function body is open; parameter
    /// declarators pass through here before that and are not collected.
    pub fn add_local(&mut self, node: Ast) {
        if let Some(locals) = self.locals.as_mut() {
            locals.push(node);
        }
    }

    pub fn begin_function(&mut self, params: Vec<Ast>) {
        self.params = params;
        self.locals = Some(Vec::new());
    }

    /// Detaches the finished parameter and local lists for storage on the
    /// function definition node.
    pub fn end_function(&mut self) -> (Vec<Ast>, Vec<Ast>) {
        let params = std::mem::take(&mut self.params);
        let locals = self.locals.take().unwrap_or_default();
        (params, locals)
    }

    /// Three-tier name resolution: parameters, then locals, then globals,
    /// each in declaration order, first match wins. A local declared
    /// twice always resolves to the earliest binding.
    pub fn resolve(&self, name: &str) -> Option<&Ast> {
        self.params
            .iter()
            .chain(self.locals.iter().flatten())
            .chain(self.globals.iter())
            .find(|v| v.var_name() == Some(name))
    }

    /// Backfills the declared type of the most recently added local once
    /// an initializer has fixed its array size.
    pub fn update_last_local(&mut self, ctype: CType) {
        if let Some(node) = self.locals.as_mut().and_then(|l| l.last_mut()) {
            node.set_ctype(ctype);
        }
    }

    pub fn globals(&self) -> &[Ast] {
        &self.globals
    }

    pub fn take_globals(&mut self) -> Vec<Ast> {
        std::mem::take(&mut self.globals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_sequential_and_never_reset() {
        let mut ctx = Context::new();
        assert_eq!(ctx.next_label(), ".L0");
        assert_eq!(ctx.next_label(), ".L1");
        ctx.begin_function(vec![]);
        let _ = ctx.end_function();
        assert_eq!(ctx.next_label(), ".L2");
    }

    #[test]
    fn independent_contexts_do_not_share_labels() {
        let mut a = Context::new();
        let mut b = Context::new();
        assert_eq!(a.next_label(), ".L0");
        assert_eq!(b.next_label(), ".L0");
    }

    #[test]
    fn resolution_prefers_params_over_locals_over_globals() {
        let mut ctx = Context::new();
        Ast::global_var(&mut ctx, CType::Int, "x", false);
        ctx.begin_function(vec![Ast::LocalVar {
            ctype: CType::Char,
            name: "x".to_string(),
        }]);
        Ast::local_var(&mut ctx, CType::Int, "x");

        let found = ctx.resolve("x").unwrap();
        assert_eq!(found.ctype(), Some(CType::Char));
    }

    // Pins the shadowing rule: the earliest-declared local wins forever.
    #[test]
    fn duplicate_locals_resolve_to_the_first_binding() {
        let mut ctx = Context::new();
        ctx.begin_function(vec![]);
        Ast::local_var(&mut ctx, CType::Int, "x");
        Ast::local_var(&mut ctx, CType::Char, "x");

        let found = ctx.resolve("x").unwrap();
        assert_eq!(found.ctype(), Some(CType::Int));
    }

    #[test]
    fn globals_remain_resolvable_across_functions() {
        let mut ctx = Context::new();
        Ast::global_var(&mut ctx, CType::Int, "g", false);

        ctx.begin_function(vec![]);
        assert!(ctx.resolve("g").is_some());
        let _ = ctx.end_function();
        assert!(ctx.resolve("g").is_some());
    }

    #[test]
    fn string_globals_do_not_shadow_variables() {
        let mut ctx = Context::new();
        Ast::string(&mut ctx, "hello");
        assert!(ctx.resolve("hello").is_none());
    }

    #[test]
    fn locals_are_detached_at_function_end() {
        let mut ctx = Context::new();
        ctx.begin_function(vec![]);
        Ast::local_var(&mut ctx, CType::Int, "x");
        let (params, locals) = ctx.end_function();
        assert!(params.is_empty());
        assert_eq!(locals.len(), 1);
        assert!(ctx.resolve("x").is_none());
    }

    #[test]
    fn locals_outside_a_function_are_not_collected() {
        let mut ctx = Context::new();
        Ast::local_var(&mut ctx, CType::Int, "p");
        ctx.begin_function(vec![]);
        let (_, locals) = ctx.end_function();
        assert!(locals.is_empty());
    }

    #[test]
    fn update_last_local_backfills_the_declared_type() {
        let mut ctx = Context::new();
        ctx.begin_function(vec![]);
        Ast::local_var(&mut ctx, CType::array_of(CType::Int, None), "a");
        ctx.update_last_local(CType::array_of(CType::Int, Some(3)));
        assert_eq!(
            ctx.resolve("a").unwrap().ctype(),
            Some(CType::array_of(CType::Int, Some(3)))
        );
    }
}
