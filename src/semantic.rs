//! The semantic model surface (`spec.md` §6): "a semantic model exposing
//! `symbol_of(node)`, `type_of(node)`, `declared_symbol_of(decl)`,
//! `compilation`, `get_type_by_metadata_name(full_name)`".
//!
//! Parsing and symbol/type resolution are external collaborators per
//! `spec.md` §1 - `InMemorySemanticModel` is the minimal reference
//! implementation that makes the rest of the crate runnable and testable
//! without a real host compiler.

use crate::model::{Compilation, NodeId, SymbolId, TypeId};
use std::collections::HashMap;

/// External semantic-resolution collaborator. The analyzer only ever reads
/// through this trait; it never re-derives symbols or types itself.
pub trait SemanticModel {
    fn symbol_of(&self, node: NodeId) -> Option<SymbolId>;
    fn type_of(&self, node: NodeId) -> Option<TypeId>;
    fn declared_symbol_of(&self, node: NodeId) -> Option<SymbolId>;
    fn compilation(&self) -> &Compilation;
    fn get_type_by_metadata_name(&self, full_name: &str) -> Option<TypeId>;
}

/// A semantic model backed by a fully resolved, in-memory `Compilation`.
///
/// Because this crate's AST nodes already embed the `SymbolId`/`TypeId`
/// they resolve to (there is no separate "bind" pass, since binding is the
/// external collaborator being stood in for), the side tables here are
/// populated once by walking the tree, rather than computed lazily.
pub struct InMemorySemanticModel {
    compilation: Compilation,
    node_symbols: HashMap<NodeId, SymbolId>,
    node_types: HashMap<NodeId, TypeId>,
    declared_symbols: HashMap<NodeId, SymbolId>,
    by_metadata_name: HashMap<String, TypeId>,
}

impl InMemorySemanticModel {
    pub fn build(compilation: Compilation) -> Self {
        let mut node_symbols = HashMap::new();
        let node_types = HashMap::new();
        let mut declared_symbols = HashMap::new();
        let mut by_metadata_name = HashMap::new();

        for ty in compilation.types.values() {
            by_metadata_name.insert(ty.name.clone(), ty.id);
        }

        for body in &compilation.bodies {
            declared_symbols.insert(body.statements.first().map(|s| s.id).unwrap_or(0), body.owner);
            for stmt in &body.statements {
                index_statement(stmt, &mut node_symbols);
            }
            if let Some(init) = &body.ctor_initializer {
                node_symbols.insert(init.id, init.callee);
                for arg in &init.args {
                    index_expr(&arg.value, &mut node_symbols);
                }
            }
        }

        InMemorySemanticModel { compilation, node_symbols, node_types, declared_symbols, by_metadata_name }
    }

    pub fn record_type(&mut self, node: NodeId, type_id: TypeId) {
        self.node_types.insert(node, type_id);
    }
}

fn index_statement(stmt: &crate::model::Statement, out: &mut HashMap<NodeId, SymbolId>) {
    use crate::model::StmtKind::*;
    match &stmt.kind {
        Expression(e) => index_expr(e, out),
        VariableDecl { symbol, initializer } => {
            out.insert(stmt.id, *symbol);
            if let Some(init) = initializer {
                index_expr(init, out);
            }
        }
        If { condition, then_branch, else_branch } => {
            index_expr(condition, out);
            for s in then_branch {
                index_statement(s, out);
            }
            if let Some(else_branch) = else_branch {
                for s in else_branch {
                    index_statement(s, out);
                }
            }
        }
        While { condition, body } => {
            index_expr(condition, out);
            for s in body {
                index_statement(s, out);
            }
        }
        Block(stmts) => {
            for s in stmts {
                index_statement(s, out);
            }
        }
        Return(Some(e)) => index_expr(e, out),
        Return(None) => {}
    }
}

fn index_expr(expr: &crate::model::Expression, out: &mut HashMap<NodeId, SymbolId>) {
    use crate::model::ExprKind::*;
    match &expr.kind {
        Identifier(sym) | MemberBinding { member: sym } => {
            out.insert(expr.id, *sym);
        }
        Invocation { callee, receiver, args } => {
            out.insert(expr.id, *callee);
            if let Some(r) = receiver {
                index_expr(r, out);
            }
            for a in args {
                index_expr(&a.value, out);
            }
        }
        MemberAccess { receiver, member } => {
            out.insert(expr.id, *member);
            index_expr(receiver, out);
        }
        Assignment { target, value } => {
            index_expr(target, out);
            index_expr(value, out);
        }
        ConditionalAccess { receiver, when_not_null } => {
            index_expr(receiver, out);
            index_expr(when_not_null, out);
        }
        Coalesce { left, right } => {
            index_expr(left, out);
            index_expr(right, out);
        }
        Ternary { condition, then_branch, else_branch } => {
            index_expr(condition, out);
            index_expr(then_branch, out);
            index_expr(else_branch, out);
        }
        Cast { inner, .. } | Paren(inner) | Await(inner) | PrefixUnary { operand: inner, .. } => {
            index_expr(inner, out)
        }
        As { left, .. } => index_expr(left, out),
        Add { left, right, .. } | Binary { left, right, .. } => {
            index_expr(left, out);
            index_expr(right, out);
        }
        ElementAccess { receiver, index } => {
            index_expr(receiver, out);
            index_expr(index, out);
        }
        Tuple(items) | InterpolatedString(items) => {
            for i in items {
                index_expr(i, out);
            }
        }
        ObjectCreation { args, .. } => {
            for a in args {
                index_expr(a, out);
            }
        }
        ArrayCreation { elements, .. } => {
            for e in elements {
                index_expr(e, out);
            }
        }
        Throw(Some(inner)) => index_expr(inner, out),
        Lambda { body, .. } => match body.as_ref() {
            crate::model::LambdaBody::Expression(e) => index_expr(e, out),
            crate::model::LambdaBody::Block(stmts) => {
                for s in stmts {
                    index_statement(s, out);
                }
            }
        },
        NullLiteral | StringLiteral(_) | NameOf(_) | This | Throw(None) | Unknown { .. } => {}
    }
}

impl SemanticModel for InMemorySemanticModel {
    fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.node_symbols.get(&node).copied()
    }

    fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.node_types.get(&node).copied()
    }

    fn declared_symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.declared_symbols.get(&node).copied()
    }

    fn compilation(&self) -> &Compilation {
        &self.compilation
    }

    fn get_type_by_metadata_name(&self, full_name: &str) -> Option<TypeId> {
        self.by_metadata_name.get(full_name).copied()
    }
}
