//! Diagnostic Emitter + batch driver (`spec.md` §4.6, §4.7/SUPPLEMENT).
//! Grounded on `analysis::mod::check_borrows_with_annotations_and_safety`
//! and `main::analyze_file` (walk every function, accumulate violations),
//! generalized from a borrow-violation list to the fixed diagnostic catalog
//! of `spec.md` §6.

use crate::analysis::annotations;
use crate::analysis::classifier::{self, ClassifyCtx, ValueType};
use crate::analysis::flow::{self, ExpressionStatus, MethodFlowAnalysis, PostGuardKind};
use crate::analysis::knowledge_base::KnowledgeBase;
use crate::analysis::underlying;
use crate::cache::AnalysisCache;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::model::{
    Compilation, ConstructorInitializer, CtorInitKind, Expression, ExprKind, MethodBody, NodeId, RefKind, Span, Statement,
    StmtKind, SymbolId,
};
use crate::semantic::SemanticModel;
use std::collections::HashMap;

/// Cooperative cancellation (`spec.md` §5: "long traversals should observe
/// a cancellation token provided by the host and stop at any node
/// boundary; partial diagnostics emitted before cancellation are discarded
/// by the host").
pub trait CancellationToken: Sync {
    fn is_cancelled(&self) -> bool;
}

pub struct NeverCancelled;

impl CancellationToken for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

struct Walker<'a> {
    model: &'a dyn SemanticModel,
    kb: &'a KnowledgeBase,
    analysis: &'a MethodFlowAnalysis,
    method_owner: SymbolId,
    cancel: &'a dyn CancellationToken,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Walker<'a> {
    fn compilation(&self) -> &Compilation {
        self.model.compilation()
    }

    fn classify(&self, expr: &Expression, ctx: &mut ClassifyCtx) -> ValueType {
        classifier::classify(expr, self.model, self.kb, ctx)
    }

    fn record_parse_failures(&mut self, ctx: ClassifyCtx, node: NodeId) {
        for failure in ctx.parse_failures {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::ParseFailure { node_kind: failure.kind_name },
                failure.span,
                node,
                "expression shape not recognized by the classifier",
            ));
        }
    }

    /// Maps a value-flowing-into-a-sink `ExpressionStatus` to its
    /// diagnostic, per `spec.md` §4.6/§6. `Assigned` produces nothing.
    fn status_diagnostic(&self, status: ExpressionStatus) -> Option<DiagnosticKind> {
        match status {
            ExpressionStatus::Assigned => None,
            ExpressionStatus::NotAssigned => Some(DiagnosticKind::NullAssignment),
            ExpressionStatus::ReassignedAfterCondition => Some(DiagnosticKind::AssignmentAfterCondition),
            ExpressionStatus::AssignedWithUnneededConstraint => Some(DiagnosticKind::UnneededConstraint),
        }
    }

    fn check_value_into_sink(&mut self, value: &Expression, point: NodeId, target: SymbolId) {
        let mut ctx = ClassifyCtx::new();
        let face_value = self.classify(value, &mut ctx);
        self.record_parse_failures(ctx, value.id);
        if face_value == ValueType::NotNull {
            return;
        }
        let status = self.analysis.is_always_assigned(self.model, self.kb, value, point);
        if let Some(kind) = self.status_diagnostic(status) {
            self.diagnostics.push(Diagnostic::new(kind, value.span, value.id, "value may be null at a non-null sink").with_target(target));
        }
    }

    fn walk_body(&mut self, body: &MethodBody) {
        if let Some(init) = &body.ctor_initializer {
            self.check_ctor_initializer(init);
        }
        for stmt in &body.statements {
            if self.cancel.is_cancelled() {
                return;
            }
            self.check_stmt(stmt);
        }
        self.emit_post_guard_violations(body);
    }

    /// `spec.md` §4.5.2 `GetAssignmentsAfterConstraints` / §4.5 "Reassignments
    /// after a guard or constraint": every assignment the flow analyzer
    /// recorded as weakening an earlier guard or constraint becomes an
    /// `AssignmentAfterCondition` or `AssignmentAfterConstraint` diagnostic
    /// at that reassignment's own statement (`spec.md` §6, §8 scenario 3).
    fn emit_post_guard_violations(&mut self, body: &MethodBody) {
        let mut spans = HashMap::new();
        collect_stmt_spans(&body.statements, &mut spans);
        for violation in self.analysis.post_guard_violations() {
            let span = spans.get(&violation.node).copied().unwrap_or_default();
            let kind = match violation.kind {
                PostGuardKind::Guard => DiagnosticKind::AssignmentAfterCondition,
                PostGuardKind::Constraint => DiagnosticKind::AssignmentAfterConstraint,
            };
            self.diagnostics.push(Diagnostic::new(
                kind,
                span,
                violation.node,
                format!("`{}` is reassigned after a guard/constraint proved it non-null", violation.key),
            ));
        }
    }

    /// `spec.md` §4.6: "for a constructor-initializer... only `NotAssigned`
    /// produces a diagnostic (`PropagateNotNullInCtors`) - other statuses
    /// are suppressed because the initializer runs before the body's
    /// guards." Nothing has executed yet at this point, so the flow
    /// analyzer's path machinery is moot: a face-value classifier check
    /// alone determines `NotAssigned` vs. `Assigned`.
    fn check_ctor_initializer(&mut self, init: &ConstructorInitializer) {
        let compilation = self.compilation();
        let Some(callee) = compilation.symbol(init.callee) else { return };
        let params = callee.parameters.clone();
        let kind_name = match init.kind {
            CtorInitKind::This => "this",
            CtorInitKind::Base => "base",
        };
        let _ = kind_name;

        for (param_id, arg) in params.iter().zip(init.args.iter()) {
            let Some(param) = compilation.symbol(*param_id) else { continue };
            if param.is_params {
                break;
            }
            if !annotations::has_not_null_contract(compilation, *param_id) {
                continue;
            }
            let mut ctx = ClassifyCtx::new();
            let value = self.classify(&arg.value, &mut ctx);
            self.record_parse_failures(ctx, arg.value.id);
            if value != ValueType::NotNull {
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::PropagateNotNullInCtors,
                        arg.value.span,
                        arg.value.id,
                        "possibly-null value passed to a non-null constructor-initializer parameter",
                    )
                    .with_target(*param_id),
                );
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Statement) {
        if self.cancel.is_cancelled() {
            return;
        }
        match &stmt.kind {
            StmtKind::Expression(e) => self.check_expr(e, stmt.id),
            StmtKind::VariableDecl { symbol, initializer } => {
                if let Some(init) = initializer {
                    self.check_expr(init, stmt.id);
                    if annotations::has_not_null_contract(self.compilation(), *symbol) {
                        self.check_value_into_sink(init, stmt.id, *symbol);
                    }
                }
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                self.check_expr(condition, stmt.id);
                for s in then_branch {
                    self.check_stmt(s);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.check_stmt(s);
                    }
                }
            }
            StmtKind::While { condition, body } => {
                self.check_expr(condition, stmt.id);
                for s in body {
                    self.check_stmt(s);
                }
            }
            StmtKind::Block(inner) => {
                for s in inner {
                    self.check_stmt(s);
                }
            }
            StmtKind::Return(Some(e)) => {
                self.check_expr(e, stmt.id);
                if annotations::has_not_null_contract(self.compilation(), self.method_owner) {
                    self.check_value_into_sink(e, stmt.id, self.method_owner);
                }
            }
            StmtKind::Return(None) => {}
        }
    }

    fn check_expr(&mut self, expr: &Expression, point: NodeId) {
        if self.cancel.is_cancelled() {
            return;
        }
        match &expr.kind {
            ExprKind::Binary { op, left, right } if op == "==" || op == "!=" => {
                self.check_null_comparison(left, right);
                self.check_expr(left, point);
                self.check_expr(right, point);
            }
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left, point);
                self.check_expr(right, point);
            }
            ExprKind::MemberAccess { receiver, .. } => self.check_expr(receiver, point),
            ExprKind::Coalesce { left, right } => {
                let mut ctx = ClassifyCtx::new();
                if self.classify(left, &mut ctx) == ValueType::NotNull {
                    self.emit_unneeded_null_check(left);
                }
                self.record_parse_failures(ctx, left.id);
                self.check_expr(left, point);
                self.check_expr(right, point);
            }
            ExprKind::ConditionalAccess { receiver, when_not_null } => {
                let mut ctx = ClassifyCtx::new();
                if self.classify(receiver, &mut ctx) == ValueType::NotNull {
                    self.emit_unneeded_null_check(receiver);
                }
                self.record_parse_failures(ctx, receiver.id);
                self.check_expr(receiver, point);
                self.check_expr(when_not_null, point);
            }
            ExprKind::Invocation { callee, receiver, args } => {
                if flow::is_constraint_invocation(self.compilation(), *callee) {
                    self.check_constraint_call(*callee, args);
                } else {
                    self.check_call_arguments(*callee, args, point);
                }
                if let Some(r) = receiver {
                    self.check_expr(r, point);
                }
                for a in args {
                    self.check_expr(&a.value, point);
                }
            }
            ExprKind::Assignment { target, value } => {
                self.check_expr(target, point);
                self.check_expr(value, point);
                match underlying::underlying(target) {
                    Ok(u) => {
                        if let ExprKind::Identifier(sym) | ExprKind::MemberAccess { member: sym, .. } = &u.kind {
                            if annotations::has_not_null_contract(self.compilation(), *sym) {
                                self.check_value_into_sink(value, point, *sym);
                            }
                        }
                    }
                    Err(e) => self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ParseFailure { node_kind: e.kind_name },
                        e.span,
                        target.id,
                        "assignment target has an unrecognized shape",
                    )),
                }
            }
            ExprKind::ObjectCreation { args, .. } => {
                for a in args {
                    self.check_expr(a, point);
                }
            }
            ExprKind::ArrayCreation { elements, .. } => {
                for e in elements {
                    self.check_expr(e, point);
                }
            }
            ExprKind::Ternary { condition, then_branch, else_branch } => {
                self.check_expr(condition, point);
                self.check_expr(then_branch, point);
                self.check_expr(else_branch, point);
            }
            ExprKind::Cast { inner, .. }
            | ExprKind::Paren(inner)
            | ExprKind::Await(inner)
            | ExprKind::PrefixUnary { operand: inner, .. } => self.check_expr(inner, point),
            ExprKind::As { left, .. } => self.check_expr(left, point),
            ExprKind::Add { left, right, .. } => {
                self.check_expr(left, point);
                self.check_expr(right, point);
            }
            ExprKind::ElementAccess { receiver, index } => {
                self.check_expr(receiver, point);
                self.check_expr(index, point);
            }
            ExprKind::Tuple(items) | ExprKind::InterpolatedString(items) => {
                for i in items {
                    self.check_expr(i, point);
                }
            }
            ExprKind::Throw(Some(inner)) => self.check_expr(inner, point),
            ExprKind::Lambda { body, .. } => match body.as_ref() {
                crate::model::LambdaBody::Expression(e) => self.check_expr(e, point),
                crate::model::LambdaBody::Block(stmts) => {
                    for s in stmts {
                        self.check_stmt(s);
                    }
                }
            },
            ExprKind::NullLiteral
            | ExprKind::StringLiteral(_)
            | ExprKind::NameOf(_)
            | ExprKind::This
            | ExprKind::Throw(None)
            | ExprKind::Identifier(_)
            | ExprKind::MemberBinding { .. }
            | ExprKind::Unknown { .. } => {}
        }
    }

    /// `a == null` / `a != null` where `a` is provably non-null (`spec.md`
    /// §4.6).
    fn check_null_comparison(&mut self, left: &Expression, right: &Expression) {
        let target = if matches!(right.kind, ExprKind::NullLiteral) {
            Some(left)
        } else if matches!(left.kind, ExprKind::NullLiteral) {
            Some(right)
        } else {
            None
        };
        let Some(target) = target else { return };
        let mut ctx = ClassifyCtx::new();
        if self.classify(target, &mut ctx) == ValueType::NotNull {
            self.emit_unneeded_null_check(target);
        }
        self.record_parse_failures(ctx, target.id);
    }

    fn emit_unneeded_null_check(&mut self, target: &Expression) {
        let sym = match &target.kind {
            ExprKind::Identifier(s) | ExprKind::MemberAccess { member: s, .. } | ExprKind::MemberBinding { member: s } => Some(*s),
            _ => None,
        };
        let mut diag = Diagnostic::new(DiagnosticKind::UnneededNullCheck, target.span, target.id, "target is already provably non-null");
        if let Some(s) = sym {
            diag = diag.with_target(s);
        }
        self.diagnostics.push(diag);
    }

    /// Invocations/object-creation argument checks (`spec.md` §4.6): for
    /// each argument passed to a `NotNull`/`CheckNull` parameter, ask the
    /// flow analyzer whether it's safely non-null at the call site. A
    /// `params` parameter ends checking for the call. Independently, any
    /// argument passed by `ref`/`out` whose own symbol carries a
    /// `NotNull`/`CheckNull` contract is always `NotNullAsRefParameter`.
    fn check_call_arguments(&mut self, callee: SymbolId, args: &[crate::model::Argument], point: NodeId) {
        let compilation = self.compilation();
        let Some(callee_sym) = compilation.symbol(callee) else { return };
        let params = callee_sym.parameters.clone();

        for (i, arg) in args.iter().enumerate() {
            if arg.ref_kind != RefKind::None {
                if let Ok(u) = underlying::underlying(&arg.value) {
                    if let ExprKind::Identifier(s) | ExprKind::MemberAccess { member: s, .. } = &u.kind {
                        if annotations::has_not_null_contract(compilation, *s) {
                            self.diagnostics.push(
                                Diagnostic::new(
                                    DiagnosticKind::NotNullAsRefParameter,
                                    arg.value.span,
                                    arg.value.id,
                                    "non-null-contract value passed by reference",
                                )
                                .with_target(*s),
                            );
                        }
                    }
                }
            }

            let Some(param_id) = params.get(i) else { continue };
            let Some(param) = compilation.symbol(*param_id) else { continue };
            if param.is_params {
                break;
            }
            if annotations::has_not_null_contract(compilation, *param_id) {
                self.check_value_into_sink(&arg.value, point, *param_id);
            }
        }
    }

    /// `spec.md` §4.6: constraint calls. `UnneededConstraint` when the
    /// target is already annotated; `InvalidConstraint` when the argument
    /// shape is unrecognized.
    fn check_constraint_call(&mut self, callee: SymbolId, args: &[crate::model::Argument]) {
        if !flow::has_recognizable_constraint_shape(args) {
            let span = args.first().map(|a| a.value.span).unwrap_or_default();
            let node = args.first().map(|a| a.value.id).unwrap_or(0);
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidConstraint,
                span,
                node,
                "Constraint.NotNull argument is not a direct member or a lambda returning one",
            ));
            return;
        }
        let compilation = self.compilation();
        if let Some(key_sym) = constrained_symbol(compilation, args) {
            if annotations::has_not_null_contract(compilation, key_sym) {
                let node = args.first().map(|a| a.value.id).unwrap_or(0);
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnneededConstraint,
                        args.first().map(|a| a.value.span).unwrap_or_default(),
                        node,
                        "target is already annotated non-null",
                    )
                    .with_target(key_sym),
                );
            }
        }
        let _ = callee;
    }
}

/// Maps every statement's `NodeId` (recursively, through `if`/`while`/block
/// nesting) to its `Span`, so `emit_post_guard_violations` can attach a real
/// location to a `PostGuardViolation`'s statement-id.
fn collect_stmt_spans(stmts: &[Statement], out: &mut HashMap<NodeId, Span>) {
    for stmt in stmts {
        out.insert(stmt.id, stmt.span);
        match &stmt.kind {
            StmtKind::If { then_branch, else_branch, .. } => {
                collect_stmt_spans(then_branch, out);
                if let Some(else_branch) = else_branch {
                    collect_stmt_spans(else_branch, out);
                }
            }
            StmtKind::While { body, .. } => collect_stmt_spans(body, out),
            StmtKind::Block(inner) => collect_stmt_spans(inner, out),
            _ => {}
        }
    }
}

fn constrained_symbol(_compilation: &Compilation, args: &[crate::model::Argument]) -> Option<SymbolId> {
    let first = args.first()?;
    let expr = match &first.value.kind {
        ExprKind::Lambda { body, .. } => match body.as_ref() {
            crate::model::LambdaBody::Expression(e) => e,
            crate::model::LambdaBody::Block(_) => return None,
        },
        _ => &first.value,
    };
    match &expr.kind {
        ExprKind::Identifier(s) | ExprKind::MemberAccess { member: s, .. } => Some(*s),
        _ => None,
    }
}

/// Analyzes one method/constructor/accessor body, building (or fetching
/// from `cache`) its `MethodFlowAnalysis` first (`spec.md` §4.6's "the
/// analysis driver that traverses a code block, invokes the above").
pub fn analyze_body(
    model: &dyn SemanticModel,
    cache: &AnalysisCache,
    body: &MethodBody,
    cancel: &dyn CancellationToken,
) -> Vec<Diagnostic> {
    let kb = cache.knowledge_base(model.compilation());
    let analysis = cache.method_analysis(model, kb, body);
    let mut walker = Walker { model, kb, analysis: analysis.as_ref(), method_owner: body.owner, cancel, diagnostics: Vec::new() };
    walker.walk_body(body);
    walker.diagnostics
}

/// Batch driver over every analyzable body in a compilation (`spec.md` §5:
/// "a host that may run many instances in parallel on disjoint code
/// blocks"). `M` must be `Sync` so bodies can be analyzed concurrently
/// across a shared semantic model, mirroring `rayon`'s per-function
/// parallelism in the teacher's borrow-check driver.
pub fn analyze_compilation<M: SemanticModel + Sync>(
    model: &M,
    cache: &AnalysisCache,
    cancel: &dyn CancellationToken,
) -> Vec<Diagnostic> {
    use rayon::prelude::*;
    model.compilation().bodies.par_iter().flat_map(|body| analyze_body(model, cache, body, cancel)).collect()
}
