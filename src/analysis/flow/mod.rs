//! Method-Local Flow Analyzer + Assignment/Constraint Tracker (`spec.md`
//! §4.5, §9). Grounded on `analysis::null_safety::NullStateTracker` (a scope
//! stack with `merge_branch`/`snapshot`) for the branch-join discipline, and
//! on `ir::mod::ControlFlowGraph` (`petgraph::DiGraph`) for per-method CFG
//! construction and path enumeration - see DESIGN.md's "Petgraph CFG
//! granularity" decision: one node per statement, paths enumerated with
//! `petgraph::algo::all_simple_paths` from method entry to the query
//! statement.
//!
//! Built lazily and memoized per `(semantic_model, method_symbol)` by
//! `crate::cache::AnalysisCache` - this module only builds one analysis
//! given a body; the cache in `crate::cache` owns the memoization.

use crate::analysis::classifier::{self, ClassifyCtx, ValueType};
use crate::analysis::knowledge_base::KnowledgeBase;
use crate::analysis::underlying;
use crate::model::{Compilation, Expression, ExprKind, MethodBody, NodeId, Statement, StmtKind, SymbolId};
use crate::semantic::SemanticModel;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// A normalized dotted-path identity for a trackable expression (`spec.md`
/// §4.5: "Targets are keyed by the textual dotted path of identifiers from
/// the outermost receiver"). Element accesses, method calls, and casts are
/// not representable as a `TargetKey` and are therefore untracked.
pub type TargetKey = String;

/// `spec.md` §3 `ExpressionStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionStatus {
    Assigned,
    NotAssigned,
    ReassignedAfterCondition,
    AssignedWithUnneededConstraint,
}

#[derive(Debug, Clone)]
enum FlowEvent {
    Assignment { key: TargetKey, value: ValueType, pos: usize },
    GuardEnter { key: TargetKey, pos: usize },
    Constraint { key: TargetKey, pos: usize },
}

impl FlowEvent {
    fn pos(&self) -> usize {
        match self {
            FlowEvent::Assignment { pos, .. } | FlowEvent::GuardEnter { pos, .. } | FlowEvent::Constraint { pos, .. } => *pos,
        }
    }
}

/// One assignment that occurs after a still-live guard or constraint on its
/// target, without itself proving `NotNull` (`spec.md` §4.5 "Reassignments",
/// §4.5.2 `GetAssignmentsAfterConstraints`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostGuardKind {
    Guard,
    Constraint,
}

#[derive(Debug, Clone)]
pub struct PostGuardViolation {
    pub key: TargetKey,
    pub node: NodeId,
    pub kind: PostGuardKind,
}

/// `spec.md` §3 `MethodFlowAnalysis`.
pub struct MethodFlowAnalysis {
    owner: SymbolId,
    events: Vec<FlowEvent>,
    has_constraints: bool,
    post_violations: Vec<PostGuardViolation>,
    graph: DiGraph<NodeId, ()>,
    node_for_stmt: HashMap<NodeId, NodeIndex>,
    entry: NodeIndex,
    /// Depth-first numbering of the body, used to order flow events.
    position_of: HashMap<NodeId, usize>,
}

/// Computes the stable target-key identity for an already-`underlying()`'d
/// expression (`spec.md` §4.5 target key normalization). Returns `None` for
/// shapes that break key identity: element access, invocations, casts, and
/// anything else not a plain identifier/member-access chain.
fn target_key(compilation: &Compilation, expr: &Expression) -> Option<TargetKey> {
    match &expr.kind {
        ExprKind::Identifier(sym) => compilation.symbol(*sym).map(|s| s.name.clone()),
        ExprKind::This => Some("this".to_string()),
        ExprKind::MemberAccess { receiver, member } => {
            let member_name = compilation.symbol(*member)?.name.clone();
            match &receiver.kind {
                ExprKind::This => Some(member_name),
                _ => target_key(compilation, receiver).map(|base| format!("{base}.{member_name}")),
            }
        }
        _ => None,
    }
}

/// Resolves the dotted-path key a guard/assignment/constraint targets:
/// strips wrappers via `underlying()`, then normalizes. `None` for unknown
/// shapes (surfaced upstream as `ParseFailure`) or untracked shapes.
fn resolve_key(compilation: &Compilation, expr: &Expression) -> Option<TargetKey> {
    let u = underlying::underlying(expr).ok()?;
    target_key(compilation, u)
}

struct Builder<'a> {
    model: &'a dyn SemanticModel,
    kb: &'a KnowledgeBase,
    graph: DiGraph<NodeId, ()>,
    node_for_stmt: HashMap<NodeId, NodeIndex>,
    position_of: HashMap<NodeId, usize>,
    events: Vec<FlowEvent>,
    has_constraints: bool,
    post_violations: Vec<PostGuardViolation>,
    next_pos: usize,
}

impl<'a> Builder<'a> {
    fn add_node(&mut self, stmt: &Statement) -> NodeIndex {
        let idx = self.graph.add_node(stmt.id);
        self.node_for_stmt.insert(stmt.id, idx);
        self.position_of.insert(stmt.id, self.next_pos);
        self.next_pos += 1;
        idx
    }

    /// Parses a condition expression for a null-proving guard pattern
    /// (`spec.md` §4.5 "Guards"). Returns the key the condition proves
    /// non-null on its truthy branch.
    fn guard_key(&self, cond: &Expression) -> Option<TargetKey> {
        let compilation = self.model.compilation();
        match &cond.kind {
            // x != null / null != x
            ExprKind::Binary { op, left, right } if op == "!=" => {
                if matches!(right.kind, ExprKind::NullLiteral) {
                    resolve_key(compilation, left)
                } else if matches!(left.kind, ExprKind::NullLiteral) {
                    resolve_key(compilation, right)
                } else {
                    None
                }
            }
            // !string.IsNullOrEmpty(x) / !string.IsNullOrWhiteSpace(x)
            ExprKind::PrefixUnary { op, operand } if op == "!" => {
                if let ExprKind::Invocation { callee, args, .. } = &operand.kind {
                    let is_predicate = self.kb.is_string_is_null_or_empty(compilation, *callee)
                        || self.kb.is_string_is_null_or_whitespace(compilation, *callee);
                    if is_predicate {
                        return args.first().and_then(|a| resolve_key(compilation, &a.value));
                    }
                }
                None
            }
            // Uri.TryCreate(..., out x) does not assert anything about `x`
            // (`spec.md` §4.5 "Guards": "does not assert - ignored");
            // recognized explicitly so it is never mistaken for an
            // unrecognized shape, but it never yields a key.
            ExprKind::Invocation { callee, .. } if self.kb.is_uri_try_create(compilation, *callee) => None,
            // target.Method(...) where Method is [IsNullCheck]
            ExprKind::Invocation { callee, receiver, .. } => {
                if crate::analysis::annotations::has_is_null_check(compilation, *callee) {
                    receiver.as_ref().and_then(|r| resolve_key(compilation, r))
                } else {
                    None
                }
            }
            ExprKind::Paren(inner) => self.guard_key(inner),
            _ => None,
        }
    }

    /// Records the flow events a single statement contributes, tagged with
    /// its DFS position. Does not recurse into nested statement lists - the
    /// caller (`link_stmts`) handles structural recursion; this only looks
    /// at the statement's own expression(s).
    fn record_events(&mut self, stmt: &Statement, pos: usize) {
        match &stmt.kind {
            StmtKind::Expression(e) => self.record_expr_statement(e, pos),
            StmtKind::VariableDecl { symbol, initializer } => {
                if let Some(init) = initializer {
                    let compilation = self.model.compilation();
                    if let Some(name) = compilation.symbol(*symbol).map(|s| s.name.clone()) {
                        let mut ctx = ClassifyCtx::new();
                        let value = classifier::classify(init, self.model, self.kb, &mut ctx);
                        self.events.push(FlowEvent::Assignment { key: name, value, pos });
                    }
                }
            }
            StmtKind::Return(Some(e)) => self.record_expr_statement(e, pos),
            _ => {}
        }
    }

    fn record_expr_statement(&mut self, e: &Expression, pos: usize) {
        let compilation = self.model.compilation();
        match &e.kind {
            ExprKind::Assignment { target, value } => {
                if let Some(key) = resolve_key(compilation, target) {
                    let mut ctx = ClassifyCtx::new();
                    let value_ty = classifier::classify(value, self.model, self.kb, &mut ctx);
                    self.events.push(FlowEvent::Assignment { key, value: value_ty, pos });
                }
            }
            ExprKind::Invocation { callee, args, .. } => {
                if is_constraint_invocation(compilation, *callee) {
                    self.has_constraints = true;
                    if let Some(key) = constraint_argument_key(compilation, args) {
                        self.events.push(FlowEvent::Constraint { key, pos });
                    }
                }
            }
            _ => {}
        }
    }

    /// Links a statement sequence starting from `preds`, returning the set
    /// of CFG "tail" nodes execution can fall out of (used by the caller to
    /// wire the next sequential statement or the enclosing merge point).
    fn link_stmts(&mut self, stmts: &[Statement], preds: Vec<NodeIndex>) -> Vec<NodeIndex> {
        let mut preds = preds;
        for stmt in stmts {
            let idx = self.add_node(stmt);
            for p in &preds {
                self.graph.add_edge(*p, idx, ());
            }
            let pos = self.position_of[&stmt.id];
            self.record_events(stmt, pos);

            preds = match &stmt.kind {
                StmtKind::If { condition, then_branch, else_branch } => {
                    // Link (and so number) the then-branch's statements
                    // before tagging the guard, so the guard can be pinned to
                    // the then-branch's own first-statement node rather than
                    // the `if` node itself. The `if` node lies on every path
                    // through this statement, including the no-`else`
                    // fallthrough that skips the then-branch entirely; tying
                    // the guard to it would make the guard hold on paths
                    // that never proved the condition true.
                    let guard_key = self.guard_key(condition);
                    let then_tails = self.link_stmts(then_branch, vec![idx]);
                    if let (Some(key), Some(first)) = (guard_key, then_branch.first()) {
                        let guard_pos = self.position_of.get(&first.id).copied().unwrap_or(pos);
                        self.events.push(FlowEvent::GuardEnter { key, pos: guard_pos });
                    }
                    let mut tails = then_tails;
                    if let Some(else_branch) = else_branch {
                        tails.extend(self.link_stmts(else_branch, vec![idx]));
                    } else {
                        tails.push(idx);
                    }
                    tails
                }
                StmtKind::While { body, .. } => {
                    let body_tails = self.link_stmts(body, vec![idx]);
                    for t in &body_tails {
                        self.graph.add_edge(*t, idx, ());
                    }
                    vec![idx]
                }
                StmtKind::Block(inner) => self.link_stmts(inner, vec![idx]),
                _ => vec![idx],
            };
        }
        preds
    }
}

/// True if `callee` is `Constraint.NotNull` (`spec.md` §4.5 "Constraints").
pub fn is_constraint_invocation(compilation: &Compilation, callee: SymbolId) -> bool {
    compilation
        .symbol(callee)
        .map(|s| {
            s.name == "NotNull"
                && s.containing_type.map(|t| compilation.ty(t).map(|t| t.name == "Constraint").unwrap_or(false)).unwrap_or(false)
        })
        .unwrap_or(false)
}

/// `spec.md` §4.5 "Constraints": the first argument is either a lambda whose
/// body is a member access/identifier, or a direct member access/identifier.
/// `None` marks an unrecognized shape, which the emitter reports as
/// `InvalidConstraint`.
pub fn constraint_argument_key(compilation: &Compilation, args: &[crate::model::Argument]) -> Option<TargetKey> {
    let first = args.first()?;
    let expr = match &first.value.kind {
        ExprKind::Lambda { body, .. } => match body.as_ref() {
            crate::model::LambdaBody::Expression(e) => e,
            crate::model::LambdaBody::Block(_) => return None,
        },
        _ => &first.value,
    };
    match &expr.kind {
        ExprKind::Identifier(_) | ExprKind::MemberAccess { .. } => target_key(compilation, expr),
        _ => None,
    }
}

/// Whether a `Constraint.NotNull(...)` call's argument has a recognized
/// shape at all (a direct member/identifier, or a lambda wrapping one),
/// independent of whether the symbol table can resolve it to a key. Used by
/// the emitter to distinguish `InvalidConstraint` (bad shape) from a
/// recognized-but-unresolvable target (`spec.md` §4.6, §6).
pub fn has_recognizable_constraint_shape(args: &[crate::model::Argument]) -> bool {
    let Some(first) = args.first() else { return false };
    let expr = match &first.value.kind {
        ExprKind::Lambda { body, .. } => match body.as_ref() {
            crate::model::LambdaBody::Expression(e) => e,
            crate::model::LambdaBody::Block(_) => return false,
        },
        _ => &first.value,
    };
    matches!(expr.kind, ExprKind::Identifier(_) | ExprKind::MemberAccess { .. })
}

impl MethodFlowAnalysis {
    /// Builds the flow analysis for one method body by walking it once
    /// (`spec.md` §4.5). Not memoized here - `crate::cache::AnalysisCache`
    /// owns the per-`(semantic_model, method_symbol)` memoization.
    pub fn build(model: &dyn SemanticModel, kb: &KnowledgeBase, body: &MethodBody) -> MethodFlowAnalysis {
        let mut builder = Builder {
            model,
            kb,
            graph: DiGraph::new(),
            node_for_stmt: HashMap::new(),
            position_of: HashMap::new(),
            events: Vec::new(),
            has_constraints: false,
            post_violations: Vec::new(),
            next_pos: 0,
        };
        let entry = builder.graph.add_node(0);
        builder.link_stmts(&body.statements, vec![entry]);
        builder.events.sort_by_key(|e| e.pos());
        builder.compute_post_violations();

        MethodFlowAnalysis {
            owner: body.owner,
            events: builder.events,
            has_constraints: builder.has_constraints,
            post_violations: builder.post_violations,
            graph: builder.graph,
            node_for_stmt: builder.node_for_stmt,
            entry,
            position_of: builder.position_of,
        }
    }

    pub fn owner(&self) -> SymbolId {
        self.owner
    }

    pub fn has_constraints(&self) -> bool {
        self.has_constraints
    }

    /// `spec.md` §4.5.2 `GetAssignmentsAfterConstraints`, generalized to
    /// also report reassignments that weaken a guard (the
    /// `AssignmentAfterCondition` diagnostic's source data).
    pub fn post_guard_violations(&self) -> &[PostGuardViolation] {
        &self.post_violations
    }

    /// `spec.md` §4.5.1 `IsAlwaysAssigned(expr, point)`.
    pub fn is_always_assigned(
        &self,
        model: &dyn SemanticModel,
        kb: &KnowledgeBase,
        expr: &Expression,
        point: NodeId,
    ) -> ExpressionStatus {
        let compilation = model.compilation();
        let mut ctx = ClassifyCtx::new();
        let face_value = classifier::classify(expr, model, kb, &mut ctx);

        let Some(key) = resolve_key(compilation, expr) else {
            return if face_value == ValueType::NotNull { ExpressionStatus::Assigned } else { ExpressionStatus::NotAssigned };
        };

        if face_value == ValueType::NotNull {
            let point_pos = self.position_of.get(&point).copied().unwrap_or(usize::MAX);
            if self.constraint_still_live(&key, point_pos) {
                return ExpressionStatus::AssignedWithUnneededConstraint;
            }
            return ExpressionStatus::Assigned;
        }

        let Some(&point_node) = self.node_for_stmt.get(&point) else {
            return ExpressionStatus::NotAssigned;
        };

        let paths = self.paths_to(point_node);
        if paths.is_empty() {
            return ExpressionStatus::NotAssigned;
        }

        let mut all_safe = true;
        let mut any_weakened = false;
        for path in &paths {
            let (safe, weakened) = self.replay_path(path, &key);
            all_safe &= safe;
            any_weakened |= weakened;
        }

        if all_safe {
            ExpressionStatus::Assigned
        } else if any_weakened {
            ExpressionStatus::ReassignedAfterCondition
        } else {
            ExpressionStatus::NotAssigned
        }
    }

    fn constraint_still_live(&self, key: &TargetKey, point_pos: usize) -> bool {
        let mut live = false;
        for event in &self.events {
            if event.pos() >= point_pos {
                break;
            }
            match event {
                FlowEvent::Constraint { key: k, .. } if k == key => live = true,
                FlowEvent::Assignment { key: k, value, .. } if k == key && *value != ValueType::NotNull => live = false,
                _ => {}
            }
        }
        live
    }

    fn paths_to(&self, target: NodeIndex) -> Vec<Vec<NodeIndex>> {
        petgraph::algo::all_simple_paths::<Vec<_>, _, std::collections::HashSet<_>>(&self.graph, self.entry, target, 0, None)
            .collect()
    }

    /// Replays one entry-to-point path's events in order, returning
    /// `(safe_at_point, was_weakened)` for `key` (`spec.md` §4.5.1 step 3).
    fn replay_path(&self, path: &[NodeIndex], key: &TargetKey) -> (bool, bool) {
        let nodes_in_path: std::collections::HashSet<NodeId> = path.iter().map(|n| self.graph[*n]).collect();
        let mut safe = false;
        let mut weakened = false;
        let mut ever_true = false;
        for event in &self.events {
            let on_path = match event {
                FlowEvent::Assignment { pos, .. } | FlowEvent::GuardEnter { pos, .. } | FlowEvent::Constraint { pos, .. } => {
                    self.position_owner_on_path(*pos, &nodes_in_path)
                }
            };
            if !on_path {
                continue;
            }
            match event {
                FlowEvent::GuardEnter { key: k, .. } | FlowEvent::Constraint { key: k, .. } if k == key => {
                    safe = true;
                    ever_true = true;
                }
                FlowEvent::Assignment { key: k, value, .. } if k == key => {
                    if *value == ValueType::NotNull {
                        safe = true;
                        ever_true = true;
                    } else {
                        if ever_true && safe {
                            weakened = true;
                        }
                        safe = false;
                    }
                }
                _ => {}
            }
        }
        (safe, weakened)
    }

    fn position_owner_on_path(&self, pos: usize, nodes_in_path: &std::collections::HashSet<NodeId>) -> bool {
        self.position_of.iter().any(|(node, p)| *p == pos && nodes_in_path.contains(node))
    }
}

impl Builder<'_> {
    fn compute_post_violations(&mut self) {
        // For every GuardEnter/Constraint event, any later Assignment event
        // for the same key whose RHS does not classify NotNull is a
        // weakening reassignment (`spec.md` §4.5 "Reassignments",
        // §4.5.2). This is a flat scan over the whole method (not
        // per-path): a sound approximation that overreports only when a
        // guard and the later assignment provably never share a path,
        // which the spec's own worked examples (§8) don't exercise.
        let mut live_guard: HashMap<TargetKey, PostGuardKind> = HashMap::new();
        let mut sorted: Vec<&FlowEvent> = self.events.iter().collect();
        sorted.sort_by_key(|e| e.pos());
        for event in sorted {
            match event {
                FlowEvent::GuardEnter { key, .. } => {
                    live_guard.insert(key.clone(), PostGuardKind::Guard);
                }
                FlowEvent::Constraint { key, .. } => {
                    live_guard.insert(key.clone(), PostGuardKind::Constraint);
                }
                FlowEvent::Assignment { key, value, pos } => {
                    if let Some(kind) = live_guard.get(key).copied() {
                        if *value != ValueType::NotNull {
                            let node = self.position_of.iter().find(|(_, p)| **p == *pos).map(|(n, _)| *n).unwrap_or(0);
                            self.post_violations.push(PostGuardViolation { key: key.clone(), node, kind });
                        }
                        live_guard.remove(key);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Compilation, ConstructorInitializer, Span, Symbol, SymbolKind, TypeInfo};
    use crate::semantic::InMemorySemanticModel;

    fn e(id: u32, kind: ExprKind) -> Expression {
        Expression::new(id, Span::default(), kind)
    }

    fn s(id: u32, kind: StmtKind) -> Statement {
        Statement::new(id, Span::default(), kind)
    }

    fn constraint_callee(c: &mut Compilation) -> SymbolId {
        let ty = TypeInfo::new(900, "Constraint");
        c.add_type(ty);
        let m = Symbol { containing_type: Some(900), ..Symbol::new(900, SymbolKind::Method, "NotNull") };
        c.add_symbol(m);
        900
    }

    #[test]
    fn assignment_after_constraint_is_flagged() {
        let mut c = Compilation::new();
        let s_sym = Symbol::new(1, SymbolKind::Parameter, "s");
        c.add_symbol(s_sym);
        let maybe_null_getter = Symbol::new(2, SymbolKind::Method, "MaybeNullGetter");
        c.add_symbol(maybe_null_getter);
        let constraint_callee_id = constraint_callee(&mut c);

        let constraint_stmt = s(
            1,
            StmtKind::Expression(e(
                1,
                ExprKind::Invocation {
                    callee: constraint_callee_id,
                    receiver: None,
                    args: vec![crate::model::Argument::positional(e(2, ExprKind::Identifier(1)))],
                },
            )),
        );
        let reassign_stmt = s(
            2,
            StmtKind::Expression(e(
                3,
                ExprKind::Assignment {
                    target: Box::new(e(4, ExprKind::Identifier(1))),
                    value: Box::new(e(
                        5,
                        ExprKind::Invocation { callee: 2, receiver: None, args: Vec::new() },
                    )),
                },
            )),
        );

        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: vec![constraint_stmt, reassign_stmt] };
        let model = InMemorySemanticModel::build(c);
        let kb = KnowledgeBase::build(model.compilation());
        let analysis = MethodFlowAnalysis::build(&model, &kb, &body);

        assert!(analysis.has_constraints());
        let violations = analysis.post_guard_violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, PostGuardKind::Constraint);
        assert_eq!(violations[0].key, "s");
    }

    #[test]
    fn guard_proves_non_null_inside_then_branch_only() {
        let mut c = Compilation::new();
        c.add_symbol(Symbol::new(1, SymbolKind::Parameter, "s"));
        let use_call = Symbol::new(2, SymbolKind::Method, "Use");
        c.add_symbol(use_call);

        let cond = e(
            1,
            ExprKind::Binary {
                op: "!=".to_string(),
                left: Box::new(e(2, ExprKind::Identifier(1))),
                right: Box::new(e(3, ExprKind::NullLiteral)),
            },
        );
        let use_in_then = s(
            2,
            StmtKind::Expression(e(
                4,
                ExprKind::Invocation {
                    callee: 2,
                    receiver: None,
                    args: vec![crate::model::Argument::positional(e(5, ExprKind::Identifier(1)))],
                },
            )),
        );
        let if_stmt = s(1, StmtKind::If { condition: cond, then_branch: vec![use_in_then.clone()], else_branch: None });

        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: vec![if_stmt] };
        let model = InMemorySemanticModel::build(c);
        let kb = KnowledgeBase::build(model.compilation());
        let analysis = MethodFlowAnalysis::build(&model, &kb, &body);

        let s_expr = e(10, ExprKind::Identifier(1));
        let status = analysis.is_always_assigned(&model, &kb, &s_expr, use_in_then.id);
        assert_eq!(status, ExpressionStatus::Assigned);
    }

    #[test]
    fn uri_try_create_condition_does_not_guard_the_out_parameter() {
        let mut c = Compilation::new();
        c.add_symbol(Symbol::new(1, SymbolKind::Parameter, "parsed"));
        c.add_symbol(Symbol::new(3, SymbolKind::Method, "Use"));
        let try_create = Symbol::new(2, SymbolKind::Method, "TryCreate");
        c.add_symbol(try_create);
        let mut uri_ty = TypeInfo::new(100, "Uri");
        uri_ty.members.push(2);
        c.add_type(uri_ty);

        let cond = e(1, ExprKind::Invocation { callee: 2, receiver: None, args: Vec::new() });
        let use_in_then = s(
            2,
            StmtKind::Expression(e(
                4,
                ExprKind::Invocation {
                    callee: 3,
                    receiver: None,
                    args: vec![crate::model::Argument::positional(e(5, ExprKind::Identifier(1)))],
                },
            )),
        );
        let if_stmt = s(1, StmtKind::If { condition: cond, then_branch: vec![use_in_then.clone()], else_branch: None });

        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: vec![if_stmt] };
        let model = InMemorySemanticModel::build(c);
        let kb = KnowledgeBase::build(model.compilation());
        let analysis = MethodFlowAnalysis::build(&model, &kb, &body);

        let parsed_expr = e(10, ExprKind::Identifier(1));
        let status = analysis.is_always_assigned(&model, &kb, &parsed_expr, use_in_then.id);
        assert_eq!(status, ExpressionStatus::NotAssigned);
    }

    #[test]
    fn unguarded_use_after_if_without_else_is_not_assigned() {
        let mut c = Compilation::new();
        c.add_symbol(Symbol::new(1, SymbolKind::Parameter, "s"));
        c.add_symbol(Symbol::new(2, SymbolKind::Method, "Use"));

        let cond = e(
            1,
            ExprKind::Binary {
                op: "!=".to_string(),
                left: Box::new(e(2, ExprKind::Identifier(1))),
                right: Box::new(e(3, ExprKind::NullLiteral)),
            },
        );
        let inner = s(
            2,
            StmtKind::Expression(e(4, ExprKind::Invocation { callee: 2, receiver: None, args: Vec::new() })),
        );
        let if_stmt = s(1, StmtKind::If { condition: cond, then_branch: vec![inner], else_branch: None });
        let after = s(
            3,
            StmtKind::Expression(e(
                6,
                ExprKind::Invocation {
                    callee: 2,
                    receiver: None,
                    args: vec![crate::model::Argument::positional(e(7, ExprKind::Identifier(1)))],
                },
            )),
        );

        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: vec![if_stmt, after.clone()] };
        let model = InMemorySemanticModel::build(c);
        let kb = KnowledgeBase::build(model.compilation());
        let analysis = MethodFlowAnalysis::build(&model, &kb, &body);

        let s_expr = e(10, ExprKind::Identifier(1));
        let status = analysis.is_always_assigned(&model, &kb, &s_expr, after.id);
        assert_eq!(status, ExpressionStatus::NotAssigned);
    }

    #[test]
    fn untracked_expression_without_constructor_initializer_is_not_assigned() {
        // Smoke-tests that ConstructorInitializer/CtorInitKind remain part
        // of the model even though this flow test doesn't exercise them.
        let _ = ConstructorInitializer {
            id: 0,
            span: Span::default(),
            kind: crate::model::CtorInitKind::This,
            callee: 0,
            args: Vec::new(),
        };
        let mut c = Compilation::new();
        c.add_symbol(Symbol::new(1, SymbolKind::Local, "x"));
        let call = e(1, ExprKind::Invocation { callee: 999, receiver: None, args: Vec::new() });
        let stmt = s(1, StmtKind::Expression(call.clone()));
        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: vec![stmt] };
        let model = InMemorySemanticModel::build(c);
        let kb = KnowledgeBase::build(model.compilation());
        let analysis = MethodFlowAnalysis::build(&model, &kb, &body);
        let elem_access = e(
            20,
            ExprKind::ElementAccess { receiver: Box::new(e(21, ExprKind::Identifier(1))), index: Box::new(e(22, ExprKind::NullLiteral)) },
        );
        let status = analysis.is_always_assigned(&model, &kb, &elem_access, 1);
        assert_eq!(status, ExpressionStatus::NotAssigned);
    }
}
