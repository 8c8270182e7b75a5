//! Expression Classifier (`spec.md` §4.3). Grounded on
//! `analysis::null_safety::NullState` (the `NonNull`/`Null`/`MaybeNull`
//! three-value lattice, renamed `NotNull` here to match `spec.md` §3's
//! vocabulary) and on its case-wise treatment of expressions, generalized
//! from pointer dereference shapes to the full case table below. Unlike
//! `NullState`, `ValueType` exposes no `merge` - the flow analyzer enumerates
//! paths rather than joining a single abstract state (see
//! `analysis::flow::mod`).

use crate::analysis::annotations;
use crate::analysis::knowledge_base::KnowledgeBase;
use crate::analysis::underlying::{self, UnknownShape};
use crate::model::{Compilation, ExprKind, Expression, SymbolId};
use crate::semantic::SemanticModel;
use serde::{Deserialize, Serialize};

/// The three-value lattice a classified expression lands in (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    NotNull,
    Null,
    MaybeNull,
}

/// Threaded through a single `classify` call tree. `has_not_null_attribute`
/// records whether the classified value's non-nullness came from an
/// explicit annotation (used by the flow analyzer to distinguish
/// "proved non-null by annotation" from "proved non-null structurally," per
/// the two call sites `spec.md` §4.3.1/§4.3.2 name explicitly).
/// `parse_failures` accumulates unrecognized shapes surfaced by the
/// Underlying-Member Resolver so the caller can turn them into
/// `ParseFailure` diagnostics without classification itself erroring out
/// (`spec.md` §7: never silently ignored, but `classify` itself always
/// returns a `ValueType`).
#[derive(Debug, Clone, Default)]
pub struct ClassifyCtx {
    pub has_not_null_attribute: bool,
    pub parse_failures: Vec<UnknownShape>,
}

impl ClassifyCtx {
    pub fn new() -> Self {
        ClassifyCtx::default()
    }
}

/// `classify(expr, semantic_model, ctx)` (`spec.md` §4.3). Cases not listed
/// in the spec's table fall through to `MaybeNull`.
pub fn classify(expr: &Expression, model: &dyn SemanticModel, kb: &KnowledgeBase, ctx: &mut ClassifyCtx) -> ValueType {
    let compilation = model.compilation();
    match &expr.kind {
        ExprKind::NullLiteral => ValueType::Null,

        ExprKind::StringLiteral(_) | ExprKind::InterpolatedString(_) | ExprKind::NameOf(_) => ValueType::NotNull,

        ExprKind::ObjectCreation { .. } | ExprKind::ArrayCreation { .. } | ExprKind::This | ExprKind::Lambda { .. } => {
            ValueType::NotNull
        }

        // Unreachable result; conservatively non-null per spec.md §4.3.
        ExprKind::Throw(_) => ValueType::NotNull,

        ExprKind::Identifier(sym) | ExprKind::MemberBinding { member: sym } => classify_symbol(compilation, kb, *sym),

        ExprKind::Invocation { callee, .. } => classify_invocation(compilation, kb, *callee, ctx),

        ExprKind::Assignment { value, .. } => classify(value, model, kb, ctx),

        ExprKind::MemberAccess { member, .. } => classify_symbol(compilation, kb, *member),

        ExprKind::Coalesce { right, .. } => match underlying::underlying(right) {
            Ok(u) => classify(u, model, kb, ctx),
            Err(e) => {
                ctx.parse_failures.push(e);
                ValueType::MaybeNull
            }
        },

        ExprKind::ConditionalAccess { when_not_null, .. } => classify(when_not_null, model, kb, ctx),

        ExprKind::Ternary { then_branch, else_branch, .. } => {
            let then_ty = classify(then_branch, model, kb, ctx);
            let else_ty = classify(else_branch, model, kb, ctx);
            if then_ty == ValueType::NotNull && else_ty == ValueType::NotNull {
                ValueType::NotNull
            } else {
                ValueType::MaybeNull
            }
        }

        ExprKind::Cast { inner, .. } | ExprKind::Paren(inner) => classify(inner, model, kb, ctx),

        ExprKind::As { left, .. } => classify(left, model, kb, ctx),

        ExprKind::Await(inner) => classify_await(inner, model, kb, ctx),

        ExprKind::Add { result_type, is_tolist_call, .. } => {
            if *is_tolist_call || compilation.is_value_type(*result_type) || compilation.is_string_type(*result_type)
            {
                ValueType::NotNull
            } else {
                ValueType::MaybeNull
            }
        }

        ExprKind::ElementAccess { .. }
        | ExprKind::Tuple(_)
        | ExprKind::PrefixUnary { .. }
        | ExprKind::Binary { .. }
        | ExprKind::Unknown { .. } => ValueType::MaybeNull,
    }
}

/// `spec.md` §4.3.1. Dispatches on symbol kind; falls through to the
/// "other symbols" rule for every kind not given its own arm (fields,
/// properties, methods-as-values, and ordinary, non-setter-value,
/// non-lambda parameters - see DESIGN.md's Open Question on this point).
fn classify_symbol(compilation: &Compilation, kb: &KnowledgeBase, sym_id: SymbolId) -> ValueType {
    use crate::model::SymbolKind;

    let Some(sym) = compilation.symbol(sym_id) else {
        return ValueType::MaybeNull;
    };

    match sym.kind {
        SymbolKind::Local => {
            if sym.is_foreach_local {
                ValueType::NotNull
            } else {
                ValueType::MaybeNull
            }
        }
        SymbolKind::Parameter if sym.is_setter_value_parameter => {
            classify_setter_value_parameter(compilation, sym_id)
        }
        SymbolKind::Parameter if sym.is_lambda_parameter => classify_lambda_parameter(compilation, kb, sym_id),
        _ => classify_other_symbol(compilation, kb, sym_id),
    }
}

/// The implicit `value` parameter of a property/indexer setter (`spec.md`
/// §4.3.1). `annotations::has_not_null_contract` already walks from a
/// method to its associated property, so checking the setter method alone
/// covers both "on the setter method" and "else on the associated property"
/// in one call.
fn classify_setter_value_parameter(compilation: &Compilation, sym_id: SymbolId) -> ValueType {
    let setter = compilation.symbol(sym_id).and_then(|s| s.setter_method);
    let carries = setter.map(|m| annotations::has_not_null_contract(compilation, m)).unwrap_or(false);
    if carries { ValueType::NotNull } else { ValueType::MaybeNull }
}

/// A parameter belonging to a lambda expression (`spec.md` §4.3.1).
fn classify_lambda_parameter(compilation: &Compilation, kb: &KnowledgeBase, sym_id: SymbolId) -> ValueType {
    let Some(sym) = compilation.symbol(sym_id) else {
        return ValueType::MaybeNull;
    };

    let inside_combinator =
        sym.enclosing_invocation_callee.map(|c| kb.is_enumerable_combinator(compilation, c)).unwrap_or(false);
    if inside_combinator {
        return ValueType::NotNull;
    }

    let delegate_carries =
        sym.delegate_param_symbol.map(|d| annotations::has_not_null_contract(compilation, d)).unwrap_or(false);
    if delegate_carries { ValueType::NotNull } else { ValueType::Null }
}

/// Fields, properties, methods-as-values, and ordinary parameters
/// (`spec.md` §4.3.1, "Other symbols").
fn classify_other_symbol(compilation: &Compilation, kb: &KnowledgeBase, sym_id: SymbolId) -> ValueType {
    let known_non_null =
        kb.is_known_non_null_property(compilation, sym_id) || kb.is_known_non_null_method(compilation, sym_id);
    let annotated = annotations::has_not_null_contract(compilation, sym_id);
    if known_non_null || annotated { ValueType::NotNull } else { ValueType::MaybeNull }
}

/// `spec.md` §4.3.2. `nameof(...)` is handled by its own `ExprKind` variant
/// in `classify`'s top-level match, so this only covers method/constructor
/// invocations proper.
fn classify_invocation(compilation: &Compilation, kb: &KnowledgeBase, callee: SymbolId, ctx: &mut ClassifyCtx) -> ValueType {
    let annotated = annotations::has_not_null_contract(compilation, callee);
    let known_non_null = kb.is_known_non_null_method(compilation, callee);
    if annotated || known_non_null {
        ctx.has_not_null_attribute = true;
        return ValueType::NotNull;
    }

    let declared_type = compilation.symbol(callee).and_then(|s| s.declared_type);
    if let Some(t) = declared_type {
        let unwrapped = compilation.unwrap_task(t);
        if compilation.is_value_type(Some(unwrapped)) {
            return ValueType::NotNull;
        }
    }

    ValueType::MaybeNull
}

/// `spec.md` §4.3.3. `classify_invocation` already unwraps `Task<T>` for any
/// invocation (§4.3.4), so once `ConfigureAwait` is stripped the ordinary
/// invocation arm of `classify` does the rest.
fn classify_await(inner: &Expression, model: &dyn SemanticModel, kb: &KnowledgeBase, ctx: &mut ClassifyCtx) -> ValueType {
    if let ExprKind::Invocation { callee, receiver, .. } = &inner.kind {
        if kb.is_task_configure_await(model.compilation(), *callee) {
            if let Some(receiver) = receiver {
                return classify(receiver, model, kb, ctx);
            }
        }
    }
    classify(inner, model, kb, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Span, Symbol, SymbolKind, TypeInfo};
    use crate::semantic::InMemorySemanticModel;

    fn e(id: u32, kind: ExprKind) -> Expression {
        Expression::new(id, Span::default(), kind)
    }

    fn model_with(compilation: Compilation) -> InMemorySemanticModel {
        InMemorySemanticModel::build(compilation)
    }

    #[test]
    fn null_literal_classifies_null() {
        let c = Compilation::new();
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();
        assert_eq!(classify(&e(1, ExprKind::NullLiteral), &model, &kb, &mut ctx), ValueType::Null);
    }

    #[test]
    fn string_literal_and_nameof_classify_not_null() {
        let c = Compilation::new();
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();
        assert_eq!(
            classify(&e(1, ExprKind::StringLiteral("x".into())), &model, &kb, &mut ctx),
            ValueType::NotNull
        );
        assert_eq!(classify(&e(2, ExprKind::NameOf("x".into())), &model, &kb, &mut ctx), ValueType::NotNull);
    }

    #[test]
    fn foreach_local_is_not_null_plain_local_is_maybe_null() {
        let mut c = Compilation::new();
        let foreach_local = Symbol { is_foreach_local: true, ..Symbol::new(1, SymbolKind::Local, "item") };
        c.add_symbol(foreach_local);
        let plain_local = Symbol::new(2, SymbolKind::Local, "x");
        c.add_symbol(plain_local);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();
        assert_eq!(classify(&e(1, ExprKind::Identifier(1)), &model, &kb, &mut ctx), ValueType::NotNull);
        assert_eq!(classify(&e(2, ExprKind::Identifier(2)), &model, &kb, &mut ctx), ValueType::MaybeNull);
    }

    #[test]
    fn annotated_field_classifies_not_null() {
        let mut c = Compilation::new();
        let field = Symbol::new(1, SymbolKind::Field, "name").with_attributes(["NotNull"]);
        c.add_symbol(field);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();
        assert_eq!(classify(&e(1, ExprKind::Identifier(1)), &model, &kb, &mut ctx), ValueType::NotNull);
    }

    #[test]
    fn ternary_is_not_null_only_when_both_branches_are() {
        let c = Compilation::new();
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let both_not_null = e(
            1,
            ExprKind::Ternary {
                condition: Box::new(e(2, ExprKind::This)),
                then_branch: Box::new(e(3, ExprKind::StringLiteral("a".into()))),
                else_branch: Box::new(e(4, ExprKind::StringLiteral("b".into()))),
            },
        );
        assert_eq!(classify(&both_not_null, &model, &kb, &mut ctx), ValueType::NotNull);

        let one_null = e(
            5,
            ExprKind::Ternary {
                condition: Box::new(e(6, ExprKind::This)),
                then_branch: Box::new(e(7, ExprKind::StringLiteral("a".into()))),
                else_branch: Box::new(e(8, ExprKind::NullLiteral)),
            },
        );
        assert_eq!(classify(&one_null, &model, &kb, &mut ctx), ValueType::MaybeNull);
    }

    #[test]
    fn both_branches_null_literal_is_maybe_null_not_null() {
        // spec.md §8 boundary: a ternary with both branches `null` is
        // MaybeNull, the conservative value, not Null.
        let c = Compilation::new();
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();
        let both_null = e(
            1,
            ExprKind::Ternary {
                condition: Box::new(e(2, ExprKind::This)),
                then_branch: Box::new(e(3, ExprKind::NullLiteral)),
                else_branch: Box::new(e(4, ExprKind::NullLiteral)),
            },
        );
        assert_eq!(classify(&both_null, &model, &kb, &mut ctx), ValueType::MaybeNull);
    }

    #[test]
    fn coalesce_classifies_underlying_of_right_and_surfaces_unknown_shape() {
        let mut c = Compilation::new();
        let field = Symbol::new(1, SymbolKind::Field, "name").with_attributes(["NotNull"]);
        c.add_symbol(field);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let good = e(
            1,
            ExprKind::Coalesce {
                left: Box::new(e(2, ExprKind::NullLiteral)),
                right: Box::new(e(3, ExprKind::Identifier(1))),
            },
        );
        assert_eq!(classify(&good, &model, &kb, &mut ctx), ValueType::NotNull);
        assert!(ctx.parse_failures.is_empty());

        let bad = e(
            4,
            ExprKind::Coalesce {
                left: Box::new(e(5, ExprKind::NullLiteral)),
                right: Box::new(e(
                    6,
                    ExprKind::Binary {
                        op: "==".into(),
                        left: Box::new(e(7, ExprKind::Identifier(1))),
                        right: Box::new(e(8, ExprKind::NullLiteral)),
                    },
                )),
            },
        );
        assert_eq!(classify(&bad, &model, &kb, &mut ctx), ValueType::MaybeNull);
        assert_eq!(ctx.parse_failures.len(), 1);
    }

    #[test]
    fn invocation_of_known_non_null_method_sets_ctx_flag() {
        let mut c = Compilation::new();
        let substring = Symbol::new(1, crate::model::SymbolKind::Method, "Substring");
        c.add_symbol(substring);
        let mut string_ty = TypeInfo::new(100, "string");
        string_ty.members.push(1);
        c.add_type(string_ty);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let call = e(1, ExprKind::Invocation { callee: 1, receiver: None, args: Vec::new() });
        assert_eq!(classify(&call, &model, &kb, &mut ctx), ValueType::NotNull);
        assert!(ctx.has_not_null_attribute);
    }

    #[test]
    fn invocation_returning_value_type_is_not_null() {
        let mut c = Compilation::new();
        let value_ty = TypeInfo::value_type(200, "int");
        c.add_type(value_ty);
        let method = Symbol { declared_type: Some(200), ..Symbol::new(1, crate::model::SymbolKind::Method, "Count") };
        c.add_symbol(method);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let call = e(1, ExprKind::Invocation { callee: 1, receiver: None, args: Vec::new() });
        assert_eq!(classify(&call, &model, &kb, &mut ctx), ValueType::NotNull);
        assert!(!ctx.has_not_null_attribute);
    }

    #[test]
    fn await_of_configure_await_classifies_receiver() {
        let mut c = Compilation::new();
        let configure_await = Symbol::new(1, crate::model::SymbolKind::Method, "ConfigureAwait");
        c.add_symbol(configure_await);
        let mut task_ty = TypeInfo::new(300, "Task`1");
        task_ty.members.push(1);
        c.add_type(task_ty);
        let field = Symbol::new(2, SymbolKind::Field, "Value").with_attributes(["NotNull"]);
        c.add_symbol(field);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let receiver = e(1, ExprKind::Identifier(2));
        let call = e(2, ExprKind::Invocation { callee: 1, receiver: Some(Box::new(receiver)), args: Vec::new() });
        let awaited = e(3, ExprKind::Await(Box::new(call)));
        assert_eq!(classify(&awaited, &model, &kb, &mut ctx), ValueType::NotNull);
    }

    #[test]
    fn add_expression_is_not_null_for_value_type_string_type_or_tolist_call() {
        let mut c = Compilation::new();
        let value_ty = TypeInfo::value_type(1, "int");
        c.add_type(value_ty);
        let string_ty = TypeInfo::new(2, "string");
        c.add_type(string_ty);
        let model = model_with(c);
        let kb = KnowledgeBase::build(model.compilation());
        let mut ctx = ClassifyCtx::new();

        let int_add = e(
            1,
            ExprKind::Add {
                left: Box::new(e(2, ExprKind::NullLiteral)),
                right: Box::new(e(3, ExprKind::NullLiteral)),
                result_type: Some(1),
                is_tolist_call: false,
            },
        );
        assert_eq!(classify(&int_add, &model, &kb, &mut ctx), ValueType::NotNull);

        let string_add = e(
            4,
            ExprKind::Add {
                left: Box::new(e(5, ExprKind::NullLiteral)),
                right: Box::new(e(6, ExprKind::NullLiteral)),
                result_type: Some(2),
                is_tolist_call: false,
            },
        );
        assert_eq!(classify(&string_add, &model, &kb, &mut ctx), ValueType::NotNull);

        let tolist_add = e(
            7,
            ExprKind::Add {
                left: Box::new(e(8, ExprKind::NullLiteral)),
                right: Box::new(e(9, ExprKind::NullLiteral)),
                result_type: None,
                is_tolist_call: true,
            },
        );
        assert_eq!(classify(&tolist_add, &model, &kb, &mut ctx), ValueType::NotNull);

        let unrelated_add = e(
            10,
            ExprKind::Add {
                left: Box::new(e(11, ExprKind::NullLiteral)),
                right: Box::new(e(12, ExprKind::NullLiteral)),
                result_type: None,
                is_tolist_call: false,
            },
        );
        assert_eq!(classify(&unrelated_add, &model, &kb, &mut ctx), ValueType::MaybeNull);
    }
}
