//! Underlying-Member Resolver (`spec.md` §4.4). Grounded on
//! `analysis::null_safety::extract_var_name_from_expr` / `extract_var_name`,
//! generalized to the full wrapper table and to surfacing unknown shapes as
//! a `ParseFailure` rather than silently returning nothing (`spec.md` §4.4,
//! §7: "never silently ignored").

use crate::model::{Expression, ExprKind, Span};

/// An expression shape `underlying()` does not recognize. Carries the
/// node's location and kind so the caller can turn it into a
/// `ParseFailure` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownShape {
    pub span: Span,
    pub kind_name: String,
}

/// Peels syntactic wrappers to find the "real" symbol whose nullness a
/// guard targets (`spec.md` §4.4). Ternary is a terminal case: the caller
/// is responsible for splitting into `then_branch`/`else_branch` and
/// calling `underlying` on each, per the spec's explicit instruction.
pub fn underlying(expr: &Expression) -> Result<&Expression, UnknownShape> {
    match &expr.kind {
        ExprKind::MemberAccess { .. } => Ok(expr),
        ExprKind::ConditionalAccess { when_not_null, .. } => underlying(when_not_null),
        ExprKind::MemberBinding { .. } => Ok(expr),
        ExprKind::Paren(inner) => underlying(inner),
        ExprKind::Assignment { value, .. } => underlying(value),
        ExprKind::Await(inner) => underlying(inner),
        ExprKind::Cast { inner, .. } => underlying(inner),
        ExprKind::PrefixUnary { operand, .. } => underlying(operand),
        ExprKind::As { left, .. } => underlying(left),
        ExprKind::Coalesce { right, .. } => underlying(right),

        // Terminal: the node itself identifies the target.
        ExprKind::Identifier(_)
        | ExprKind::NullLiteral
        | ExprKind::StringLiteral(_)
        | ExprKind::InterpolatedString(_)
        | ExprKind::NameOf(_)
        | ExprKind::Invocation { .. }
        | ExprKind::This
        | ExprKind::ElementAccess { .. }
        | ExprKind::ObjectCreation { .. }
        | ExprKind::ArrayCreation { .. }
        | ExprKind::Throw(_)
        | ExprKind::Tuple(_)
        | ExprKind::Ternary { .. }
        // Not named explicitly among the spec's terminal list, but equally
        // self-describing leaves rather than unusual shapes - treated as
        // terminal rather than an unrecognized node.
        | ExprKind::Lambda { .. } => Ok(expr),

        ExprKind::Add { .. } | ExprKind::Binary { .. } | ExprKind::Unknown { .. } => {
            Err(UnknownShape { span: expr.span, kind_name: node_kind_name(&expr.kind) })
        }
    }
}

fn node_kind_name(kind: &ExprKind) -> String {
    match kind {
        ExprKind::Unknown { kind_name } => kind_name.clone(),
        ExprKind::Add { .. } => "Add".to_string(),
        ExprKind::Binary { op, .. } => format!("Binary({op})"),
        other => format!("{other:?}").split_whitespace().next().unwrap_or("Unknown").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExprKind::*;

    fn e(id: u32, kind: crate::model::ExprKind) -> Expression {
        Expression::new(id, Span::default(), kind)
    }

    #[test]
    fn strips_parens_and_casts() {
        let inner = e(1, Identifier(10));
        let parened = e(2, Paren(Box::new(inner)));
        let casted = e(3, Cast { type_id: None, inner: Box::new(parened) });
        let result = underlying(&casted).unwrap();
        assert!(matches!(result.kind, Identifier(10)));
    }

    #[test]
    fn coalesce_resolves_to_right() {
        let left = e(1, NullLiteral);
        let right = e(2, Identifier(5));
        let coalesce = e(3, Coalesce { left: Box::new(left), right: Box::new(right) });
        let result = underlying(&coalesce).unwrap();
        assert!(matches!(result.kind, Identifier(5)));
    }

    #[test]
    fn unknown_shape_surfaces_as_error() {
        let bad = e(1, Unknown { kind_name: "WeirdNode".to_string() });
        let err = underlying(&bad).unwrap_err();
        assert_eq!(err.kind_name, "WeirdNode");
    }

    #[test]
    fn raw_binary_is_unknown_shape_not_silently_ignored() {
        let left = e(1, Identifier(1));
        let right = e(2, NullLiteral);
        let cmp = e(3, Binary { op: "==".to_string(), left: Box::new(left), right: Box::new(right) });
        assert!(underlying(&cmp).is_err());
    }
}
