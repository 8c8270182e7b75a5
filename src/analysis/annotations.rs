//! Annotation Reader (`spec.md` §4.2). Grounded on
//! `parser::safety_annotations`'s name-based `@safe`/`@unsafe` matching
//! convention: attribute identity here is likewise by short type name only,
//! so a caller-defined `NotNullAttribute` works without depending on any
//! particular attribute library (`spec.md` §6, §9).

use crate::model::{AttributeKind, Compilation, SymbolId};

/// Matches an attribute's raw written name (e.g. `"NotNullAttribute"` or
/// `"NotNull"`) to the `AttributeKind` it denotes, stripping a trailing
/// `Attribute` suffix per the language's usual attribute-name convention.
pub fn match_attribute_name(raw: &str) -> Option<AttributeKind> {
    let stripped = raw.strip_suffix("Attribute").unwrap_or(raw);
    match stripped {
        "NotNull" => Some(AttributeKind::NotNull),
        "CheckNull" => Some(AttributeKind::CheckNull),
        "IsNullCheck" => Some(AttributeKind::IsNullCheck),
        _ => None,
    }
}

fn symbol_has(compilation: &Compilation, symbol: SymbolId, wanted: &[AttributeKind]) -> bool {
    compilation
        .symbol(symbol)
        .map(|s| s.attributes.iter().filter_map(|a| match_attribute_name(a)).any(|k| wanted.contains(&k)))
        .unwrap_or(false)
}

/// `has(symbol, attr_set)` (`spec.md` §4.2): true if any of `wanted`
/// decorates `symbol`. When `symbol` is a property accessor method, also
/// checks the associated property's attributes - but no further transitive
/// inheritance is performed.
pub fn has(compilation: &Compilation, symbol: SymbolId, wanted: &[AttributeKind]) -> bool {
    if symbol_has(compilation, symbol, wanted) {
        return true;
    }
    if let Some(sym) = compilation.symbol(symbol) {
        if let Some(prop) = sym.associated_property {
            return symbol_has(compilation, prop, wanted);
        }
    }
    false
}

/// Convenience: the `NotNull`/`CheckNull` union check used throughout the
/// classifier and flow analyzer (`spec.md` §3: "A target symbol that bears
/// both `NotNull` and `CheckNull` is treated identically to bearing
/// either").
pub fn has_not_null_contract(compilation: &Compilation, symbol: SymbolId) -> bool {
    has(compilation, symbol, &[AttributeKind::NotNull, AttributeKind::CheckNull])
}

pub fn has_is_null_check(compilation: &Compilation, symbol: SymbolId) -> bool {
    has(compilation, symbol, &[AttributeKind::IsNullCheck])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Symbol, SymbolKind};

    #[test]
    fn matches_attribute_with_or_without_suffix() {
        assert_eq!(match_attribute_name("NotNull"), Some(AttributeKind::NotNull));
        assert_eq!(match_attribute_name("NotNullAttribute"), Some(AttributeKind::NotNull));
        assert_eq!(match_attribute_name("Obsolete"), None);
    }

    #[test]
    fn getter_inherits_property_attribute() {
        let mut c = Compilation::new();
        let prop = Symbol::new(1, SymbolKind::Property, "Name").with_attributes(["NotNull"]);
        c.add_symbol(prop);
        let getter =
            Symbol { associated_property: Some(1), ..Symbol::new(2, SymbolKind::PropertyAccessor, "get_Name") };
        c.add_symbol(getter);

        assert!(has_not_null_contract(&c, 2));
    }

    #[test]
    fn union_semantics_for_checknull_and_notnull() {
        let mut c = Compilation::new();
        let s = Symbol::new(1, SymbolKind::Field, "x").with_attributes(["CheckNull"]);
        c.add_symbol(s);
        assert!(has_not_null_contract(&c, 1));
    }

    #[test]
    fn no_transitive_inheritance_beyond_accessor_to_property() {
        let mut c = Compilation::new();
        let base_getter = Symbol::new(1, SymbolKind::PropertyAccessor, "get_Name").with_attributes(["NotNull"]);
        c.add_symbol(base_getter);
        // A method unrelated to symbol 1 does not inherit its attribute.
        let other = Symbol::new(2, SymbolKind::Method, "Other");
        c.add_symbol(other);
        assert!(!has_not_null_contract(&c, 2));
    }
}
