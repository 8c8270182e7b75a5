//! Symbol Knowledge Base (`spec.md` §4.1, §3 `KnownSymbols`).
//!
//! Resolved once per compilation. Grounded on
//! `parser::type_annotations::TypeLifetimeRegistry` (a registry populated
//! once via `load_stl_annotations`, keyed by name, queried defensively) and
//! on `analysis::null_safety::is_known_nonnull_function`.

use crate::model::Compilation;
use std::collections::HashSet;

type SymbolId = crate::model::SymbolId;

/// One `(containing type name, member name)` entry the Knowledge Base
/// resolves defensively against a given compilation.
struct WellKnownMember {
    type_name: &'static str,
    member_name: &'static str,
}

const NOT_NULL_METHODS: &[WellKnownMember] = &[
    WellKnownMember { type_name: "string", member_name: "Substring" },
    WellKnownMember { type_name: "Uri", member_name: "ToString" },
    WellKnownMember { type_name: "Guid", member_name: "ToString" },
    WellKnownMember { type_name: "Enumerable", member_name: "ToList" },
    WellKnownMember { type_name: "Enumerable", member_name: "ToArray" },
    WellKnownMember { type_name: "Enumerable", member_name: "Where" },
    WellKnownMember { type_name: "Enumerable", member_name: "Select" },
    WellKnownMember { type_name: "Path", member_name: "GetTempPath" },
    WellKnownMember { type_name: "Marshal", member_name: "PtrToStructure" },
    WellKnownMember { type_name: "Task", member_name: "FromResult" },
    WellKnownMember { type_name: "Task`1", member_name: "ConfigureAwait" },
];

const NOT_NULL_PROPERTIES: &[WellKnownMember] = &[
    WellKnownMember { type_name: "Dictionary`2", member_name: "Keys" },
    WellKnownMember { type_name: "Dictionary`2", member_name: "Values" },
];

const ENUMERABLE_COMBINATORS: &[WellKnownMember] = &[
    WellKnownMember { type_name: "Enumerable", member_name: "ToList" },
    WellKnownMember { type_name: "Enumerable", member_name: "ToArray" },
    WellKnownMember { type_name: "Enumerable", member_name: "Where" },
    WellKnownMember { type_name: "Enumerable", member_name: "Select" },
];

/// Resolved, per-compilation knowledge of well-known standard-library
/// members. Missing members (different target-framework profile) are
/// simply absent rather than an error - "defensive" resolution per
/// `spec.md` §4.1.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    not_null_methods: HashSet<SymbolId>,
    not_null_properties: HashSet<SymbolId>,
    enumerable_combinators: HashSet<SymbolId>,
    string_is_null_or_empty: Option<SymbolId>,
    string_is_null_or_whitespace: Option<SymbolId>,
    uri_try_create: Option<SymbolId>,
    task_configure_await: Option<SymbolId>,
}

fn resolve(compilation: &Compilation, entry: &WellKnownMember) -> Option<SymbolId> {
    compilation.types.values().find(|t| t.name == entry.type_name).and_then(|t| {
        t.members
            .iter()
            .copied()
            .find(|m| compilation.symbol(*m).map(|s| s.name.as_str()) == Some(entry.member_name))
    })
}

impl KnowledgeBase {
    pub fn build(compilation: &Compilation) -> Self {
        let mut kb = KnowledgeBase::default();

        for entry in NOT_NULL_METHODS {
            if let Some(id) = resolve(compilation, entry) {
                kb.not_null_methods.insert(compilation.original_of(id));
            }
        }
        for entry in NOT_NULL_PROPERTIES {
            if let Some(id) = resolve(compilation, entry) {
                kb.not_null_properties.insert(compilation.original_of(id));
            }
        }
        for entry in ENUMERABLE_COMBINATORS {
            if let Some(id) = resolve(compilation, entry) {
                kb.enumerable_combinators.insert(compilation.original_of(id));
            }
        }

        kb.string_is_null_or_empty =
            resolve(compilation, &WellKnownMember { type_name: "string", member_name: "IsNullOrEmpty" });
        kb.string_is_null_or_whitespace =
            resolve(compilation, &WellKnownMember { type_name: "string", member_name: "IsNullOrWhiteSpace" });
        kb.uri_try_create = resolve(compilation, &WellKnownMember { type_name: "Uri", member_name: "TryCreate" });
        kb.task_configure_await =
            resolve(compilation, &WellKnownMember { type_name: "Task`1", member_name: "ConfigureAwait" });

        kb
    }

    /// True if `m`'s original (unreduced, ungenericized) definition is in
    /// the non-null method set. Extension-method invocations carry a
    /// reduced form that hides the explicit receiver; we normalize to the
    /// original static definition first.
    pub fn is_known_non_null_method(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.not_null_methods.contains(&compilation.original_of(m))
    }

    pub fn is_known_non_null_property(&self, compilation: &Compilation, p: SymbolId) -> bool {
        self.not_null_properties.contains(&compilation.original_of(p))
    }

    /// True if `m` is one of the enumerable combinator methods
    /// (`ToList`/`ToArray`/`Where`/`Select`) - used by the classifier's
    /// lambda-parameter rule (§4.3.1: "if the lambda sits inside a
    /// LINQ-style enumerable invocation").
    pub fn is_enumerable_combinator(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.enumerable_combinators.contains(&compilation.original_of(m))
    }

    pub fn is_string_is_null_or_empty(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.string_is_null_or_empty.map(|k| compilation.original_of(m) == k).unwrap_or(false)
    }

    pub fn is_string_is_null_or_whitespace(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.string_is_null_or_whitespace.map(|k| compilation.original_of(m) == k).unwrap_or(false)
    }

    pub fn is_uri_try_create(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.uri_try_create.map(|k| compilation.original_of(m) == k).unwrap_or(false)
    }

    /// True if `m` is `Task<T>.ConfigureAwait` - used by the await
    /// classifier rule to strip the wrapper and classify the receiver
    /// directly (`spec.md` §4.3.3).
    pub fn is_task_configure_await(&self, compilation: &Compilation, m: SymbolId) -> bool {
        self.task_configure_await.map(|k| compilation.original_of(m) == k).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Symbol, SymbolKind, TypeInfo};

    fn compilation_with_string_substring() -> Compilation {
        let mut c = Compilation::new();
        let substring = Symbol::new(1, SymbolKind::Method, "Substring");
        c.add_symbol(substring);
        let mut string_ty = TypeInfo::new(100, "string");
        string_ty.members.push(1);
        c.add_type(string_ty);
        c
    }

    #[test]
    fn resolves_known_non_null_method() {
        let c = compilation_with_string_substring();
        let kb = KnowledgeBase::build(&c);
        assert!(kb.is_known_non_null_method(&c, 1));
    }

    #[test]
    fn missing_member_resolves_to_unknown_not_error() {
        let c = Compilation::new();
        let kb = KnowledgeBase::build(&c);
        assert!(!kb.is_known_non_null_method(&c, 42));
        assert!(!kb.is_string_is_null_or_empty(&c, 42));
    }

    #[test]
    fn extension_method_normalizes_through_original_definition() {
        let mut c = compilation_with_string_substring();
        let reduced = Symbol { original_definition: Some(1), ..Symbol::new(2, SymbolKind::Method, "Substring") };
        c.add_symbol(reduced);
        let kb = KnowledgeBase::build(&c);
        assert!(kb.is_known_non_null_method(&c, 2));
    }
}
