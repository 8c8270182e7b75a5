//! Per-semantic-model memoization and coarse operation timers (`spec.md`
//! §5, §9). Grounded on `parser::header_cache::HeaderCache`'s "already
//! processed, skip" discipline (`processed_headers`), lifted to a
//! thread-safe version because `spec.md` §5 requires concurrent-read safety
//! the teacher's single-threaded cache doesn't need: "safe for concurrent
//! reads from parallel block analyses sharing one semantic model, and for
//! write-once initialization under a mutex."
//!
//! Method-analysis memoization follows a compute-if-absent discipline: two
//! threads racing for the same method key may both compute a
//! `MethodFlowAnalysis`, but only one result is retained, since results are
//! immutable and structurally equivalent (`spec.md` §5).

use crate::analysis::flow::MethodFlowAnalysis;
use crate::analysis::knowledge_base::KnowledgeBase;
use crate::model::{Compilation, MethodBody, SymbolId};
use crate::semantic::SemanticModel;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Coarse operation timers (`spec.md` §2 "Cache/Timing Infrastructure").
/// Accumulates total wall time spent per named operation across a whole
/// analyzer run; not itself part of the diagnostic output, but useful for
/// a host to log alongside diagnostics.
#[derive(Debug, Default)]
pub struct OperationTimer {
    totals: Mutex<HashMap<&'static str, Duration>>,
}

impl OperationTimer {
    pub fn new() -> Self {
        OperationTimer::default()
    }

    /// Times `f`, accumulating its duration under `name`, and returns `f`'s
    /// result.
    pub fn time<T>(&self, name: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        let mut totals = self.totals.lock().unwrap_or_else(|e| e.into_inner());
        *totals.entry(name).or_insert(Duration::ZERO) += elapsed;
        result
    }

    pub fn total(&self, name: &str) -> Duration {
        self.totals.lock().unwrap_or_else(|e| e.into_inner()).get(name).copied().unwrap_or(Duration::ZERO)
    }
}

/// Per–semantic-model cache of method analyses and the resolved Knowledge
/// Base (`spec.md` §3 "Lifecycle", §9 "Lazy, memoized per-method analyses").
/// One `AnalysisCache` is constructed per analyzer invocation (one per
/// semantic-model instance) and discarded with it - bounded, so it needs no
/// eviction policy.
pub struct AnalysisCache {
    knowledge_base: OnceCell<KnowledgeBase>,
    methods: Mutex<HashMap<SymbolId, std::sync::Arc<MethodFlowAnalysis>>>,
    pub timer: OperationTimer,
}

impl AnalysisCache {
    pub fn new() -> Self {
        AnalysisCache { knowledge_base: OnceCell::new(), methods: Mutex::new(HashMap::new()), timer: OperationTimer::new() }
    }

    /// Write-once initialization under a mutex-equivalent (`OnceCell`):
    /// only one thread populates the Knowledge Base per compilation; all
    /// others observe the already-built value.
    pub fn knowledge_base(&self, compilation: &Compilation) -> &KnowledgeBase {
        self.timer.time("knowledge_base.build", || self.knowledge_base.get_or_init(|| KnowledgeBase::build(compilation)))
    }

    /// Compute-if-absent for a method's flow analysis. Two callers racing
    /// on the same `owner` may both build a `MethodFlowAnalysis`, but only
    /// one survives in the cache; both return a structurally-equivalent,
    /// immutable result (`spec.md` §5).
    pub fn method_analysis(
        &self,
        model: &dyn SemanticModel,
        kb: &KnowledgeBase,
        body: &MethodBody,
    ) -> std::sync::Arc<MethodFlowAnalysis> {
        if let Some(existing) = self.methods.lock().unwrap_or_else(|e| e.into_inner()).get(&body.owner) {
            return existing.clone();
        }
        let built = std::sync::Arc::new(self.timer.time("method_analysis.build", || MethodFlowAnalysis::build(model, kb, body)));
        let mut methods = self.methods.lock().unwrap_or_else(|e| e.into_inner());
        methods.entry(body.owner).or_insert(built).clone()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        AnalysisCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Compilation, Symbol, SymbolKind};
    use crate::semantic::InMemorySemanticModel;

    #[test]
    fn knowledge_base_is_built_once() {
        let c = Compilation::new();
        let cache = AnalysisCache::new();
        let kb1 = cache.knowledge_base(&c) as *const KnowledgeBase;
        let kb2 = cache.knowledge_base(&c) as *const KnowledgeBase;
        assert_eq!(kb1, kb2);
    }

    #[test]
    fn method_analysis_is_memoized_per_owner() {
        let mut c = Compilation::new();
        c.add_symbol(Symbol::new(1, SymbolKind::Method, "M"));
        let body = crate::model::MethodBody { owner: 1, ctor_initializer: None, statements: Vec::new() };
        let model = InMemorySemanticModel::build(c);
        let cache = AnalysisCache::new();
        let kb = cache.knowledge_base(model.compilation());
        let a = cache.method_analysis(&model, kb, &body);
        let b = cache.method_analysis(&model, kb, &body);
        assert!(std::sync::Arc::ptr_eq(&a, &b));
    }
}
