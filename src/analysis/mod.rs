//! The analyzer proper: Symbol Knowledge Base, Annotation Reader,
//! Underlying-Member Resolver, Expression Classifier, Method-Local Flow
//! Analyzer, and Diagnostic Emitter (`spec.md` §4).

pub mod annotations;
pub mod classifier;
pub mod emitter;
pub mod flow;
pub mod knowledge_base;
pub mod underlying;
