//! The diagnostic catalog (`spec.md` §6). Grounded on
//! `fhirpath-diagnostics::diagnostic`'s `Severity` + structured-kind +
//! location shape (`octofhir-fhirpath-rs`).

use crate::model::{NodeId, Span, SymbolId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Hint,
    Warning,
    Error,
}

/// The fixed diagnostic catalog from `spec.md` §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    NullAssignment,
    AssignmentAfterCondition,
    AssignmentAfterConstraint,
    UnneededNullCheck,
    UnneededConstraint,
    InvalidConstraint,
    PropagateNotNullInCtors,
    NotNullAsRefParameter,
    ParseFailure { node_kind: String },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::NullAssignment
            | DiagnosticKind::AssignmentAfterCondition
            | DiagnosticKind::AssignmentAfterConstraint
            | DiagnosticKind::PropagateNotNullInCtors
            | DiagnosticKind::NotNullAsRefParameter => Severity::Error,
            DiagnosticKind::UnneededNullCheck | DiagnosticKind::UnneededConstraint => Severity::Hint,
            DiagnosticKind::InvalidConstraint => Severity::Warning,
            DiagnosticKind::ParseFailure { .. } => Severity::Warning,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::NullAssignment => "NullAssignment",
            DiagnosticKind::AssignmentAfterCondition => "AssignmentAfterCondition",
            DiagnosticKind::AssignmentAfterConstraint => "AssignmentAfterConstraint",
            DiagnosticKind::UnneededNullCheck => "UnneededNullCheck",
            DiagnosticKind::UnneededConstraint => "UnneededConstraint",
            DiagnosticKind::InvalidConstraint => "InvalidConstraint",
            DiagnosticKind::PropagateNotNullInCtors => "PropagateNotNullInCtors",
            DiagnosticKind::NotNullAsRefParameter => "NotNullAsRefParameter",
            DiagnosticKind::ParseFailure { .. } => "ParseFailure",
        }
    }
}

/// `{kind, location, message_context}` per `spec.md` §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Span,
    pub node: NodeId,
    /// The target symbol this diagnostic concerns, when applicable (the
    /// `NotNull`/`CheckNull` sink, the constrained target, etc.).
    pub target: Option<SymbolId>,
    pub message_context: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: Span, node: NodeId, message_context: impl Into<String>) -> Self {
        Diagnostic { kind, location, node, target: None, message_context: message_context.into() }
    }

    pub fn with_target(mut self, target: SymbolId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}
