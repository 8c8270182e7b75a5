//! Infrastructure-failure error type, distinct from the `ParseFailure`
//! diagnostic (`spec.md` §7): a `ParseFailure` is a normal, cataloged
//! analyzer *output* for an unrecognized expression shape, while
//! `AnalyzerError` is for conditions that should never happen given a
//! well-formed host - a cache entry under the wrong key, an I/O failure
//! loading a program fixture, and the like.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to read program file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse program JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("method analysis cache inconsistency for symbol {0}")]
    CacheInconsistency(crate::model::SymbolId),

    #[error("expiring cache lock could not be acquired within {0:?}")]
    LockTimeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
