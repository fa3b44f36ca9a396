//! Fatal error taxonomy for declaration, validation, serialization and
//! code generation. Everything here aborts the artifact being produced;
//! the one *recoverable* family (wire decoding) lives in `wire::WireError`
//! because decoding is a runtime operation, not a build-time one.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed shape declaration (duplicate field, reserved prefix,
    /// degenerate union, bad enum value). Detected eagerly at declare time.
    #[error("shape declaration error: {0}")]
    Decl(String),

    /// A supplied or defaulted value failed the type checker.
    #[error("field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// A target-reference leaf was reached under the fail policy.
    #[error(
        "field '{field}' holds target '{target}' and cannot safely be serialized: \
         resolved paths are not stable cache keys. Serialize with \
         TargetPolicy::Resolve to emit a build-time `$(location ...)` \
         indirection instead."
    )]
    TargetSerialization { field: String, target: String },

    /// Thrift field-number mapping does not match the declared field set.
    #[error("shape '{shape}': thrift field mapping {reason}")]
    ThriftMapping { shape: String, reason: String },

    /// IR extraction failed (unresolvable reference, bad module target,
    /// target value inside a default, ...).
    #[error("ir extraction: {0}")]
    Extract(String),

    /// Rendering the IR through a backend failed.
    #[error("codegen: {0}")]
    Codegen(String),
}

pub type Result<T> = std::result::Result<T, Error>;
