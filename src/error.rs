//! Defines [`GeoWireError`], representing all errors returned by this crate.

use thiserror::Error;

/// Enum with all errors in this crate.
///
/// Codec failures carry a formatted context string (declared vs. available
/// byte counts, the offending index or type code) so callers can log a
/// useful diagnostic without re-parsing the input.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeoWireError {
    /// Buffer shorter than the declared/required size. Detected by explicit
    /// length arithmetic before the read, never by a fault.
    #[error("Not enough data: {0}")]
    NotEnoughData(String),

    /// Internally inconsistent input: absurd counts, out-of-range or
    /// non-increasing indices, type-code mismatches, malformed token
    /// sequences, or over-deep container nesting.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// A geometry type valid in the model but not representable in the
    /// requested wire format or dialect.
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    /// Incorrect geometry type for operation.
    #[error("Incorrect geometry type for operation: {0}")]
    IncorrectGeometryType(String),

    /// Allocation failure for a validated-reasonable buffer or tree.
    #[error("Not enough memory: {0}")]
    NotEnoughMemory(String),

    /// An optional external collaborator (e.g. a topology engine) is not
    /// available for the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// [std::io::Error]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, GeoWireError>;
