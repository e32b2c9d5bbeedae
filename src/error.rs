use thiserror::Error;

/// The error type shared by every module in this crate.
///
/// Variants are grouped by the pipeline stage that raises them: coordinate
/// and transform validation, Insert-Track preconditions, store structural
/// errors, and I/O parsing. Strict-mode validation failures surface as
/// errors; graceful mode substitutes a fallback value and logs instead.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum CurveEditorError {
    /// A coordinate was non-finite or exceeded `max_coordinate` under
    /// strict validation.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A scale value was non-finite, non-positive, or below `min_scale`.
    #[error("invalid scale: {0}")]
    InvalidScale(String),

    /// A transform's combined scale underflowed `min_scale_value` and an
    /// inverse was requested anyway.
    #[error("transform is not invertible: {0}")]
    NonInvertible(String),

    /// Malformed input: wrong tuple arity, non-numeric field, bad header.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The gap containing the focus frame has no closing boundary.
    #[error("gap is open-ended and cannot be filled")]
    OpenGap,

    /// Fewer than two overlap frames were found where deformation needs
    /// at least two to interpolate an offset.
    #[error("insufficient overlap frames for deformation")]
    InsufficientOverlap,

    /// A donor curve has no usable data for the requested gap.
    #[error("donor curve has no usable data for this gap")]
    NoDonorData,

    /// Averaging sources share no common frame.
    #[error("no common frames across source curves")]
    NoCommonFrames,

    /// `from_normalized` was called on a curve that was never normalized.
    #[error("curve is not normalized")]
    NotNormalized,

    /// A batch of points did not match the shape a batch transform expects.
    #[error("malformed point batch: {0}")]
    InvalidBatchShape(String),

    /// An index or frame lookup referenced something the store doesn't have.
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// A curve name collided with an existing curve in a `MultiCurveStore`.
    #[error("curve already exists: {0}")]
    DuplicateCurve(String),

    /// A curve name was not found in a `MultiCurveStore`.
    #[error("unknown curve: {0}")]
    UnknownCurve(String),

    /// JSON (de)serialization failure at the `io::json` boundary.
    #[error("json error: {0}")]
    Json(String),

    /// A tracking file could not be parsed into the expected format.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CurveEditorError>;

impl From<serde_json::Error> for CurveEditorError {
    fn from(err: serde_json::Error) -> Self {
        CurveEditorError::Json(err.to_string())
    }
}
