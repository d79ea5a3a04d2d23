//! Error types shared by every marshaling back-end.

/// Result type for XDR operations.
pub type XdrResult<T> = std::result::Result<T, XdrError>;

/// Errors that can occur while walking a value with a visitor.
#[derive(Debug, thiserror::Error)]
pub enum XdrError {
    /// Free-form message from a back-end.
    #[error("{0}")]
    Message(String),

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    Eof,

    /// Opaque or string padding contained a non-zero byte.
    #[error("non-zero padding after {0} bytes of data")]
    BadPadding(usize),

    /// Variable-length data longer than the declared bound.
    #[error("{type_name}: length {len} exceeds bound {bound}")]
    LengthExceedsBound {
        type_name: &'static str,
        len: u64,
        bound: u32,
    },

    /// Fixed-length data of the wrong size.
    #[error("{type_name}: expected exactly {expected} elements, got {len}")]
    WrongLength {
        type_name: &'static str,
        len: usize,
        expected: usize,
    },

    /// Invalid boolean value (must be 0 or 1).
    #[error("invalid boolean value: {0}")]
    InvalidBool(u32),

    /// Invalid presence flag of an optional (must be 0 or 1).
    #[error("invalid optional flag: {0}")]
    InvalidOptionFlag(u32),

    /// Value that is not one of the tags of an enum.
    #[error("{type_name}: invalid enum value {value}")]
    InvalidEnum { type_name: &'static str, value: i32 },

    /// Union discriminant that selects no arm.
    #[error("{type_name}: invalid union discriminant {tag}")]
    InvalidUnion { type_name: &'static str, tag: String },

    /// String is not valid UTF-8.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Trailing data after decoding.
    #[error("trailing data: {0} bytes remaining")]
    TrailingData(usize),

    /// Text that cannot be parsed as a value of the expected shape.
    #[error("{type_name}: cannot parse {text:?}")]
    Parse { type_name: &'static str, text: String },

    /// JSON decoding failure at a given path.
    #[error("json at {path:?}: {message}")]
    Json { path: String, message: String },

    /// The visitor was handed a shape it cannot process.
    #[error("unsupported shape for type {type_name}")]
    UnsupportedShape { type_name: &'static str },

    /// Output sink failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl XdrError {
    /// Build a [`XdrError::Message`] from anything printable.
    pub fn msg(message: impl std::fmt::Display) -> Self {
        XdrError::Message(message.to_string())
    }
}
