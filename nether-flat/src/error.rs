//! Error types for building, reading and verifying buffers

/// Construction-side misuse. These are programmer errors and are surfaced
/// immediately rather than recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Field written outside an open object, or with a slot past its field count
    #[error("invalid slot {slot} (open object declares {field_count} fields)")]
    InvalidSlot { slot: u16, field_count: u16 },

    /// `end_object` without a matching `start_object`
    #[error("no object is open")]
    NoOpenObject,

    /// An object is still open (nested start, string/vector creation or finish)
    #[error("an object is still open; finish it before starting another or finishing the buffer")]
    UnclosedObject,

    /// Any other violation of the construction order
    #[error("builder misuse: {0}")]
    BuilderMisuse(&'static str),

    /// Offset handed out by a different builder, or before a reset.
    /// A specific case of [`BuildError::BuilderMisuse`], reported with the offending offset.
    #[error("offset {0} does not belong to this builder")]
    ForeignOffset(u32),

    /// `finish` called before any object was built
    #[error("nothing has been built yet")]
    NothingToFinish,

    /// Builder already finished; call `reset` to reuse it
    #[error("buffer is already finished")]
    AlreadyFinished,

    /// A required slot was not written before `end_object`
    #[error("required field in slot {slot} is missing")]
    MissingRequiredField { slot: u16 },

    /// Buffer would exceed the 2 GiB offset range
    #[error("buffer would exceed the maximum size of 2 GiB")]
    BufferTooLarge,

    /// `end_vector` called with a different element count than was pushed
    #[error("vector declared {declared} elements but {pushed} were pushed")]
    VectorLengthMismatch { declared: usize, pushed: usize },
}

/// Read-side failure: the buffer does not hold what the caller expects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// A read of `len` bytes at `pos` would leave the buffer
    #[error("read of {len} bytes at {pos} is outside the buffer ({buffer_len} bytes)")]
    OutOfBounds {
        pos: usize,
        len: usize,
        buffer_len: usize,
    },

    /// Buffer shorter than its own header (root offset, identifier, size prefix)
    #[error("buffer truncated: need {needed} bytes, have {actual}")]
    Truncated { needed: usize, actual: usize },

    /// uoffset of zero or pointing backwards
    #[error("invalid offset at {pos}")]
    InvalidOffset { pos: usize },

    /// Vector element index past the vector's length
    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// String bytes are not UTF-8
    #[error("string at {pos} is not valid UTF-8")]
    InvalidUtf8 { pos: usize },

    /// String is not followed by its NUL terminator
    #[error("string at {pos} is missing its NUL terminator")]
    MissingNulTerminator { pos: usize },

    /// VTable header is malformed
    #[error("malformed vtable at {pos}: {reason}")]
    BadVTable { pos: usize, reason: &'static str },

    /// Field offset points outside the table's inline region
    #[error("field in slot {slot} of table at {table_pos} lies outside the table")]
    FieldOutsideTable { table_pos: usize, slot: u16 },

    /// File identifier does not match
    #[error("file identifier mismatch: expected {expected:?}, found {found:?}")]
    IdentifierMismatch { expected: [u8; 4], found: [u8; 4] },

    /// Value at `pos` is not aligned to its size
    #[error("unaligned {size}-byte value at {pos}")]
    Unaligned { pos: usize, size: usize },

    /// Nesting deeper than the verifier allows
    #[error("nesting depth exceeds {0}")]
    DepthLimitExceeded(usize),

    /// More tables than the verifier allows
    #[error("buffer contains more than {0} tables")]
    TooManyTables(usize),

    /// Buffer larger than the verifier allows
    #[error("buffer of {size} bytes exceeds the limit of {limit} bytes")]
    BufferTooLarge { size: usize, limit: usize },

    /// A required field is absent
    #[error("required field `{field}` of `{table}` is missing")]
    MissingRequiredField { table: String, field: String },

    /// Union tag not declared by the schema
    #[error("unknown tag {tag} for union `{union}`")]
    UnknownUnionTag { union: String, tag: u8 },

    /// Field name not declared by the schema
    #[error("unknown field `{field}` in `{owner}`")]
    UnknownField { owner: String, field: String },

    /// Field accessed as the wrong kind of value
    #[error("field `{field}` is {actual}, not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Convenience alias for read results
pub type ReadResult<T> = Result<T, ReadError>;

/// Schema loading and schema-driven building failures.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to parse schema: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate {kind} `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("slot {slot} is used twice in table `{table}`")]
    DuplicateSlot { table: String, slot: u16 },

    #[error("unknown type `{name}` for `{owner}.{field}`")]
    UnknownType {
        owner: String,
        field: String,
        name: String,
    },

    #[error("invalid type for `{owner}.{field}`: {reason}")]
    InvalidType {
        owner: String,
        field: String,
        reason: &'static str,
    },

    #[error("invalid default for `{table}.{field}`")]
    InvalidDefault { table: String, field: String },

    /// Malformed struct, enum or union definition
    #[error("invalid definition of `{name}`: {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("root table `{0}` is not declared")]
    UnknownRoot(String),

    #[error("file identifier must be exactly 4 bytes, got `{0}`")]
    InvalidIdentifier(String),

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("unknown field `{field}` in `{owner}`")]
    UnknownField { owner: String, field: String },

    #[error("field `{field}` is {actual}, not {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("value for `{field}` does not fit in {ty}")]
    OutOfRange { field: String, ty: &'static str },

    #[error("field `{table}.{field}` is deprecated")]
    DeprecatedField { table: String, field: String },

    #[error("no table is open")]
    NoOpenTable,

    #[error(transparent)]
    Build(#[from] BuildError),
}
