//! Trace schema as data

use nether_flat::{Schema, SchemaError};

/// TOML source of the trace schema
pub const TRACE_SCHEMA: &str = include_str!("../schemas/trace.toml");

/// Parse and validate the trace schema.
pub fn trace_schema() -> Result<Schema, SchemaError> {
    Schema::from_toml_str(TRACE_SCHEMA)
}
