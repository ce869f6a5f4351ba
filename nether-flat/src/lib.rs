//! Nether-Flat: zero-copy, offset-based binary tables for Nethercore
//!
//! Buffers are built once, back-to-front, by a [`FlatBuilder`] and then read in
//! place: a [`Table`] view resolves fields through a shared vtable without
//! decoding or allocating. Tables may omit fields (they read back as their
//! default), so schemas can grow without breaking old readers.
//!
//! # Key Features
//!
//! - **Zero-copy reads**: strings and byte vectors borrow the buffer
//! - **Shared vtables**: identical field layouts are written once
//! - **Checked by default**: every read is bounds-checked; `unsafe` unchecked
//!   accessors exist for buffers that passed the [`Verifier`]
//! - **Schemas as data**: TOML descriptors drive the verifier, [`DynTable`]
//!   and [`DynBuilder`]
//!
//! # Buffer Layout
//!
//! ```text
//! [root uoffset][identifier?] ... vtables / tables / strings / vectors ...
//!
//! vtable: [vtable size: u16][table size: u16][field voffset: u16]*
//! table:  [soffset to vtable: i32][inline fields...]
//! string: [len: u32][bytes][0]
//! vector: [len: u32][elements]
//! ```
//!
//! # Usage
//!
//! ```
//! use nether_flat::{FlatBuilder, reader};
//!
//! let mut builder = FlatBuilder::new();
//! let name = builder.create_string("match1").unwrap();
//! builder.start_object(2).unwrap();
//! builder.push_slot_offset(0, name).unwrap();
//! builder.push_slot(1, 42u32, 0).unwrap();
//! let root = builder.end_object().unwrap();
//! let bytes = builder.finish(root).unwrap();
//!
//! let table = reader::root(bytes).unwrap();
//! assert_eq!(table.get_str(0).unwrap(), Some("match1"));
//! assert_eq!(table.get(1, 0u32).unwrap(), 42);
//! ```

mod builder;
pub mod config;
mod error;
pub mod layout;
pub mod reader;
pub mod schema;
mod structs;
mod verifier;

pub use builder::{FinishedBuffer, FlatBuilder};
pub use config::{BuilderOptions, FlatConfig, VerifierOptions};
pub use error::{BuildError, ReadError, ReadResult, SchemaError};
pub use layout::{
    FILE_IDENTIFIER_LENGTH, Offset, Scalar, StrOffset, StructOffset, TableOffset, VectorOffset,
};
pub use reader::{Inline, Table, VTable, Vector};
pub use schema::{DynBuilder, DynTable, Literal, Schema, Value};
pub use structs::FlatStruct;
pub use verifier::Verifier;
