// Copyright (c) 2026 the argrec authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Schema-driven command-line argument parsing into typed records.
//!
//! A [`Schema`] is compiled once from declarative field specifications —
//! positionals, options, and flags — and then matches flat token streams
//! into [`ParsedRecord`]s, or fails with a precise diagnostic. The
//! schema performs every spec-time check up front (duplicate aliases,
//! multiple variadic positionals, conflicting defaults), so a spec error
//! can never surface mid-parse.
//!
//! ## Basic example
//!
//! ```rust
//! use argrec::{ty, Flag, Opt, Positional, Schema};
//!
//! let schema = Schema::builder()
//!     .positional(Positional::new("path", ty::scalar::<std::path::PathBuf>()))
//!     .option(Opt::new("port", ty::scalar::<u16>()).default(8080u16).short())
//!     .flag(Flag::new("verbose").short())
//!     .build()
//!     .expect("valid schema");
//!
//! let record = schema.parse(&["/etc/hosts", "-p", "9000", "--verbose"]).expect("parse");
//! assert_eq!(record.get::<u16>("port"), Some(&9000));
//! assert_eq!(record.get::<bool>("verbose"), Some(&true));
//! ```
//!
//! ## Field shapes
//!
//! The constructors in [`ty`] cover every supported value shape:
//! single-token scalars, `Option<T>` values that resolve to `None` when
//! absent, variable-length `Vec<T>` sequences, fixed-size tuples parsed
//! element-wise, and enumerated-string choices checked by membership
//! before conversion. Alias tokens may carry an inline value
//! (`--port=9000`); flags never accept one.
//!
//! At most one positional field may be variadic. When one is, token
//! allocation looks ahead: the variadic slot receives everything except
//! what the fixed-arity slots after it require, so
//!
//! ```rust
//! # use argrec::{ty, Positional, Schema};
//! let schema = Schema::builder()
//!     .positional(Positional::new("head", ty::scalar::<String>()))
//!     .positional(Positional::new("middle", ty::sequence::<String>()))
//!     .positional(Positional::new("tail", ty::scalar::<String>()))
//!     .build()
//!     .expect("valid schema");
//!
//! let record = schema.parse(&["a", "b", "c", "d"]).expect("parse");
//! assert_eq!(record.get::<Vec<String>>("middle").map(Vec::len), Some(2));
//! ```
//!
//! ## Lifecycle
//!
//! Build the schema once per record shape and reuse it for every parse;
//! it is immutable and `Send + Sync`, so a `static` behind
//! `once_cell::sync::Lazy` is the intended pattern. Each parse call
//! allocates its own working state and returns a fresh record.
//!
//! Help and usage *text* is out of scope: the seeded `-h`/`--help`
//! aliases short-circuit to [`EarlyExit::Help`], and the schema's
//! read-only introspection surface ([`Schema::positionals`],
//! [`Schema::named`], [`ArgumentSpec`] getters) gives an external
//! renderer everything it needs.

#![deny(missing_docs)]

use std::str::FromStr;

mod descriptor;
mod error;
mod parse;
mod schema;

pub use descriptor::{ty, Arity, TypeDescriptor};
pub use error::{EarlyExit, ParseError, SpecError};
pub use parse::ParsedRecord;
pub use schema::{ArgumentSpec, FieldKind, Flag, Opt, Positional, Schema, SchemaBuilder};

/// Types which can be constructed from a single commandline token.
///
/// Any scalar, tuple element, sequence element, or choice type used in a
/// [`TypeDescriptor`] must implement this trait. A blanket
/// implementation exists for types implementing `FromStr<Err: Display>`;
/// custom types can implement it directly.
pub trait FromArgValue: Sized {
    /// Construct the type from a commandline token, returning an error
    /// string on failure.
    fn from_arg_value(value: &str) -> Result<Self, String>;
}

impl<T> FromArgValue for T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn from_arg_value(value: &str) -> Result<Self, String> {
        T::from_str(value).map_err(|err| err.to_string())
    }
}
