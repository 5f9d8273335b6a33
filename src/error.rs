// Copyright (c) 2026 the argrec authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Spec-time and parse-time diagnostics.
//!
//! The two families are disjoint: a `SpecError` can only come out of
//! `SchemaBuilder::build` and is fatal to the declaring code, while a
//! `ParseError` is produced per invocation and never reflects a defect
//! in the schema itself.

use thiserror::Error;

/// An error detected while compiling field declarations into a [`Schema`].
///
/// All of these are raised by [`SchemaBuilder::build`], before any field
/// is accepted; a `SpecError` never surfaces mid-parse.
///
/// [`Schema`]: crate::Schema
/// [`SchemaBuilder::build`]: crate::SchemaBuilder::build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// A field was declared with an empty name.
    #[error("field names must be non-empty")]
    EmptyFieldName,

    /// Two fields were declared with the same name.
    #[error("duplicate field name `{field}`")]
    DuplicateField {
        /// The name declared by more than one field.
        field: &'static str,
    },

    /// Two fields (or one field twice) claim the same alias string.
    #[error("duplicate alias `{alias}` declared by `{first}` and `{second}`")]
    DuplicateAlias {
        /// The contested alias string.
        alias: String,
        /// The field that registered the alias first.
        first: &'static str,
        /// The field whose registration collided.
        second: &'static str,
    },

    /// More than one positional field has variadic arity.
    #[error("multiple variadic positional arguments: `{first}` and `{second}`")]
    MultipleVariadic {
        /// The first variadic positional, in declaration order.
        first: &'static str,
        /// The second variadic positional.
        second: &'static str,
    },

    /// A field declares both a literal default and a default factory.
    #[error("cannot specify both default and default_factory for `{field}`")]
    DefaultAndFactory {
        /// The offending field.
        field: &'static str,
    },

    /// A default value (or factory result type) does not match the
    /// field's declared value type.
    #[error("default value for `{field}` does not match its declared type")]
    DefaultTypeMismatch {
        /// The offending field.
        field: &'static str,
    },

    /// A validator predicate's argument type does not match the field's
    /// declared value type.
    #[error("validator for `{field}` does not match its declared type")]
    ValidatorTypeMismatch {
        /// The offending field.
        field: &'static str,
    },
}

/// An error detected while matching a token stream against a [`Schema`].
///
/// Parsing is fail-fast: the first violated contract aborts the rest of
/// the parse and no partial record is returned.
///
/// [`Schema`]: crate::Schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A fixed-arity field matched, but fewer tokens than its arity
    /// remained to be consumed.
    #[error("missing value(s) for `{field}`")]
    MissingValues {
        /// The field that came up short.
        field: &'static str,
    },

    /// A field with no tokens, no default, and no absent-value rule.
    #[error("missing required argument `{field}`")]
    MissingArgument {
        /// The required field that was omitted.
        field: &'static str,
    },

    /// A token was left over after every positional slot was filled.
    #[error("unrecognized extra argument: `{token}`{}", did_you_mean(.suggestion))]
    Unrecognized {
        /// The leftover token.
        token: String,
        /// The closest registered alias, if the token looked like one.
        suggestion: Option<String>,
    },

    /// Raw token(s) could not be converted to the field's value type.
    #[error("invalid value for `{field}`: {value} ({reason})")]
    Invalid {
        /// The field being converted.
        field: &'static str,
        /// The raw token(s), space-joined.
        value: String,
        /// The conversion failure reported by the type descriptor.
        reason: String,
    },

    /// A validator predicate rejected a successfully converted value.
    #[error("invalid value for `{field}`: {value}")]
    FailedValidation {
        /// The field whose validator rejected the value.
        field: &'static str,
        /// The converted (not raw) value, debug-rendered.
        value: String,
    },

    /// A flag alias was given an inline `=value`.
    #[error("flag `{field}` does not take a value")]
    FlagWithValue {
        /// The flag field.
        field: &'static str,
    },
}

/// Why a parse invocation returned before producing a record.
///
/// `Help` is not a failure: it reports that a surviving help alias was
/// seen, and the caller is expected to render usage text from the
/// schema's introspection surface and exit cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EarlyExit {
    /// A seeded help alias (`-h`/`--help`, minus any the schema's own
    /// fields claimed) appeared in the token stream.
    #[error("help requested")]
    Help,

    /// The token stream violated the schema.
    #[error(transparent)]
    Error(#[from] ParseError),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(alias) => format!(" (did you mean `{alias}`?)"),
        None => String::new(),
    }
}
