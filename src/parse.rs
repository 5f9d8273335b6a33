// Copyright (c) 2026 the argrec authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The matching engine: tokenization, option/flag matching, look-ahead
//! positional allocation, and value resolution.
//!
//! A token is an option/flag occurrence iff it exactly matches a
//! registered alias up to an optional inline `=value`; everything else
//! is a positional candidate. A bare `--` ends alias matching. After
//! occurrences consume their arity worth of tokens, the remaining
//! candidates are apportioned among the positional slots in a single
//! left-to-right pass that reserves, ahead of the variadic slot, the
//! summed arity of every slot after it.

use std::any::Any;
use std::collections::HashMap;

use rust_fuzzy_search::fuzzy_compare;

use crate::descriptor::{Arity, Value};
use crate::error::{EarlyExit, ParseError};
use crate::schema::{ArgumentSpec, FieldKind, Schema};

/// The mapping from field name to resolved typed value produced by a
/// successful parse.
///
/// Created fresh per parse call and owned by the caller; the values are
/// retrieved by name with the type the field's descriptor produced
/// (`u16` for `ty::scalar::<u16>()`, `Vec<String>` for
/// `ty::sequence::<String>()`, and so on).
#[derive(Default)]
pub struct ParsedRecord {
    values: HashMap<&'static str, Value>,
}

impl ParsedRecord {
    /// Borrow the value resolved for `name`. Returns `None` for an
    /// unknown field or a mismatched type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name).and_then(|value| value.downcast_ref::<T>())
    }

    /// Move the value resolved for `name` out of the record. Returns
    /// `None` (leaving the record untouched) for an unknown field or a
    /// mismatched type.
    pub fn take<T: Any>(&mut self, name: &str) -> Option<T> {
        if !self.values.get(name)?.as_ref().is::<T>() {
            return None;
        }
        let boxed = self.values.remove(name)?;
        boxed.downcast::<T>().ok().map(|concrete| *concrete)
    }

    /// Whether a value was resolved for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The field names present in the record, in no particular order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}

impl std::fmt::Debug for ParsedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedRecord").field("fields", &self.values.keys()).finish()
    }
}

/// What the matcher assigned to one spec before value resolution.
enum Assigned {
    Tokens(Vec<String>),
    FlagValue(bool),
}

impl Schema {
    /// Match a token stream (argv without the program name) against this
    /// schema and resolve every field to a typed value.
    ///
    /// Fail-fast: the first violated contract aborts the parse. Tokens
    /// are scanned strictly left to right, and a surviving help alias
    /// short-circuits to [`EarlyExit::Help`] the moment it is seen;
    /// tokens to its right are never examined.
    pub fn parse(&self, args: &[&str]) -> Result<ParsedRecord, EarlyExit> {
        let mut assigned: Vec<Option<Assigned>> = Vec::new();
        assigned.resize_with(self.specs.len(), || None);

        let mut candidates: Vec<&str> = Vec::new();
        let mut aliases_ended = false;

        let mut remaining = args.iter().copied();
        while let Some(token) = remaining.next() {
            if !aliases_ended {
                if token == "--" {
                    aliases_ended = true;
                    continue;
                }
                if self.help_aliases.contains(&token) {
                    return Err(EarlyExit::Help);
                }
                let (head, inline) = split_inline(token);
                if let Some(target) = self.alias_table.get(head) {
                    let index = target.spec;
                    let spec = &self.specs[index];
                    assigned[index] = Some(match spec.kind {
                        FieldKind::Flag => {
                            if inline.is_some() {
                                return Err(ParseError::FlagWithValue { field: spec.name }.into());
                            }
                            let value = if target.negates { false } else { !spec.flag_default };
                            Assigned::FlagValue(value)
                        }
                        _ => Assigned::Tokens(self.consume_values(spec, inline, &mut remaining)?),
                    });
                    continue;
                }
            }
            candidates.push(token);
        }

        self.allocate(&candidates, &mut assigned)?;

        let mut record = ParsedRecord::default();
        for (spec, slot) in self.specs.iter().zip(assigned) {
            record.values.insert(spec.name, resolve_value(spec, slot)?);
        }
        Ok(record)
    }

    /// Consume an option occurrence's value tokens: the inline value (if
    /// any) plus following tokens up to the declared arity, or — for a
    /// variadic option — up to the next alias occurrence, help alias, or
    /// `--`. Variadic options reserve nothing for later positionals.
    fn consume_values<'a>(
        &self,
        spec: &ArgumentSpec,
        inline: Option<&str>,
        remaining: &mut (impl Iterator<Item = &'a str> + Clone),
    ) -> Result<Vec<String>, ParseError> {
        let mut values: Vec<String> = Vec::new();
        if let Some(inline) = inline {
            values.push(inline.to_owned());
        }
        match spec.descriptor.arity() {
            Arity::Fixed(count) => {
                while values.len() < count {
                    match remaining.next() {
                        Some(token) => values.push(token.to_owned()),
                        None => return Err(ParseError::MissingValues { field: spec.name }),
                    }
                }
            }
            Arity::Variadic => loop {
                let mut lookahead = remaining.clone();
                match lookahead.next() {
                    Some(token) if !self.stops_variadic(token) => {
                        values.push(token.to_owned());
                        *remaining = lookahead;
                    }
                    _ => break,
                }
            },
        }
        Ok(values)
    }

    fn stops_variadic(&self, token: &str) -> bool {
        if token == "--" || self.help_aliases.contains(&token) {
            return true;
        }
        let (head, _) = split_inline(token);
        self.alias_table.contains_key(head)
    }

    /// Apportion positional candidates among the positional slots and
    /// store the assignments. Slots assigned zero tokens stay empty so
    /// the value resolver can apply defaults or absent-value rules.
    fn allocate(
        &self,
        candidates: &[&str],
        assigned: &mut [Option<Assigned>],
    ) -> Result<(), ParseError> {
        let arities: Vec<Arity> =
            self.positionals().map(|spec| spec.descriptor.arity()).collect();
        let names: Vec<&'static str> = self.positionals().map(|spec| spec.name).collect();
        let counts = allocate_counts(&arities, self.variadic, candidates.len(), &names)?;

        let mut cursor = 0;
        for (&spec_index, count) in self.positionals.iter().zip(counts) {
            if count > 0 {
                let tokens =
                    candidates[cursor..cursor + count].iter().map(|t| (*t).to_owned()).collect();
                assigned[spec_index] = Some(Assigned::Tokens(tokens));
                cursor += count;
            }
        }

        if let Some(&extra) = candidates.get(cursor) {
            return Err(ParseError::Unrecognized {
                token: extra.to_owned(),
                suggestion: self.suggestion_for(extra),
            });
        }
        Ok(())
    }

    /// The closest registered alias to a dash-prefixed stray token, when
    /// one is close enough to be worth mentioning.
    fn suggestion_for(&self, token: &str) -> Option<String> {
        if !token.starts_with('-') {
            return None;
        }
        let (head, _) = split_inline(token);
        let mut best: Option<(f32, &str)> = None;
        for alias in self.alias_table.keys() {
            let score = fuzzy_compare(head, alias);
            if best.map(|(top, _)| score > top).unwrap_or(true) {
                best = Some((score, alias));
            }
        }
        best.filter(|&(score, _)| score > 0.5).map(|(_, alias)| alias.to_owned())
    }
}

/// Split a token at the first `=` into the candidate alias and the
/// inline value. Only applied once the head matches a registered alias;
/// positional candidates are never split.
fn split_inline(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((head, value)) => (head, Some(value)),
        None => (token, None),
    }
}

/// The single-pass look-ahead allocation from the schema's positional
/// arities to per-slot token counts.
///
/// Fixed slots before the variadic one take exactly their arity off the
/// front; the variadic slot takes everything except the summed arity of
/// the slots after it; fixed slots after it then take their arity. A
/// slot reached with zero tokens left is assigned zero (defaults apply
/// later); a partial shortfall is an immediate error.
fn allocate_counts(
    arities: &[Arity],
    variadic: Option<usize>,
    available: usize,
    names: &[&'static str],
) -> Result<Vec<usize>, ParseError> {
    let mut counts = vec![0usize; arities.len()];
    let mut remaining = available;

    let take_fixed = |index: usize, remaining: &mut usize, counts: &mut Vec<usize>| {
        let width = match arities[index] {
            Arity::Fixed(width) => width,
            Arity::Variadic => 0,
        };
        if *remaining >= width {
            counts[index] = width;
            *remaining -= width;
            Ok(())
        } else if *remaining == 0 {
            Ok(())
        } else {
            Err(ParseError::MissingValues { field: names[index] })
        }
    };

    match variadic {
        Some(variadic) => {
            for index in 0..variadic {
                take_fixed(index, &mut remaining, &mut counts)?;
            }
            let reserved: usize = arities[variadic + 1..]
                .iter()
                .map(|arity| match arity {
                    Arity::Fixed(width) => *width,
                    Arity::Variadic => 0,
                })
                .sum();
            let share = remaining.saturating_sub(reserved);
            counts[variadic] = share;
            remaining -= share;
            for index in variadic + 1..arities.len() {
                take_fixed(index, &mut remaining, &mut counts)?;
            }
        }
        None => {
            for index in 0..arities.len() {
                take_fixed(index, &mut remaining, &mut counts)?;
            }
        }
    }
    Ok(counts)
}

/// Resolve one spec's assignment to a typed value: convert assigned
/// tokens, or fall back to the default, the default factory, or the
/// type's absent value. Validators run on the converted value, defaults
/// included.
fn resolve_value(spec: &ArgumentSpec, assigned: Option<Assigned>) -> Result<Value, ParseError> {
    let value = match assigned {
        Some(Assigned::FlagValue(flag)) => Box::new(flag) as Value,
        Some(Assigned::Tokens(tokens)) => {
            spec.descriptor.parse(&tokens).map_err(|reason| ParseError::Invalid {
                field: spec.name,
                value: tokens.join(" "),
                reason,
            })?
        }
        None => match &spec.default {
            Some(default) => default.produce(),
            None => match spec.descriptor.absent_value() {
                Some(absent) => absent,
                None => return Err(ParseError::MissingArgument { field: spec.name }),
            },
        },
    };

    if let Some(validator) = &spec.validator {
        if !validator(value.as_ref()) {
            return Err(ParseError::FailedValidation {
                field: spec.name,
                value: spec.descriptor.debug_value(value.as_ref()),
            });
        }
    }
    Ok(value)
}
