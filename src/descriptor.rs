// Copyright (c) 2026 the argrec authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Type descriptors: the arity contract and conversion rule for a field.
//!
//! A [`TypeDescriptor`] is the erased bridge between a strongly-typed
//! field value and the schema machinery, which only ever sees
//! `Box<dyn Any>`. The constructors in [`ty`] are the whole vocabulary:
//! scalars, optionals, variable-length sequences, fixed-size tuples, and
//! enumerated-string choices.

use std::any::{self, Any, TypeId};
use std::fmt::Debug;

use crate::FromArgValue;

/// An erased, `Send + Sync` field value.
pub(crate) type Value = Box<dyn Any + Send + Sync>;

type ParseFn = Box<dyn Fn(&[String]) -> Result<Value, String> + Send + Sync>;
type ProduceFn = Box<dyn Fn() -> Value + Send + Sync>;
type DebugFn = Box<dyn Fn(&dyn Any) -> String + Send + Sync>;

/// How many tokens a field consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Consumes exactly this many tokens.
    Fixed(usize),
    /// Consumes a context-dependent, non-negative number of tokens,
    /// resolved by the look-ahead allocator (positionals) or by greedy
    /// consumption (options).
    Variadic,
}

/// The arity contract and conversion rule for one field's value type.
///
/// Descriptors are built with the constructors in [`ty`] and handed to
/// the field declaration builders; the schema never inspects the
/// concrete value type beyond what is captured here.
pub struct TypeDescriptor {
    arity: Arity,
    type_name: &'static str,
    value_type: TypeId,
    parse: ParseFn,
    absent: Option<ProduceFn>,
    debug: DebugFn,
}

impl TypeDescriptor {
    /// The number of tokens a value of this type consumes.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// The name of the concrete value type, for help renderers.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Convert assigned raw tokens into an erased value. The allocator
    /// guarantees the token count honors the arity contract.
    pub(crate) fn parse(&self, tokens: &[String]) -> Result<Value, String> {
        (self.parse)(tokens)
    }

    /// The value this type resolves to when no tokens were assigned and
    /// no default exists: the empty sequence, `None`, or nothing at all
    /// (in which case the field is required).
    pub(crate) fn absent_value(&self) -> Option<Value> {
        self.absent.as_ref().map(|produce| produce())
    }

    pub(crate) fn debug_value(&self, value: &dyn Any) -> String {
        (self.debug)(value)
    }
}

impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("arity", &self.arity)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn debug_fn<T: Debug + 'static>() -> DebugFn {
    Box::new(|value| match value.downcast_ref::<T>() {
        Some(concrete) => format!("{concrete:?}"),
        None => "<unprintable>".to_owned(),
    })
}

fn first_token(tokens: &[String]) -> Result<&String, String> {
    tokens.first().ok_or_else(|| "no value supplied".to_owned())
}

/// Constructors for every supported value shape.
pub mod ty {
    use super::*;

    /// A single-token value parsed via [`FromArgValue`].
    ///
    /// [`FromArgValue`]: crate::FromArgValue
    pub fn scalar<T>() -> TypeDescriptor
    where
        T: FromArgValue + Debug + Send + Sync + 'static,
    {
        TypeDescriptor {
            arity: Arity::Fixed(1),
            type_name: any::type_name::<T>(),
            value_type: TypeId::of::<T>(),
            parse: Box::new(|tokens| {
                T::from_arg_value(first_token(tokens)?).map(|value| Box::new(value) as Value)
            }),
            absent: None,
            debug: debug_fn::<T>(),
        }
    }

    /// A single-token value that resolves to `None` when absent.
    ///
    /// An optional field is never "missing": omitting it yields
    /// `Option::None` unless a default says otherwise.
    pub fn optional<T>() -> TypeDescriptor
    where
        T: FromArgValue + Debug + Send + Sync + 'static,
    {
        TypeDescriptor {
            arity: Arity::Fixed(1),
            type_name: any::type_name::<T>(),
            value_type: TypeId::of::<Option<T>>(),
            parse: Box::new(|tokens| {
                T::from_arg_value(first_token(tokens)?)
                    .map(|value| Box::new(Some(value)) as Value)
            }),
            absent: Some(Box::new(|| Box::new(Option::<T>::None) as Value)),
            debug: debug_fn::<Option<T>>(),
        }
    }

    /// A variable-length sequence: consumes every assigned token into a
    /// `Vec<T>`, and resolves to the empty vector when absent.
    pub fn sequence<T>() -> TypeDescriptor
    where
        T: FromArgValue + Debug + Send + Sync + 'static,
    {
        TypeDescriptor {
            arity: Arity::Variadic,
            type_name: any::type_name::<T>(),
            value_type: TypeId::of::<Vec<T>>(),
            parse: Box::new(|tokens| {
                let values = tokens
                    .iter()
                    .map(|token| T::from_arg_value(token))
                    .collect::<Result<Vec<T>, String>>()?;
                Ok(Box::new(values) as Value)
            }),
            absent: Some(Box::new(|| Box::new(Vec::<T>::new()) as Value)),
            debug: debug_fn::<Vec<T>>(),
        }
    }

    /// A single-token value restricted to a closed set of accepted
    /// strings, checked by membership before conversion.
    pub fn choice<T>(accepted: &'static [&'static str]) -> TypeDescriptor
    where
        T: FromArgValue + Debug + Send + Sync + 'static,
    {
        TypeDescriptor {
            arity: Arity::Fixed(1),
            type_name: any::type_name::<T>(),
            value_type: TypeId::of::<T>(),
            parse: Box::new(move |tokens| {
                let token = first_token(tokens)?;
                if !accepted.iter().any(|candidate| candidate == token) {
                    return Err(format!("expected one of: {}", accepted.join(", ")));
                }
                T::from_arg_value(token).map(|value| Box::new(value) as Value)
            }),
            absent: None,
            debug: debug_fn::<T>(),
        }
    }

    macro_rules! impl_tuple_descriptor {
        ($(#[$doc:meta])* $fn_name:ident, $len:expr, $($param:ident),+) => {
            $(#[$doc])*
            pub fn $fn_name<$($param),+>() -> TypeDescriptor
            where
                $($param: FromArgValue + Debug + Send + Sync + 'static,)+
            {
                TypeDescriptor {
                    arity: Arity::Fixed($len),
                    type_name: any::type_name::<($($param,)+)>(),
                    value_type: TypeId::of::<($($param,)+)>(),
                    parse: Box::new(|tokens| {
                        let mut tokens = tokens.iter();
                        let mut next = || {
                            tokens.next().ok_or_else(|| "no value supplied".to_owned())
                        };
                        let tuple = ($($param::from_arg_value(next()?)?,)+);
                        Ok(Box::new(tuple) as Value)
                    }),
                    absent: None,
                    debug: debug_fn::<($($param,)+)>(),
                }
            }
        };
    }

    impl_tuple_descriptor! {
        /// A two-token value parsed element-wise by position.
        tuple2, 2, A, B
    }
    impl_tuple_descriptor! {
        /// A three-token value parsed element-wise by position.
        tuple3, 3, A, B, C
    }
    impl_tuple_descriptor! {
        /// A four-token value parsed element-wise by position.
        tuple4, 4, A, B, C, D
    }
}
