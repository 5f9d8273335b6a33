// Copyright (c) 2026 the argrec authors. All rights reserved.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Field declarations, the alias resolver, and the schema compiler.
//!
//! Declarations ([`Positional`], [`Opt`], [`Flag`]) are handed to a
//! [`SchemaBuilder`]; `build` runs every spec-time check and produces an
//! immutable [`Schema`]. Schemas are `Send + Sync` and are meant to be
//! compiled once per program and reused by every parse call.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;

use crate::descriptor::{Arity, TypeDescriptor, Value};
use crate::error::SpecError;

type ProduceFn = Box<dyn Fn() -> Value + Send + Sync>;
type ValidateFn = Box<dyn Fn(&dyn Any) -> bool + Send + Sync>;

/// Whether a field is matched by position or by alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Identified by position in the token stream.
    Positional,
    /// Named, takes one or more associated value tokens.
    Option,
    /// Named, boolean, takes no value tokens.
    Flag,
}

/// The built-in help alias strings, seeded into every schema unless a
/// field claims them.
const HELP_ALIASES: [&str; 2] = ["-h", "--help"];

struct LiteralDefault {
    type_id: TypeId,
    description: String,
    produce: ProduceFn,
}

struct FactoryDefault {
    type_id: TypeId,
    produce: ProduceFn,
}

struct FieldDecl {
    name: &'static str,
    descriptor: TypeDescriptor,
    default: Option<LiteralDefault>,
    factory: Option<FactoryDefault>,
    validator: Option<(TypeId, ValidateFn)>,
    help: Option<&'static str>,
}

impl FieldDecl {
    fn new(name: &'static str, descriptor: TypeDescriptor) -> Self {
        Self { name, descriptor, default: None, factory: None, validator: None, help: None }
    }

    fn set_default<T>(&mut self, value: T)
    where
        T: Any + Clone + Debug + Send + Sync,
    {
        self.default = Some(LiteralDefault {
            type_id: TypeId::of::<T>(),
            description: format!("{value:?}"),
            produce: Box::new(move || Box::new(value.clone()) as Value),
        });
    }

    fn set_factory<T, F>(&mut self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(FactoryDefault {
            type_id: TypeId::of::<T>(),
            produce: Box::new(move || Box::new(factory()) as Value),
        });
    }

    fn set_validator<T, F>(&mut self, validate: F)
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let erased: ValidateFn = Box::new(move |value: &dyn Any| {
            value.downcast_ref::<T>().map(|concrete| validate(concrete)).unwrap_or(false)
        });
        self.validator = Some((TypeId::of::<T>(), erased));
    }
}

/// A positional field declaration: matched by position, never by alias.
pub struct Positional {
    decl: FieldDecl,
}

impl Positional {
    /// Declare a positional field with the given name and value type.
    pub fn new(name: &'static str, descriptor: TypeDescriptor) -> Self {
        Self { decl: FieldDecl::new(name, descriptor) }
    }

    /// Use this value when no tokens are assigned to the field.
    pub fn default<T>(mut self, value: T) -> Self
    where
        T: Any + Clone + Debug + Send + Sync,
    {
        self.decl.set_default(value);
        self
    }

    /// Invoke this producer (lazily, once per parse) when no tokens are
    /// assigned to the field. Mutually exclusive with [`default`].
    ///
    /// [`default`]: Positional::default
    pub fn default_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.decl.set_factory(factory);
        self
    }

    /// Reject the parse when this predicate returns `false` for the
    /// converted value.
    pub fn validator<T, F>(mut self, validate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.decl.set_validator(validate);
        self
    }

    /// Attach help text for external renderers.
    pub fn help(mut self, text: &'static str) -> Self {
        self.decl.help = Some(text);
        self
    }
}

/// A named field declaration that takes value tokens.
pub struct Opt {
    decl: FieldDecl,
    short: bool,
    aliases: Vec<String>,
}

impl Opt {
    /// Declare an option field with the given name and value type.
    pub fn new(name: &'static str, descriptor: TypeDescriptor) -> Self {
        Self { decl: FieldDecl::new(name, descriptor), short: false, aliases: Vec::new() }
    }

    /// Also generate a single-letter alias from the first character of
    /// the field name (`port` gains `-p`).
    pub fn short(mut self) -> Self {
        self.short = true;
        self
    }

    /// Register extra alias strings, exactly as written.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Use this value when the option does not occur.
    pub fn default<T>(mut self, value: T) -> Self
    where
        T: Any + Clone + Debug + Send + Sync,
    {
        self.decl.set_default(value);
        self
    }

    /// Invoke this producer (lazily, once per parse) when the option
    /// does not occur. Mutually exclusive with [`default`].
    ///
    /// [`default`]: Opt::default
    pub fn default_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.decl.set_factory(factory);
        self
    }

    /// Reject the parse when this predicate returns `false` for the
    /// converted value.
    pub fn validator<T, F>(mut self, validate: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.decl.set_validator(validate);
        self
    }

    /// Attach help text for external renderers.
    pub fn help(mut self, text: &'static str) -> Self {
        self.decl.help = Some(text);
        self
    }
}

/// A named boolean field declaration that takes no value tokens.
///
/// An occurrence resolves the flag to the negation of its default; a
/// negator alias resolves it to `false` regardless of the default.
pub struct Flag {
    name: &'static str,
    default: bool,
    short: bool,
    aliases: Vec<String>,
    negators: Vec<String>,
    help: Option<&'static str>,
}

impl Flag {
    /// Declare a flag field, defaulting to `false`.
    pub fn new(name: &'static str) -> Self {
        Self { name, default: false, short: false, aliases: Vec::new(), negators: Vec::new(), help: None }
    }

    /// Set the flag's resolved value when it does not occur. A `true`
    /// default with no explicit negators gains an automatic
    /// `--no-<name>` negator.
    pub fn default(mut self, value: bool) -> Self {
        self.default = value;
        self
    }

    /// Also generate a single-letter alias from the first character of
    /// the field name.
    pub fn short(mut self) -> Self {
        self.short = true;
        self
    }

    /// Register extra alias strings, exactly as written.
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Register negator alias strings, exactly as written. Supplying any
    /// suppresses the automatic `--no-<name>` negator.
    pub fn negators<I, S>(mut self, negators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negators.extend(negators.into_iter().map(Into::into));
        self
    }

    /// Attach help text for external renderers.
    pub fn help(mut self, text: &'static str) -> Self {
        self.help = Some(text);
        self
    }
}

pub(crate) enum CompiledDefault {
    Literal { produce: ProduceFn, description: String },
    Factory { produce: ProduceFn },
}

impl CompiledDefault {
    pub(crate) fn produce(&self) -> Value {
        match self {
            CompiledDefault::Literal { produce, .. } => produce(),
            CompiledDefault::Factory { produce } => produce(),
        }
    }
}

/// One compiled field of a [`Schema`]: the validated, alias-resolved
/// form of a declaration. Exposed read-only for help renderers.
pub struct ArgumentSpec {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) default: Option<CompiledDefault>,
    pub(crate) validator: Option<ValidateFn>,
    help: Option<&'static str>,
    aliases: Vec<String>,
    negators: Vec<String>,
    pub(crate) flag_default: bool,
}

impl ArgumentSpec {
    /// The canonical field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the field is positional, an option, or a flag.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// How many tokens the field consumes. Flags consume none.
    pub fn arity(&self) -> Arity {
        match self.kind {
            FieldKind::Flag => Arity::Fixed(0),
            _ => self.descriptor.arity(),
        }
    }

    /// The name of the field's value type, for help renderers.
    pub fn type_name(&self) -> &'static str {
        self.descriptor.type_name()
    }

    /// The declared help text, if any.
    pub fn help(&self) -> Option<&'static str> {
        self.help
    }

    /// Every non-negator alias that resolves to this field, in
    /// registration order. Empty for positionals.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Every negator alias for this field. Empty unless it is a flag.
    pub fn negators(&self) -> &[String] {
        &self.negators
    }

    /// Whether the field resolves without tokens (via a default, a
    /// default factory, or its type's absent-value rule).
    pub fn is_required(&self) -> bool {
        self.default.is_none() && self.descriptor.absent_value().is_none()
    }

    /// A debug rendering of the literal default, if one was declared.
    /// Factory defaults are opaque and yield `None`.
    pub fn default_description(&self) -> Option<&str> {
        match &self.default {
            Some(CompiledDefault::Literal { description, .. }) => Some(description),
            _ => None,
        }
    }
}

impl Debug for ArgumentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.arity())
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AliasTarget {
    pub(crate) spec: usize,
    pub(crate) negates: bool,
}

/// The compiled, immutable form of a set of field declarations.
///
/// Built exactly once per declared record shape and reused across every
/// parse call; no parse operation mutates it, so a `static Schema`
/// (e.g. behind `once_cell::sync::Lazy`) is safe to share across
/// threads.
pub struct Schema {
    pub(crate) specs: Vec<ArgumentSpec>,
    pub(crate) positionals: Vec<usize>,
    pub(crate) variadic: Option<usize>,
    pub(crate) alias_table: HashMap<String, AliasTarget>,
    pub(crate) help_aliases: Vec<&'static str>,
}

impl Schema {
    /// Start declaring fields for a new schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { decls: Vec::new() }
    }

    /// The positional specs, in declaration order.
    pub fn positionals(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.positionals.iter().map(|&index| &self.specs[index])
    }

    /// The option and flag specs, in declaration order.
    pub fn named(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.specs.iter().filter(|spec| spec.kind != FieldKind::Positional)
    }

    /// Every compiled spec, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.specs.iter()
    }

    /// Resolve an alias string (without any inline `=value`) to its
    /// spec, if registered.
    pub fn lookup_alias(&self, alias: &str) -> Option<&ArgumentSpec> {
        self.alias_table.get(alias).map(|target| &self.specs[target.spec])
    }

    /// The seeded help aliases still available, i.e. not claimed by any
    /// field. A field that claims `-h` demotes only `-h`; `--help`
    /// keeps triggering help unless also claimed.
    pub fn help_aliases(&self) -> &[&'static str] {
        &self.help_aliases
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("specs", &self.specs)
            .field("help_aliases", &self.help_aliases)
            .finish()
    }
}

enum Decl {
    Positional(Positional),
    Opt(Opt),
    Flag(Flag),
}

/// Accumulates field declarations and compiles them into a [`Schema`].
pub struct SchemaBuilder {
    decls: Vec<Decl>,
}

impl SchemaBuilder {
    /// Add a positional field. Positional order is declaration order.
    pub fn positional(mut self, decl: Positional) -> Self {
        self.decls.push(Decl::Positional(decl));
        self
    }

    /// Add an option field.
    pub fn option(mut self, decl: Opt) -> Self {
        self.decls.push(Decl::Opt(decl));
        self
    }

    /// Add a flag field.
    pub fn flag(mut self, decl: Flag) -> Self {
        self.decls.push(Decl::Flag(decl));
        self
    }

    /// Run every spec-time check and produce the immutable schema.
    ///
    /// Checks, in declaration order: non-empty and unique field names,
    /// conflicting default/default-factory, default and validator type
    /// agreement with the field's value type, at most one variadic
    /// positional, and alias collisions across the whole schema
    /// (short-alias collisions with explicit aliases included — never
    /// silently deduplicated).
    pub fn build(self) -> Result<Schema, SpecError> {
        let mut compiler = Compiler::default();
        for decl in self.decls {
            match decl {
                Decl::Positional(positional) => compiler.positional(positional.decl)?,
                Decl::Opt(opt) => compiler.option(opt)?,
                Decl::Flag(flag) => compiler.flag(flag)?,
            }
        }
        Ok(compiler.finish())
    }
}

#[derive(Default)]
struct Compiler {
    specs: Vec<ArgumentSpec>,
    positionals: Vec<usize>,
    variadic: Option<usize>,
    alias_table: HashMap<String, AliasTarget>,
}

impl Compiler {
    fn positional(&mut self, decl: FieldDecl) -> Result<(), SpecError> {
        self.check_field_name(decl.name)?;
        let spec = compile_decl(decl, FieldKind::Positional)?;
        if spec.descriptor.arity() == Arity::Variadic {
            if let Some(first) = self.variadic {
                return Err(SpecError::MultipleVariadic {
                    first: self.specs[self.positionals[first]].name,
                    second: spec.name,
                });
            }
            self.variadic = Some(self.positionals.len());
        }
        self.positionals.push(self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    fn option(&mut self, opt: Opt) -> Result<(), SpecError> {
        let name = opt.decl.name;
        self.check_field_name(name)?;
        let mut spec = compile_decl(opt.decl, FieldKind::Option)?;
        spec.aliases = self.resolve_aliases(name, opt.short, opt.aliases)?;
        self.register(&spec.aliases, name, false)?;
        self.specs.push(spec);
        Ok(())
    }

    fn flag(&mut self, flag: Flag) -> Result<(), SpecError> {
        self.check_field_name(flag.name)?;
        let aliases = self.resolve_aliases(flag.name, flag.short, flag.aliases)?;
        let negators = if flag.negators.is_empty() && flag.default {
            vec![format!("--no-{}", dash_name(flag.name))]
        } else {
            flag.negators
        };
        self.register(&aliases, flag.name, false)?;
        self.register(&negators, flag.name, true)?;

        let default = flag.default;
        self.specs.push(ArgumentSpec {
            name: flag.name,
            kind: FieldKind::Flag,
            descriptor: crate::ty::scalar::<bool>(),
            default: Some(CompiledDefault::Literal {
                produce: Box::new(move || Box::new(default) as Value),
                description: format!("{default:?}"),
            }),
            validator: None,
            help: flag.help,
            aliases,
            negators,
            flag_default: flag.default,
        });
        Ok(())
    }

    /// Every field name must be non-empty and unique across the schema;
    /// resolved record values are keyed by name, so a reused name would
    /// silently shadow the earlier field.
    fn check_field_name(&self, name: &'static str) -> Result<(), SpecError> {
        if name.is_empty() {
            return Err(SpecError::EmptyFieldName);
        }
        if self.specs.iter().any(|spec| spec.name == name) {
            return Err(SpecError::DuplicateField { field: name });
        }
        Ok(())
    }

    /// Long dash/underscore forms, then explicit aliases, then the
    /// short form. The short form colliding with an explicit alias is a
    /// duplicate, not a deduplication.
    fn resolve_aliases(
        &self,
        name: &'static str,
        short: bool,
        explicit: Vec<String>,
    ) -> Result<Vec<String>, SpecError> {
        let mut aliases = Vec::new();
        let dashed = format!("--{}", dash_name(name));
        let underscored = format!("--{}", name.replace('-', "_"));
        aliases.push(dashed);
        if underscored != aliases[0] {
            aliases.push(underscored);
        }
        aliases.extend(explicit);

        // Names are known to be non-empty by `check_field_name`.
        if short {
            if let Some(letter) = name.chars().next() {
                let short_alias = format!("-{letter}");
                if aliases.contains(&short_alias) {
                    return Err(SpecError::DuplicateAlias {
                        alias: short_alias,
                        first: name,
                        second: name,
                    });
                }
                aliases.push(short_alias);
            }
        }
        Ok(aliases)
    }

    fn register(
        &mut self,
        aliases: &[String],
        name: &'static str,
        negates: bool,
    ) -> Result<(), SpecError> {
        let spec = self.specs.len();
        for alias in aliases {
            if let Some(existing) = self.alias_table.get(alias) {
                return Err(SpecError::DuplicateAlias {
                    alias: alias.clone(),
                    first: self.specs.get(existing.spec).map(|s| s.name).unwrap_or(name),
                    second: name,
                });
            }
            self.alias_table.insert(alias.clone(), AliasTarget { spec, negates });
        }
        Ok(())
    }

    fn finish(self) -> Schema {
        let help_aliases = HELP_ALIASES
            .iter()
            .copied()
            .filter(|alias| !self.alias_table.contains_key(*alias))
            .collect();
        Schema {
            specs: self.specs,
            positionals: self.positionals,
            variadic: self.variadic,
            alias_table: self.alias_table,
            help_aliases,
        }
    }
}

fn dash_name(name: &str) -> String {
    name.replace('_', "-")
}

fn compile_decl(decl: FieldDecl, kind: FieldKind) -> Result<ArgumentSpec, SpecError> {
    if decl.default.is_some() && decl.factory.is_some() {
        return Err(SpecError::DefaultAndFactory { field: decl.name });
    }

    let expected = decl.descriptor.value_type();
    let default = if let Some(literal) = decl.default {
        if literal.type_id != expected {
            return Err(SpecError::DefaultTypeMismatch { field: decl.name });
        }
        Some(CompiledDefault::Literal { produce: literal.produce, description: literal.description })
    } else if let Some(factory) = decl.factory {
        if factory.type_id != expected {
            return Err(SpecError::DefaultTypeMismatch { field: decl.name });
        }
        Some(CompiledDefault::Factory { produce: factory.produce })
    } else {
        None
    };

    let validator = match decl.validator {
        Some((type_id, validate)) => {
            if type_id != expected {
                return Err(SpecError::ValidatorTypeMismatch { field: decl.name });
            }
            Some(validate)
        }
        None => None,
    };

    Ok(ArgumentSpec {
        name: decl.name,
        kind,
        descriptor: decl.descriptor,
        default,
        validator,
        help: decl.help,
        aliases: Vec::new(),
        negators: Vec::new(),
        flag_default: false,
    })
}
