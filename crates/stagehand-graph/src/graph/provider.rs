// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Providers, invokes and the options that carry them into a [`Graph`].
//!
//! [`Graph`]: super::Graph

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use stagehand::BoxError;
use stagehand::tags::{self, ProviderTag, TagKind};

use crate::error::{GraphError, Result};

/// Type-erased value stored in the graph.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Address of a value in the graph.
#[derive(Debug, Clone)]
pub enum Key {
    /// Addressed by type.
    Type { id: TypeId, name: &'static str },
    /// Addressed by name; the value type is not part of the key.
    Named(String),
    /// A group collecting values from any number of providers.
    Group(String),
}

impl Key {
    pub fn of<T: Any>() -> Self {
        Key::Type {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Type key for a type known only at run time.
    pub fn from_type_id(id: TypeId, name: &'static str) -> Self {
        Key::Type { id, name }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Key::Named(name.into())
    }

    pub fn group(group: impl Into<String>) -> Self {
        Key::Group(group.into())
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Key::Group(_))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type { id: a, .. }, Key::Type { id: b, .. }) => a == b,
            (Key::Named(a), Key::Named(b)) => a == b,
            (Key::Group(a), Key::Group(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Key::Type { id, .. } => id.hash(state),
            Key::Named(name) | Key::Group(name) => name.hash(state),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type { name, .. } => f.write_str(name),
            Key::Named(name) => f.write_str(&tags::named(name)),
            Key::Group(group) => f.write_str(&tags::group(group)),
        }
    }
}

/// A dependency declared by a provider or invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    key: Key,
    optional: bool,
    soft: bool,
}

impl Param {
    /// Required value of type `T`.
    pub fn of<T: Any>() -> Self {
        Self::key(Key::of::<T>())
    }

    /// Required named value.
    pub fn named(name: impl Into<String>) -> Self {
        Self::key(Key::named(name))
    }

    /// Every value of a group.
    pub fn group(group: impl Into<String>) -> Self {
        Self::key(Key::group(group))
    }

    pub fn key(key: Key) -> Self {
        Self {
            key,
            optional: false,
            soft: false,
        }
    }

    /// Parse a `name:"…"` / `group:"…"` tag. Type-addressed params have no
    /// tag; use [`Param::of`].
    pub fn tag(tag: &str) -> Result<Self> {
        Ok(tag.parse::<ProviderTag>()?.into())
    }

    /// Resolve to nothing instead of failing when there is no provider.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// For groups: take only values that were already constructed.
    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    pub fn get_key(&self) -> &Key {
        &self.key
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_soft(&self) -> bool {
        self.soft
    }
}

impl From<ProviderTag> for Param {
    fn from(tag: ProviderTag) -> Self {
        let key = match tag.kind {
            TagKind::Name => Key::Named(tag.id),
            TagKind::Group => Key::Group(tag.id),
        };
        Self {
            key,
            optional: tag.optional,
            soft: tag.soft,
        }
    }
}

/// Arguments handed to a constructor or invoke, in parameter order.
#[derive(Debug, Default)]
pub struct Args {
    entries: Vec<(Key, Arg)>,
}

#[derive(Debug)]
pub(crate) enum Arg {
    One(Option<Value>),
    Many(Vec<Value>),
}

impl Args {
    pub(crate) fn new(entries: Vec<(Key, Arg)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw single value at `index`; `None` for a missing optional or a group.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.entries.get(index) {
            Some((_, Arg::One(value))) => value.as_ref(),
            _ => None,
        }
    }

    /// Raw group values at `index`.
    pub fn values(&self, index: usize) -> &[Value] {
        match self.entries.get(index) {
            Some((_, Arg::Many(values))) => values,
            _ => &[],
        }
    }

    /// Value at `index` as `T`.
    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T> {
        let key = self.key_label(index);
        let value = self
            .value(index)
            .ok_or_else(|| GraphError::MissingDependency {
                key: key.clone(),
                required_by: format!("argument {index}"),
            })?;
        downcast::<T>(value).ok_or(GraphError::TypeMismatch {
            key,
            expected: std::any::type_name::<T>(),
        })
    }

    /// Value at `index` as `T`, if present and of that type.
    pub fn optional<T: Any + Clone>(&self, index: usize) -> Option<T> {
        self.value(index).and_then(downcast::<T>)
    }

    /// Group members at `index` that are a `T`.
    pub fn group<T: Any + Clone>(&self, index: usize) -> Vec<T> {
        self.values(index).iter().filter_map(downcast::<T>).collect()
    }

    fn key_label(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map(|(key, _)| key.to_string())
            .unwrap_or_else(|| format!("argument {index}"))
    }
}

/// Clone a `T` out of a value holding `T` or `Arc<T>`.
pub fn downcast<T: Any + Clone>(value: &Value) -> Option<T> {
    if let Some(v) = value.downcast_ref::<T>() {
        return Some(v.clone());
    }
    value.downcast_ref::<Arc<T>>().map(|v| T::clone(v))
}

type ConstructorResult = std::result::Result<Vec<Value>, BoxError>;
type Constructor = Arc<dyn Fn(&Args) -> ConstructorResult + Send + Sync>;

/// Constructs a value from its parameters. Constructors run at most once.
#[derive(Clone)]
pub struct Provider {
    pub(crate) label: String,
    pub(crate) params: Vec<Param>,
    pub(crate) output: Key,
    constructor: Constructor,
}

impl Provider {
    /// Provider of a `T`, addressed by type until [`named`](Self::named) or
    /// [`group`](Self::group) is called.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            label: std::any::type_name::<T>().to_string(),
            params: Vec::new(),
            output: Key::of::<T>(),
            constructor: Arc::new(move |args: &Args| -> ConstructorResult {
                Ok(vec![Arc::new(f(args)?) as Value])
            }),
        }
    }

    /// Provider spreading every element of its result into `group`.
    pub fn many<T, F>(group: impl Into<String>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> std::result::Result<Vec<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            label: std::any::type_name::<Vec<T>>().to_string(),
            params: Vec::new(),
            output: Key::group(group),
            constructor: Arc::new(move |args: &Args| -> ConstructorResult {
                Ok(f(args)?
                    .into_iter()
                    .map(|v| Arc::new(v) as Value)
                    .collect())
            }),
        }
    }

    /// Provider of a fixed value.
    pub fn supply<T: Any + Clone + Send + Sync>(value: T) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Provider of an already-erased value under `name`.
    pub fn erased(name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Self {
            label: format!("supply {name}"),
            params: Vec::new(),
            output: Key::Named(name),
            constructor: Arc::new(move |_: &Args| -> ConstructorResult { Ok(vec![value.clone()]) }),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.output = Key::named(name);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.output = Key::group(group);
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn output(&self) -> &Key {
        &self.output
    }

    pub(crate) fn construct(&self, args: &Args) -> ConstructorResult {
        (self.constructor)(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("label", &self.label)
            .field("params", &self.params)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

type InvokeFn = Arc<dyn Fn(&Args) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Function run once while the graph is built, after every provider is
/// registered. Invokes are what pull values into existence.
#[derive(Clone)]
pub struct Invoke {
    pub(crate) label: String,
    pub(crate) params: Vec<Param>,
    func: InvokeFn,
}

impl Invoke {
    pub fn new<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Args) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            params: Vec::new(),
            func: Arc::new(f),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub(crate) fn call(&self, args: &Args) -> std::result::Result<(), BoxError> {
        (self.func)(args)
    }
}

impl fmt::Debug for Invoke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoke")
            .field("label", &self.label)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Building block of a graph.
#[derive(Debug, Clone)]
pub enum GraphOption {
    Provide(Provider),
    Invoke(Invoke),
    /// Named bundle; the name shows up in graph events.
    Module(String, Vec<GraphOption>),
    Options(Vec<GraphOption>),
    StartTimeout(Duration),
    StopTimeout(Duration),
}

pub fn provide(provider: Provider) -> GraphOption {
    GraphOption::Provide(provider)
}

pub fn invoke(invoke: Invoke) -> GraphOption {
    GraphOption::Invoke(invoke)
}

pub fn module(name: impl Into<String>, opts: Vec<GraphOption>) -> GraphOption {
    GraphOption::Module(name.into(), opts)
}

pub fn options(opts: Vec<GraphOption>) -> GraphOption {
    GraphOption::Options(opts)
}

/// Provide a fixed value by type.
pub fn supply<T: Any + Clone + Send + Sync>(value: T) -> GraphOption {
    provide(Provider::supply(value))
}

/// Provide a fixed value by name.
pub fn supply_named<T: Any + Clone + Send + Sync>(name: impl Into<String>, value: T) -> GraphOption {
    provide(Provider::supply(value).named(name))
}

pub fn start_timeout(timeout: Duration) -> GraphOption {
    GraphOption::StartTimeout(timeout)
}

pub fn stop_timeout(timeout: Duration) -> GraphOption {
    GraphOption::StopTimeout(timeout)
}
