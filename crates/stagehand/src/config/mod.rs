// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration schema.
//!
//! Configuration types describe their own shape through [`ConfigTree`],
//! normally generated with `#[derive(ConfigTree)]`. The schema lists every
//! field in declaration order together with its type name and whether it is
//! a nested record, a pointer to one, or something else. The
//! [`discovery`] walker visits that schema to expose nested `*Config`
//! records as individually addressable providers.

pub mod discovery;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Graph name of the configuration value as supplied by the caller.
pub const NAMED_CONFIG_POINTER_IN: &str = "config.pointer.in";
/// Graph name of the configuration value once loaded.
pub const NAMED_CONFIG_POINTER_OUT: &str = "config.pointer.out";
/// Graph group collecting configuration file paths for loaders.
pub const GROUP_CONFIG_FILES: &str = "config.files";

/// Type-erased value shared through the provider graph.
pub type ConfigValue = Arc<dyn Any + Send + Sync>;

/// Schema description of a configuration record.
pub trait ConfigTree: Any + Send + Sync {
    /// Fully qualified type name of the record.
    fn type_name(&self) -> &'static str;

    /// Fields in declaration order.
    fn fields(&self) -> Vec<ConfigField<'_>>;

    /// Clone the field at `index` into a handle, if it is a record or a
    /// non-empty pointer to one.
    fn field_value(&self, index: usize) -> Option<ConfigHandle>;

    /// Whether this value is a structured record. Only hand-written
    /// implementations for scalar wrappers should return `false`.
    fn is_record(&self) -> bool {
        true
    }
}

/// Marker configuration: no fields, nothing to discover.
impl ConfigTree for () {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<()>()
    }

    fn fields(&self) -> Vec<ConfigField<'_>> {
        Vec::new()
    }

    fn field_value(&self, _index: usize) -> Option<ConfigHandle> {
        None
    }
}

/// One field of a [`ConfigTree`].
pub struct ConfigField<'a> {
    pub name: &'static str,
    /// Declared type name; for pointer fields, the pointee's type name.
    pub type_name: &'static str,
    pub node: FieldNode<'a>,
}

/// Shape of a field as seen by the walker.
pub enum FieldNode<'a> {
    /// Plain nested record.
    Record(&'a dyn ConfigTree),
    /// `Box`/`Arc`/`Option<Box|Arc>` pointing at a record; `None` when empty.
    Pointer(Option<&'a dyn ConfigTree>),
    /// Anything else.
    Other,
}

impl fmt::Debug for ConfigField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = match &self.node {
            FieldNode::Record(_) => "record",
            FieldNode::Pointer(Some(_)) => "pointer",
            FieldNode::Pointer(None) => "nil pointer",
            FieldNode::Other => "other",
        };
        f.debug_struct("ConfigField")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("node", &node)
            .finish()
    }
}

type TreeFn = for<'a> fn(&'a (dyn Any + Send + Sync)) -> Option<&'a dyn ConfigTree>;

/// A configuration value together with the means to view it as a tree.
///
/// The handle remembers the record type it was created for, so the tree view
/// can be re-derived from the erased value whether it holds the record
/// directly or behind `Box`, `Arc` or `Option<Box>`.
#[derive(Clone)]
pub struct ConfigHandle {
    value: ConfigValue,
    type_name: &'static str,
    tree: TreeFn,
}

impl ConfigHandle {
    /// Wrap a record.
    pub fn new<T: ConfigTree>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap a shared record without cloning it.
    pub fn from_arc<T: ConfigTree>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            tree: tree_of::<T>,
        }
    }

    /// Tree view of the value, if it still has the expected shape.
    pub fn tree(&self) -> Option<&dyn ConfigTree> {
        (self.tree)(self.value.as_ref())
    }

    /// Type name of the record the handle was created for.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Erased value.
    pub fn value(&self) -> &ConfigValue {
        &self.value
    }

    /// Borrow the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Clone the value out as `T`.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn tree_of<T: ConfigTree>(value: &(dyn Any + Send + Sync)) -> Option<&dyn ConfigTree> {
    if let Some(v) = value.downcast_ref::<T>() {
        return Some(v);
    }
    if let Some(v) = value.downcast_ref::<Box<T>>() {
        return Some(v.as_ref());
    }
    if let Some(v) = value.downcast_ref::<Arc<T>>() {
        return Some(v.as_ref());
    }
    if let Some(v) = value.downcast_ref::<Option<Box<T>>>() {
        return v.as_deref().map(|v| v as &dyn ConfigTree);
    }
    None
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config: struct nil")]
    Nil,
    #[error("config: expecting struct, got '{type_name}'")]
    NotAStruct { type_name: String },
}

/// Checks that a configuration is present and is a structured record.
pub fn struct_check(config: Option<&ConfigHandle>) -> Result<(), ConfigError> {
    let Some(handle) = config else {
        return Err(ConfigError::Nil);
    };
    match handle.tree() {
        Some(tree) if tree.is_record() => Ok(()),
        _ => Err(ConfigError::NotAStruct {
            type_name: handle.type_name().to_string(),
        }),
    }
}

/// Support for `#[derive(ConfigTree)]`. Not public API.
#[doc(hidden)]
pub mod __private {
    use std::marker::PhantomData;

    use super::{ConfigHandle, ConfigTree};

    /// Type-level probe for a pointer field's pointee.
    ///
    /// Method calls go through `(&probe).method()`: [`TreeField`] applies
    /// when `T` is a config tree, otherwise auto-ref falls back to
    /// [`PlainField`].
    pub struct TreeProbe<T: ?Sized>(PhantomData<*const T>);

    impl<T: ?Sized> TreeProbe<T> {
        #[allow(clippy::new_without_default)]
        pub fn new() -> Self {
            Self(PhantomData)
        }
    }

    pub trait TreeField {
        type Pointee: ?Sized;
        fn is_tree(&self) -> bool;
        fn view<'a>(&self, value: &'a Self::Pointee) -> Option<&'a dyn ConfigTree>;
        fn handle(&self, value: &Self::Pointee) -> Option<ConfigHandle>;
    }

    impl<T: ConfigTree + Clone> TreeField for TreeProbe<T> {
        type Pointee = T;

        fn is_tree(&self) -> bool {
            true
        }

        fn view<'a>(&self, value: &'a T) -> Option<&'a dyn ConfigTree> {
            Some(value)
        }

        fn handle(&self, value: &T) -> Option<ConfigHandle> {
            Some(ConfigHandle::new(value.clone()))
        }
    }

    pub trait PlainField {
        type Pointee: ?Sized;
        fn is_tree(&self) -> bool;
        fn view<'a>(&self, value: &'a Self::Pointee) -> Option<&'a dyn ConfigTree>;
        fn handle(&self, value: &Self::Pointee) -> Option<ConfigHandle>;
    }

    impl<T: ?Sized> PlainField for &TreeProbe<T> {
        type Pointee = T;

        fn is_tree(&self) -> bool {
            false
        }

        fn view<'a>(&self, _value: &'a T) -> Option<&'a dyn ConfigTree> {
            None
        }

        fn handle(&self, _value: &T) -> Option<ConfigHandle> {
            None
        }
    }
}
