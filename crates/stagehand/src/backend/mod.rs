// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lifecycle backends.
//!
//! A backend is what actually runs the application. The controller hands it
//! the identity, views of its config and logger slots, the extra options and
//! the timeouts during [`Backend::init`], then drives it through
//! [`Backend::start`], [`Backend::stop`] and [`Backend::wait`].
//!
//! - [`DefaultBackend`]: no-op backend that only waits for OS signals
//! - `stagehand_graph::GraphBackend`: provider-graph backend

mod default;

pub use default::DefaultBackend;

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::App;
use crate::config::{ConfigHandle, ConfigTree};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::signals::TerminationCause;

/// Opaque backend-specific option carried through [`crate::options`].
///
/// Backends downcast the entries they understand and ignore the rest.
pub type BackendOption = Arc<dyn Any + Send + Sync>;

/// Wrap a value as a [`BackendOption`].
pub fn backend_option<T: Any + Send + Sync>(value: T) -> BackendOption {
    Arc::new(value)
}

/// Backend contract.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identity used when wrapping backend errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Configure the backend. A failed init must leave nothing running.
    async fn init(&self, params: BackendInitParams<'_>) -> Result<()>;

    /// Start the application, honouring the context deadline.
    async fn start(&self, ctx: Context) -> Result<()>;

    /// Stop the application, honouring the context deadline.
    async fn stop(&self, ctx: Context) -> Result<()>;

    /// Resolve once the application should terminate.
    async fn wait(&self) -> TerminationCause;
}

/// Parameters handed to [`Backend::init`].
pub struct BackendInitParams<'a> {
    pub app: Arc<App>,
    pub config: ConfigSlot<'a>,
    pub logger: LoggerSlot<'a>,
    pub options: Vec<BackendOption>,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl fmt::Debug for BackendInitParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendInitParams")
            .field("app", &self.app)
            .field("config", &self.config)
            .field("logger", &self.logger)
            .field("options", &self.options.len())
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .finish()
    }
}

type EmptyFn = fn(&(dyn Any + Send + Sync)) -> bool;
type AssignFn = fn(&mut (dyn Any + Send + Sync), &(dyn Any + Send + Sync)) -> bool;

/// Type-erased view of a controller slot (`&mut Option<T>`).
///
/// The backend does not know `T`; it can test for it, read it, or store a
/// value that has exactly that type.
pub struct Slot<'a> {
    value: &'a mut (dyn Any + Send + Sync),
    type_id: TypeId,
    type_name: &'static str,
    is_empty: EmptyFn,
    assign: AssignFn,
}

impl<'a> Slot<'a> {
    pub fn new<T>(slot: &'a mut Option<T>) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        Self {
            value: slot,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            is_empty: slot_is_empty::<T>,
            assign: slot_assign::<T>,
        }
    }

    /// Whether the slot is declared as `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Declared type of the slot.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_empty(&self) -> bool {
        (self.is_empty)(&*self.value)
    }

    /// Clone the current value out, if the slot is a `T` and is set.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.value.downcast_ref::<Option<T>>()?.clone()
    }

    /// Store `value`; fails with [`Error::SlotType`] unless the slot is a `V`.
    pub fn set<V: Any>(&mut self, value: V) -> Result<()> {
        match self.value.downcast_mut::<Option<V>>() {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(Error::SlotType {
                expected: self.type_name,
                found: std::any::type_name::<V>(),
            }),
        }
    }

    /// Store an erased value, cloning it when it has the slot's type.
    /// `found` names the offered type for the error.
    pub fn set_erased(&mut self, value: &(dyn Any + Send + Sync), found: &'static str) -> Result<()> {
        if (self.assign)(&mut *self.value, value) {
            Ok(())
        } else {
            Err(Error::SlotType {
                expected: self.type_name,
                found,
            })
        }
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("type_name", &self.type_name)
            .field("empty", &self.is_empty())
            .finish()
    }
}

fn slot_is_empty<T: Any>(value: &(dyn Any + Send + Sync)) -> bool {
    value
        .downcast_ref::<Option<T>>()
        .is_none_or(Option::is_none)
}

fn slot_assign<T: Any + Clone>(
    slot: &mut (dyn Any + Send + Sync),
    value: &(dyn Any + Send + Sync),
) -> bool {
    let Some(value) = value.downcast_ref::<T>() else {
        return false;
    };
    match slot.downcast_mut::<Option<T>>() {
        Some(slot) => {
            *slot = Some(value.clone());
            true
        }
        None => false,
    }
}

/// Logger slot.
pub type LoggerSlot<'a> = Slot<'a>;

type HandleFn = fn(&(dyn Any + Send + Sync)) -> Option<ConfigHandle>;

/// Config slot: a [`Slot`] whose type also implements [`ConfigTree`].
pub struct ConfigSlot<'a> {
    slot: Slot<'a>,
    handle: HandleFn,
}

impl<'a> ConfigSlot<'a> {
    pub fn new<C>(slot: &'a mut Option<C>) -> Self
    where
        C: ConfigTree + Clone,
    {
        Self {
            slot: Slot::new(slot),
            handle: config_handle::<C>,
        }
    }

    /// Handle to a copy of the current value, if set.
    pub fn handle(&self) -> Option<ConfigHandle> {
        (self.handle)(&*self.slot.value)
    }

    /// Replace the value with the one held by `handle`.
    pub fn set_handle(&mut self, handle: &ConfigHandle) -> Result<()> {
        let found = handle.type_name();
        self.slot.set_erased(handle.value().as_ref(), found)
    }
}

impl<'a> Deref for ConfigSlot<'a> {
    type Target = Slot<'a>;

    fn deref(&self) -> &Self::Target {
        &self.slot
    }
}

impl DerefMut for ConfigSlot<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot
    }
}

impl fmt::Debug for ConfigSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.slot.fmt(f)
    }
}

fn config_handle<C: ConfigTree + Clone>(value: &(dyn Any + Send + Sync)) -> Option<ConfigHandle> {
    let value = value.downcast_ref::<Option<C>>()?.as_ref()?;
    Some(ConfigHandle::new(value.clone()))
}
