// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A key-value store shared between scripts.
//!
//! Scripts reach the store through the `bindings` module:
//!
//! ```rhai
//! bindings::bind("db", #{ url: "mem:test" });
//! let db = bindings::lookup("db");
//! bindings::unbind("db");
//! ```
//!
//! One store is created per driver run and handed to every sandbox, so values bound while
//! evaluating one test file are visible to the files that follow.

use rhai::{Dynamic, Module};
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};
use tracing::debug;

/// The name scripts use to reach the store.
pub const BINDINGS_MODULE: &str = "bindings";

/// A shared handle to a key-value store. Clones refer to the same store.
#[derive(Clone, Debug, Default)]
pub struct BindingStore {
    inner: Rc<RefCell<BTreeMap<String, Dynamic>>>,
}

impl BindingStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `name`, returning the previous value if any.
    pub fn bind(&self, name: &str, value: Dynamic) -> Option<Dynamic> {
        debug!("binding `{name}`");
        self.inner.borrow_mut().insert(name.to_owned(), value)
    }

    /// Returns the value bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<Dynamic> {
        self.inner.borrow().get(name).cloned()
    }

    /// Removes the binding for `name`, returning its value if any.
    pub fn unbind(&self, name: &str) -> Option<Dynamic> {
        self.inner.borrow_mut().remove(name)
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Builds the `bindings` script module backed by this store.
    ///
    /// Missing values are returned to scripts as `()`.
    pub(crate) fn to_module(&self) -> Module {
        let mut module = Module::new();

        let store = self.clone();
        module.set_native_fn("bind", move |name: &str, value: Dynamic| {
            Ok(store.bind(name, value).unwrap_or(Dynamic::UNIT))
        });
        let store = self.clone();
        module.set_native_fn("lookup", move |name: &str| {
            Ok(store.lookup(name).unwrap_or(Dynamic::UNIT))
        });
        let store = self.clone();
        module.set_native_fn("unbind", move |name: &str| {
            Ok(store.unbind(name).unwrap_or(Dynamic::UNIT))
        });

        module
    }
}
