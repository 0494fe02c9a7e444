//! Engine-agnostic host bindings facade for registering functions and
//! properties on the JavaScript global object.
//!
//! This module defines a small set of value types and traits that allow the
//! host to install namespaces (for example, `console` or `document`) into any
//! JavaScript engine adapter without depending on engine-specific APIs. The
//! tables are generic over the context the functions run against, so the
//! crate owning that context decides what a host call can reach.

use std::collections::BTreeMap;
use std::sync::Arc;

mod values;
pub use values::{JSError, JSValue, JsFunctionRef, LogLevel};
mod logger;
pub use logger::{HostEnvironment, HostLogger};

/// A synchronous host function signature.
pub type HostFnSync<C> =
    dyn Fn(&C, Vec<JSValue>) -> Result<JSValue, JSError> + Send + Sync + 'static;

/// A single function descriptor the engine adapter can install.
pub enum HostFnKind<C> {
    /// Synchronous function.
    Sync(Arc<HostFnSync<C>>),
}

impl<C> Clone for HostFnKind<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(function) => Self::Sync(Arc::clone(function)),
        }
    }
}

impl<C> HostFnKind<C> {
    /// Invoke the function with the given context and arguments.
    ///
    /// # Errors
    /// Propagates the error raised by the host function.
    #[inline]
    pub fn call(&self, context: &C, arguments: Vec<JSValue>) -> Result<JSValue, JSError> {
        match self {
            Self::Sync(function) => function(context, arguments),
        }
    }
}

/// A namespaced set of functions and properties (for example, the `console` object).
pub struct HostNamespace<C> {
    /// Functions to install under this namespace.
    pub functions: BTreeMap<String, HostFnKind<C>>,
    /// Constant properties to install under this namespace.
    pub properties: BTreeMap<String, JSValue>,
}

impl<C> HostNamespace<C> {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self { functions: BTreeMap::new(), properties: BTreeMap::new() }
    }

    /// Register a synchronous function.
    #[must_use]
    pub fn with_sync_fn(mut self, name: &str, function: Arc<HostFnSync<C>>) -> Self {
        self.functions.insert(name.to_owned(), HostFnKind::Sync(function));
        self
    }

    /// Register a constant property.
    #[must_use]
    pub fn with_property(mut self, name: &str, value: JSValue) -> Self {
        self.properties.insert(name.to_owned(), value);
        self
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&HostFnKind<C>> {
        self.functions.get(name)
    }
}

impl<C> Default for HostNamespace<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A collection of namespaces to be installed on the global object.
pub struct HostBindings<C> {
    /// Mapping from namespace name to its definitions.
    pub namespaces: BTreeMap<String, HostNamespace<C>>,
}

impl<C> HostBindings<C> {
    /// Create empty bindings.
    pub fn new() -> Self {
        Self { namespaces: BTreeMap::new() }
    }

    /// Add or replace a namespace.
    #[must_use]
    pub fn with_namespace(mut self, name: &str, namespace: HostNamespace<C>) -> Self {
        self.namespaces.insert(name.to_owned(), namespace);
        self
    }

    /// Look up `namespace.function`.
    pub fn function(&self, namespace: &str, name: &str) -> Option<&HostFnKind<C>> {
        self.namespaces.get(namespace)?.function(name)
    }
}

impl<C> Default for HostBindings<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal helper to build a console logging function for a given level.
fn make_log_fn<C: HostEnvironment + 'static>(level: LogLevel) -> Arc<HostFnSync<C>> {
    Arc::new(move |context: &C, arguments: Vec<JSValue>| -> Result<JSValue, JSError> {
        let message = stringify_arguments(arguments);
        context.logger().log(level, &message);
        Ok(JSValue::Undefined)
    })
}

/// Build the `console` namespace with standard logging methods.
pub fn build_console_namespace<C: HostEnvironment + 'static>() -> HostNamespace<C> {
    let methods: [(&str, LogLevel); 5] = [
        ("log", LogLevel::Info),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("warn", LogLevel::Warn),
        ("error", LogLevel::Error),
    ];

    methods
        .iter()
        .fold(HostNamespace::new(), |ns, (name, level)| ns.with_sync_fn(name, make_log_fn(*level)))
}

/// Join arguments the way `console.log` prints them.
pub fn stringify_arguments(arguments: Vec<JSValue>) -> String {
    arguments
        .iter()
        .map(JSValue::to_display_string)
        .collect::<Vec<_>>()
        .join(" ")
}
