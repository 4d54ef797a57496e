//! Transform registry: maps a transform name to its schema and factory.
//!
//! A transform registers exactly once. Re-registration under the same name
//! is rejected with `DuplicateName`, never silently overwritten, and there
//! is no unregistration.
//!
//! The process-wide instance is [`Registry::global`], created on first
//! access with every built-in transform registered. Tests and embedding
//! hosts that need isolation build their own with [`Registry::new`] or
//! [`Registry::with_builtins`].

use crate::error::{Result, TransformError};
use crate::provider::{AnyProvider, Provider};
use crate::schema::Descriptor;
use crate::transforms;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

/// Builds a transform's descriptor with defaults applied.
pub type SchemaFn = fn() -> Result<Descriptor>;

/// Builds a provider from a validated descriptor.
pub type ProviderFactory = fn(&Descriptor) -> Result<AnyProvider>;

/// Everything the registry knows about one transform.
#[derive(Clone, Copy)]
pub struct TransformDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: SchemaFn,
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for TransformDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Name → definition map. Read-mostly; lookups may run concurrently.
#[derive(Debug, Default)]
pub struct Registry {
    entries: RwLock<BTreeMap<String, TransformDefinition>>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in transform.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for definition in transforms::builtin_definitions() {
            if let Err(e) = registry.register(definition) {
                tracing::error!("Failed to register built-in transform: {}", e);
            }
        }
        registry
    }

    /// The process-wide registry, initialised with the built-ins on first
    /// access.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::with_builtins)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, TransformDefinition>>> {
        self.entries
            .read()
            .map_err(|e| TransformError::Config(format!("Failed to acquire registry lock: {}", e)))
    }

    /// Register a transform. Fails if the name is taken.
    pub fn register(&self, definition: TransformDefinition) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| {
            TransformError::Config(format!("Failed to acquire registry lock: {}", e))
        })?;
        if entries.contains_key(definition.name) {
            return Err(TransformError::DuplicateName(definition.name.to_string()));
        }
        entries.insert(definition.name.to_string(), definition);
        tracing::debug!("Registered transform '{}'", definition.name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().is_ok_and(|entries| entries.contains_key(name))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn definition(&self, name: &str) -> Result<TransformDefinition> {
        self.read()?
            .get(name)
            .copied()
            .ok_or_else(|| TransformError::UnknownTransform(name.to_string()))
    }

    pub fn description(&self, name: &str) -> Result<&'static str> {
        self.definition(name).map(|d| d.description)
    }

    /// A fresh descriptor for `name` with defaults applied and the update
    /// rule evaluated.
    pub fn descriptor(&self, name: &str) -> Result<Descriptor> {
        let definition = self.definition(name)?;
        let descriptor = (definition.schema)()?;
        if descriptor.name() != definition.name {
            return Err(TransformError::InvalidDescriptor {
                transform: definition.name.to_string(),
                reason: format!("schema is named '{}'", descriptor.name()),
            });
        }
        Ok(descriptor)
    }

    /// Build a provider for `descriptor`.
    ///
    /// Fails only if the transform is unknown. An invalid descriptor or a
    /// factory error produces a not-OK provider so batch callers can skip it.
    pub fn create(&self, descriptor: &Descriptor) -> Result<Provider> {
        let definition = self.definition(descriptor.name())?;
        let name = definition.name;

        if let Err(e) = descriptor.validate() {
            tracing::warn!("Transform '{}' not constructed: {}", name, e);
            return Ok(Provider::not_ok(name, e.to_string()));
        }
        match (definition.factory)(descriptor) {
            Ok(inner) => Ok(Provider::ready(name, inner)),
            Err(e) => {
                tracing::warn!("Transform '{}' factory failed: {}", name, e);
                Ok(Provider::not_ok(name, e.to_string()))
            }
        }
    }
}
