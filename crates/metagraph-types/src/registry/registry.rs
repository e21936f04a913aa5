//! The process-wide type registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::batch::{stage_batch, StagedBatch};
use super::snapshot::{current_timestamp, ResolvedTypes, TypeSnapshot};
use super::store::TypeStore;
use crate::document::SchemaDocument;
use crate::error::{Error, RegistrationError, ValidationError};
use crate::types::{EnumTypeDefinition, ResolvedType, TypeCategory, TypeDefinition};
use crate::validation::validate_entity;
use crate::value::Value;

/// Transactional catalog of classes, traits and enums.
///
/// Writers are serialised: one batch validates and commits at a time.
/// Readers clone the current snapshot pointer and never observe a
/// partially applied batch.
pub struct TypeRegistry {
    /// Published snapshot; the lock is held only to copy or swap the pointer.
    current: RwLock<Arc<TypeSnapshot>>,
    /// Serialises registration.
    commit_lock: Mutex<()>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(TypeSnapshot::empty())),
            commit_lock: Mutex::new(()),
        }
    }

    /// Rebuild a registry by replaying every batch in a store.
    pub fn restore(store: &TypeStore) -> Result<Self, Error> {
        let registry = Self::new();
        for batch in store.batches()? {
            let _guard = registry.commit_lock.lock();
            let current = registry.snapshot();
            let expected = current.version() + 1;
            if batch.version != expected {
                return Err(Error::Corrupt(format!(
                    "expected batch version {}, found {}",
                    expected, batch.version
                )));
            }
            let staged = stage_batch(&current, &batch.definitions).map_err(|errors| {
                Error::Corrupt(RegistrationError::new(errors).to_string())
            })?;
            registry.publish(&current, staged, batch.created_at);
        }
        info!(version = registry.version(), types = registry.snapshot().len(), "restored type registry");
        Ok(registry)
    }

    /// The current snapshot. Holding it gives a consistent view across lookups.
    pub fn snapshot(&self) -> Arc<TypeSnapshot> {
        self.current.read().clone()
    }

    /// Current snapshot version; 0 before the first commit.
    pub fn version(&self) -> u64 {
        self.snapshot().version()
    }

    /// Register a batch of definitions atomically.
    ///
    /// Every problem in the batch is reported together. On failure nothing
    /// is published. An empty batch succeeds without a new version.
    pub fn register_types(
        &self,
        batch: Vec<TypeDefinition>,
    ) -> Result<ResolvedTypes, RegistrationError> {
        if batch.is_empty() {
            return Ok(ResolvedTypes::new());
        }
        let _guard = self.commit_lock.lock();
        let current = self.snapshot();
        let staged = self.stage(&current, &batch)?;
        Ok(self.publish(&current, staged, current_timestamp()))
    }

    /// Register a batch and record it in `store` before publishing.
    ///
    /// If the store write fails the batch is not published.
    pub fn register_and_persist(
        &self,
        batch: Vec<TypeDefinition>,
        store: &TypeStore,
    ) -> Result<ResolvedTypes, Error> {
        if batch.is_empty() {
            return Ok(ResolvedTypes::new());
        }
        let _guard = self.commit_lock.lock();
        let current = self.snapshot();
        let staged = self.stage(&current, &batch)?;
        let created_at = current_timestamp();
        store.append(current.version() + 1, created_at, &batch)?;
        Ok(self.publish(&current, staged, created_at))
    }

    fn stage(
        &self,
        current: &TypeSnapshot,
        batch: &[TypeDefinition],
    ) -> Result<StagedBatch, RegistrationError> {
        stage_batch(current, batch).map_err(|errors| {
            warn!(
                version = current.version(),
                batch = batch.len(),
                errors = errors.len(),
                "rejected type batch"
            );
            RegistrationError::new(errors)
        })
    }

    /// Swap in the next snapshot. Caller holds the commit lock.
    fn publish(&self, current: &TypeSnapshot, staged: StagedBatch, created_at: u64) -> ResolvedTypes {
        let version = current.version() + 1;
        let types: ResolvedTypes = staged
            .types
            .into_iter()
            .map(|(name, resolved)| (name, Arc::new(resolved)))
            .collect();
        let enums: Vec<Arc<EnumTypeDefinition>> = staged.enums.into_iter().map(Arc::new).collect();

        let next = current.extend(version, created_at, types.values().cloned(), enums.iter().cloned());
        *self.current.write() = Arc::new(next);

        info!(
            version,
            types = types.len(),
            enums = enums.len(),
            "committed type batch"
        );
        types
    }

    /// Get a resolved class or trait.
    pub fn get_type(&self, name: &str) -> Option<Arc<ResolvedType>> {
        self.snapshot().get_type(name).cloned()
    }

    /// Get an enum.
    pub fn get_enum(&self, name: &str) -> Option<Arc<EnumTypeDefinition>> {
        self.snapshot().get_enum(name).cloned()
    }

    /// Class and trait names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        owned(self.snapshot().type_names())
    }

    /// Enum names, sorted.
    pub fn enum_names(&self) -> Vec<String> {
        owned(self.snapshot().enum_names())
    }

    /// Class or trait names of one category, sorted.
    pub fn type_names_by_category(&self, category: TypeCategory) -> Vec<String> {
        owned(self.snapshot().type_names_by_category(category))
    }

    /// Types inheriting from `name`, sorted.
    pub fn subtypes_of(&self, name: &str) -> Vec<String> {
        owned(self.snapshot().subtypes_of(name))
    }

    /// Check attribute values against a registered class.
    ///
    /// Returns every violation found; an empty list means the entity is valid.
    /// Cross-entity uniqueness is left to the storage layer.
    pub fn validate_entity(
        &self,
        type_name: &str,
        values: &HashMap<String, Value>,
    ) -> Vec<ValidationError> {
        validate_entity(&self.snapshot(), type_name, values)
    }

    /// Export every committed type in document form.
    pub fn export(&self) -> SchemaDocument {
        SchemaDocument::from_snapshot(&self.snapshot())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(String::from).collect()
}
