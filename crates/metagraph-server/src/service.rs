//! Type service: the registry plus its durable store.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use metagraph_types::{ResolvedTypes, SchemaDocument, TypeDefinition, TypeRegistry, TypeStore};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::lineage::{lineage_type_definitions, LineageIngestor};

/// Owns the process-wide type registry and the store backing it.
pub struct TypeService {
    registry: Arc<TypeRegistry>,
    store: TypeStore,
    /// Keep the sled::Db handle alive for the store.
    _db: sled::Db,
}

impl TypeService {
    /// Open the store under `data_path` and replay every committed batch.
    pub fn open(data_path: &Path) -> Result<Self, Error> {
        std::fs::create_dir_all(data_path)?;
        let db = sled::open(data_path.join("types"))?;
        let store = TypeStore::open(&db)?;
        let registry = TypeRegistry::restore(&store)?;

        Ok(Self {
            registry: Arc::new(registry),
            store,
            _db: db,
        })
    }

    /// Open the service and load everything `config` asks for at startup.
    pub fn start(config: &ServerConfig) -> Result<Self, Error> {
        let service = Self::open(&config.data_path)?;
        info!(
            data_path = %config.data_path.display(),
            version = service.registry.version(),
            "type store opened"
        );

        for path in &config.bootstrap_files {
            service.load_bootstrap_file(path)?;
        }
        if config.lineage_types {
            let definitions = lineage_type_definitions().map_err(metagraph_types::Error::from)?;
            let registered = service.register_missing(definitions)?;
            info!(types = registered.len(), "lineage types ready");
        }

        service.flush()?;
        Ok(service)
    }

    /// Shared handle to the registry.
    pub fn registry(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    /// Register a batch and persist it.
    pub fn register(&self, batch: Vec<TypeDefinition>) -> Result<ResolvedTypes, Error> {
        Ok(self.registry.register_and_persist(batch, &self.store)?)
    }

    /// Register a batch, skipping definitions already committed unchanged.
    ///
    /// Makes startup registration repeatable across restarts. A definition
    /// that reuses a committed name with a different shape is still submitted
    /// and fails as a duplicate.
    pub fn register_missing(&self, batch: Vec<TypeDefinition>) -> Result<ResolvedTypes, Error> {
        let snapshot = self.registry.snapshot();
        let (committed, missing): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|def| snapshot.is_committed(def));
        if !committed.is_empty() {
            info!(skipped = committed.len(), "types already registered");
        }
        self.register(missing)
    }

    /// Register the schema document at `path`.
    pub fn load_bootstrap_file(&self, path: &Path) -> Result<ResolvedTypes, Error> {
        let bootstrap = |source: metagraph_types::Error| Error::Bootstrap {
            path: path.to_path_buf(),
            source,
        };

        let json = std::fs::read_to_string(path)?;
        let batch = SchemaDocument::from_json(&json)
            .and_then(|doc| doc.into_batch().map_err(Into::into))
            .map_err(bootstrap)?;
        let registered = match self.register_missing(batch) {
            Ok(registered) => registered,
            Err(Error::Types(source)) => return Err(bootstrap(source)),
            Err(other) => return Err(other),
        };

        info!(
            path = %path.display(),
            types = registered.len(),
            version = self.registry.version(),
            "bootstrap file loaded"
        );
        Ok(registered)
    }

    /// Create a lineage ingestor over this registry.
    pub fn lineage_ingestor(&self) -> LineageIngestor {
        LineageIngestor::new(self.registry())
    }

    /// Flush the store to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.store.flush()?;
        Ok(())
    }
}
