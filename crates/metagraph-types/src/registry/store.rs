//! Durable log of committed type batches.

use rkyv::{Archive, Deserialize, Serialize};
use sled::{Db, Tree};

use crate::error::Error;
use crate::types::TypeDefinition;

/// Tree name for committed batches.
const BATCH_TREE: &str = "types:batches";

/// One committed registration batch.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct TypeBatch {
    /// Snapshot version the batch was committed as.
    pub version: u64,
    /// Commit timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Definitions exactly as submitted.
    pub definitions: Vec<TypeDefinition>,
}

impl TypeBatch {
    /// Serialize the batch to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a batch from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Append-only store of committed batches, keyed by version.
///
/// Replaying every batch in version order rebuilds the registry.
pub struct TypeStore {
    batches: Tree,
}

impl TypeStore {
    /// Open or create a store using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        Ok(Self {
            batches: db.open_tree(BATCH_TREE)?,
        })
    }

    /// Record a committed batch.
    pub fn append(
        &self,
        version: u64,
        created_at: u64,
        definitions: &[TypeDefinition],
    ) -> Result<(), Error> {
        let batch = TypeBatch {
            version,
            created_at,
            definitions: definitions.to_vec(),
        };
        self.batches.insert(version.to_be_bytes(), batch.to_bytes()?)?;
        Ok(())
    }

    /// All batches in ascending version order.
    pub fn batches(&self) -> Result<Vec<TypeBatch>, Error> {
        let mut batches = Vec::new();
        for result in self.batches.iter() {
            let (_, value) = result?;
            batches.push(TypeBatch::from_bytes(&value)?);
        }
        Ok(batches)
    }

    /// Highest stored version, 0 when empty.
    pub fn latest_version(&self) -> Result<u64, Error> {
        match self.batches.last()? {
            Some((key, _)) if key.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&key);
                Ok(u64::from_be_bytes(buf))
            }
            Some(_) => Err(Error::Corrupt("invalid batch key".into())),
            None => Ok(0),
        }
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.batches.flush()?;
        Ok(())
    }
}
