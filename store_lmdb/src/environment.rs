//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbError, LmdbOutputStore};

/// Number of named databases the output store uses.
const DATABASE_COUNT: u32 = 3;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    outputs_db: Database<Bytes, Bytes>,
    topic_scores_db: Database<Bytes, Bytes>,
    applied_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never truncated underneath it.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASE_COUNT)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let outputs_db = env.create_database(&mut wtxn, Some("outputs"))?;
        let topic_scores_db = env.create_database(&mut wtxn, Some("topic_scores"))?;
        let applied_db = env.create_database(&mut wtxn, Some("applied_transactions"))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            outputs_db,
            topic_scores_db,
            applied_db,
        })
    }

    /// Output store sharing this environment.
    pub fn output_store(&self) -> LmdbOutputStore {
        LmdbOutputStore {
            env: Arc::clone(&self.env),
            outputs_db: self.outputs_db,
            topic_scores_db: self.topic_scores_db,
            applied_db: self.applied_db,
        }
    }
}
