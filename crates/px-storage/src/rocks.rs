use anyhow::Result;
use async_trait::async_trait;
use px_api_types::PersistedWallet;
use rocksdb::{DB, IteratorMode, Options};
use std::sync::Arc;

use crate::SessionStore;

const KEY_PREFIX: &str = "session:";

pub struct RocksDbSessionStore {
    db: Arc<DB>,
}

impl RocksDbSessionStore {
    pub fn open_default(path: &str) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn key_for(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

#[async_trait]
impl SessionStore for RocksDbSessionStore {
    async fn save(&self, key: &str, record: &PersistedWallet) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.db.put(Self::key_for(key).as_bytes(), value)?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedWallet>> {
        match self.db.get(Self::key_for(key).as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db.delete(Self::key_for(key).as_bytes())?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.db.iterator(IteratorMode::Start) {
            let (key, _) = item?;
            if let Some(rest) = key.as_ref().strip_prefix(KEY_PREFIX.as_bytes()) {
                keys.push(String::from_utf8_lossy(rest).into_owned());
            }
        }
        Ok(keys)
    }
}
