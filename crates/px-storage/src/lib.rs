use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use px_api_types::PersistedWallet;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[cfg(feature = "rocksdb")]
mod rocks;

#[cfg(feature = "rocksdb")]
pub use rocks::RocksDbSessionStore;

/// Key-value persistence for the wallet session, shaped like browser local
/// storage: one JSON document per key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, key: &str, record: &PersistedWallet) -> Result<()>;
    async fn load(&self, key: &str) -> Result<Option<PersistedWallet>>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct NoopSessionStore;

#[async_trait]
impl SessionStore for NoopSessionStore {
    async fn save(&self, _key: &str, _record: &PersistedWallet) -> Result<()> {
        Ok(())
    }

    async fn load(&self, _key: &str) -> Result<Option<PersistedWallet>> {
        Ok(None)
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Keeps raw JSON strings, so records go through the same encoding as the
/// persistent stores.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put_raw(&self, key: &str, value: impl Into<String>) {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.into());
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, key: &str, record: &PersistedWallet) -> Result<()> {
        let value = serde_json::to_string(record)?;
        let mut guard = self.entries.write().await;
        guard.insert(key.to_owned(), value);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedWallet>> {
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(raw) => Ok(Some(
                serde_json::from_str(raw)
                    .with_context(|| format!("corrupt session entry: {key}"))?,
            )),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut guard = self.entries.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let guard = self.entries.read().await;
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

/// One `<key>.json` file per entry inside a directory.
pub struct JsonFileSessionStore {
    dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create session directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn save(&self, key: &str, record: &PersistedWallet) -> Result<()> {
        let path = self.path_for(key)?;
        let value = serde_json::to_vec(record)?;
        tokio::fs::write(&path, value)
            .await
            .with_context(|| format!("failed to write session file: {}", path.display()))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<PersistedWallet>> {
        let path = self.path_for(key)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read session file: {}", path.display()));
            }
        };
        let record = serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt session file: {}", path.display()))?;
        Ok(Some(record))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove session file: {}", path.display())),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("failed to read session directory: {}", self.dir.display()))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|value| value.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(anyhow!("session key cannot be empty"));
    }
    if key.contains(['/', '\\']) || key.contains("..") {
        return Err(anyhow!("invalid session key: {key}"));
    }
    Ok(())
}
