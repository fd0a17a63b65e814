//! Flat-file JSON persistence for the registries.
//!
//! Each store is one pretty-printed JSON array on disk. An absent file
//! reads as empty; a corrupt file logs a warning and also reads as
//! empty rather than poisoning startup. All access goes through a per
//! store mutex, so read-modify-write cycles never interleave.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

pub struct JsonStore<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> JsonStore<T> {
    pub fn open(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()), _marker: PhantomData }
    }

    /// Snapshot of the current records.
    pub fn load(&self) -> Vec<T> {
        let _guard = self.lock.lock();
        self.read_items()
    }

    /// Read-modify-write under the store lock. The file is rewritten
    /// whether or not `apply` changed anything.
    pub fn update<R>(&self, apply: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        let _guard = self.lock.lock();
        let mut items = self.read_items();
        let out = apply(&mut items);
        self.write_items(&items)?;
        Ok(out)
    }

    fn read_items(&self) -> Vec<T> {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(items) => items,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "store file is corrupt, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "store file unreadable, starting empty");
                Vec::new()
            }
        }
    }

    fn write_items(&self, items: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let body = serde_json::to_vec_pretty(items)?;
        fs::write(&self.path, body).with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
