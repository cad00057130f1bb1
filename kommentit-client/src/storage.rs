use std::{collections::HashMap, io, path::PathBuf, sync::Arc};

use anyhow::Context;

/// Persistent string key-value storage, shared by everything that must survive a
/// restart
pub trait KvStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_raw(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("parsing stored value for key {key:?}"))
                .map(Some),
        }
    }

    fn save<T: serde::Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("serializing value for key {key:?}"))?;
        self.set_raw(key, &raw)
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set_raw(key, value)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key)
    }
}

/// In-memory store, whose clones all share the same data
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<parking_lot::Mutex<HashMap<String, String>>>);

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.lock().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.0.lock().remove(key);
        Ok(())
    }
}

/// Stores every key as a `<key>.json` file in a directory
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Creates the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<JsonFileStore> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating state directory {dir:?}"))?;
        Ok(JsonFileStore { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for JsonFileStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {path:?}")),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        std::fs::write(&path, value).with_context(|| format!("writing {path:?}"))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing {path:?}"))
            }
            _ => Ok(()),
        }
    }
}

/// The browser's local storage
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl KvStore for LocalStore {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| anyhow::anyhow!("reading {key:?} from local storage: {e:?}"))
    }

    fn set_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| anyhow::anyhow!("writing {key:?} to local storage: {e:?}"))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::delete(key);
        Ok(())
    }
}
