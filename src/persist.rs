//! Persisted activation state.
//!
//! The engine never touches storage directly: it owns an [`ActivationState`]
//! that loads and saves one namespaced boolean through a [`StateBackend`]
//! supplied by the host (a JSON file for the CLI, memory for tests and WASM).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Key/value storage for boolean flags.
pub trait StateBackend {
    fn load(&self, key: &str) -> Result<Option<bool>>;
    fn save(&mut self, key: &str, value: bool) -> Result<()>;
}

impl<B: StateBackend + ?Sized> StateBackend for Box<B> {
    fn load(&self, key: &str) -> Result<Option<bool>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: bool) -> Result<()> {
        (**self).save(key, value)
    }
}

/// Backend that lives as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: BTreeMap<String, bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with one flag.
    pub fn with(key: impl Into<String>, value: bool) -> Self {
        let mut backend = Self::new();
        backend.values.insert(key.into(), value);
        backend
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn save(&mut self, key: &str, value: bool) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Backend storing all flags as one JSON object on disk.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous state intact.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, bool>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StateBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&mut self, key: &str, value: bool) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, &values)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// The persisted on/off flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationState {
    key: String,
    active: bool,
}

impl ActivationState {
    /// Inactive state under `<namespace>:enabled`, not yet loaded.
    pub fn new(namespace: &str) -> Self {
        Self {
            key: format!("{namespace}:enabled"),
            active: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Read the flag. A missing key means inactive.
    pub fn load(&mut self, backend: &dyn StateBackend) -> Result<bool> {
        self.active = backend.load(&self.key)?.unwrap_or(false);
        Ok(self.active)
    }

    pub fn set(&mut self, active: bool) {
        self.active = active;
    }

    /// Flip the in-memory flag and return the new value.
    pub fn flip(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    pub fn save(&self, backend: &mut dyn StateBackend) -> Result<()> {
        backend.save(&self.key, self.active)
    }
}

/// Build the backend for a state file path, or memory when none is given.
pub fn backend_for(path: Option<&Path>) -> Box<dyn StateBackend> {
    match path {
        Some(path) => Box::new(FileBackend::new(path)),
        None => Box::new(MemoryBackend::new()),
    }
}
