use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{AssemblyIo, WriterOptions};
use crate::{metadata::module::Module, Error, Result};

/// Assemblies backed by memory, keyed by path.
///
/// `write` stores a copy of the module under the destination path (with the options it was written
/// with as its `writer_options`) and records the call, so a later `load` of that path returns the
/// rewritten module.
#[derive(Debug, Default)]
pub struct MemoryIo {
    modules: Mutex<HashMap<PathBuf, Module>>,
    writes: Mutex<Vec<(PathBuf, WriterOptions)>>,
    fail_writes: bool,
}

impl MemoryIo {
    /// Create an empty memory backend
    #[must_use]
    pub fn new() -> MemoryIo {
        MemoryIo::default()
    }

    /// Adds a module, builder style.
    ///
    /// ## Arguments
    /// * 'path'   - The path the module can be loaded from
    /// * 'module' - The module to store
    #[must_use]
    pub fn with_module(mut self, path: impl AsRef<Path>, module: Module) -> MemoryIo {
        // exclusive access: nobody else can have poisoned the map
        self.modules
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf(), module);
        self
    }

    /// Makes every subsequent `write` fail with [`Error::Serialization`].
    #[must_use]
    pub fn failing_writes(mut self) -> MemoryIo {
        self.fail_writes = true;
        self
    }

    /// Stores `module` under `path`, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`Error::Error`] if the backend's lock is poisoned.
    pub fn insert(&self, path: impl AsRef<Path>, module: Module) -> Result<()> {
        lock(&self.modules)?.insert(path.as_ref().to_path_buf(), module);
        Ok(())
    }

    /// Returns a copy of the module stored under `path`.
    ///
    /// # Errors
    /// Returns [`Error::Error`] if the backend's lock is poisoned.
    pub fn get(&self, path: &Path) -> Result<Option<Module>> {
        Ok(lock(&self.modules)?.get(path).cloned())
    }

    /// Returns true if a module is stored under `path`.
    ///
    /// # Errors
    /// Returns [`Error::Error`] if the backend's lock is poisoned.
    pub fn contains(&self, path: &Path) -> Result<bool> {
        Ok(lock(&self.modules)?.contains_key(path))
    }

    /// Returns every successful write in order, with the options it used.
    ///
    /// # Errors
    /// Returns [`Error::Error`] if the backend's lock is poisoned.
    pub fn writes(&self) -> Result<Vec<(PathBuf, WriterOptions)>> {
        Ok(lock(&self.writes)?.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Error("memory backend lock poisoned".to_string()))
}

impl AssemblyIo for MemoryIo {
    fn load(&self, path: &Path) -> Result<Module> {
        lock(&self.modules)?.get(path).cloned().ok_or_else(|| {
            Error::FileError(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        })
    }

    fn write(&self, module: &Module, path: &Path, options: &WriterOptions) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Serialization(format!(
                "refusing to write {}",
                path.display()
            )));
        }

        let mut written = module.clone();
        written.writer_options = *options;

        lock(&self.modules)?.insert(path.to_path_buf(), written);
        lock(&self.writes)?.push((path.to_path_buf(), *options));

        Ok(())
    }
}
