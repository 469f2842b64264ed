//! Explicit lazily-loaded model handle.
//!
//! Expensive models (the Whisper context in particular) are loaded on first
//! use rather than at startup. A [`ModelHandle`] is created by the caller and
//! passed by reference; there is no global state.
//!
//! The loader runs under the handle's mutex, so concurrent first calls load
//! the model once. A failed load leaves the handle empty and is retried on
//! the next call.

use std::sync::{Arc, Mutex};

type Loader<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

pub struct ModelHandle<T, E> {
    name: String,
    loader: Loader<T, E>,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T, E: std::fmt::Display> ModelHandle<T, E> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    /// A handle that is already loaded; the loader is never called.
    pub fn preloaded(name: impl Into<String>, model: T) -> Self
    where
        T: Send + Sync + 'static,
        E: 'static,
    {
        let name = name.into();
        let unreachable_name = name.clone();
        Self {
            name,
            loader: Box::new(move || -> Result<T, E> {
                unreachable!("preloaded handle {unreachable_name} has no loader")
            }),
            slot: Mutex::new(Some(Arc::new(model))),
        }
    }

    /// Return the model, loading it first if needed.
    pub fn get(&self) -> Result<Arc<T>, E> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        log::info!("loading {}...", self.name);
        match (self.loader)() {
            Ok(model) => {
                let model = Arc::new(model);
                *slot = Some(Arc::clone(&model));
                log::info!("{} loaded", self.name);
                Ok(model)
            }
            Err(e) => {
                log::error!("failed to load {}: {e}", self.name);
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T, E> std::fmt::Debug for ModelHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
