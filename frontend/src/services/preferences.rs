//! Persisted color mode preference.
//!
//! The store is injected into the UI shell through context rather than
//! living in a global. Initial mode, in priority order: the persisted
//! value, the environment's `prefers-color-scheme`, then `Light`.
//!
//! Storage failures never reach the user: the store logs them and keeps
//! working in memory for the rest of the session.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::COLOR_MODE_KEY;
use crate::ColorMode;

/// Where the preference is persisted, plus the ambient light/dark signal.
pub trait PreferenceBackend {
    /// Read the persisted value, if any.
    fn load(&self) -> Result<Option<String>, String>;
    /// Persist a value.
    fn store(&self, value: &str) -> Result<(), String>;
    /// Whether the operating environment asks for a dark scheme.
    fn prefers_dark(&self) -> bool;
}

/// `window.localStorage` plus the `prefers-color-scheme` media query.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageBackend;

impl LocalStorageBackend {
    fn storage() -> Result<web_sys::Storage, String> {
        web_sys::window()
            .ok_or_else(|| "no global window".to_string())?
            .local_storage()
            .map_err(|e| format!("localStorage access denied: {:?}", e))?
            .ok_or_else(|| "localStorage unavailable".to_string())
    }
}

impl PreferenceBackend for LocalStorageBackend {
    fn load(&self) -> Result<Option<String>, String> {
        Self::storage()?
            .get_item(COLOR_MODE_KEY)
            .map_err(|e| format!("Failed to read {}: {:?}", COLOR_MODE_KEY, e))
    }

    fn store(&self, value: &str) -> Result<(), String> {
        Self::storage()?
            .set_item(COLOR_MODE_KEY, value)
            .map_err(|e| format!("Failed to write {}: {:?}", COLOR_MODE_KEY, e))
    }

    fn prefers_dark(&self) -> bool {
        web_sys::window()
            .and_then(|window| window.match_media("(prefers-color-scheme: dark)").ok().flatten())
            .map(|query| query.matches())
            .unwrap_or(false)
    }
}

type Listener = Rc<dyn Fn(ColorMode)>;

struct StoreInner<B> {
    backend: B,
    mode: Cell<ColorMode>,
    persistent: Cell<bool>,
    listeners: RefCell<Vec<Listener>>,
}

/// Color mode store with subscribe/notify.
///
/// Cloning is cheap and clones share state.
pub struct PreferenceStore<B> {
    inner: Rc<StoreInner<B>>,
}

impl<B> Clone for PreferenceStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: PreferenceBackend> PreferenceStore<B> {
    pub fn new(backend: B) -> Self {
        let (mode, persistent) = match backend.load() {
            Ok(stored) => {
                let mode = stored
                    .as_deref()
                    .and_then(ColorMode::parse)
                    .unwrap_or_else(|| ambient_mode(&backend));
                (mode, true)
            }
            Err(e) => {
                log::warn!("⚠️  Color mode not persisted this session: {}", e);
                (ambient_mode(&backend), false)
            }
        };

        let store = Self {
            inner: Rc::new(StoreInner {
                backend,
                mode: Cell::new(mode),
                persistent: Cell::new(persistent),
                listeners: RefCell::new(Vec::new()),
            }),
        };
        store.persist(mode);
        log::debug!("🎨 Color mode initialised to {}", mode);
        store
    }

    pub fn get(&self) -> ColorMode {
        self.inner.mode.get()
    }

    /// Persist `mode` and notify subscribers.
    pub fn set(&self, mode: ColorMode) {
        self.inner.mode.set(mode);
        self.persist(mode);

        let listeners: Vec<Listener> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(mode);
        }
    }

    /// Flip between light and dark; returns the new mode.
    pub fn toggle(&self) -> ColorMode {
        let mode = self.get().toggled();
        self.set(mode);
        mode
    }

    pub fn subscribe(&self, listener: impl Fn(ColorMode) + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Whether changes are still being written to storage.
    pub fn is_persistent(&self) -> bool {
        self.inner.persistent.get()
    }

    fn persist(&self, mode: ColorMode) {
        if !self.inner.persistent.get() {
            return;
        }
        if let Err(e) = self.inner.backend.store(mode.as_str()) {
            log::warn!("⚠️  Falling back to in-memory color mode: {}", e);
            self.inner.persistent.set(false);
        }
    }
}

fn ambient_mode(backend: &impl PreferenceBackend) -> ColorMode {
    if backend.prefers_dark() {
        ColorMode::Dark
    } else {
        ColorMode::default()
    }
}
