//! The process-wide preferences store: settings, recent files, and the opaque
//! `Actions` sub-tree, persisted together as one document.
//!
//! Loading never fails: a missing or broken document means "no prior state".
//! Saving reports write failures to the caller.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::app_data::{self, AppIdentity};
use crate::document::{DocumentError, Element};
use crate::recents::RecentRegistry;
use crate::settings::{Settings, ToolVersion};

const ROOT_ELEMENT: &str = "Document";
const RECENTS_ELEMENT: &str = "Recents";
const SETTINGS_ELEMENT: &str = "Settings";
const ACTIONS_ELEMENT: &str = "Actions";

/// What the store needs from the host: file existence for pruning recents,
/// and the default tool version for a first run.
pub trait Environment {
    fn exists(&self, path: &Path) -> bool;
    fn highest_tool_version(&self) -> ToolVersion;
}

/// The real file system. Version detection is left to the viewer; this reports
/// the newest release we know of.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn highest_tool_version(&self) -> ToolVersion {
        ToolVersion::HIGHEST
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    settings: Settings,
    recents: RecentRegistry,
    /// Captured verbatim on load, written back unchanged on save.
    actions: Option<Element>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// A store holding only defaults, not bound to any file.
    pub fn with_defaults(env: &dyn Environment) -> Self {
        let mut store = Self {
            settings: Settings::default(),
            recents: RecentRegistry::new(),
            actions: None,
            path: None,
        };
        store.apply_defaults(env);
        store
    }

    /// Defaults that come from the environment rather than from the code.
    pub fn apply_defaults(&mut self, env: &dyn Environment) {
        self.settings.tool_version = env.highest_tool_version();
    }

    /// Defaults overlaid with the document at `path`, if there is a readable one.
    /// The store saves back to `path`.
    pub fn open(path: Option<PathBuf>, env: &dyn Environment) -> Self {
        let mut store = Self::with_defaults(env);
        match path.as_deref() {
            Some(p) if env.exists(p) => match Element::read_file(p) {
                Ok(doc) => {
                    store.load(&doc, env);
                    tracing::debug!(path = %p.display(), "loaded configs");
                }
                Err(e) => tracing::warn!("ignoring unreadable configs, using defaults: {e}"),
            },
            Some(p) => tracing::debug!(path = %p.display(), "no configs yet, using defaults"),
            None => tracing::warn!("could not determine config directory, using defaults"),
        }
        store.path = path;
        store
    }

    /// Opens the document at the application's usual location.
    pub fn open_default() -> Self {
        Self::open(app_data::config_path(&AppIdentity::default()), &SystemEnvironment)
    }

    /// Overlays the state stored in `doc`. Recent files that no longer exist are
    /// dropped along the way.
    pub fn load(&mut self, doc: &Element, env: &dyn Environment) {
        if let Some(recents) = doc.child(RECENTS_ELEMENT) {
            let dropped = self.recents.load(recents, |p| env.exists(p));
            if dropped > 0 {
                tracing::debug!(dropped, "pruned recent files that no longer exist");
            }
        }
        if let Some(settings) = doc.child(SETTINGS_ELEMENT) {
            self.settings.load(settings);
        }
        if let Some(actions) = doc.child(ACTIONS_ELEMENT) {
            self.actions = Some(actions.clone());
        }
    }

    /// Appends the full state to `doc`.
    pub fn save(&self, doc: &mut Element) {
        self.recents.save(doc.append_child(Element::new(RECENTS_ELEMENT)));
        self.settings.save(doc.append_child(Element::new(SETTINGS_ELEMENT)));
        if let Some(actions) = &self.actions {
            doc.append_child(actions.clone());
        }
    }

    pub fn to_document(&self) -> Element {
        let mut doc = Element::new(ROOT_ELEMENT);
        self.save(&mut doc);
        doc
    }

    /// Writes the store to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::CreateDir(parent.to_path_buf(), e))?;
        }
        self.to_document().write_file(path)?;
        tracing::debug!(path = %path.display(), "saved configs");
        Ok(())
    }

    /// Writes the store back to the file it was opened from.
    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(path)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn recents(&self) -> &RecentRegistry {
        &self.recents
    }

    pub fn recents_mut(&mut self) -> &mut RecentRegistry {
        &mut self.recents
    }

    /// The `Actions` sub-tree, owned by the command subsystem.
    pub fn actions(&self) -> Option<&Element> {
        self.actions.as_ref()
    }

    pub fn set_actions(&mut self, actions: Option<Element>) {
        self.actions = actions;
    }
}

static INSTANCE: OnceLock<Mutex<ConfigStore>> = OnceLock::new();

/// The process-wide store, opened from the default location on first access.
pub fn instance() -> &'static Mutex<ConfigStore> {
    INSTANCE.get_or_init(|| Mutex::new(ConfigStore::open_default()))
}

/// Installs `store` as the process-wide store. Must happen before the first
/// call to [`instance`].
pub fn init(store: ConfigStore) -> Result<(), ConfigError> {
    INSTANCE
        .set(Mutex::new(store))
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Runs `f` on the locked process-wide store.
pub fn with_instance<R>(f: impl FnOnce(&mut ConfigStore) -> R) -> R {
    let mut guard = instance().lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("config store already initialized")]
    AlreadyInitialized,
}
