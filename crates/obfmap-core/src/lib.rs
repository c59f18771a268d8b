//! All preferences logic independent of how the viewer is run (CLI or GUI).
//!
//! Mapping files live wherever the user keeps them. obfmap stores only its
//! settings, the recent-files list, and the commands sub-tree in one configs
//! document in its own config directory (see [app_data]).

pub mod app_data;
pub mod config;
pub mod document;
pub mod recents;
pub mod settings;

pub use app_data::{config_path, AppIdentity};
pub use config::{init, instance, with_instance, ConfigError, ConfigStore, Environment, SystemEnvironment};
pub use document::{DocumentError, Element};
pub use recents::{RecentEntry, RecentRegistry};
pub use settings::{Settings, SortingType, ToolVersion};
