pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{CommandPreparer, HttpCkan, HttpCms, HttpDownloader};
pub use config::toml_config::TomlConfig;
pub use self::core::prepare::{command_single, PrepareConfig, PrepareOutcome};
pub use self::core::publish::{PublishReport, Publisher};
pub use utils::error::{PlateauError, Result};
