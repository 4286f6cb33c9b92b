pub mod app_config;
pub mod settings_provider;

pub use app_config::*;
pub use settings_provider::*;
