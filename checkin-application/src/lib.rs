// Check-in Application Layer

pub mod commands;
pub mod credentials;
pub mod dtos;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod queries;
pub mod render_cache;
pub mod settings;
pub mod state;
pub mod utils;

pub use error::AppError;
pub use metrics::Metrics;
pub use render_cache::RenderCache;
pub use settings::EngineSettings;
pub use state::AppState;
