pub mod health_service;
pub mod http_renderer;
pub mod webhook_notifier;

pub use health_service::*;
pub use http_renderer::*;
pub use webhook_notifier::*;
