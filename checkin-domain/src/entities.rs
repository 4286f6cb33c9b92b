// Domain entities

pub mod attendee;
pub mod check_in;
pub mod event;
pub mod registration;
pub mod runtime_config;

pub use attendee::*;
pub use check_in::*;
pub use event::*;
pub use registration::*;
pub use runtime_config::*;
