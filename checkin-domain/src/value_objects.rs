// Domain value objects
pub mod check_in_method;
pub mod event_status;
pub mod identifiers;
pub mod registration_code;
pub mod registration_status;

pub use check_in_method::*;
pub use event_status::*;
pub use identifiers::*;
pub use registration_code::*;
pub use registration_status::*;
