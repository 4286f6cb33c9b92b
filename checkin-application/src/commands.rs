pub mod check_in_commands;
pub mod registration_commands;

pub use check_in_commands::*;
pub use registration_commands::*;
