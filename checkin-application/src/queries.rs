pub mod credential_queries;
pub mod registration_queries;
pub mod verification_queries;

pub use credential_queries::*;
pub use registration_queries::*;
pub use verification_queries::*;
