// Registration credential issuance and verification

pub mod code_generator;
pub mod payload;
pub mod signer;
pub mod verifier;

pub use code_generator::*;
pub use payload::*;
pub use signer::*;
pub use verifier::*;
