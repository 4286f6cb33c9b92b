// Pure domain services

pub mod capacity_guard;
pub mod eligibility;
pub mod ledger_rules;

pub use capacity_guard::*;
pub use eligibility::*;
pub use ledger_rules::*;
