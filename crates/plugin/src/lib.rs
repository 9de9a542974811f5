pub mod linkage;
pub mod naming;

pub use linkage::{LinkageRules, MemberStorage, MergeDecision, ObservedState};
pub use naming::{NamingConvention, ScopePathConvention};
