//! Specialization and instantiation of templates.
//!
//! Instances are kept in a list hanging off their template and found
//! through the per-template instance cache, keyed by the canonical key of
//! the complete argument list. Partial specializations hang off their
//! primary template in signature order.

pub mod deduce;
mod instance;
mod partial;

pub(crate) use instance::adapt_instance;
pub(crate) use partial::{adapt_partial, reselect_patterns};
pub use deduce::{Deduction, deduce, select_partial, specificity};
