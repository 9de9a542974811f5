pub mod config;
pub mod error;
pub mod logging;

pub mod cache;
pub mod deferred;
pub mod gc;
pub mod index;
pub mod linkage;
pub mod node;
pub mod scope;
pub mod storage;
pub mod template;
pub mod types;
pub mod unit;
pub mod visit;

pub use config::IndexConfig;
pub use error::{IndexError, Result};
pub use index::{DeclarationInfo, IndexStats, SymbolIndex, UnitSummary};
pub use linkage::{IndexSession, Linkage, Observation, SessionMode};
pub use node::{NodeType, TypedNode};
pub use storage::Database;
pub use types::{ArgumentMap, IndexArgument, IndexType};
pub use unit::{SourceUnit, UnitFailure, UnitReport};
pub use visit::{IndexVisitor, Visit};
