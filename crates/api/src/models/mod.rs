pub mod builder;
pub mod entity;
pub mod kind;
pub mod language;
pub mod record;
pub mod types;

pub use builder::EntityBuilder;
pub use entity::*;
pub use kind::*;
pub use language::LinkageId;
pub use record::RecordId;
pub use types::*;
