//! Field offsets of every stored record kind.
//!
//! Each kind's fields start where its parent kind's block ends (`SIZE`), so a
//! view of the parent kind reads a child record unchanged.

pub mod node {
    pub const TYPE: u32 = 0;
    pub const PARENT: u32 = 2;
    pub const SIZE: u32 = 6;
}

/// `[tag][parent][len u16][bytes..]`, shared by strings and blobs.
pub mod data {
    pub const LEN: u32 = super::node::SIZE;
    pub const BYTES: u32 = LEN + 2;
}

pub mod binding {
    pub const NAME: u32 = super::node::SIZE;
    pub const LINKAGE: u32 = NAME + 4;
    pub const FLAGS: u32 = LINKAGE + 4;
    /// Next member when the owning scope keeps a list.
    pub const NEXT_MEMBER: u32 = FLAGS + 2;
    pub const FIRST_DECL: u32 = NEXT_MEMBER + 4;
    pub const SIZE: u32 = FIRST_DECL + 4;
}

pub mod namespace {
    /// Root of the member tree (or head of the member list).
    pub const MEMBERS: u32 = super::binding::SIZE;
    pub const SIZE: u32 = MEMBERS + 4;
}

pub mod class {
    pub const KEY: u32 = super::binding::SIZE;
    pub const MEMBERS: u32 = KEY + 2;
    pub const FIRST_BASE: u32 = MEMBERS + 4;
    pub const SIZE: u32 = FIRST_BASE + 4;
}

pub mod class_template {
    pub const FIRST_TEMPLATE_PARAM: u32 = super::class::SIZE;
    pub const FIRST_PARTIAL: u32 = FIRST_TEMPLATE_PARAM + 4;
    pub const FIRST_INSTANCE: u32 = FIRST_PARTIAL + 4;
    pub const SIZE: u32 = FIRST_INSTANCE + 4;
}

pub mod partial {
    pub const PRIMARY: u32 = super::class_template::SIZE;
    /// Blob of the argument pattern.
    pub const ARGS: u32 = PRIMARY + 4;
    pub const SIGNATURE: u32 = ARGS + 4;
    pub const NEXT_PARTIAL: u32 = SIGNATURE + 8;
    pub const SIZE: u32 = NEXT_PARTIAL + 4;
}

pub mod class_spec {
    pub const SPECIALIZED: u32 = super::class::SIZE;
    pub const SIZE: u32 = SPECIALIZED + 4;
}

/// Shared by concrete and deferred class instances.
pub mod class_instance {
    pub const ARGMAP: u32 = super::class_spec::SIZE;
    pub const NEXT_INSTANCE: u32 = ARGMAP + 4;
    /// Partial specialization the instance was matched against.
    pub const PATTERN: u32 = NEXT_INSTANCE + 4;
    pub const SIZE: u32 = PATTERN + 4;
}

pub mod enumeration {
    pub const MEMBERS: u32 = super::binding::SIZE;
    pub const UNDERLYING: u32 = MEMBERS + 4;
    pub const SIZE: u32 = UNDERLYING + 4;
}

pub mod enumerator {
    pub const VALUE: u32 = super::binding::SIZE;
    pub const SIZE: u32 = VALUE + 8;
}

pub mod typedef {
    pub const TYPE: u32 = super::binding::SIZE;
    pub const SIZE: u32 = TYPE + 4;
}

pub mod variable {
    pub const TYPE: u32 = super::binding::SIZE;
    pub const SIZE: u32 = TYPE + 4;
}

pub mod field {
    pub const VISIBILITY: u32 = super::variable::SIZE;
    pub const SIZE: u32 = VISIBILITY + 2;
}

pub mod field_spec {
    pub const SPECIALIZED: u32 = super::field::SIZE;
    pub const SIZE: u32 = SPECIALIZED + 4;
}

pub mod function {
    pub const SIGNATURE: u32 = super::binding::SIZE;
    pub const FIRST_PARAM: u32 = SIGNATURE + 8;
    pub const PARAM_COUNT: u32 = FIRST_PARAM + 4;
    pub const RETURN_TYPE: u32 = PARAM_COUNT + 2;
    pub const TRAITS: u32 = RETURN_TYPE + 4;
    pub const SIZE: u32 = TRAITS + 2;
}

/// Methods and constructors.
pub mod method {
    pub const VISIBILITY: u32 = super::function::SIZE;
    pub const SIZE: u32 = VISIBILITY + 2;
}

pub mod function_template {
    pub const FIRST_TEMPLATE_PARAM: u32 = super::function::SIZE;
    pub const FIRST_INSTANCE: u32 = FIRST_TEMPLATE_PARAM + 4;
    pub const SIZE: u32 = FIRST_INSTANCE + 4;
}

pub mod function_spec {
    pub const SPECIALIZED: u32 = super::method::SIZE;
    pub const SIZE: u32 = SPECIALIZED + 4;
}

pub mod function_instance {
    pub const ARGMAP: u32 = super::function_spec::SIZE;
    pub const NEXT_INSTANCE: u32 = ARGMAP + 4;
    pub const SIZE: u32 = NEXT_INSTANCE + 4;
}

pub mod template_param {
    pub const POSITION: u32 = super::binding::SIZE;
    /// Blob of the default argument.
    pub const DEFAULT: u32 = POSITION + 2;
    pub const NEXT_PARAM: u32 = DEFAULT + 4;
    pub const SIZE: u32 = NEXT_PARAM + 4;
}

pub mod value_param {
    pub const TYPE: u32 = super::template_param::SIZE;
    pub const SIZE: u32 = TYPE + 4;
}

pub mod parameter {
    pub const TYPE: u32 = super::binding::SIZE;
    pub const NEXT_PARAM: u32 = TYPE + 4;
    pub const POSITION: u32 = NEXT_PARAM + 4;
    pub const SIZE: u32 = POSITION + 2;
}

pub mod linkage {
    pub const NAME: u32 = super::node::SIZE;
    pub const GLOBAL: u32 = NAME + 4;
    pub const NEXT_LINKAGE: u32 = GLOBAL + 4;
    pub const SIZE: u32 = NEXT_LINKAGE + 4;
}

pub mod source_unit {
    pub const PATH: u32 = super::node::SIZE;
    pub const FIRST_DECL: u32 = PATH + 4;
    pub const CONTENT_HASH: u32 = FIRST_DECL + 4;
    pub const TIMESTAMP: u32 = CONTENT_HASH + 8;
    pub const SIZE: u32 = TIMESTAMP + 8;
}

/// Cell linking one binding to one source unit; member of two lists.
pub mod declaration {
    pub const BINDING: u32 = super::node::SIZE;
    pub const UNIT: u32 = BINDING + 4;
    pub const ROLE: u32 = UNIT + 4;
    pub const NEXT_IN_BINDING: u32 = ROLE + 2;
    pub const PREV_IN_BINDING: u32 = NEXT_IN_BINDING + 4;
    pub const NEXT_IN_UNIT: u32 = PREV_IN_BINDING + 4;
    pub const PREV_IN_UNIT: u32 = NEXT_IN_UNIT + 4;
    pub const SIZE: u32 = PREV_IN_UNIT + 4;
}

pub mod base {
    pub const TYPE: u32 = super::node::SIZE;
    pub const VISIBILITY: u32 = TYPE + 4;
    pub const IS_VIRTUAL: u32 = VISIBILITY + 2;
    pub const NEXT: u32 = IS_VIRTUAL + 2;
    pub const SIZE: u32 = NEXT + 4;
}
