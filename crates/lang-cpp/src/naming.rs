use symdex_plugin::ScopePathConvention;

/// `std::vector::size`
pub const CPP_SEPARATOR: &str = "::";

/// C has no nested scopes beyond tags; members render as `tag.field`.
pub const C_SEPARATOR: &str = ".";

pub fn cpp_convention() -> ScopePathConvention {
    ScopePathConvention::new(CPP_SEPARATOR)
}

pub fn c_convention() -> ScopePathConvention {
    ScopePathConvention::new(C_SEPARATOR)
}
