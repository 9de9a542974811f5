//! C and C++ linkage rules for the symbol index.

pub mod c;
pub mod cpp;
pub mod naming;

pub use c::CLinkage;
pub use cpp::CppLinkage;

use std::sync::Arc;
use symdex_api::LinkageId;
use symdex_plugin::LinkageRules;

/// Every linkage this crate provides.
pub fn all_linkages() -> Vec<Arc<dyn LinkageRules>> {
    vec![Arc::new(CppLinkage), Arc::new(CLinkage)]
}

pub fn linkage_for(id: &LinkageId) -> Option<Arc<dyn LinkageRules>> {
    if *id == LinkageId::CPP {
        Some(Arc::new(CppLinkage))
    } else if *id == LinkageId::C {
        Some(Arc::new(CLinkage))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linkage_lookup_by_id() {
        assert_eq!(linkage_for(&LinkageId::CPP).unwrap().linkage_id(), LinkageId::CPP);
        assert_eq!(linkage_for(&"c".into()).unwrap().linkage_id(), LinkageId::C);
        assert!(linkage_for(&LinkageId::new("fortran")).is_none());
        assert_eq!(all_linkages().len(), 2);
    }
}
