use crate::naming::cpp_convention;
use std::sync::Arc;
use symdex_api::{EntityKind, LinkageId};
use symdex_plugin::{LinkageRules, MemberStorage, NamingConvention};

/// C++: overloadable functions, templates, namespaces.
///
/// Namespaces can collect thousands of members across a code base and are
/// stored as B-trees; classes and enumerations keep a plain member list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppLinkage;

impl LinkageRules for CppLinkage {
    fn linkage_id(&self) -> LinkageId {
        LinkageId::CPP
    }

    fn naming_convention(&self) -> Arc<dyn NamingConvention> {
        Arc::new(cpp_convention())
    }

    fn is_overloadable(&self, kind: EntityKind) -> bool {
        kind.is_function_like()
    }

    fn member_storage(&self, kind: EntityKind) -> MemberStorage {
        match kind {
            EntityKind::Namespace => MemberStorage::BTree,
            EntityKind::Class
            | EntityKind::ClassTemplate
            | EntityKind::PartialSpecialization
            | EntityKind::Enumeration => MemberStorage::List,
            _ => MemberStorage::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symdex_api::FunctionTraits;

    #[test]
    fn test_storage_by_scope_kind() {
        let rules = CppLinkage;
        assert_eq!(rules.member_storage(EntityKind::Namespace), MemberStorage::BTree);
        assert_eq!(rules.member_storage(EntityKind::ClassTemplate), MemberStorage::List);
        assert_eq!(rules.member_storage(EntityKind::Function), MemberStorage::None);
    }

    #[test]
    fn test_functions_overload_but_variables_do_not() {
        let rules = CppLinkage;
        assert!(rules.is_overloadable(EntityKind::Constructor));
        assert!(rules.is_overloadable(EntityKind::FunctionTemplate));
        assert!(!rules.is_overloadable(EntityKind::Variable));
        assert!(rules.supports_templates());
    }

    #[test]
    fn test_const_methods_have_their_own_signature() {
        let rules = CppLinkage;
        let keys = vec!["int".to_string()];
        let plain = rules.signature_memento(&keys, FunctionTraits::default());
        let constant = rules.signature_memento(
            &keys,
            FunctionTraits {
                is_const: true,
                ..Default::default()
            },
        );
        assert_ne!(plain, constant);
        assert_eq!(plain, rules.signature_memento(&keys, FunctionTraits::default()));
    }
}
