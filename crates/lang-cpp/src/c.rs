use crate::naming::c_convention;
use std::sync::Arc;
use symdex_api::{EntityKind, FunctionTraits, LinkageId};
use symdex_plugin::{LinkageRules, MemberStorage, NamingConvention};

/// C: one flat namespace, no overloading, no templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CLinkage;

impl LinkageRules for CLinkage {
    fn linkage_id(&self) -> LinkageId {
        LinkageId::C
    }

    fn naming_convention(&self) -> Arc<dyn NamingConvention> {
        Arc::new(c_convention())
    }

    fn is_overloadable(&self, _kind: EntityKind) -> bool {
        false
    }

    fn supports_templates(&self) -> bool {
        false
    }

    fn supports_kind(&self, kind: EntityKind) -> bool {
        !matches!(
            kind,
            EntityKind::Namespace | EntityKind::Method | EntityKind::Constructor
        ) && !kind.is_template()
            && !kind.is_template_parameter()
    }

    fn member_storage(&self, kind: EntityKind) -> MemberStorage {
        match kind {
            EntityKind::Class | EntityKind::Enumeration => MemberStorage::List,
            _ => MemberStorage::None,
        }
    }

    /// A C function is identified by its name alone.
    fn signature_memento(&self, _parameter_keys: &[String], _traits: FunctionTraits) -> u64 {
        0
    }
}
