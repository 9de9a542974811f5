pub mod directory;
pub mod layout;
pub mod views;

pub use directory::{TypedNode, get_node};
pub use views::*;

use symdex_api::EntityKind;

/// Tag stored in the first two bytes of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum NodeType {
    Linkage = 1,
    SourceUnit = 2,
    Declaration = 3,
    String = 4,
    Blob = 5,
    BTreeNode = 6,
    Base = 7,
    Namespace = 10,
    Class = 11,
    ClassTemplate = 12,
    PartialSpecialization = 13,
    ClassSpecialization = 14,
    ClassInstance = 15,
    DeferredClassInstance = 16,
    Enumeration = 17,
    Enumerator = 18,
    Typedef = 19,
    Field = 20,
    Variable = 21,
    Function = 22,
    FunctionTemplate = 23,
    Method = 24,
    Constructor = 25,
    FunctionSpecialization = 26,
    FunctionInstance = 27,
    FieldSpecialization = 28,
    TemplateTypeParameter = 29,
    TemplateValueParameter = 30,
    Parameter = 31,
}

impl NodeType {
    pub fn from_u16(tag: u16) -> Option<Self> {
        use NodeType::*;
        Some(match tag {
            1 => Linkage,
            2 => SourceUnit,
            3 => Declaration,
            4 => String,
            5 => Blob,
            6 => BTreeNode,
            7 => Base,
            10 => Namespace,
            11 => Class,
            12 => ClassTemplate,
            13 => PartialSpecialization,
            14 => ClassSpecialization,
            15 => ClassInstance,
            16 => DeferredClassInstance,
            17 => Enumeration,
            18 => Enumerator,
            19 => Typedef,
            20 => Field,
            21 => Variable,
            22 => Function,
            23 => FunctionTemplate,
            24 => Method,
            25 => Constructor,
            26 => FunctionSpecialization,
            27 => FunctionInstance,
            28 => FieldSpecialization,
            29 => TemplateTypeParameter,
            30 => TemplateValueParameter,
            31 => Parameter,
            _ => return None,
        })
    }

    /// Fixed size of a record of this kind; data records are sized by content.
    pub fn record_size(self) -> u32 {
        use NodeType::*;
        use layout as l;
        match self {
            Linkage => l::linkage::SIZE,
            SourceUnit => l::source_unit::SIZE,
            Declaration => l::declaration::SIZE,
            String | Blob => l::data::BYTES,
            BTreeNode => l::node::SIZE,
            Base => l::base::SIZE,
            Namespace => l::namespace::SIZE,
            Class => l::class::SIZE,
            ClassTemplate => l::class_template::SIZE,
            PartialSpecialization => l::partial::SIZE,
            ClassSpecialization => l::class_spec::SIZE,
            ClassInstance | DeferredClassInstance => l::class_instance::SIZE,
            Enumeration => l::enumeration::SIZE,
            Enumerator => l::enumerator::SIZE,
            Typedef => l::typedef::SIZE,
            Field => l::field::SIZE,
            Variable => l::variable::SIZE,
            FieldSpecialization => l::field_spec::SIZE,
            Function => l::function::SIZE,
            Method | Constructor => l::method::SIZE,
            FunctionTemplate => l::function_template::SIZE,
            FunctionSpecialization => l::function_spec::SIZE,
            FunctionInstance => l::function_instance::SIZE,
            TemplateTypeParameter => l::template_param::SIZE,
            TemplateValueParameter => l::value_param::SIZE,
            Parameter => l::parameter::SIZE,
        }
    }

    /// Records that start with the binding block (name, linkage, flags).
    pub fn is_binding(self) -> bool {
        (self as u16) >= NodeType::Namespace as u16
    }

    pub fn is_class_like(self) -> bool {
        matches!(
            self,
            NodeType::Class
                | NodeType::ClassTemplate
                | NodeType::PartialSpecialization
                | NodeType::ClassSpecialization
                | NodeType::ClassInstance
                | NodeType::DeferredClassInstance
        )
    }

    pub fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeType::Function
                | NodeType::FunctionTemplate
                | NodeType::Method
                | NodeType::Constructor
                | NodeType::FunctionSpecialization
                | NodeType::FunctionInstance
        )
    }

    /// Owns a list of template parameters.
    pub fn is_template(self) -> bool {
        matches!(
            self,
            NodeType::ClassTemplate | NodeType::PartialSpecialization | NodeType::FunctionTemplate
        )
    }

    pub fn is_instance(self) -> bool {
        matches!(
            self,
            NodeType::ClassInstance | NodeType::DeferredClassInstance | NodeType::FunctionInstance
        )
    }

    /// Member specializations and instances; both point at what they specialize.
    pub fn is_specialization(self) -> bool {
        matches!(
            self,
            NodeType::ClassSpecialization
                | NodeType::FieldSpecialization
                | NodeType::FunctionSpecialization
        ) || self.is_instance()
    }

    /// Tag that stores a plain (unspecialized) entity of `kind`.
    pub fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Namespace => NodeType::Namespace,
            EntityKind::Class => NodeType::Class,
            EntityKind::ClassTemplate => NodeType::ClassTemplate,
            EntityKind::PartialSpecialization => NodeType::PartialSpecialization,
            EntityKind::Enumeration => NodeType::Enumeration,
            EntityKind::Enumerator => NodeType::Enumerator,
            EntityKind::Typedef => NodeType::Typedef,
            EntityKind::Field => NodeType::Field,
            EntityKind::Variable => NodeType::Variable,
            EntityKind::Function => NodeType::Function,
            EntityKind::FunctionTemplate => NodeType::FunctionTemplate,
            EntityKind::Method => NodeType::Method,
            EntityKind::Constructor => NodeType::Constructor,
            EntityKind::TemplateTypeParameter => NodeType::TemplateTypeParameter,
            EntityKind::TemplateValueParameter => NodeType::TemplateValueParameter,
            EntityKind::Parameter => NodeType::Parameter,
        }
    }

    /// Tag of a member of a specialized owner, if the kind has one.
    pub fn member_specialization_for(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Class => Some(NodeType::ClassSpecialization),
            EntityKind::Field => Some(NodeType::FieldSpecialization),
            EntityKind::Function | EntityKind::Method | EntityKind::Constructor => {
                Some(NodeType::FunctionSpecialization)
            }
            _ => None,
        }
    }

    pub fn entity_kind(self) -> Option<EntityKind> {
        use NodeType::*;
        Some(match self {
            Namespace => EntityKind::Namespace,
            Class | ClassSpecialization | ClassInstance | DeferredClassInstance => {
                EntityKind::Class
            }
            ClassTemplate => EntityKind::ClassTemplate,
            PartialSpecialization => EntityKind::PartialSpecialization,
            Enumeration => EntityKind::Enumeration,
            Enumerator => EntityKind::Enumerator,
            Typedef => EntityKind::Typedef,
            Field | FieldSpecialization => EntityKind::Field,
            Variable => EntityKind::Variable,
            Function | FunctionInstance => EntityKind::Function,
            FunctionSpecialization => EntityKind::Method,
            FunctionTemplate => EntityKind::FunctionTemplate,
            Method => EntityKind::Method,
            Constructor => EntityKind::Constructor,
            TemplateTypeParameter => EntityKind::TemplateTypeParameter,
            TemplateValueParameter => EntityKind::TemplateValueParameter,
            Parameter => EntityKind::Parameter,
            Linkage | SourceUnit | Declaration | String | Blob | BTreeNode | Base => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        use NodeType::*;
        match self {
            Linkage => "linkage",
            SourceUnit => "source_unit",
            Declaration => "declaration",
            String => "string",
            Blob => "blob",
            BTreeNode => "btree_node",
            Base => "base",
            Namespace => "namespace",
            Class => "class",
            ClassTemplate => "class_template",
            PartialSpecialization => "partial_specialization",
            ClassSpecialization => "class_specialization",
            ClassInstance => "class_instance",
            DeferredClassInstance => "deferred_class_instance",
            Enumeration => "enumeration",
            Enumerator => "enumerator",
            Typedef => "typedef",
            Field => "field",
            Variable => "variable",
            Function => "function",
            FunctionTemplate => "function_template",
            Method => "method",
            Constructor => "constructor",
            FunctionSpecialization => "function_specialization",
            FunctionInstance => "function_instance",
            FieldSpecialization => "field_specialization",
            TemplateTypeParameter => "template_type_parameter",
            TemplateValueParameter => "template_value_parameter",
            Parameter => "parameter",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bits of the binding `FLAGS` field.
pub mod flags {
    /// Low bits hold the strongest observed [`symdex_api::DeclRole`].
    pub const ROLE_MASK: u16 = 0x3;
    pub const FRIEND_ONLY: u16 = 1 << 2;
    /// Template parameters (or a partial's pattern) still to be written.
    pub const NOT_CONFIGURED: u16 = 1 << 3;
    pub const EXPLICIT_SPEC: u16 = 1 << 4;
    pub const IMPLICIT: u16 = 1 << 5;
    pub const DEFERRED: u16 = 1 << 6;
    pub const SCOPED_ENUM: u16 = 1 << 7;
    pub const PACK: u16 = 1 << 8;
    pub const HAS_DEFAULT: u16 = 1 << 9;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_u16() {
        for tag in 0..40u16 {
            if let Some(node_type) = NodeType::from_u16(tag) {
                assert_eq!(node_type as u16, tag);
            }
        }
        assert_eq!(NodeType::from_u16(8), None);
    }

    #[test]
    fn test_binding_tags() {
        assert!(NodeType::Namespace.is_binding());
        assert!(NodeType::Parameter.is_binding());
        assert!(!NodeType::Base.is_binding());
        assert!(NodeType::DeferredClassInstance.is_specialization());
        assert_eq!(
            NodeType::member_specialization_for(EntityKind::Method),
            Some(NodeType::FunctionSpecialization)
        );
    }
}
