use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a semantic entity as reported by the parser.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Namespace,
    Class,
    ClassTemplate,
    PartialSpecialization,
    Enumeration,
    Enumerator,
    Typedef,
    Field,
    Variable,
    Function,
    FunctionTemplate,
    Method,
    Constructor,
    TemplateTypeParameter,
    TemplateValueParameter,
    Parameter,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Namespace => "namespace",
            EntityKind::Class => "class",
            EntityKind::ClassTemplate => "class_template",
            EntityKind::PartialSpecialization => "partial_specialization",
            EntityKind::Enumeration => "enumeration",
            EntityKind::Enumerator => "enumerator",
            EntityKind::Typedef => "typedef",
            EntityKind::Field => "field",
            EntityKind::Variable => "variable",
            EntityKind::Function => "function",
            EntityKind::FunctionTemplate => "function_template",
            EntityKind::Method => "method",
            EntityKind::Constructor => "constructor",
            EntityKind::TemplateTypeParameter => "template_type_parameter",
            EntityKind::TemplateValueParameter => "template_value_parameter",
            EntityKind::Parameter => "parameter",
        }
    }

    /// Functions of any flavour; their identity includes the parameter signature.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            EntityKind::Function
                | EntityKind::FunctionTemplate
                | EntityKind::Method
                | EntityKind::Constructor
        )
    }

    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            EntityKind::Class | EntityKind::ClassTemplate | EntityKind::PartialSpecialization
        )
    }

    pub fn is_template(&self) -> bool {
        matches!(
            self,
            EntityKind::ClassTemplate
                | EntityKind::FunctionTemplate
                | EntityKind::PartialSpecialization
        )
    }

    pub fn is_template_parameter(&self) -> bool {
        matches!(
            self,
            EntityKind::TemplateTypeParameter | EntityKind::TemplateValueParameter
        )
    }
}

impl From<&str> for EntityKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "class" | "struct" | "union" => EntityKind::Class,
            "class_template" => EntityKind::ClassTemplate,
            "partial_specialization" => EntityKind::PartialSpecialization,
            "enum" | "enumeration" => EntityKind::Enumeration,
            "enumerator" => EntityKind::Enumerator,
            "typedef" | "alias" => EntityKind::Typedef,
            "field" => EntityKind::Field,
            "variable" => EntityKind::Variable,
            "function" => EntityKind::Function,
            "function_template" => EntityKind::FunctionTemplate,
            "method" => EntityKind::Method,
            "constructor" => EntityKind::Constructor,
            "template_type_parameter" => EntityKind::TemplateTypeParameter,
            "template_value_parameter" => EntityKind::TemplateValueParameter,
            "parameter" => EntityKind::Parameter,
            _ => EntityKind::Namespace,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much an observation tells about an entity.
///
/// Ordered by information content: a definition says more than a declaration,
/// which says more than a mere reference.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum DeclRole {
    Reference,
    #[default]
    Declaration,
    Definition,
}

impl DeclRole {
    pub fn to_bits(self) -> u16 {
        match self {
            DeclRole::Reference => 0,
            DeclRole::Declaration => 1,
            DeclRole::Definition => 2,
        }
    }

    pub fn from_bits(bits: u16) -> Self {
        match bits {
            2 => DeclRole::Definition,
            1 => DeclRole::Declaration,
            _ => DeclRole::Reference,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn to_bits(self) -> u16 {
        match self {
            Visibility::Public => 0,
            Visibility::Protected => 1,
            Visibility::Private => 2,
        }
    }

    pub fn from_bits(bits: u16) -> Self {
        match bits {
            1 => Visibility::Protected,
            2 => Visibility::Private,
            _ => Visibility::Public,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClassKey {
    #[default]
    Class,
    Struct,
    Union,
}

impl ClassKey {
    pub fn to_bits(self) -> u16 {
        match self {
            ClassKey::Class => 0,
            ClassKey::Struct => 1,
            ClassKey::Union => 2,
        }
    }

    pub fn from_bits(bits: u16) -> Self {
        match bits {
            1 => ClassKey::Struct,
            2 => ClassKey::Union,
            _ => ClassKey::Class,
        }
    }
}

/// Relation between a specialization and the entity it specializes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpecializationKind {
    /// Concrete instantiation with its own argument list.
    Instance,
    /// `template<> class A<int>`: instance that carries its own definition.
    Explicit,
    /// Member of a specialized owner; arguments come from the owner.
    Member,
}
