use super::entity::Entity;
use super::kind::{SpecializationKind, Visibility};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinType {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    Char16,
    Char32,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    Nullptr,
    Auto,
}

impl BuiltinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Bool => "bool",
            BuiltinType::Char => "char",
            BuiltinType::SignedChar => "signed char",
            BuiltinType::UnsignedChar => "unsigned char",
            BuiltinType::WChar => "wchar_t",
            BuiltinType::Char16 => "char16_t",
            BuiltinType::Char32 => "char32_t",
            BuiltinType::Short => "short",
            BuiltinType::UnsignedShort => "unsigned short",
            BuiltinType::Int => "int",
            BuiltinType::UnsignedInt => "unsigned int",
            BuiltinType::Long => "long",
            BuiltinType::UnsignedLong => "unsigned long",
            BuiltinType::LongLong => "long long",
            BuiltinType::UnsignedLongLong => "unsigned long long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::LongDouble => "long double",
            BuiltinType::Nullptr => "std::nullptr_t",
            BuiltinType::Auto => "auto",
        }
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type as spelled by the parser, already resolved to entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Builtin(BuiltinType),
    /// Class, enumeration or typedef entity.
    Named(Entity),
    Pointer(Box<TypeRef>),
    LValueReference(Box<TypeRef>),
    RValueReference(Box<TypeRef>),
    Qualified {
        is_const: bool,
        is_volatile: bool,
        inner: Box<TypeRef>,
    },
    Array {
        size: Option<u64>,
        element: Box<TypeRef>,
    },
    Function {
        return_type: Box<TypeRef>,
        parameters: Vec<TypeRef>,
    },
    /// Reference to a template parameter of the innermost template that
    /// declares a parameter with this name at this position.
    TemplateParameter { name: String, position: u16 },
    /// Dependent name that cannot be resolved before instantiation.
    Dependent(String),
    /// Placeholder emitted by the parser for a type it failed to resolve.
    Problem(String),
}

impl TypeRef {
    pub fn builtin(kind: BuiltinType) -> Self {
        TypeRef::Builtin(kind)
    }

    pub fn named(entity: &Entity) -> Self {
        TypeRef::Named(entity.clone())
    }

    pub fn pointer(inner: TypeRef) -> Self {
        TypeRef::Pointer(Box::new(inner))
    }

    pub fn lvalue_ref(inner: TypeRef) -> Self {
        TypeRef::LValueReference(Box::new(inner))
    }

    pub fn rvalue_ref(inner: TypeRef) -> Self {
        TypeRef::RValueReference(Box::new(inner))
    }

    pub fn constant(inner: TypeRef) -> Self {
        TypeRef::Qualified {
            is_const: true,
            is_volatile: false,
            inner: Box::new(inner),
        }
    }

    /// `const T&`
    pub fn const_ref(inner: TypeRef) -> Self {
        TypeRef::lvalue_ref(TypeRef::constant(inner))
    }

    pub fn parameter(name: &str, position: u16) -> Self {
        TypeRef::TemplateParameter {
            name: name.to_string(),
            position,
        }
    }

    /// True when the type mentions a template parameter or an unresolved name.
    pub fn is_dependent(&self) -> bool {
        match self {
            TypeRef::TemplateParameter { .. } | TypeRef::Dependent(_) => true,
            TypeRef::Pointer(inner)
            | TypeRef::LValueReference(inner)
            | TypeRef::RValueReference(inner)
            | TypeRef::Qualified { inner, .. }
            | TypeRef::Array { element: inner, .. } => inner.is_dependent(),
            TypeRef::Function {
                return_type,
                parameters,
            } => return_type.is_dependent() || parameters.iter().any(TypeRef::is_dependent),
            TypeRef::Named(entity) => entity
                .specialization
                .as_ref()
                .is_some_and(|s| s.arguments.iter().any(TemplateArgument::is_dependent)),
            TypeRef::Builtin(_) | TypeRef::Problem(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArgument {
    Type(TypeRef),
    Value(i64),
    /// Non-type template parameter used as an argument.
    ValueParameter { name: String, position: u16 },
    DependentValue(String),
}

impl TemplateArgument {
    pub fn is_dependent(&self) -> bool {
        match self {
            TemplateArgument::Type(ty) => ty.is_dependent(),
            TemplateArgument::Value(_) => false,
            TemplateArgument::ValueParameter { .. } | TemplateArgument::DependentValue(_) => true,
        }
    }
}

impl From<TypeRef> for TemplateArgument {
    fn from(ty: TypeRef) -> Self {
        TemplateArgument::Type(ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeRef,
    pub has_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateParameterKind {
    Type { default: Option<TypeRef> },
    Value { ty: TypeRef, default: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateParameterInfo {
    pub name: String,
    pub kind: TemplateParameterKind,
    pub is_pack: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseSpecifier {
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_virtual: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specialization {
    pub kind: SpecializationKind,
    pub specialized: Entity,
    /// Empty for member specializations, which inherit their owner's arguments.
    pub arguments: Vec<TemplateArgument>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FunctionTraits {
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub is_inline: bool,
    pub is_variadic: bool,
    pub is_deleted: bool,
}

impl FunctionTraits {
    pub fn to_bits(self) -> u16 {
        let mut bits = 0u16;
        for (i, set) in [
            self.is_virtual,
            self.is_pure,
            self.is_const,
            self.is_static,
            self.is_inline,
            self.is_variadic,
            self.is_deleted,
        ]
        .into_iter()
        .enumerate()
        {
            if set {
                bits |= 1 << i;
            }
        }
        bits
    }

    pub fn from_bits(bits: u16) -> Self {
        let bit = |i: u16| bits & (1 << i) != 0;
        Self {
            is_virtual: bit(0),
            is_pure: bit(1),
            is_const: bit(2),
            is_static: bit(3),
            is_inline: bit(4),
            is_variadic: bit(5),
            is_deleted: bit(6),
        }
    }
}
