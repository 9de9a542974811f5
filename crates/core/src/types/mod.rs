//! Types and template arguments as stored in the index.
//!
//! Parser-side [`symdex_api::TypeRef`]s name entities; stored types name
//! records instead, so two spellings of one type share one stored form.

pub mod codec;
pub mod key;

use serde::{Deserialize, Serialize};
use symdex_api::{BuiltinType, RecordId};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexType {
    Builtin(BuiltinType),
    /// Class, enumeration, typedef or instance record.
    Binding(RecordId),
    Pointer(Box<IndexType>),
    LValueReference(Box<IndexType>),
    RValueReference(Box<IndexType>),
    Qualified {
        is_const: bool,
        is_volatile: bool,
        inner: Box<IndexType>,
    },
    Array {
        size: Option<u64>,
        element: Box<IndexType>,
    },
    Function {
        return_type: Box<IndexType>,
        parameters: Vec<IndexType>,
    },
    /// Parameter `position` of template record `owner`.
    TemplateParameter { owner: RecordId, position: u16 },
    Dependent(String),
}

impl IndexType {
    /// Mentions a template parameter or an unresolved name directly.
    ///
    /// Dependence through a deferred instance binding needs the database,
    /// see [`key::is_dependent`].
    pub fn mentions_parameter(&self) -> bool {
        match self {
            IndexType::TemplateParameter { .. } | IndexType::Dependent(_) => true,
            IndexType::Pointer(inner)
            | IndexType::LValueReference(inner)
            | IndexType::RValueReference(inner)
            | IndexType::Qualified { inner, .. }
            | IndexType::Array { element: inner, .. } => inner.mentions_parameter(),
            IndexType::Function {
                return_type,
                parameters,
            } => {
                return_type.mentions_parameter()
                    || parameters.iter().any(IndexType::mentions_parameter)
            }
            IndexType::Builtin(_) | IndexType::Binding(_) => false,
        }
    }

    /// Rewrite template parameter owners `from` to `to`.
    pub fn with_owner(&self, from: RecordId, to: RecordId) -> IndexType {
        let swap = |inner: &IndexType| Box::new(inner.with_owner(from, to));
        match self {
            IndexType::TemplateParameter { owner, position } if *owner == from => {
                IndexType::TemplateParameter {
                    owner: to,
                    position: *position,
                }
            }
            IndexType::Pointer(inner) => IndexType::Pointer(swap(inner)),
            IndexType::LValueReference(inner) => IndexType::LValueReference(swap(inner)),
            IndexType::RValueReference(inner) => IndexType::RValueReference(swap(inner)),
            IndexType::Qualified {
                is_const,
                is_volatile,
                inner,
            } => IndexType::Qualified {
                is_const: *is_const,
                is_volatile: *is_volatile,
                inner: swap(inner),
            },
            IndexType::Array { size, element } => IndexType::Array {
                size: *size,
                element: swap(element),
            },
            IndexType::Function {
                return_type,
                parameters,
            } => IndexType::Function {
                return_type: swap(return_type),
                parameters: parameters.iter().map(|p| p.with_owner(from, to)).collect(),
            },
            other => other.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexArgument {
    Type(IndexType),
    Value(i64),
    ValueParameter { owner: RecordId, position: u16 },
    DependentValue(String),
}

impl IndexArgument {
    pub fn with_owner(&self, from: RecordId, to: RecordId) -> IndexArgument {
        match self {
            IndexArgument::Type(ty) => IndexArgument::Type(ty.with_owner(from, to)),
            IndexArgument::ValueParameter { owner, position } if *owner == from => {
                IndexArgument::ValueParameter {
                    owner: to,
                    position: *position,
                }
            }
            other => other.clone(),
        }
    }
}

/// `(parameter position, argument)` pairs of an instance, in position order.
pub type ArgumentMap = Vec<(u16, IndexArgument)>;

pub fn to_argument_map(arguments: Vec<IndexArgument>) -> ArgumentMap {
    arguments
        .into_iter()
        .enumerate()
        .map(|(i, arg)| (i as u16, arg))
        .collect()
}

pub fn from_argument_map(map: ArgumentMap) -> Vec<IndexArgument> {
    let mut map = map;
    map.sort_by_key(|(position, _)| *position);
    map.into_iter().map(|(_, arg)| arg).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_rewrite_is_deep() {
        let placeholder = IndexType::Pointer(Box::new(IndexType::TemplateParameter {
            owner: RecordId::NULL,
            position: 1,
        }));
        let owned = placeholder.with_owner(RecordId::NULL, RecordId(4096));
        assert_eq!(
            owned,
            IndexType::Pointer(Box::new(IndexType::TemplateParameter {
                owner: RecordId(4096),
                position: 1,
            }))
        );
        assert!(owned.mentions_parameter());
        let value = IndexArgument::ValueParameter {
            owner: RecordId(8),
            position: 0,
        };
        assert_eq!(value.with_owner(RecordId::NULL, RecordId(4096)), value);
    }
}
