//! Canonical, spelling-independent keys of stored types and argument lists.
//!
//! Typedefs are expanded before keying, so `size_t` and `unsigned long`
//! produce the same key when one aliases the other.

use super::codec::read_type;
use super::{IndexArgument, IndexType};
use crate::error::{IndexError, Result};
use crate::node::NodeType;
use crate::node::layout::{node, typedef};
use crate::storage::Database;
use std::fmt::Write;
use symdex_api::RecordId;

const MAX_TYPEDEF_DEPTH: usize = 32;

fn tag_of(db: &Database, rec: RecordId) -> Result<Option<NodeType>> {
    Ok(NodeType::from_u16(db.get_u16(rec.at(node::TYPE))?))
}

/// Replace every typedef binding by the type it aliases.
pub fn canonical(db: &Database, ty: &IndexType) -> Result<IndexType> {
    canonical_at(db, ty, 0)
}

fn canonical_at(db: &Database, ty: &IndexType, depth: usize) -> Result<IndexType> {
    if depth > MAX_TYPEDEF_DEPTH {
        return Err(IndexError::corrupt("typedef chain too deep"));
    }
    let boxed = |inner: &IndexType| -> Result<Box<IndexType>> {
        Ok(Box::new(canonical_at(db, inner, depth)?))
    };
    Ok(match ty {
        IndexType::Binding(rec) if tag_of(db, *rec)? == Some(NodeType::Typedef) => {
            match read_type(db, db.get_rec(rec.at(typedef::TYPE))?)? {
                Some(aliased) => canonical_at(db, &aliased, depth + 1)?,
                None => ty.clone(),
            }
        }
        IndexType::Pointer(inner) => IndexType::Pointer(boxed(inner)?),
        IndexType::LValueReference(inner) => IndexType::LValueReference(boxed(inner)?),
        IndexType::RValueReference(inner) => IndexType::RValueReference(boxed(inner)?),
        IndexType::Qualified {
            is_const,
            is_volatile,
            inner,
        } => {
            let inner = canonical_at(db, inner, depth)?;
            // `const` applied to an already const-qualified alias collapses.
            match inner {
                IndexType::Qualified {
                    is_const: c,
                    is_volatile: v,
                    inner,
                } => IndexType::Qualified {
                    is_const: *is_const || c,
                    is_volatile: *is_volatile || v,
                    inner,
                },
                inner => IndexType::Qualified {
                    is_const: *is_const,
                    is_volatile: *is_volatile,
                    inner: Box::new(inner),
                },
            }
        }
        IndexType::Array { size, element } => IndexType::Array {
            size: *size,
            element: boxed(element)?,
        },
        IndexType::Function {
            return_type,
            parameters,
        } => IndexType::Function {
            return_type: boxed(return_type)?,
            parameters: parameters
                .iter()
                .map(|p| canonical_at(db, p, depth))
                .collect::<Result<_>>()?,
        },
        other => other.clone(),
    })
}

fn write_key(out: &mut String, ty: &IndexType) {
    match ty {
        IndexType::Builtin(b) => out.push_str(b.as_str()),
        IndexType::Binding(rec) => {
            let _ = write!(out, "b{}", rec.0);
        }
        IndexType::Pointer(inner) => {
            out.push_str("P(");
            write_key(out, inner);
            out.push(')');
        }
        IndexType::LValueReference(inner) => {
            out.push_str("R(");
            write_key(out, inner);
            out.push(')');
        }
        IndexType::RValueReference(inner) => {
            out.push_str("RR(");
            write_key(out, inner);
            out.push(')');
        }
        IndexType::Qualified {
            is_const,
            is_volatile,
            inner,
        } => {
            if *is_const {
                out.push('c');
            }
            if *is_volatile {
                out.push('v');
            }
            out.push('(');
            write_key(out, inner);
            out.push(')');
        }
        IndexType::Array { size, element } => {
            match size {
                Some(n) => {
                    let _ = write!(out, "A{}(", n);
                }
                None => out.push_str("A("),
            }
            write_key(out, element);
            out.push(')');
        }
        IndexType::Function {
            return_type,
            parameters,
        } => {
            out.push_str("F(");
            write_key(out, return_type);
            out.push(';');
            for (i, p) in parameters.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_key(out, p);
            }
            out.push(')');
        }
        IndexType::TemplateParameter { owner, position } => {
            let _ = write!(out, "t{}.{}", owner.0, position);
        }
        IndexType::Dependent(name) => {
            let _ = write!(out, "d:{}", name);
        }
    }
}

pub fn type_key(db: &Database, ty: &IndexType) -> Result<String> {
    let mut out = String::new();
    write_key(&mut out, &canonical(db, ty)?);
    Ok(out)
}

pub fn argument_key(db: &Database, arg: &IndexArgument) -> Result<String> {
    Ok(match arg {
        IndexArgument::Type(ty) => type_key(db, ty)?,
        IndexArgument::Value(v) => format!("v{}", v),
        IndexArgument::ValueParameter { owner, position } => format!("t{}.{}", owner.0, position),
        IndexArgument::DependentValue(name) => format!("d:{}", name),
    })
}

/// Order-preserving key of a whole argument list.
pub fn arguments_key(db: &Database, args: &[IndexArgument]) -> Result<String> {
    let mut keys = Vec::with_capacity(args.len());
    for arg in args {
        keys.push(argument_key(db, arg)?);
    }
    Ok(format!("<{}>", keys.join(",")))
}

/// True when the type cannot be known before instantiation, including
/// through bindings to deferred instances.
pub fn is_dependent(db: &Database, ty: &IndexType) -> Result<bool> {
    Ok(match ty {
        IndexType::TemplateParameter { .. } | IndexType::Dependent(_) => true,
        IndexType::Binding(rec) => tag_of(db, *rec)? == Some(NodeType::DeferredClassInstance),
        IndexType::Pointer(inner)
        | IndexType::LValueReference(inner)
        | IndexType::RValueReference(inner)
        | IndexType::Qualified { inner, .. }
        | IndexType::Array { element: inner, .. } => is_dependent(db, inner)?,
        IndexType::Function {
            return_type,
            parameters,
        } => {
            if is_dependent(db, return_type)? {
                return Ok(true);
            }
            for p in parameters {
                if is_dependent(db, p)? {
                    return Ok(true);
                }
            }
            false
        }
        IndexType::Builtin(_) => false,
    })
}

pub fn is_dependent_argument(db: &Database, arg: &IndexArgument) -> Result<bool> {
    match arg {
        IndexArgument::Type(ty) => is_dependent(db, ty),
        IndexArgument::Value(_) => Ok(false),
        IndexArgument::ValueParameter { .. } | IndexArgument::DependentValue(_) => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::codec::write_type;
    use symdex_api::BuiltinType;
    use tempfile::tempdir;

    fn typedef_of(db: &Database, aliased: &IndexType) -> RecordId {
        let rec = db.malloc(typedef::SIZE as usize).unwrap();
        db.put_u16(rec.at(node::TYPE), NodeType::Typedef as u16).unwrap();
        let blob = write_type(db, rec, aliased).unwrap();
        db.put_rec(rec.at(typedef::TYPE), blob).unwrap();
        rec
    }

    #[test]
    fn test_typedefs_are_expanded() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let ulong = IndexType::Builtin(BuiltinType::UnsignedLong);
        let size_t = typedef_of(&db, &ulong);
        let size_type = typedef_of(&db, &IndexType::Binding(size_t));

        let via_alias = IndexType::Pointer(Box::new(IndexType::Binding(size_type)));
        let direct = IndexType::Pointer(Box::new(ulong));
        assert_eq!(type_key(&db, &via_alias).unwrap(), type_key(&db, &direct).unwrap());
    }

    #[test]
    fn test_argument_keys_preserve_order() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let int = IndexArgument::Type(IndexType::Builtin(BuiltinType::Int));
        let three = IndexArgument::Value(3);
        let a = arguments_key(&db, &[int.clone(), three.clone()]).unwrap();
        let b = arguments_key(&db, &[three, int]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, "<int,v3>");
    }
}
