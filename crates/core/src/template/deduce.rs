//! Matching instance arguments against partial specialization patterns.

use crate::error::Result;
use crate::node::{ClassTemplateView, InstanceView, NodeType, SpecializationView, tag_of};
use crate::storage::Database;
use crate::types::key::canonical;
use crate::types::{IndexArgument, IndexType, from_argument_map};
use std::collections::HashMap;
use symdex_api::RecordId;

/// Deduced values of a partial specialization's own parameters.
pub type Deduction = HashMap<u16, IndexArgument>;

/// Deduce the parameters of `partial` so that its `pattern` equals `args`.
///
/// Parameters are those owned by `partial`; every other type in the pattern
/// must match exactly, modulo typedefs.
pub fn deduce(
    db: &Database,
    partial: RecordId,
    pattern: &[IndexArgument],
    args: &[IndexArgument],
) -> Result<Option<Deduction>> {
    if pattern.len() != args.len() {
        return Ok(None);
    }
    let mut deducer = Deducer {
        db,
        partial,
        bound: Deduction::new(),
    };
    for (p, a) in pattern.iter().zip(args) {
        if !deducer.argument(p, a)? {
            return Ok(None);
        }
    }
    Ok(Some(deducer.bound))
}

struct Deducer<'a> {
    db: &'a Database,
    partial: RecordId,
    bound: Deduction,
}

impl Deducer<'_> {
    fn bind(&mut self, position: u16, value: IndexArgument) -> bool {
        match self.bound.get(&position) {
            Some(existing) => *existing == value,
            None => {
                self.bound.insert(position, value);
                true
            }
        }
    }

    fn argument(&mut self, pattern: &IndexArgument, arg: &IndexArgument) -> Result<bool> {
        Ok(match (pattern, arg) {
            (IndexArgument::ValueParameter { owner, position }, _) if *owner == self.partial => {
                self.bind(*position, arg.clone())
            }
            (IndexArgument::Type(p), IndexArgument::Type(a)) => {
                let p = canonical(self.db, p)?;
                let a = canonical(self.db, a)?;
                self.ty(&p, &a)?
            }
            (p, a) => p == a,
        })
    }

    fn ty(&mut self, pattern: &IndexType, arg: &IndexType) -> Result<bool> {
        Ok(match (pattern, arg) {
            (IndexType::TemplateParameter { owner, position }, _) if *owner == self.partial => {
                self.bind(*position, IndexArgument::Type(arg.clone()))
            }
            (IndexType::Pointer(p), IndexType::Pointer(a))
            | (IndexType::LValueReference(p), IndexType::LValueReference(a))
            | (IndexType::RValueReference(p), IndexType::RValueReference(a)) => self.ty(p, a)?,
            (
                IndexType::Qualified {
                    is_const: pc,
                    is_volatile: pv,
                    inner: p,
                },
                IndexType::Qualified {
                    is_const: ac,
                    is_volatile: av,
                    inner: a,
                },
            ) => pc == ac && pv == av && self.ty(p, a)?,
            (
                IndexType::Array {
                    size: ps,
                    element: p,
                },
                IndexType::Array {
                    size: as_,
                    element: a,
                },
            ) => ps == as_ && self.ty(p, a)?,
            (
                IndexType::Function {
                    return_type: pr,
                    parameters: pp,
                },
                IndexType::Function {
                    return_type: ar,
                    parameters: ap,
                },
            ) => {
                if pp.len() != ap.len() || !self.ty(pr, ar)? {
                    return Ok(false);
                }
                for (p, a) in pp.iter().zip(ap) {
                    if !self.ty(p, a)? {
                        return Ok(false);
                    }
                }
                true
            }
            (IndexType::Binding(p), IndexType::Binding(a)) if p != a => self.instances(*p, *a)?,
            (p, a) => p == a,
        })
    }

    /// `Foo<T*>` against `Foo<int*>`: same template, matching arguments.
    fn instances(&mut self, pattern: RecordId, arg: RecordId) -> Result<bool> {
        if !tag_of(self.db, pattern)?.is_instance() || !tag_of(self.db, arg)?.is_instance() {
            return Ok(false);
        }
        let generic = SpecializationView(pattern).specialized(self.db)?;
        if generic != SpecializationView(arg).specialized(self.db)? {
            return Ok(false);
        }
        let pattern_args = from_argument_map(InstanceView(pattern).argument_map(self.db)?);
        let args = from_argument_map(InstanceView(arg).argument_map(self.db)?);
        if pattern_args.len() != args.len() {
            return Ok(false);
        }
        for (p, a) in pattern_args.iter().zip(&args) {
            if !self.argument(p, a)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// How constrained a pattern is: the number of nodes that are not
/// parameters. More specialized patterns score higher.
pub fn specificity(db: &Database, pattern: &[IndexArgument]) -> Result<usize> {
    let mut total = 0;
    for arg in pattern {
        total += match arg {
            IndexArgument::Type(ty) => type_specificity(db, ty)?,
            IndexArgument::Value(_) | IndexArgument::DependentValue(_) => 1,
            IndexArgument::ValueParameter { .. } => 0,
        };
    }
    Ok(total)
}

fn type_specificity(db: &Database, ty: &IndexType) -> Result<usize> {
    Ok(match ty {
        IndexType::TemplateParameter { .. } => 0,
        IndexType::Builtin(_) | IndexType::Dependent(_) => 1,
        IndexType::Binding(rec) => {
            if tag_of(db, *rec)?.is_instance() {
                let args = from_argument_map(InstanceView(*rec).argument_map(db)?);
                1 + specificity(db, &args)?
            } else {
                1
            }
        }
        IndexType::Pointer(inner)
        | IndexType::LValueReference(inner)
        | IndexType::RValueReference(inner)
        | IndexType::Qualified { inner, .. }
        | IndexType::Array { element: inner, .. } => 1 + type_specificity(db, inner)?,
        IndexType::Function {
            return_type,
            parameters,
        } => {
            let mut total = 1 + type_specificity(db, return_type)?;
            for parameter in parameters {
                total += type_specificity(db, parameter)?;
            }
            total
        }
    })
}

/// Most specialized configured partial of `primary` matching `args`.
///
/// Partials are kept in signature order, so ties resolve the same way in
/// every session.
pub fn select_partial(
    db: &Database,
    primary: RecordId,
    args: &[IndexArgument],
) -> Result<Option<RecordId>> {
    if tag_of(db, primary)? != NodeType::ClassTemplate {
        return Ok(None);
    }
    let mut best: Option<(usize, RecordId)> = None;
    for partial in ClassTemplateView(primary).partials(db)? {
        if !partial.is_configured(db)? {
            continue;
        }
        let pattern = partial.pattern(db)?;
        if deduce(db, partial.0, &pattern, args)?.is_none() {
            continue;
        }
        let score = specificity(db, &pattern)?;
        if best.is_none_or(|(top, _)| score > top) {
            best = Some((score, partial.0));
        }
    }
    Ok(best.map(|(_, rec)| rec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use symdex_api::BuiltinType;
    use tempfile::tempdir;

    const PARTIAL: RecordId = RecordId(4096);

    fn param(position: u16) -> IndexType {
        IndexType::TemplateParameter {
            owner: PARTIAL,
            position,
        }
    }

    fn int() -> IndexType {
        IndexType::Builtin(BuiltinType::Int)
    }

    fn ptr(inner: IndexType) -> IndexType {
        IndexType::Pointer(Box::new(inner))
    }

    #[test]
    fn test_pointer_pattern_binds_pointee() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let pattern = vec![IndexArgument::Type(ptr(param(0)))];

        let deduced = deduce(&db, PARTIAL, &pattern, &[IndexArgument::Type(ptr(int()))])
            .unwrap()
            .unwrap();
        assert_eq!(deduced.get(&0), Some(&IndexArgument::Type(int())));

        assert!(deduce(&db, PARTIAL, &pattern, &[IndexArgument::Type(int())])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_repeated_parameter_must_bind_consistently() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let pattern = vec![IndexArgument::Type(param(0)), IndexArgument::Type(param(0))];
        let same = [IndexArgument::Type(int()), IndexArgument::Type(int())];
        let mixed = [
            IndexArgument::Type(int()),
            IndexArgument::Type(IndexType::Builtin(BuiltinType::Double)),
        ];
        assert!(deduce(&db, PARTIAL, &pattern, &same).unwrap().is_some());
        assert!(deduce(&db, PARTIAL, &pattern, &mixed).unwrap().is_none());
    }

    #[test]
    fn test_value_parameters_and_literals() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let pattern = vec![
            IndexArgument::Type(param(0)),
            IndexArgument::ValueParameter {
                owner: PARTIAL,
                position: 1,
            },
        ];
        let args = [IndexArgument::Type(int()), IndexArgument::Value(3)];
        let deduced = deduce(&db, PARTIAL, &pattern, &args).unwrap().unwrap();
        assert_eq!(deduced.get(&1), Some(&IndexArgument::Value(3)));

        let fixed = vec![IndexArgument::Type(param(0)), IndexArgument::Value(4)];
        assert!(deduce(&db, PARTIAL, &fixed, &args).unwrap().is_none());
    }

    #[test]
    fn test_specificity_orders_patterns() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let general = [IndexArgument::Type(param(0))];
        let pointer = [IndexArgument::Type(ptr(param(0)))];
        let exact = [IndexArgument::Type(ptr(int()))];
        let s = |p: &[IndexArgument]| specificity(&db, p).unwrap();
        assert!(s(&general) < s(&pointer));
        assert!(s(&pointer) < s(&exact));
    }
}
