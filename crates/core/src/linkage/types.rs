//! Parser types to stored types.

use super::session::{IndexSession, Observation, SessionMode};
use crate::error::Result;
use crate::types::{IndexArgument, IndexType};
use symdex_api::{Entity, RecordId, ResolutionFailure, TemplateArgument, TypeRef};

impl IndexSession<'_> {
    /// Adapt `ty` as used by `context`.
    ///
    /// Named entities are adapted as references, and the current unit is
    /// noted as referring to them. `None` only in find-only mode, when a
    /// named entity is not indexed.
    pub(crate) fn adapt_type(&mut self, context: &Entity, ty: &TypeRef) -> Result<Option<IndexType>> {
        self.type_context.push(context.clone());
        let result = self.adapt_type_in(context, ty);
        self.type_context.pop();
        result
    }

    fn adapt_type_in(&mut self, context: &Entity, ty: &TypeRef) -> Result<Option<IndexType>> {
        macro_rules! inner {
            ($inner:expr) => {
                match self.adapt_type_in(context, $inner)? {
                    Some(ty) => Box::new(ty),
                    None => return Ok(None),
                }
            };
        }
        Ok(Some(match ty {
            TypeRef::Builtin(b) => IndexType::Builtin(*b),
            TypeRef::Named(entity) => match self.adapt(entity, Observation::reference())? {
                Some(rec) => {
                    self.record_reference(rec)?;
                    IndexType::Binding(rec)
                }
                None if self.mode == SessionMode::FindOnly => return Ok(None),
                None => {
                    return Err(ResolutionFailure::ProblemType {
                        entity: context.name.clone(),
                        reason: format!("`{}` is not indexed", entity.name),
                    }
                    .into());
                }
            },
            TypeRef::Pointer(inner) => IndexType::Pointer(inner!(inner)),
            TypeRef::LValueReference(inner) => IndexType::LValueReference(inner!(inner)),
            TypeRef::RValueReference(inner) => IndexType::RValueReference(inner!(inner)),
            TypeRef::Qualified {
                is_const,
                is_volatile,
                inner,
            } => IndexType::Qualified {
                is_const: *is_const,
                is_volatile: *is_volatile,
                inner: inner!(inner),
            },
            TypeRef::Array { size, element } => IndexType::Array {
                size: *size,
                element: inner!(element),
            },
            TypeRef::Function {
                return_type,
                parameters,
            } => {
                let return_type = inner!(return_type);
                let mut adapted = Vec::with_capacity(parameters.len());
                for parameter in parameters {
                    match self.adapt_type_in(context, parameter)? {
                        Some(ty) => adapted.push(ty),
                        None => return Ok(None),
                    }
                }
                IndexType::Function {
                    return_type,
                    parameters: adapted,
                }
            }
            TypeRef::TemplateParameter { name, position } => {
                match self.resolve_template_parameter(context, name, *position)? {
                    Some(owner) => {
                        self.record_reference(owner)?;
                        IndexType::TemplateParameter {
                            owner,
                            position: *position,
                        }
                    }
                    None => return Ok(None),
                }
            }
            TypeRef::Dependent(name) => IndexType::Dependent(name.clone()),
            TypeRef::Problem(reason) => {
                return Err(ResolutionFailure::ProblemType {
                    entity: context.name.clone(),
                    reason: reason.clone(),
                }
                .into());
            }
        }))
    }

    pub(crate) fn adapt_arguments(
        &mut self,
        context: &Entity,
        arguments: &[TemplateArgument],
    ) -> Result<Option<Vec<IndexArgument>>> {
        let mut adapted = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let argument = match argument {
                TemplateArgument::Type(ty) => match self.adapt_type(context, ty)? {
                    Some(ty) => IndexArgument::Type(ty),
                    None => return Ok(None),
                },
                TemplateArgument::Value(value) => IndexArgument::Value(*value),
                TemplateArgument::ValueParameter { name, position } => {
                    self.type_context.push(context.clone());
                    let owner = self.resolve_template_parameter(context, name, *position);
                    self.type_context.pop();
                    match owner? {
                        Some(owner) => {
                            self.record_reference(owner)?;
                            IndexArgument::ValueParameter {
                                owner,
                                position: *position,
                            }
                        }
                        None => return Ok(None),
                    }
                }
                TemplateArgument::DependentValue(name) => IndexArgument::DependentValue(name.clone()),
            };
            adapted.push(argument);
        }
        Ok(Some(adapted))
    }

    /// Record of the template declaring parameter `name` at `position`.
    ///
    /// Searched from `local` outward, then through the entities whose types
    /// are being adapted. A template still being keyed yields a null owner.
    fn resolve_template_parameter(
        &mut self,
        local: &Entity,
        name: &str,
        position: u16,
    ) -> Result<Option<RecordId>> {
        let mut declaring = declaring_template(local, name, position);
        if declaring.is_none() {
            declaring = self
                .type_context
                .iter()
                .rev()
                .find_map(|context| declaring_template(context, name, position));
        }
        let Some(template) = declaring else {
            return Err(ResolutionFailure::UnresolvedTemplateParameter {
                entity: local.name.clone(),
                name: name.to_string(),
                position,
            }
            .into());
        };
        if self.keying.contains(&template) {
            return Ok(Some(RecordId::NULL));
        }
        self.adapt(&template, Observation::reference())
    }
}

fn declaring_template(start: &Entity, name: &str, position: u16) -> Option<Entity> {
    let mut current = Some(start);
    while let Some(entity) = current {
        let declares = entity
            .template_parameters
            .get(position as usize)
            .is_some_and(|p| name.is_empty() || p.name == name);
        if declares {
            return Some(entity.clone());
        }
        current = entity.owner();
    }
    None
}
