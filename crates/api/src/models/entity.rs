use super::builder::EntityBuilder;
use super::kind::{ClassKey, DeclRole, EntityKind, Visibility};
use super::types::{
    BaseSpecifier, FunctionTraits, ParameterInfo, Specialization, TemplateParameterInfo, TypeRef,
};
use std::ops::Deref;
use std::sync::Arc;

/// A semantic entity observed by a parser.
///
/// Cheap to clone; the enclosing scope chain is shared between entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entity(Arc<EntityData>);

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntityData {
    pub name: String,
    pub kind: EntityKind,
    /// Declared enclosing scope; `None` for the global scope.
    pub owner: Option<Entity>,
    pub role: DeclRole,
    /// Observed only through a friend declaration.
    pub friend: bool,
    pub visibility: Visibility,
    pub class_key: ClassKey,
    /// Type of a field/variable, target of a typedef, underlying type of an enumeration.
    pub declared_type: Option<TypeRef>,
    pub return_type: Option<TypeRef>,
    pub parameters: Vec<ParameterInfo>,
    pub template_parameters: Vec<TemplateParameterInfo>,
    pub bases: Vec<BaseSpecifier>,
    pub specialization: Option<Specialization>,
    pub function: FunctionTraits,
    pub enumerator_value: Option<i64>,
    pub scoped_enum: bool,
    /// Set when the parser could not make sense of the entity.
    pub problem: Option<String>,
}

impl Entity {
    pub fn new(data: EntityData) -> Self {
        Self(Arc::new(data))
    }

    pub fn builder(kind: EntityKind, name: &str) -> EntityBuilder {
        EntityBuilder::new(kind, name)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> EntityKind {
        self.0.kind
    }

    pub fn owner(&self) -> Option<&Entity> {
        self.0.owner.as_ref()
    }

    pub fn is_problem(&self) -> bool {
        self.0.problem.is_some()
    }

    pub fn is_definition(&self) -> bool {
        self.0.role == DeclRole::Definition
    }

    /// Names from the outermost scope down to this entity.
    pub fn qualified_path(&self) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut current = Some(self);
        while let Some(entity) = current {
            parts.push(entity.name());
            current = entity.owner();
        }
        parts.reverse();
        parts
    }

    /// True when the entity lives inside a function body.
    pub fn is_function_local(&self) -> bool {
        let mut current = self.owner();
        while let Some(owner) = current {
            if owner.kind().is_function_like() {
                return true;
            }
            current = owner.owner();
        }
        false
    }

    /// Return a copy with a different role, keeping everything else shared.
    pub fn with_role(&self, role: DeclRole) -> Entity {
        let mut data = (*self.0).clone();
        data.role = role;
        Entity::new(data)
    }
}

impl Deref for Entity {
    type Target = EntityData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
