use super::entity::{Entity, EntityData};
use super::kind::{ClassKey, DeclRole, EntityKind, SpecializationKind, Visibility};
use super::types::{
    BaseSpecifier, FunctionTraits, ParameterInfo, Specialization, TemplateArgument,
    TemplateParameterInfo, TemplateParameterKind, TypeRef,
};

/// Fluent construction of [`Entity`] values, used by parsers and tests.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    data: EntityData,
}

impl EntityBuilder {
    pub fn new(kind: EntityKind, name: &str) -> Self {
        Self {
            data: EntityData {
                name: name.to_string(),
                kind,
                ..Default::default()
            },
        }
    }

    pub fn owner(mut self, owner: &Entity) -> Self {
        self.data.owner = Some(owner.clone());
        self
    }

    pub fn role(mut self, role: DeclRole) -> Self {
        self.data.role = role;
        self
    }

    pub fn definition(self) -> Self {
        self.role(DeclRole::Definition)
    }

    pub fn reference(self) -> Self {
        self.role(DeclRole::Reference)
    }

    pub fn friend(mut self) -> Self {
        self.data.friend = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.data.visibility = visibility;
        self
    }

    pub fn class_key(mut self, key: ClassKey) -> Self {
        self.data.class_key = key;
        self
    }

    pub fn declared_type(mut self, ty: TypeRef) -> Self {
        self.data.declared_type = Some(ty);
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.data.return_type = Some(ty);
        self
    }

    pub fn parameter(mut self, name: &str, ty: TypeRef) -> Self {
        self.data.parameters.push(ParameterInfo {
            name: name.to_string(),
            ty,
            has_default: false,
        });
        self
    }

    pub fn template_type_parameter(mut self, name: &str) -> Self {
        self.data.template_parameters.push(TemplateParameterInfo {
            name: name.to_string(),
            kind: TemplateParameterKind::Type { default: None },
            is_pack: false,
        });
        self
    }

    pub fn template_type_parameter_with_default(mut self, name: &str, default: TypeRef) -> Self {
        self.data.template_parameters.push(TemplateParameterInfo {
            name: name.to_string(),
            kind: TemplateParameterKind::Type {
                default: Some(default),
            },
            is_pack: false,
        });
        self
    }

    pub fn template_value_parameter(mut self, name: &str, ty: TypeRef) -> Self {
        self.data.template_parameters.push(TemplateParameterInfo {
            name: name.to_string(),
            kind: TemplateParameterKind::Value { ty, default: None },
            is_pack: false,
        });
        self
    }

    pub fn template_parameter(mut self, parameter: TemplateParameterInfo) -> Self {
        self.data.template_parameters.push(parameter);
        self
    }

    pub fn base(mut self, ty: TypeRef) -> Self {
        self.data.bases.push(BaseSpecifier {
            ty,
            visibility: Visibility::Public,
            is_virtual: false,
        });
        self
    }

    pub fn base_specifier(mut self, base: BaseSpecifier) -> Self {
        self.data.bases.push(base);
        self
    }

    fn specialize(
        mut self,
        kind: SpecializationKind,
        specialized: &Entity,
        arguments: Vec<TemplateArgument>,
    ) -> Self {
        self.data.specialization = Some(Specialization {
            kind,
            specialized: specialized.clone(),
            arguments,
        });
        self
    }

    pub fn instance_of(self, template: &Entity, arguments: Vec<TemplateArgument>) -> Self {
        self.specialize(SpecializationKind::Instance, template, arguments)
    }

    pub fn explicit_specialization_of(
        self,
        template: &Entity,
        arguments: Vec<TemplateArgument>,
    ) -> Self {
        self.specialize(SpecializationKind::Explicit, template, arguments)
    }

    /// Partial specialization pattern of `primary` (use with `EntityKind::PartialSpecialization`).
    pub fn partial_of(self, primary: &Entity, pattern: Vec<TemplateArgument>) -> Self {
        self.specialize(SpecializationKind::Explicit, primary, pattern)
    }

    /// Member of a specialized owner, specializing the generic member `generic`.
    pub fn member_of_specialization(self, generic: &Entity) -> Self {
        self.specialize(SpecializationKind::Member, generic, Vec::new())
    }

    pub fn function_traits(mut self, traits: FunctionTraits) -> Self {
        self.data.function = traits;
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.data.enumerator_value = Some(value);
        self
    }

    pub fn scoped(mut self) -> Self {
        self.data.scoped_enum = true;
        self
    }

    pub fn problem(mut self, message: &str) -> Self {
        self.data.problem = Some(message.to_string());
        self
    }

    pub fn build(self) -> Entity {
        Entity::new(self.data)
    }
}
