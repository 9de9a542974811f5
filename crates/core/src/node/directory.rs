//! Dispatch from a stored tag to a typed view.
//!
//! This is the one place where the kind of a record is resolved from
//! persisted data; everything past it works on typed handles.

use super::layout as l;
use super::views::*;
use super::NodeType;
use crate::error::Result;
use crate::storage::Database;
use symdex_api::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedNode {
    Linkage(LinkageView),
    SourceUnit(SourceUnitView),
    Declaration(DeclarationView),
    Base(BaseView),
    Namespace(BindingView),
    Class(ClassView),
    ClassTemplate(ClassTemplateView),
    PartialSpecialization(PartialView),
    ClassSpecialization(SpecializationView),
    ClassInstance(InstanceView),
    DeferredClassInstance(InstanceView),
    Enumeration(EnumerationView),
    Enumerator(EnumeratorView),
    Typedef(TypedView),
    Field(TypedView),
    Variable(TypedView),
    FieldSpecialization(SpecializationView),
    Function(FunctionView),
    FunctionTemplate(FunctionTemplateView),
    Method(FunctionView),
    Constructor(FunctionView),
    FunctionSpecialization(SpecializationView),
    FunctionInstance(InstanceView),
    TemplateTypeParameter(TemplateParameterView),
    TemplateValueParameter(TemplateParameterView),
    Parameter(ParameterView),
    /// Strings, blobs and tree nodes: storage, not semantic records.
    Storage { tag: NodeType, record: RecordId },
}

pub fn get_node(db: &Database, rec: RecordId) -> Result<TypedNode> {
    let tag = tag_of(db, rec)?;
    Ok(match tag {
        NodeType::Linkage => TypedNode::Linkage(LinkageView(rec)),
        NodeType::SourceUnit => TypedNode::SourceUnit(SourceUnitView(rec)),
        NodeType::Declaration => TypedNode::Declaration(DeclarationView(rec)),
        NodeType::Base => TypedNode::Base(BaseView(rec)),
        NodeType::Namespace => TypedNode::Namespace(BindingView(rec)),
        NodeType::Class => TypedNode::Class(ClassView(rec)),
        NodeType::ClassTemplate => TypedNode::ClassTemplate(ClassTemplateView(rec)),
        NodeType::PartialSpecialization => TypedNode::PartialSpecialization(PartialView(rec)),
        NodeType::ClassSpecialization => TypedNode::ClassSpecialization(SpecializationView(rec)),
        NodeType::ClassInstance => TypedNode::ClassInstance(InstanceView(rec)),
        NodeType::DeferredClassInstance => TypedNode::DeferredClassInstance(InstanceView(rec)),
        NodeType::Enumeration => TypedNode::Enumeration(EnumerationView(rec)),
        NodeType::Enumerator => TypedNode::Enumerator(EnumeratorView(rec)),
        NodeType::Typedef => TypedNode::Typedef(TypedView(rec)),
        NodeType::Field => TypedNode::Field(TypedView(rec)),
        NodeType::Variable => TypedNode::Variable(TypedView(rec)),
        NodeType::FieldSpecialization => TypedNode::FieldSpecialization(SpecializationView(rec)),
        NodeType::Function => TypedNode::Function(FunctionView(rec)),
        NodeType::FunctionTemplate => TypedNode::FunctionTemplate(FunctionTemplateView(rec)),
        NodeType::Method => TypedNode::Method(FunctionView(rec)),
        NodeType::Constructor => TypedNode::Constructor(FunctionView(rec)),
        NodeType::FunctionSpecialization => {
            TypedNode::FunctionSpecialization(SpecializationView(rec))
        }
        NodeType::FunctionInstance => TypedNode::FunctionInstance(InstanceView(rec)),
        NodeType::TemplateTypeParameter => {
            TypedNode::TemplateTypeParameter(TemplateParameterView(rec))
        }
        NodeType::TemplateValueParameter => {
            TypedNode::TemplateValueParameter(TemplateParameterView(rec))
        }
        NodeType::Parameter => TypedNode::Parameter(ParameterView(rec)),
        NodeType::String | NodeType::Blob | NodeType::BTreeNode => {
            TypedNode::Storage { tag, record: rec }
        }
    })
}

impl TypedNode {
    pub fn record(&self) -> RecordId {
        match *self {
            TypedNode::Linkage(v) => v.0,
            TypedNode::SourceUnit(v) => v.0,
            TypedNode::Declaration(v) => v.0,
            TypedNode::Base(v) => v.0,
            TypedNode::Namespace(v) => v.0,
            TypedNode::Class(v) => v.0,
            TypedNode::ClassTemplate(v) => v.0,
            TypedNode::PartialSpecialization(v) => v.0,
            TypedNode::ClassSpecialization(v)
            | TypedNode::FieldSpecialization(v)
            | TypedNode::FunctionSpecialization(v) => v.0,
            TypedNode::ClassInstance(v)
            | TypedNode::DeferredClassInstance(v)
            | TypedNode::FunctionInstance(v) => v.0,
            TypedNode::Enumeration(v) => v.0,
            TypedNode::Enumerator(v) => v.0,
            TypedNode::Typedef(v) | TypedNode::Field(v) | TypedNode::Variable(v) => v.0,
            TypedNode::Function(v) | TypedNode::Method(v) | TypedNode::Constructor(v) => v.0,
            TypedNode::FunctionTemplate(v) => v.0,
            TypedNode::TemplateTypeParameter(v) | TypedNode::TemplateValueParameter(v) => v.0,
            TypedNode::Parameter(v) => v.0,
            TypedNode::Storage { record, .. } => record,
        }
    }

    /// The binding block of semantic records.
    pub fn binding(&self) -> Option<BindingView> {
        match self {
            TypedNode::Linkage(_)
            | TypedNode::SourceUnit(_)
            | TypedNode::Declaration(_)
            | TypedNode::Base(_)
            | TypedNode::Storage { .. } => None,
            _ => Some(BindingView(self.record())),
        }
    }
}

// ---- field dispatch ----

/// Anchor of a scope's members (tree root or list head).
pub fn members_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::Linkage => Some(l::linkage::GLOBAL),
        NodeType::Namespace => Some(l::namespace::MEMBERS),
        t if t.is_class_like() => Some(l::class::MEMBERS),
        NodeType::Enumeration => Some(l::enumeration::MEMBERS),
        _ => None,
    }
}

pub fn specialized_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::ClassSpecialization | NodeType::ClassInstance | NodeType::DeferredClassInstance => {
            Some(l::class_spec::SPECIALIZED)
        }
        NodeType::FieldSpecialization => Some(l::field_spec::SPECIALIZED),
        NodeType::FunctionSpecialization | NodeType::FunctionInstance => {
            Some(l::function_spec::SPECIALIZED)
        }
        NodeType::PartialSpecialization => Some(l::partial::PRIMARY),
        _ => None,
    }
}

pub fn argmap_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::ClassInstance | NodeType::DeferredClassInstance => {
            Some(l::class_instance::ARGMAP)
        }
        NodeType::FunctionInstance => Some(l::function_instance::ARGMAP),
        _ => None,
    }
}

pub fn next_instance_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::ClassInstance | NodeType::DeferredClassInstance => {
            Some(l::class_instance::NEXT_INSTANCE)
        }
        NodeType::FunctionInstance => Some(l::function_instance::NEXT_INSTANCE),
        _ => None,
    }
}

pub fn template_params_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::ClassTemplate | NodeType::PartialSpecialization => {
            Some(l::class_template::FIRST_TEMPLATE_PARAM)
        }
        NodeType::FunctionTemplate => Some(l::function_template::FIRST_TEMPLATE_PARAM),
        _ => None,
    }
}

pub fn instances_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::ClassTemplate => Some(l::class_template::FIRST_INSTANCE),
        NodeType::FunctionTemplate => Some(l::function_template::FIRST_INSTANCE),
        _ => None,
    }
}

/// Records carrying a visibility after the function block.
pub fn has_method_block(tag: NodeType) -> bool {
    matches!(
        tag,
        NodeType::Method
            | NodeType::Constructor
            | NodeType::FunctionSpecialization
            | NodeType::FunctionInstance
    )
}

/// Blob holding the single declared type of typedefs, variables and fields.
pub fn type_field(tag: NodeType) -> Option<u32> {
    match tag {
        NodeType::Typedef => Some(l::typedef::TYPE),
        NodeType::Variable | NodeType::Field | NodeType::FieldSpecialization => {
            Some(l::variable::TYPE)
        }
        NodeType::Enumeration => Some(l::enumeration::UNDERLYING),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::layout::node;
    use tempfile::tempdir;

    #[test]
    fn test_dispatch_follows_tag() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("db")).unwrap();
        let rec = db.malloc(NodeType::Method.record_size() as usize).unwrap();
        db.put_u16(rec.at(node::TYPE), NodeType::Method as u16).unwrap();
        assert!(matches!(get_node(&db, rec).unwrap(), TypedNode::Method(_)));
        assert_eq!(get_node(&db, rec).unwrap().record(), rec);

        db.put_u16(rec.at(node::TYPE), 99).unwrap();
        assert!(get_node(&db, rec).is_err());
    }
}
