//! Typed, copyable handles over stored records.
//!
//! A view is just a record id; every accessor reads through the database.

use super::directory;
use super::layout as l;
use super::{NodeType, flags};
use crate::error::{IndexError, Result};
use crate::storage::Database;
use crate::types::{ArgumentMap, IndexArgument, IndexType, codec};
use symdex_api::{ClassKey, DeclRole, FunctionTraits, RecordId, Visibility};

/// Upper bound on intrusive list lengths before a cycle is assumed.
const MAX_LIST_LEN: usize = 1 << 24;

pub fn tag_of(db: &Database, rec: RecordId) -> Result<NodeType> {
    let raw = db.get_u16(rec.at(l::node::TYPE))?;
    NodeType::from_u16(raw)
        .ok_or_else(|| IndexError::corrupt(format!("unknown tag {} at {}", raw, rec)))
}

pub fn parent_of(db: &Database, rec: RecordId) -> Result<RecordId> {
    db.get_rec(rec.at(l::node::PARENT))
}

/// Collect an intrusive singly linked list.
pub fn walk_list(db: &Database, first: RecordId, next_offset: u32) -> Result<Vec<RecordId>> {
    let mut out = Vec::new();
    let mut current = first;
    while !current.is_null() {
        out.push(current);
        if out.len() > MAX_LIST_LEN {
            return Err(IndexError::corrupt(format!("cycle in list at {}", first)));
        }
        current = db.get_rec(current.at(next_offset))?;
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingView(pub RecordId);

impl BindingView {
    pub fn record(self) -> RecordId {
        self.0
    }

    pub fn tag(self, db: &Database) -> Result<NodeType> {
        tag_of(db, self.0)
    }

    pub fn parent(self, db: &Database) -> Result<RecordId> {
        parent_of(db, self.0)
    }

    pub fn name_bytes(self, db: &Database) -> Result<Vec<u8>> {
        codec::read_string(db, db.get_rec(self.0.at(l::binding::NAME))?)
    }

    pub fn name(self, db: &Database) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.name_bytes(db)?).into_owned())
    }

    pub fn linkage(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::binding::LINKAGE))
    }

    pub fn flags(self, db: &Database) -> Result<u16> {
        db.get_u16(self.0.at(l::binding::FLAGS))
    }

    pub fn set_flags(self, db: &Database, value: u16) -> Result<()> {
        db.put_u16(self.0.at(l::binding::FLAGS), value)
    }

    pub fn has_flag(self, db: &Database, flag: u16) -> Result<bool> {
        Ok(self.flags(db)? & flag != 0)
    }

    pub fn set_flag(self, db: &Database, flag: u16, on: bool) -> Result<()> {
        let current = self.flags(db)?;
        let next = if on { current | flag } else { current & !flag };
        if next != current {
            self.set_flags(db, next)?;
        }
        Ok(())
    }

    pub fn role(self, db: &Database) -> Result<DeclRole> {
        Ok(DeclRole::from_bits(self.flags(db)? & flags::ROLE_MASK))
    }

    pub fn is_friend_only(self, db: &Database) -> Result<bool> {
        self.has_flag(db, flags::FRIEND_ONLY)
    }

    pub fn first_declaration(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::binding::FIRST_DECL))
    }

    pub fn next_member(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::binding::NEXT_MEMBER))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassView(pub RecordId);

impl ClassView {
    pub fn binding(self) -> BindingView {
        BindingView(self.0)
    }

    pub fn key(self, db: &Database) -> Result<ClassKey> {
        Ok(ClassKey::from_bits(db.get_u16(self.0.at(l::class::KEY))?))
    }

    pub fn bases(self, db: &Database) -> Result<Vec<BaseView>> {
        let first = db.get_rec(self.0.at(l::class::FIRST_BASE))?;
        Ok(walk_list(db, first, l::base::NEXT)?
            .into_iter()
            .map(BaseView)
            .collect())
    }
}

/// Class template or partial specialization (both own template parameters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassTemplateView(pub RecordId);

impl ClassTemplateView {
    pub fn class(self) -> ClassView {
        ClassView(self.0)
    }

    pub fn template_parameters(self, db: &Database) -> Result<Vec<TemplateParameterView>> {
        template_parameters_at(db, self.0.at(l::class_template::FIRST_TEMPLATE_PARAM))
    }

    pub fn partials(self, db: &Database) -> Result<Vec<PartialView>> {
        let first = db.get_rec(self.0.at(l::class_template::FIRST_PARTIAL))?;
        Ok(walk_list(db, first, l::partial::NEXT_PARTIAL)?
            .into_iter()
            .map(PartialView)
            .collect())
    }

    pub fn instances(self, db: &Database) -> Result<Vec<RecordId>> {
        let first = db.get_rec(self.0.at(l::class_template::FIRST_INSTANCE))?;
        walk_list(db, first, l::class_instance::NEXT_INSTANCE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialView(pub RecordId);

impl PartialView {
    pub fn template(self) -> ClassTemplateView {
        ClassTemplateView(self.0)
    }

    pub fn primary(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::partial::PRIMARY))
    }

    /// Stored argument pattern; empty until configured.
    pub fn pattern(self, db: &Database) -> Result<Vec<IndexArgument>> {
        codec::read_arguments(db, db.get_rec(self.0.at(l::partial::ARGS))?)
    }

    pub fn is_configured(self, db: &Database) -> Result<bool> {
        Ok(!db.get_rec(self.0.at(l::partial::ARGS))?.is_null())
    }

    pub fn signature(self, db: &Database) -> Result<u64> {
        db.get_u64(self.0.at(l::partial::SIGNATURE))
    }
}

/// Any specialization: member specializations and instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecializationView(pub RecordId);

impl SpecializationView {
    pub fn binding(self) -> BindingView {
        BindingView(self.0)
    }

    pub fn specialized(self, db: &Database) -> Result<RecordId> {
        let offset = directory::specialized_field(tag_of(db, self.0)?)
            .ok_or_else(|| IndexError::corrupt(format!("{} is not a specialization", self.0)))?;
        db.get_rec(self.0.at(offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceView(pub RecordId);

impl InstanceView {
    pub fn specialization(self) -> SpecializationView {
        SpecializationView(self.0)
    }

    pub fn argument_map(self, db: &Database) -> Result<ArgumentMap> {
        let offset = directory::argmap_field(tag_of(db, self.0)?)
            .ok_or_else(|| IndexError::corrupt(format!("{} is not an instance", self.0)))?;
        codec::read_argument_map(db, db.get_rec(self.0.at(offset))?)
    }

    pub fn is_deferred(self, db: &Database) -> Result<bool> {
        Ok(tag_of(db, self.0)? == NodeType::DeferredClassInstance)
    }

    pub fn is_explicit(self, db: &Database) -> Result<bool> {
        BindingView(self.0).has_flag(db, flags::EXPLICIT_SPEC)
    }

    /// Partial specialization a class instance was matched against.
    pub fn pattern(self, db: &Database) -> Result<Option<RecordId>> {
        if !tag_of(db, self.0)?.is_class_like() {
            return Ok(None);
        }
        Ok(db.get_rec(self.0.at(l::class_instance::PATTERN))?.non_null())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumerationView(pub RecordId);

impl EnumerationView {
    pub fn underlying(self, db: &Database) -> Result<Option<IndexType>> {
        codec::read_type(db, db.get_rec(self.0.at(l::enumeration::UNDERLYING))?)
    }

    pub fn is_scoped(self, db: &Database) -> Result<bool> {
        BindingView(self.0).has_flag(db, flags::SCOPED_ENUM)
    }

    pub fn enumerators(self, db: &Database) -> Result<Vec<RecordId>> {
        let first = db.get_rec(self.0.at(l::enumeration::MEMBERS))?;
        walk_list(db, first, l::binding::NEXT_MEMBER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumeratorView(pub RecordId);

impl EnumeratorView {
    pub fn value(self, db: &Database) -> Result<i64> {
        db.get_i64(self.0.at(l::enumerator::VALUE))
    }
}

/// Typedef, variable or field: a binding with one declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedView(pub RecordId);

impl TypedView {
    pub fn declared_type(self, db: &Database) -> Result<Option<IndexType>> {
        // Typedef and variable keep their type at the same offset.
        codec::read_type(db, db.get_rec(self.0.at(l::variable::TYPE))?)
    }

    pub fn visibility(self, db: &Database) -> Result<Option<Visibility>> {
        match tag_of(db, self.0)? {
            NodeType::Field | NodeType::FieldSpecialization => Ok(Some(Visibility::from_bits(
                db.get_u16(self.0.at(l::field::VISIBILITY))?,
            ))),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionView(pub RecordId);

impl FunctionView {
    pub fn binding(self) -> BindingView {
        BindingView(self.0)
    }

    pub fn signature(self, db: &Database) -> Result<u64> {
        db.get_u64(self.0.at(l::function::SIGNATURE))
    }

    pub fn parameters(self, db: &Database) -> Result<Vec<ParameterView>> {
        let first = db.get_rec(self.0.at(l::function::FIRST_PARAM))?;
        Ok(walk_list(db, first, l::parameter::NEXT_PARAM)?
            .into_iter()
            .map(ParameterView)
            .collect())
    }

    pub fn parameter_count(self, db: &Database) -> Result<u16> {
        db.get_u16(self.0.at(l::function::PARAM_COUNT))
    }

    pub fn return_type(self, db: &Database) -> Result<Option<IndexType>> {
        codec::read_type(db, db.get_rec(self.0.at(l::function::RETURN_TYPE))?)
    }

    pub fn traits(self, db: &Database) -> Result<FunctionTraits> {
        Ok(FunctionTraits::from_bits(
            db.get_u16(self.0.at(l::function::TRAITS))?,
        ))
    }

    pub fn visibility(self, db: &Database) -> Result<Option<Visibility>> {
        if directory::has_method_block(tag_of(db, self.0)?) {
            return Ok(Some(Visibility::from_bits(
                db.get_u16(self.0.at(l::method::VISIBILITY))?,
            )));
        }
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionTemplateView(pub RecordId);

impl FunctionTemplateView {
    pub fn function(self) -> FunctionView {
        FunctionView(self.0)
    }

    pub fn template_parameters(self, db: &Database) -> Result<Vec<TemplateParameterView>> {
        template_parameters_at(db, self.0.at(l::function_template::FIRST_TEMPLATE_PARAM))
    }

    pub fn instances(self, db: &Database) -> Result<Vec<RecordId>> {
        let first = db.get_rec(self.0.at(l::function_template::FIRST_INSTANCE))?;
        walk_list(db, first, l::function_instance::NEXT_INSTANCE)
    }
}

fn template_parameters_at(db: &Database, anchor: u32) -> Result<Vec<TemplateParameterView>> {
    let first = db.get_rec(anchor)?;
    Ok(walk_list(db, first, l::template_param::NEXT_PARAM)?
        .into_iter()
        .map(TemplateParameterView)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateParameterView(pub RecordId);

impl TemplateParameterView {
    pub fn binding(self) -> BindingView {
        BindingView(self.0)
    }

    pub fn position(self, db: &Database) -> Result<u16> {
        db.get_u16(self.0.at(l::template_param::POSITION))
    }

    pub fn default_argument(self, db: &Database) -> Result<Option<IndexArgument>> {
        codec::read_argument(db, db.get_rec(self.0.at(l::template_param::DEFAULT))?)
    }

    pub fn is_pack(self, db: &Database) -> Result<bool> {
        BindingView(self.0).has_flag(db, flags::PACK)
    }

    /// Type of a non-type parameter.
    pub fn value_type(self, db: &Database) -> Result<Option<IndexType>> {
        if tag_of(db, self.0)? != NodeType::TemplateValueParameter {
            return Ok(None);
        }
        codec::read_type(db, db.get_rec(self.0.at(l::value_param::TYPE))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterView(pub RecordId);

impl ParameterView {
    pub fn binding(self) -> BindingView {
        BindingView(self.0)
    }

    pub fn declared_type(self, db: &Database) -> Result<Option<IndexType>> {
        codec::read_type(db, db.get_rec(self.0.at(l::parameter::TYPE))?)
    }

    pub fn position(self, db: &Database) -> Result<u16> {
        db.get_u16(self.0.at(l::parameter::POSITION))
    }

    pub fn has_default(self, db: &Database) -> Result<bool> {
        BindingView(self.0).has_flag(db, flags::HAS_DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkageView(pub RecordId);

impl LinkageView {
    pub fn name(self, db: &Database) -> Result<String> {
        codec::read_str(db, db.get_rec(self.0.at(l::linkage::NAME))?)
    }

    pub fn next(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::linkage::NEXT_LINKAGE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceUnitView(pub RecordId);

impl SourceUnitView {
    pub fn path(self, db: &Database) -> Result<String> {
        codec::read_str(db, db.get_rec(self.0.at(l::source_unit::PATH))?)
    }

    pub fn first_declaration(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::source_unit::FIRST_DECL))
    }

    pub fn content_hash(self, db: &Database) -> Result<u64> {
        db.get_u64(self.0.at(l::source_unit::CONTENT_HASH))
    }

    pub fn timestamp(self, db: &Database) -> Result<u64> {
        db.get_u64(self.0.at(l::source_unit::TIMESTAMP))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationView(pub RecordId);

impl DeclarationView {
    pub fn binding(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::declaration::BINDING))
    }

    pub fn unit(self, db: &Database) -> Result<RecordId> {
        db.get_rec(self.0.at(l::declaration::UNIT))
    }

    pub fn role(self, db: &Database) -> Result<DeclRole> {
        Ok(DeclRole::from_bits(db.get_u16(self.0.at(l::declaration::ROLE))?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseView(pub RecordId);

impl BaseView {
    pub fn base_type(self, db: &Database) -> Result<Option<IndexType>> {
        codec::read_type(db, db.get_rec(self.0.at(l::base::TYPE))?)
    }

    pub fn visibility(self, db: &Database) -> Result<Visibility> {
        Ok(Visibility::from_bits(db.get_u16(self.0.at(l::base::VISIBILITY))?))
    }

    pub fn is_virtual(self, db: &Database) -> Result<bool> {
        Ok(db.get_u16(self.0.at(l::base::IS_VIRTUAL))? != 0)
    }
}
