use nu_ansi_term::Color;
use symdex_api::{DeclRole, RecordId};
use symdex_core::node::{BindingView, NodeType, tag_of};
use symdex_core::{Result, SymbolIndex, UnitSummary};
use tabled::Tabled;

/// One binding as printed by `find`.
#[derive(Tabled)]
pub struct BindingRow {
    #[tabled(rename = "Record")]
    pub record: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Units")]
    pub units: String,
}

impl BindingRow {
    pub fn load(index: &SymbolIndex, rec: RecordId) -> Result<Self> {
        let db = index.database();
        let tag = tag_of(db, rec)?;
        let role = if tag.is_binding() {
            role_label(BindingView(rec).role(db)?).to_string()
        } else {
            "-".to_string()
        };
        let units: Vec<String> = index
            .declarations(rec)?
            .into_iter()
            .map(|decl| format!("{} ({})", decl.unit, role_label(decl.role)))
            .collect();
        Ok(Self {
            record: rec.to_string(),
            kind: tag.to_string(),
            name: index.qualified_name(rec)?,
            role,
            units: if units.is_empty() {
                "-".to_string()
            } else {
                units.join(", ")
            },
        })
    }
}

#[derive(Tabled)]
pub struct UnitRow {
    #[tabled(rename = "Record")]
    pub record: String,
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Hash")]
    pub hash: String,
    #[tabled(rename = "Decls")]
    pub declarations: usize,
    #[tabled(rename = "Indexed")]
    pub age: String,
}

impl UnitRow {
    pub fn new(unit: UnitSummary, now: u64) -> Self {
        Self {
            record: unit.record.to_string(),
            path: unit.path,
            hash: format!("{:016x}", unit.content_hash),
            declarations: unit.declarations,
            age: format_age(now.saturating_sub(unit.timestamp)),
        }
    }
}

pub fn role_label(role: DeclRole) -> &'static str {
    match role {
        DeclRole::Reference => "reference",
        DeclRole::Declaration => "declaration",
        DeclRole::Definition => "definition",
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

pub fn format_age(age: u64) -> String {
    if age < 60 {
        format!("{}s ago", age)
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86400)
    }
}

/// Kind label colored by node family.
pub fn paint_kind(tag: NodeType) -> String {
    let color = if tag == NodeType::Namespace {
        Color::Blue
    } else if tag.is_template() {
        Color::Magenta
    } else if tag.is_class_like() {
        Color::Cyan
    } else if tag.is_function_like() {
        Color::Yellow
    } else {
        Color::Green
    };
    color.paint(tag.to_string()).to_string()
}
