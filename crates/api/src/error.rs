/// Reasons an entity handed over by a parser cannot be adapted into the index.
///
/// All of these are recoverable: the single addition is abandoned and indexing
/// continues with the next entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionFailure {
    #[error("`{0}` is a problem placeholder produced by the parser")]
    ProblemEntity(String),
    #[error("type used by `{entity}` cannot be resolved: {reason}")]
    ProblemType { entity: String, reason: String },
    #[error("enclosing scope of `{0}` cannot be resolved")]
    UnresolvedScope(String),
    #[error("template parameter `{name}` (position {position}) is not visible from `{entity}`")]
    UnresolvedTemplateParameter {
        entity: String,
        name: String,
        position: u16,
    },
    #[error("`{0}` is specialized but does not name a template")]
    NotATemplate(String),
    #[error("{kind} `{name}` is not supported by linkage {linkage}")]
    Unsupported {
        kind: &'static str,
        name: String,
        linkage: String,
    },
    #[error("name of `{0}...` exceeds the maximum stored name length")]
    NameTooLong(String),
    #[error("encoded payload of {0} bytes exceeds the maximum stored length")]
    PayloadTooLarge(usize),
}

pub type ResolutionResult<T> = std::result::Result<T, ResolutionFailure>;
