use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of a linkage (one per source language sharing an index file).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkageId(Cow<'static, str>);

impl LinkageId {
    pub const CPP: LinkageId = LinkageId(Cow::Borrowed("C++"));
    pub const C: LinkageId = LinkageId(Cow::Borrowed("C"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Map a source file extension to the linkage that indexes it.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "c" => Some(Self::C),
            "cc" | "cpp" | "cxx" | "c++" | "hh" | "hpp" | "hxx" | "ipp" | "tpp" => Some(Self::CPP),
            // Plain headers are shared; C++ is the superset.
            "h" => Some(Self::CPP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LinkageId {
    fn from(s: &str) -> Self {
        match s {
            "C++" | "c++" | "cpp" => Self::CPP,
            "C" | "c" => Self::C,
            other => Self::new(other.to_string()),
        }
    }
}

impl From<String> for LinkageId {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl AsRef<str> for LinkageId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(LinkageId::from_extension("c"), Some(LinkageId::C));
        assert_eq!(LinkageId::from_extension("HPP"), Some(LinkageId::CPP));
        assert_eq!(LinkageId::from_extension("rs"), None);
    }

    #[test]
    fn test_aliases_collapse() {
        assert_eq!(LinkageId::from("cpp"), LinkageId::CPP);
        assert_eq!(LinkageId::from("C"), LinkageId::C);
        assert_eq!(LinkageId::from("fortran").as_str(), "fortran");
    }
}
