use std::fmt::Debug;

/// Defines language-specific rules for rendering and parsing qualified names.
pub trait NamingConvention: Send + Sync + Debug {
    /// The scope separator (e.g., "::" for C++).
    fn separator(&self) -> &str;

    /// Render scope segments, outermost first, into a qualified name.
    fn render(&self, segments: &[String]) -> String {
        segments.join(self.separator())
    }

    /// Split a qualified name into scope segments, outermost first.
    ///
    /// A leading separator (global-scope qualifier) is ignored.
    fn parse(&self, qualified: &str) -> Vec<String> {
        let sep = self.separator();
        let trimmed = qualified.strip_prefix(sep).unwrap_or(qualified);
        trimmed
            .split(sep)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A convention parameterized only by its separator.
#[derive(Debug, Clone)]
pub struct ScopePathConvention {
    separator: &'static str,
}

impl ScopePathConvention {
    pub const fn new(separator: &'static str) -> Self {
        Self { separator }
    }
}

impl Default for ScopePathConvention {
    fn default() -> Self {
        Self::new("::")
    }
}

impl NamingConvention for ScopePathConvention {
    fn separator(&self) -> &str {
        self.separator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse() {
        let nc = ScopePathConvention::default();
        let segments = vec!["std".to_string(), "vector".to_string()];
        assert_eq!(nc.render(&segments), "std::vector");
        assert_eq!(nc.parse("::std::vector"), segments);
        assert!(nc.parse("").is_empty());
    }
}
