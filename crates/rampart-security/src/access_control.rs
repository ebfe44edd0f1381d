/// Attribute that opens a matched rule to everyone, authenticated or not.
pub const PUBLIC_ACCESS: &str = "PUBLIC_ACCESS";

/// Path prefix plus the attributes a request under it must be granted.
///
/// An empty attribute set marks the path public: it still counts as a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlRule {
    path_prefix: String,
    attributes: Vec<String>,
}

impl AccessControlRule {
    /// ## Summary
    /// Creates a rule. Attributes are trimmed; empty and repeated attributes are dropped
    /// while the first occurrence keeps its position.
    #[must_use]
    pub fn new<I, S>(path_prefix: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for attribute in attributes {
            let attribute = attribute.as_ref().trim();
            if !attribute.is_empty() && !unique.iter().any(|a| a == attribute) {
                unique.push(attribute.to_owned());
            }
        }
        Self {
            path_prefix: path_prefix.into(),
            attributes: unique,
        }
    }

    #[must_use]
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }
}

/// Ordered access-control rules. The first registered rule matching a path wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControl {
    rules: Vec<AccessControlRule>,
}

impl AccessControl {
    #[must_use]
    pub const fn new(rules: Vec<AccessControlRule>) -> Self {
        Self { rules }
    }

    /// ## Summary
    /// Appends a rule after every rule already registered.
    #[must_use]
    pub fn with_rule<I, S>(mut self, path_prefix: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.rules.push(AccessControlRule::new(path_prefix, attributes));
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[AccessControlRule] {
        &self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// ## Summary
    /// Attributes of the first rule whose prefix is a literal prefix of `path`, or `None`
    /// when no rule matches.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<&[String]> {
        self.match_rule(path).map(|(_, rule)| rule.attributes())
    }

    /// ## Summary
    /// First matching rule together with its registration index.
    #[must_use]
    pub fn match_rule(&self, path: &str) -> Option<(usize, &AccessControlRule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(path))
    }

    /// ## Summary
    /// Rules of `first` followed by rules of `second`.
    #[must_use]
    pub fn concat(first: &Self, second: &Self) -> Self {
        Self::new(
            first
                .rules
                .iter()
                .chain(&second.rules)
                .cloned()
                .collect(),
        )
    }
}
