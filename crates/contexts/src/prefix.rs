//! Prefix rules routing property names to contexts
//!
//! Rules are kept longest prefix first so the first match is the most
//! specific one. Rules of equal length stay in the order they were added,
//! and wildcard rules (`*`) always sort last.

/// One `prefix -> context` mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
    prefix: String,
    context: usize,
}

impl PrefixRule {
    /// The prefix as written in the contexts file
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Index of the context this rule routes to
    pub fn context(&self) -> usize {
        self.context
    }

    /// True for the catch-all rule
    pub fn is_wildcard(&self) -> bool {
        self.prefix.starts_with('*')
    }

    fn matches(&self, name: &str) -> bool {
        self.is_wildcard() || name.starts_with(&self.prefix)
    }
}

/// Ordered list of prefix rules
#[derive(Debug, Clone, Default)]
pub struct PrefixRules {
    rules: Vec<PrefixRule>,
}

impl PrefixRules {
    /// Empty rule list
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, keeping longest-first order
    pub fn insert(&mut self, prefix: &str, context: usize) {
        let len = prefix.len();
        let at = self
            .rules
            .iter()
            .position(|rule| rule.prefix.len() < len || rule.is_wildcard())
            .unwrap_or(self.rules.len());
        self.rules.insert(
            at,
            PrefixRule {
                prefix: prefix.to_string(),
                context,
            },
        );
    }

    /// Context index for `name`, or `None` when no rule matches
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.rules
            .iter()
            .find(|rule| rule.matches(name))
            .map(|rule| rule.context)
    }

    /// Rules in match order
    pub fn iter(&self) -> impl Iterator<Item = &PrefixRule> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rule was added
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
