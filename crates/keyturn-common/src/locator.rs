use serde::{Deserialize, Serialize};

/// A declarative element selector with one or more acceptable CSS
/// alternatives (e.g. `input[id$='txtLoginName']` OR `input[id$='txtUserName']`).
///
/// Immutable once constructed. A locator matches zero, one, or many elements;
/// callers decide how to disambiguate (first in document order throughout
/// this workspace).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    alternatives: Vec<String>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            alternatives: vec![selector.into()],
        }
    }

    /// Build a locator from several acceptable selectors.
    /// Empty input produces a locator that matches nothing.
    pub fn any_of<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alternatives: selectors.into_iter().map(Into::into).collect(),
        }
    }

    pub fn or(mut self, selector: impl Into<String>) -> Self {
        self.alternatives.push(selector.into());
        self
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// Combined CSS selector list, suitable for a single `findElements` call.
    pub fn as_css(&self) -> String {
        self.alternatives.join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_css())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_alternatives_into_css_list() {
        let loc = Locator::css("input[id$='txtLoginName']").or("input[id$='txtUserName']");
        assert_eq!(
            loc.as_css(),
            "input[id$='txtLoginName'], input[id$='txtUserName']"
        );
        assert_eq!(loc.alternatives().len(), 2);
    }

    #[test]
    fn any_of_accepts_empty() {
        let loc = Locator::any_of(Vec::<String>::new());
        assert!(loc.is_empty());
        assert_eq!(loc.as_css(), "");
    }
}
