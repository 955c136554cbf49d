//! Pluggable classifiers for pearl entities and trigger-capable blocks.
//!
//! Both classifiers are name heuristics, not authoritative taxonomy: the
//! trait seam exists so they can be tightened or replaced without touching
//! the state machine.

/// Decides whether a world entity kind is a trackable pearl.
pub trait EntityClassifier: Send + Sync {
    /// Whether `kind` names a pearl entity.
    fn is_pearl(&self, kind: &str) -> bool;
}

/// Default pearl classifier: exact name match, with a tolerant substring
/// fallback for protocol variants that decorate the name.
#[derive(Debug, Clone)]
pub struct PearlClassifier {
    exact: String,
    fragment: String,
}

impl PearlClassifier {
    /// Classifier for a specific exact name and fallback fragment.
    #[must_use]
    pub fn new(exact: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            exact: exact.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for PearlClassifier {
    fn default() -> Self {
        Self::new("ender_pearl", "pearl")
    }
}

impl EntityClassifier for PearlClassifier {
    fn is_pearl(&self, kind: &str) -> bool {
        kind.eq_ignore_ascii_case(&self.exact)
            || kind.to_ascii_lowercase().contains(&self.fragment)
    }
}

/// Matches interactive blocks usable as a physical trigger mechanism:
/// buttons, levers, trapdoors, doors, pressure plates, fence gates.
#[derive(Debug, Clone)]
pub struct ActionBlockMatcher {
    exact: Vec<String>,
    suffixes: Vec<String>,
}

impl ActionBlockMatcher {
    /// Whether `name` is a qualifying action block.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.exact.iter().any(|e| *e == name)
            || self.suffixes.iter().any(|s| name.ends_with(s.as_str()))
    }
}

impl Default for ActionBlockMatcher {
    fn default() -> Self {
        Self {
            exact: vec!["lever".to_string()],
            suffixes: vec![
                "_button".to_string(),
                "_pressure_plate".to_string(),
                "_trapdoor".to_string(),
                "_door".to_string(),
                "_fence_gate".to_string(),
            ],
        }
    }
}
