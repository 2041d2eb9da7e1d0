//! Declared class hierarchy.

use std::collections::{HashMap, HashSet};

/// Class → declared supertypes (parent classes and interfaces).
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    supertypes: HashMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare direct supertypes of `class`, appending to earlier declarations.
    pub fn declare<I, S>(&mut self, class: &str, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes
            .entry(class.to_string())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
    }

    /// Builder-style [`declare`](Self::declare).
    pub fn with<I, S>(mut self, class: &str, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(class, supertypes);
        self
    }

    /// Whether `class` is `ancestor` or transitively extends/implements it.
    pub fn is_subtype(&self, class: &str, ancestor: &str) -> bool {
        if class == ancestor {
            return true;
        }

        let mut seen = HashSet::new();
        let mut pending = vec![class];
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            for parent in self.supertypes.get(current).into_iter().flatten() {
                if parent == ancestor {
                    return true;
                }
                pending.push(parent.as_str());
            }
        }
        false
    }
}
