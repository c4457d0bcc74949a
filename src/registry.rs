//! Category registry: the static table of codes for one dimension.
//!
//! A registry is built once and handed to the aggregator by reference, so
//! several dimensions can coexist without sharing any global map.

use crate::error::{ProfileError, Result};
use crate::types::CategoryDefinition;
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    dimension: String,
    definitions: Vec<CategoryDefinition>,
    index: HashMap<String, usize>,
}

impl CategoryRegistry {
    /// Builds a registry for `dimension`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Config`] on a duplicate code or a range whose
    /// upper bound is below its lower bound.
    pub fn new(dimension: impl Into<String>, definitions: Vec<CategoryDefinition>) -> Result<Self> {
        let dimension = dimension.into();
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.code.clone(), i).is_some() {
                return Err(ProfileError::Config {
                    message: format!("duplicate category code '{}' in '{}'", def.code, dimension),
                });
            }
            if let (Some(min), Some(max)) = (def.range_min, def.range_max) {
                if max < min {
                    return Err(ProfileError::Config {
                        message: format!(
                            "category '{}' in '{}' has range_max {} below range_min {}",
                            def.code, dimension, max, min
                        ),
                    });
                }
            }
        }
        Ok(Self {
            dimension,
            definitions,
            index,
        })
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn definitions(&self) -> &[CategoryDefinition] {
        &self.definitions
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Resolves a code. Never fails: unknown codes get a synthetic
    /// definition labelled with the raw code in the `OTHER` group.
    pub fn lookup(&self, code: &str) -> Cow<'_, CategoryDefinition> {
        match self.index.get(code) {
            Some(i) => Cow::Borrowed(&self.definitions[*i]),
            None => Cow::Owned(CategoryDefinition::synthetic(code)),
        }
    }

    pub fn label(&self, code: &str) -> String {
        self.lookup(code).label.clone()
    }

    /// Group tags in the order they first appear in the table.
    /// `OTHER` is only listed when a definition declares it.
    pub fn groups(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for group in self.definitions.iter().filter_map(|d| d.group.as_deref()) {
            if !out.contains(&group) {
                out.push(group);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OTHER_GROUP;

    fn countries() -> CategoryRegistry {
        CategoryRegistry::new(
            "countries",
            vec![
                CategoryDefinition::new("QATAR", "Qatar").with_group("GULF"),
                CategoryDefinition::new("UAE", "United Arab Emirates").with_group("GULF"),
                CategoryDefinition::new("INDIA", "India").with_group("SOUTH_ASIA"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn lookup_known_code() {
        let reg = countries();
        let def = reg.lookup("QATAR");
        assert_eq!(def.label, "Qatar");
        assert_eq!(def.group.as_deref(), Some("GULF"));
    }

    #[test]
    fn lookup_unknown_code_falls_back_to_other() {
        let reg = countries();
        let def = reg.lookup("NARNIA");
        assert_eq!(def.code, "NARNIA");
        assert_eq!(def.label, "NARNIA");
        assert_eq!(def.group.as_deref(), Some(OTHER_GROUP));
    }

    #[test]
    fn groups_keep_declaration_order() {
        assert_eq!(countries().groups(), vec!["GULF", "SOUTH_ASIA"]);
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = CategoryRegistry::new(
            "countries",
            vec![
                CategoryDefinition::new("QATAR", "Qatar"),
                CategoryDefinition::new("QATAR", "Qatar again"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Config { .. }));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = CategoryRegistry::new(
            "amounts",
            vec![CategoryDefinition::new("bad", "Bad").with_range(500.0, Some(100.0))],
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Config { .. }));
    }
}
