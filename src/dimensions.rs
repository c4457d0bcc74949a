//! Built-in dimensions, loaded from TOML definitions embedded at compile time.
//!
//! Each file in `dimensions/` declares one statistical dimension: its
//! category table and the weighted indices reported for it. Adding a
//! dimension means adding a TOML file and listing it below.

use crate::error::{ProfileError, Result};
use crate::indicators::{IndexBasis, WeightSet};
use crate::registry::CategoryRegistry;
use crate::types::CategoryDefinition;
use serde::Deserialize;

const DIMENSION_TOMLS: &[(&str, &str)] = &[
    (
        "foreign_employment_countries",
        include_str!("../dimensions/foreign_employment_countries.toml"),
    ),
    (
        "foreign_employment_skills",
        include_str!("../dimensions/foreign_employment_skills.toml"),
    ),
    (
        "household_facilities",
        include_str!("../dimensions/household_facilities.toml"),
    ),
    (
        "remittance_amounts",
        include_str!("../dimensions/remittance_amounts.toml"),
    ),
    (
        "house_roof_types",
        include_str!("../dimensions/house_roof_types.toml"),
    ),
    (
        "house_floor_types",
        include_str!("../dimensions/house_floor_types.toml"),
    ),
];

#[derive(Debug, Deserialize)]
struct DimensionToml {
    name: String,
    title: String,
    subject: String,
    #[serde(default)]
    per_capita_flow: bool,
    categories: Vec<CategoryDefinition>,
    #[serde(default)]
    indices: Vec<IndexToml>,
}

#[derive(Debug, Deserialize)]
struct IndexToml {
    name: String,
    /// Named weight set from `config`, instead of inline weights.
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    basis: Option<IndexBasis>,
    #[serde(default)]
    weights: Vec<WeightToml>,
}

#[derive(Debug, Deserialize)]
struct WeightToml {
    key: String,
    weight: f64,
}

/// One statistical dimension: what is counted, and how it is scored.
#[derive(Debug, Clone)]
pub struct DimensionDefinition {
    pub name: String,
    pub title: String,
    /// Singular noun used in narrative text, e.g. "roofing material".
    pub subject: String,
    /// Counts are people abroad, so reports estimate a remittance flow
    /// from the average amount per person.
    pub per_capita_flow: bool,
    pub registry: CategoryRegistry,
    pub indices: Vec<WeightSet>,
}

impl DimensionDefinition {
    /// True when the categories are numeric ranges that flows can be
    /// estimated from.
    pub fn is_bucketed(&self) -> bool {
        !self.registry.definitions().is_empty()
            && self
                .registry
                .definitions()
                .iter()
                .all(|d| d.range_min.is_some())
    }
}

fn config_error(dimension: &str, message: impl Into<String>) -> ProfileError {
    ProfileError::Config {
        message: format!("dimension '{}': {}", dimension, message.into()),
    }
}

fn build_index(raw: IndexToml, registry: &CategoryRegistry) -> Result<WeightSet> {
    let dimension = registry.dimension();
    let set = match raw.preset.as_deref() {
        Some("digital_access") => WeightSet::digital_access()?,
        Some(other) => {
            return Err(config_error(dimension, format!("unknown index preset '{other}'")));
        }
        None => {
            let basis = raw.basis.ok_or_else(|| {
                config_error(dimension, format!("index '{}' needs a basis", raw.name))
            })?;
            let weights = raw.weights.into_iter().map(|w| (w.key, w.weight)).collect();
            WeightSet::new(raw.name.as_str(), basis, weights)?
        }
    };

    let groups = registry.groups();
    for (key, _) in set.weights() {
        let known = match set.basis() {
            IndexBasis::Group => groups.contains(&key.as_str()),
            IndexBasis::Category => registry.contains(key),
        };
        if !known {
            return Err(config_error(
                dimension,
                format!("index '{}' weighs unknown key '{}'", set.name(), key),
            ));
        }
    }
    Ok(set)
}

/// Parses one dimension definition.
///
/// # Errors
///
/// [`ProfileError::Toml`] for malformed TOML, [`ProfileError::Config`] for
/// duplicate codes, bad ranges or indices over unknown keys, and
/// [`ProfileError::InvalidWeights`] for a weight set that does not sum to 1.
pub fn parse_dimension_toml(s: &str) -> Result<DimensionDefinition> {
    let raw: DimensionToml = toml::from_str(s)?;
    let registry = CategoryRegistry::new(raw.name.clone(), raw.categories)?;
    let indices = raw
        .indices
        .into_iter()
        .map(|i| build_index(i, &registry))
        .collect::<Result<Vec<_>>>()?;
    Ok(DimensionDefinition {
        name: raw.name,
        title: raw.title,
        subject: raw.subject,
        per_capita_flow: raw.per_capita_flow,
        registry,
        indices,
    })
}

/// Every built-in dimension, in declaration order.
pub fn all_dimensions() -> Result<Vec<DimensionDefinition>> {
    DIMENSION_TOMLS
        .iter()
        .map(|(name, toml)| {
            let def = parse_dimension_toml(toml)?;
            if def.name != *name {
                return Err(config_error(name, format!("file declares name '{}'", def.name)));
            }
            Ok(def)
        })
        .collect()
}

pub fn dimension_names() -> Vec<&'static str> {
    DIMENSION_TOMLS.iter().map(|(name, _)| *name).collect()
}

pub fn find_dimension(name: &str) -> Result<DimensionDefinition> {
    let (_, toml) = DIMENSION_TOMLS
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| ProfileError::UnknownDimension {
            name: name.to_string(),
        })?;
    parse_dimension_toml(toml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_all_dimensions() {
        let dims = all_dimensions().unwrap();
        assert_eq!(dims.len(), DIMENSION_TOMLS.len());
        for dim in &dims {
            assert!(!dim.registry.definitions().is_empty(), "{} is empty", dim.name);
        }
    }

    #[test]
    fn household_facilities_use_digital_access_preset() {
        let dim = find_dimension("household_facilities").unwrap();
        assert_eq!(dim.indices.len(), 1);
        assert_eq!(dim.indices[0], WeightSet::digital_access().unwrap());
        assert!(!dim.is_bucketed());
    }

    #[test]
    fn remittance_amounts_are_bucketed() {
        let dim = find_dimension("remittance_amounts").unwrap();
        assert!(dim.is_bucketed());
        let top = dim.registry.lookup("above_500k");
        assert!(top.is_open_ended());
        assert_eq!(top.range_min, Some(500_000.0));
    }

    #[test]
    fn only_destinations_estimate_per_capita_flow() {
        let flagged: Vec<String> = all_dimensions()
            .unwrap()
            .into_iter()
            .filter(|d| d.per_capita_flow)
            .map(|d| d.name)
            .collect();
        assert_eq!(flagged, vec!["foreign_employment_countries".to_string()]);
    }

    #[test]
    fn country_groups() {
        let dim = find_dimension("foreign_employment_countries").unwrap();
        assert_eq!(dim.registry.lookup("QATAR").group.as_deref(), Some("GULF"));
        assert!(dim.registry.groups().contains(&"WESTERN"));
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        let err = find_dimension("road_access").unwrap_err();
        assert!(matches!(err, ProfileError::UnknownDimension { .. }));
    }

    #[test]
    fn rejects_index_over_unknown_group() {
        let toml = r#"
name = "test"
title = "Test"
subject = "thing"

[[categories]]
code = "A"
label = "A"
group = "G1"

[[indices]]
name = "bad"
basis = "group"
weights = [{ key = "G2", weight = 1.0 }]
"#;
        let err = parse_dimension_toml(toml).unwrap_err();
        assert!(matches!(err, ProfileError::Config { .. }));
    }

    #[test]
    fn rejects_unbalanced_weights() {
        let toml = r#"
name = "test"
title = "Test"
subject = "thing"

[[categories]]
code = "A"
label = "A"
group = "G1"

[[indices]]
name = "bad"
basis = "group"
weights = [{ key = "G1", weight = 0.7 }]
"#;
        let err = parse_dimension_toml(toml).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidWeights { .. }));
    }
}
