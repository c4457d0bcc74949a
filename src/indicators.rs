//! Derived indicators: weighted indices, estimated flows and superlatives.
//!
//! Everything here is a pure function of an [`Aggregation`]. Weight sets
//! and representative-value policies are passed in by the caller, so the
//! same code serves every dimension.

use crate::aggregate::Aggregation;
use crate::config::{DIGITAL_ACCESS_WEIGHTS, OPEN_BUCKET_MARKUP, WEIGHT_TOLERANCE};
use crate::error::{ProfileError, Result};
use crate::registry::CategoryRegistry;
use crate::types::{CategoryDefinition, CategoryTotal, Percentage, WardAggregate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which ward shares an index weighs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBasis {
    /// Group-tag shares of the ward total.
    Group,
    /// Individual category shares of the ward total.
    Category,
}

/// A validated set of weights whose sum is 1.0 within [`WEIGHT_TOLERANCE`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSet {
    name: String,
    basis: IndexBasis,
    weights: Vec<(String, f64)>,
}

impl WeightSet {
    /// # Errors
    ///
    /// [`ProfileError::InvalidWeights`] for an empty set, a repeated key, a
    /// negative or non-finite weight, or a sum away from 1.0. Weights are
    /// never renormalized.
    pub fn new(
        name: impl Into<String>,
        basis: IndexBasis,
        weights: Vec<(String, f64)>,
    ) -> Result<Self> {
        let name = name.into();
        let sum: f64 = weights.iter().map(|(_, w)| *w).sum();
        let invalid = |message: String| ProfileError::InvalidWeights {
            index: name.clone(),
            sum,
            message,
        };

        if weights.is_empty() {
            return Err(invalid("no weights given".to_string()));
        }
        for (i, (key, w)) in weights.iter().enumerate() {
            if !w.is_finite() || *w < 0.0 {
                return Err(invalid(format!("weight for '{key}' is {w}")));
            }
            if weights[..i].iter().any(|(k, _)| k == key) {
                return Err(invalid(format!("'{key}' is weighted twice")));
            }
        }
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(invalid("weights must sum to 1.0".to_string()));
        }

        Ok(Self {
            name,
            basis,
            weights,
        })
    }

    pub fn from_pairs(name: &str, basis: IndexBasis, pairs: &[(&str, f64)]) -> Result<Self> {
        Self::new(
            name,
            basis,
            pairs.iter().map(|(k, w)| ((*k).to_string(), *w)).collect(),
        )
    }

    /// Internet 0.4, computer 0.3, mobile phone 0.2, television 0.1.
    pub fn digital_access() -> Result<Self> {
        Self::from_pairs("digital_access", IndexBasis::Category, DIGITAL_ACCESS_WEIGHTS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basis(&self) -> IndexBasis {
        self.basis
    }

    pub fn weights(&self) -> &[(String, f64)] {
        &self.weights
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexComponent {
    pub key: String,
    pub weight: f64,
    pub percentage: Percentage,
    pub contribution: f64,
}

/// A ward's score on one weighted index, with the shares that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedIndex {
    pub ward: u32,
    pub index: String,
    pub score: f64,
    pub components: Vec<IndexComponent>,
}

/// Weighted sum of the ward's shares named by `weights`.
///
/// A key absent from the ward contributes a share of zero.
pub fn compute_index(ward: &WardAggregate, weights: &WeightSet) -> DerivedIndex {
    let components: Vec<IndexComponent> = weights
        .weights
        .iter()
        .map(|(key, weight)| {
            let percentage = match weights.basis {
                IndexBasis::Group => ward.group_percentage(key),
                IndexBasis::Category => ward.category_percentage(key),
            };
            IndexComponent {
                key: key.clone(),
                weight: *weight,
                percentage,
                contribution: percentage.value() * weight,
            }
        })
        .collect();
    let score: f64 = components.iter().map(|c| c.contribution).sum();
    DerivedIndex {
        ward: ward.ward,
        index: weights.name.clone(),
        score,
        components,
    }
}

/// [`compute_index`] for every ward, ascending by ward number.
pub fn compute_indices(aggregation: &Aggregation, weights: &WeightSet) -> Vec<DerivedIndex> {
    aggregation
        .by_ward_and_group
        .iter()
        .map(|w| compute_index(w, weights))
        .collect()
}

/// Midpoint of a closed bucket, or `range_min * OPEN_BUCKET_MARKUP` for an
/// open-ended top bucket. `None` when the category has no range.
pub fn standard_representative(def: &CategoryDefinition) -> Option<f64> {
    match (def.range_min, def.range_max) {
        (Some(min), Some(max)) => Some((min + max) / 2.0),
        (Some(min), None) => Some(min * OPEN_BUCKET_MARKUP),
        _ => None,
    }
}

fn estimate_over<F>(totals: &[CategoryTotal], registry: &CategoryRegistry, representative: F) -> Result<f64>
where
    F: Fn(&CategoryDefinition) -> Option<f64>,
{
    totals.iter().try_fold(0.0, |acc: f64, total| -> Result<f64> {
        let def = registry.lookup(&total.code);
        let amount = representative(&def).ok_or_else(|| ProfileError::UnrangedBucket {
            code: total.code.clone(),
        })?;
        Ok(acc + total.total as f64 * amount)
    })
}

/// Sum over the ward's buckets of `count * representative(bucket)`.
///
/// # Errors
///
/// [`ProfileError::UnrangedBucket`] if `representative` has no value for a
/// bucket present in the ward.
pub fn estimate_flow<F>(ward: &WardAggregate, registry: &CategoryRegistry, representative: F) -> Result<f64>
where
    F: Fn(&CategoryDefinition) -> Option<f64>,
{
    estimate_over(&ward.categories, registry, representative)
}

/// Municipality-wide version of [`estimate_flow`].
pub fn estimate_total_flow<F>(
    aggregation: &Aggregation,
    registry: &CategoryRegistry,
    representative: F,
) -> Result<f64>
where
    F: Fn(&CategoryDefinition) -> Option<f64>,
{
    estimate_over(&aggregation.by_category, registry, representative)
}

/// A flow over the buckets that have a representative amount. Counts in
/// buckets without one are kept aside instead of failing the estimate.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlowEstimate {
    pub flow: f64,
    /// Count that contributed nothing to `flow`.
    pub unranged: u64,
    /// Codes of those buckets, in the order of `totals`.
    pub unranged_codes: Vec<String>,
}

impl FlowEstimate {
    pub fn is_complete(&self) -> bool {
        self.unranged_codes.is_empty()
    }
}

/// Like [`estimate_flow`], but skips buckets `representative` has no value
/// for and reports them in the result.
pub fn estimate_ranged_flow<F>(
    totals: &[CategoryTotal],
    registry: &CategoryRegistry,
    representative: F,
) -> FlowEstimate
where
    F: Fn(&CategoryDefinition) -> Option<f64>,
{
    let mut estimate = FlowEstimate::default();
    for total in totals {
        match representative(&registry.lookup(&total.code)) {
            Some(amount) => estimate.flow += total.total as f64 * amount,
            None => {
                estimate.unranged += total.total;
                estimate.unranged_codes.push(total.code.clone());
            }
        }
    }
    estimate
}

/// Population times an assumed average amount per person.
pub fn estimate_per_capita_flow(population: u64, average_per_person: f64) -> f64 {
    population as f64 * average_per_person
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Highest,
    Lowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Superlative {
    pub ward: u32,
    pub value: f64,
}

/// Ward with the highest or lowest value; ties go to the lowest ward number.
///
/// `selector` maps an item to `(ward, value)`. Returns `None` for no items.
pub fn find_superlative<T, F>(items: &[T], extreme: Extreme, selector: F) -> Option<Superlative>
where
    F: Fn(&T) -> (u32, f64),
{
    items.iter().map(selector).fold(None, |best, (ward, value)| {
        let Some(current) = best else {
            return Some(Superlative { ward, value });
        };
        let ordering = match extreme {
            Extreme::Highest => value.total_cmp(&current.value),
            Extreme::Lowest => current.value.total_cmp(&value),
        };
        match ordering {
            Ordering::Greater => Some(Superlative { ward, value }),
            Ordering::Equal if ward < current.ward => Some(Superlative { ward, value }),
            _ => Some(current),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::types::{Fact, GroupTotal};
    use crate::util::approx_eq;

    fn facilities() -> CategoryRegistry {
        CategoryRegistry::new(
            "household_facilities",
            vec![
                CategoryDefinition::new("INTERNET", "Internet").with_group("DIGITAL"),
                CategoryDefinition::new("COMPUTER", "Computer").with_group("DIGITAL"),
                CategoryDefinition::new("MOBILE_PHONE", "Mobile phone").with_group("DIGITAL"),
                CategoryDefinition::new("TELEVISION", "Television").with_group("MEDIA"),
            ],
        )
        .unwrap()
    }

    fn amounts() -> CategoryRegistry {
        CategoryRegistry::new(
            "remittance_amounts",
            vec![
                CategoryDefinition::new("200k_to_500k", "NPR 200k - 500k")
                    .with_range(200_000.0, Some(499_999.0)),
                CategoryDefinition::new("above_500k", "Above NPR 500k").with_range(500_000.0, None),
            ],
        )
        .unwrap()
    }

    #[test]
    fn equal_shares_give_that_share() {
        let weights = WeightSet::from_pairs(
            "equal",
            IndexBasis::Group,
            &[("a", 0.4), ("b", 0.3), ("c", 0.2), ("d", 0.1)],
        )
        .unwrap();
        let ward = WardAggregate {
            ward: 1,
            total: 200,
            categories: Vec::new(),
            groups: ["a", "b", "c", "d"]
                .iter()
                .map(|g| GroupTotal {
                    group: (*g).to_string(),
                    total: 100,
                    percentage: Percentage::of(100, 200),
                })
                .collect(),
        };
        let index = compute_index(&ward, &weights);
        assert!(approx_eq(index.score, 50.0, 1e-9));
        assert_eq!(index.components.len(), 4);
        assert!(approx_eq(index.components[0].contribution, 20.0, 1e-9));
    }

    #[test]
    fn digital_access_weights_by_category() {
        let facts = vec![
            Fact::new(2, "INTERNET", 50).unwrap(),
            Fact::new(2, "MOBILE_PHONE", 50).unwrap(),
        ];
        let agg = aggregate(&facts, &facilities()).unwrap();
        let index = compute_index(agg.ward_aggregate(2).unwrap(), &WeightSet::digital_access().unwrap());
        // 0.4 * 50 + 0.2 * 50
        assert!(approx_eq(index.score, 30.0, 1e-9));
        let computer = index.components.iter().find(|c| c.key == "COMPUTER").unwrap();
        assert_eq!(computer.percentage.value(), 0.0);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = WeightSet::from_pairs("bad", IndexBasis::Group, &[("a", 0.5), ("b", 0.4)])
            .unwrap_err();
        assert!(matches!(err, ProfileError::InvalidWeights { .. }));
    }

    #[test]
    fn rejects_negative_duplicate_and_empty_weights() {
        assert!(WeightSet::from_pairs("neg", IndexBasis::Group, &[("a", 1.5), ("b", -0.5)]).is_err());
        assert!(WeightSet::from_pairs("dup", IndexBasis::Group, &[("a", 0.5), ("a", 0.5)]).is_err());
        assert!(WeightSet::from_pairs("none", IndexBasis::Group, &[]).is_err());
    }

    #[test]
    fn closed_bucket_uses_midpoint() {
        let reg = amounts();
        let facts = vec![Fact::new(1, "200k_to_500k", 10).unwrap()];
        let agg = aggregate(&facts, &reg).unwrap();
        let def = reg.lookup("200k_to_500k");
        assert_eq!(standard_representative(&def), Some(349_999.5));
        let flow = estimate_flow(agg.ward_aggregate(1).unwrap(), &reg, standard_representative).unwrap();
        assert!(approx_eq(flow, 3_499_995.0, 1e-6));
    }

    #[test]
    fn open_bucket_uses_markup() {
        let reg = amounts();
        let facts = vec![Fact::new(1, "above_500k", 4).unwrap()];
        let agg = aggregate(&facts, &reg).unwrap();
        assert_eq!(standard_representative(&reg.lookup("above_500k")), Some(600_000.0));
        let flow = estimate_total_flow(&agg, &reg, standard_representative).unwrap();
        assert!(approx_eq(flow, 2_400_000.0, 1e-6));
    }

    #[test]
    fn unranged_bucket_fails() {
        let reg = amounts();
        let facts = vec![Fact::new(1, "MYSTERY", 4).unwrap()];
        let agg = aggregate(&facts, &reg).unwrap();
        let err = estimate_total_flow(&agg, &reg, standard_representative).unwrap_err();
        assert!(matches!(err, ProfileError::UnrangedBucket { code } if code == "MYSTERY"));
    }

    #[test]
    fn ranged_flow_sets_unranged_buckets_aside() {
        let reg = amounts();
        let facts = vec![
            Fact::new(1, "200k_to_500k", 10).unwrap(),
            Fact::new(1, "MYSTERY", 3).unwrap(),
        ];
        let agg = aggregate(&facts, &reg).unwrap();
        let estimate = estimate_ranged_flow(&agg.by_category, &reg, standard_representative);
        assert!(approx_eq(estimate.flow, 3_499_995.0, 1e-6));
        assert_eq!(estimate.unranged, 3);
        assert_eq!(estimate.unranged_codes, vec!["MYSTERY".to_string()]);
        assert!(!estimate.is_complete());
    }

    #[test]
    fn per_capita_flow() {
        assert_eq!(estimate_per_capita_flow(3, 500_000.0), 1_500_000.0);
    }

    #[test]
    fn superlative_ties_go_to_lowest_ward() {
        let items = vec![(7u32, 12.0), (3, 12.0), (5, 4.0)];
        let best = find_superlative(&items, Extreme::Highest, |(w, v)| (*w, *v)).unwrap();
        assert_eq!(best, Superlative { ward: 3, value: 12.0 });
        let worst = find_superlative(&items, Extreme::Lowest, |(w, v)| (*w, *v)).unwrap();
        assert_eq!(worst.ward, 5);
    }

    #[test]
    fn superlative_of_nothing_is_none() {
        let items: Vec<(u32, f64)> = Vec::new();
        assert!(find_superlative(&items, Extreme::Highest, |(w, v)| (*w, *v)).is_none());
    }
}
