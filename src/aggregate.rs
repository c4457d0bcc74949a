//! Folds raw facts into category, ward and ward-by-group totals.

use crate::error::{ProfileError, Result};
use crate::registry::CategoryRegistry;
use crate::types::{
    CategoryTotal, Fact, GroupTotal, Percentage, WardAggregate, WardTotal, OTHER_GROUP,
};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Aggregated view of one dimension's facts.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub dimension: String,
    /// Sorted by total, descending; ties keep first-encountered order.
    pub by_category: Vec<CategoryTotal>,
    /// Sorted by total, descending; ties go to the lower ward number.
    pub by_ward: Vec<WardTotal>,
    /// One entry per ward, ascending by ward number.
    pub by_ward_and_group: Vec<WardAggregate>,
    pub grand_total: u64,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn category(&self, code: &str) -> Option<&CategoryTotal> {
        self.by_category.iter().find(|c| c.code == code)
    }

    pub fn ward(&self, ward: u32) -> Option<&WardTotal> {
        self.by_ward.iter().find(|w| w.ward == ward)
    }

    pub fn ward_aggregate(&self, ward: u32) -> Option<&WardAggregate> {
        self.by_ward_and_group.iter().find(|w| w.ward == ward)
    }
}

/// Running per-code sums that remember the order codes were first seen.
#[derive(Default)]
struct OrderedSums {
    order: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl OrderedSums {
    /// `None` if the running sum for `code` would overflow.
    fn add(&mut self, code: &str, count: u64) -> Option<()> {
        match self.index.get(code) {
            Some(i) => {
                let sum = &mut self.order[*i].1;
                *sum = sum.checked_add(count)?;
            }
            None => {
                self.index.insert(code.to_string(), self.order.len());
                self.order.push((code.to_string(), count));
            }
        }
        Some(())
    }

    fn total(&self) -> Option<u64> {
        self.order.iter().try_fold(0u64, |acc, (_, v)| acc.checked_add(*v))
    }

    /// Descending by total. `sort_by_key` is stable, so equal totals keep
    /// their first-seen order.
    fn into_sorted(mut self) -> Vec<(String, u64)> {
        self.order.sort_by_key(|(_, v)| Reverse(*v));
        self.order
    }
}

fn category_totals(
    sums: OrderedSums,
    whole: u64,
    registry: &CategoryRegistry,
) -> Vec<CategoryTotal> {
    sums.into_sorted()
        .into_iter()
        .map(|(code, total)| {
            let def = registry.lookup(&code);
            CategoryTotal {
                label: def.label.clone(),
                group: def.group.clone(),
                code,
                total,
                percentage: Percentage::of(total, whole),
            }
        })
        .collect()
}

fn overflow(registry: &CategoryRegistry, code: &str) -> ProfileError {
    ProfileError::CountOverflow {
        dimension: registry.dimension().to_string(),
        code: code.to_string(),
    }
}

/// Aggregates `facts` against `registry`.
///
/// Duplicate `(ward, code)` facts are summed. Codes missing from the
/// registry are kept under their raw code and the `OTHER` group, so every
/// level always reconciles to `grand_total`.
///
/// # Errors
///
/// [`ProfileError::CountOverflow`] if a sum no longer fits in a `u64`.
pub fn aggregate(facts: &[Fact], registry: &CategoryRegistry) -> Result<Aggregation> {
    let mut overall = OrderedSums::default();
    let mut wards: BTreeMap<u32, OrderedSums> = BTreeMap::new();
    let mut unknown: HashSet<&str> = HashSet::new();

    for fact in facts {
        if !registry.contains(&fact.category_code) && unknown.insert(&fact.category_code) {
            log::warn!(
                "Unknown category code '{}' in dimension '{}'; counting it under {}",
                fact.category_code,
                registry.dimension(),
                OTHER_GROUP
            );
        }
        overall
            .add(&fact.category_code, fact.count)
            .and_then(|()| {
                wards
                    .entry(fact.ward_number)
                    .or_default()
                    .add(&fact.category_code, fact.count)
            })
            .ok_or_else(|| overflow(registry, &fact.category_code))?;
    }

    let grand_total = overall
        .total()
        .ok_or_else(|| overflow(registry, "(all categories)"))?;

    let mut groups: Vec<String> = registry.groups().into_iter().map(str::to_string).collect();
    if !unknown.is_empty() && !groups.iter().any(|g| g == OTHER_GROUP) {
        groups.push(OTHER_GROUP.to_string());
    }

    let by_ward_and_group: Vec<WardAggregate> = wards
        .into_iter()
        .map(|(ward, sums)| {
            // Bounded by grand_total, which already fit.
            let total = sums.total().unwrap_or(grand_total);
            let categories = category_totals(sums, total, registry);
            let groups = groups
                .iter()
                .map(|tag| {
                    let group_total: u64 = categories
                        .iter()
                        .filter(|c| c.group.as_deref() == Some(tag.as_str()))
                        .map(|c| c.total)
                        .sum();
                    GroupTotal {
                        group: tag.clone(),
                        total: group_total,
                        percentage: Percentage::of(group_total, total),
                    }
                })
                .collect();
            WardAggregate {
                ward,
                total,
                categories,
                groups,
            }
        })
        .collect();

    let mut by_ward: Vec<WardTotal> = by_ward_and_group
        .iter()
        .map(|w| WardTotal {
            ward: w.ward,
            total: w.total,
            percentage: Percentage::of(w.total, grand_total),
        })
        .collect();
    by_ward.sort_by_key(|w| Reverse(w.total));

    let by_category = category_totals(overall, grand_total, registry);

    log::debug!(
        "Aggregated {} facts for '{}': {} categories, {} wards, total {}",
        facts.len(),
        registry.dimension(),
        by_category.len(),
        by_ward.len(),
        grand_total
    );

    Ok(Aggregation {
        dimension: registry.dimension().to_string(),
        by_category,
        by_ward,
        by_ward_and_group,
        grand_total,
    })
}
