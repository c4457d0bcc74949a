//! Report assembly: rankings, top-N with an "All others" residual, display
//! tables and narrative sentences built from an [`Aggregation`].

use crate::aggregate::{aggregate, Aggregation};
use crate::config::AVERAGE_REMITTANCE_PER_PERSON;
use crate::dimensions::DimensionDefinition;
use crate::error::Result;
use crate::indicators::{
    compute_indices, estimate_per_capita_flow, estimate_ranged_flow, find_superlative,
    standard_representative, DerivedIndex, Extreme,
};
use crate::registry::CategoryRegistry;
use crate::types::{
    Fact, IndexExtremes, IndexRow, Percentage, ProfileSummary, RankingRow, WardBreakdownRow,
    WardFlowRow,
};
use crate::util::{format_int, format_number};
use serde::Serialize;
use std::cmp::Ordering;

/// Code and label of the residual top-N row. Distinct from any registry
/// code, since some dimensions declare a real `OTHER` category.
pub const OTHER_CODE: &str = "__REST__";
pub const OTHER_LABEL: &str = "All others";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based.
    pub rank: usize,
    pub code: String,
    pub label: String,
    pub value: u64,
    pub percentage: Percentage,
}

/// Categories in rank order. Iterating borrows, so it can be walked any
/// number of times.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    entries: Vec<RankedEntry>,
    grand_total: u64,
}

impl Ranking {
    pub fn iter(&self) -> std::slice::Iter<'_, RankedEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }

    pub fn grand_total(&self) -> u64 {
        self.grand_total
    }
}

impl<'a> IntoIterator for &'a Ranking {
    type Item = &'a RankedEntry;
    type IntoIter = std::slice::Iter<'a, RankedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub fn build_ranking(aggregation: &Aggregation) -> Ranking {
    let entries = aggregation
        .by_category
        .iter()
        .enumerate()
        .map(|(i, c)| RankedEntry {
            rank: i + 1,
            code: c.code.clone(),
            label: c.label.clone(),
            value: c.total,
            percentage: c.percentage,
        })
        .collect();
    Ranking {
        entries,
        grand_total: aggregation.grand_total,
    }
}

/// The first `n` entries of a ranking plus an "All others" row for the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct TopN {
    pub entries: Vec<RankedEntry>,
    /// Present only when entries exist beyond rank `n`.
    pub other: Option<RankedEntry>,
    pub grand_total: u64,
}

impl TopN {
    pub fn other_value(&self) -> u64 {
        self.other.as_ref().map_or(0, |o| o.value)
    }

    /// Shown entries followed by the residual row, if any.
    pub fn rows(&self) -> impl Iterator<Item = &RankedEntry> {
        self.entries.iter().chain(self.other.iter())
    }
}

/// Keeps the top `n` and folds the remainder into [`OTHER_LABEL`].
///
/// The residual value is `grand_total - sum(top n)`, so the displayed rows
/// always add up to the grand total.
pub fn top_n(ranking: &Ranking, n: usize) -> TopN {
    let entries: Vec<RankedEntry> = ranking.iter().take(n).cloned().collect();
    let other = (ranking.len() > n).then(|| {
        let shown: u64 = entries.iter().map(|e| e.value).sum();
        let value = ranking.grand_total.saturating_sub(shown);
        RankedEntry {
            rank: entries.len() + 1,
            code: OTHER_CODE.to_string(),
            label: OTHER_LABEL.to_string(),
            value,
            percentage: Percentage::of(value, ranking.grand_total),
        }
    });
    TopN {
        entries,
        other,
        grand_total: ranking.grand_total,
    }
}

pub fn ranking_rows(top: &TopN) -> Vec<RankingRow> {
    top.rows()
        .map(|e| RankingRow {
            rank: e.rank,
            category: e.label.clone(),
            count: format_int(e.value),
            percentage: e.percentage.display(),
        })
        .collect()
}

/// One row per ward, largest ward first.
pub fn ward_breakdown_rows(aggregation: &Aggregation) -> Vec<WardBreakdownRow> {
    aggregation
        .by_ward
        .iter()
        .filter_map(|w| {
            let ward = aggregation.ward_aggregate(w.ward)?;
            let top_category = ward
                .categories
                .first()
                .map(|c| format!("{} ({}%)", c.label, c.percentage))
                .unwrap_or_else(|| "-".to_string());
            let group_shares = ward
                .groups
                .iter()
                .filter(|g| g.total > 0)
                .map(|g| format!("{} {}%", g.group, g.percentage))
                .collect::<Vec<_>>()
                .join(", ");
            Some(WardBreakdownRow {
                ward: w.ward,
                total: format_int(w.total),
                share: w.percentage.display(),
                top_category,
                group_shares,
            })
        })
        .collect()
}

/// Highest score first; equal scores go to the lower ward.
pub fn rank_indices(indices: &[DerivedIndex]) -> Vec<&DerivedIndex> {
    let mut ranked: Vec<&DerivedIndex> = indices.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ward.cmp(&b.ward))
    });
    ranked
}

pub fn index_rows(indices: &[DerivedIndex]) -> Vec<IndexRow> {
    rank_indices(indices)
        .into_iter()
        .enumerate()
        .map(|(i, idx)| IndexRow {
            rank: i + 1,
            ward: idx.ward,
            score: format_number(idx.score, 2),
            components: idx
                .components
                .iter()
                .map(|c| format!("{} {}% x {}", c.key, c.percentage, c.weight))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

pub fn index_extremes(indices: &[DerivedIndex]) -> Option<IndexExtremes> {
    let first = indices.first()?;
    let selector = |d: &DerivedIndex| (d.ward, d.score);
    let highest = find_superlative(indices, Extreme::Highest, selector)?;
    let lowest = find_superlative(indices, Extreme::Lowest, selector)?;
    Some(IndexExtremes {
        index: first.index.clone(),
        highest_ward: highest.ward,
        highest_score: highest.value,
        lowest_ward: lowest.ward,
        lowest_score: lowest.value,
    })
}

/// Estimated flow per ward using the midpoint / open-bucket markup rule,
/// ascending by ward number. Households in unranged buckets count towards
/// `households` but not towards the per-household average.
pub fn ward_flow_rows(aggregation: &Aggregation, registry: &CategoryRegistry) -> Vec<WardFlowRow> {
    aggregation
        .by_ward_and_group
        .iter()
        .map(|ward| {
            let estimate = estimate_ranged_flow(&ward.categories, registry, standard_representative);
            let ranged = ward.total - estimate.unranged;
            let per_household = if ranged == 0 {
                0.0
            } else {
                estimate.flow / ranged as f64
            };
            WardFlowRow {
                ward: ward.ward,
                households: format_int(ward.total),
                estimated_flow: format_number(estimate.flow, 0),
                per_household: format_number(per_household, 0),
            }
        })
        .collect()
}

fn humanize(name: &str) -> String {
    name.replace('_', " ")
}

/// "Qatar is the most common foreign employment destination, with 130 of 180 (72.22%)."
pub fn top_category_sentence(ranking: &Ranking, subject: &str) -> Option<String> {
    let top = ranking.first()?;
    Some(format!(
        "{} is the most common {}, with {} of {} ({}%).",
        top.label,
        subject,
        format_int(top.value),
        format_int(ranking.grand_total),
        top.percentage
    ))
}

pub fn top_n_sentence(top: &TopN) -> Option<String> {
    let other = top.other.as_ref()?;
    let shown = top.grand_total - other.value;
    Some(format!(
        "The top {} categories account for {} ({}%); the remaining {} ({}%) are grouped as \"{}\".",
        top.entries.len(),
        format_int(shown),
        Percentage::of(shown, top.grand_total),
        format_int(other.value),
        other.percentage,
        OTHER_LABEL
    ))
}

pub fn dominant_ward_sentence(aggregation: &Aggregation, subject: &str) -> Option<String> {
    let ward = aggregation.by_ward.first()?;
    Some(format!(
        "Ward {} reports the most by {}, with {} ({}% of the municipality).",
        ward.ward,
        subject,
        format_int(ward.total),
        ward.percentage
    ))
}

pub fn index_sentence(extremes: &IndexExtremes) -> String {
    format!(
        "On the {} index, ward {} scores highest ({}) and ward {} lowest ({}).",
        humanize(&extremes.index),
        extremes.highest_ward,
        format_number(extremes.highest_score, 2),
        extremes.lowest_ward,
        format_number(extremes.lowest_score, 2)
    )
}

pub fn flow_sentence(flow: f64, households: u64) -> String {
    format!(
        "An estimated NPR {} flows to {} households each year.",
        format_number(flow, 0),
        format_int(households)
    )
}

pub fn unranged_sentence(count: u64) -> String {
    format!(
        "{} households report an amount outside the known ranges and are left out of the estimate.",
        format_int(count)
    )
}

/// "At an assumed NPR 500,000 each, the 180 people abroad remit an estimated NPR 90,000,000 a year."
pub fn per_capita_sentence(flow: f64, people: u64) -> String {
    format!(
        "At an assumed NPR {} each, the {} people abroad remit an estimated NPR {} a year.",
        format_number(AVERAGE_REMITTANCE_PER_PERSON, 0),
        format_int(people),
        format_number(flow, 0)
    )
}

/// Everything the presentation layer needs for one dimension.
#[derive(Debug, Clone)]
pub struct DimensionReport {
    pub aggregation: Aggregation,
    pub ranking: Ranking,
    pub top: TopN,
    /// One list per weight set of the dimension, ascending by ward.
    pub indices: Vec<Vec<DerivedIndex>>,
    /// Over ranged buckets only, for bucketed dimensions.
    pub estimated_flow: Option<f64>,
    /// Count in buckets that had no range to estimate from.
    pub unranged_count: u64,
    /// People abroad times the average remittance, for dimensions that
    /// count people abroad.
    pub per_capita_flow: Option<f64>,
    pub narrative: Vec<String>,
}

impl DimensionReport {
    pub fn extremes(&self) -> Vec<IndexExtremes> {
        self.indices.iter().filter_map(|i| index_extremes(i)).collect()
    }
}

/// Runs the full pipeline for one dimension.
///
/// A bucketed dimension with codes outside its registry still gets a full
/// report; those counts are left out of the flow and reported separately.
///
/// # Errors
///
/// Propagates [`crate::error::ProfileError::CountOverflow`] from
/// aggregation.
pub fn build_report(dimension: &DimensionDefinition, facts: &[Fact], n: usize) -> Result<DimensionReport> {
    let aggregation = aggregate(facts, &dimension.registry)?;
    let ranking = build_ranking(&aggregation);
    let top = top_n(&ranking, n);
    let indices: Vec<Vec<DerivedIndex>> = dimension
        .indices
        .iter()
        .map(|w| compute_indices(&aggregation, w))
        .collect();
    let flow = dimension.is_bucketed().then(|| {
        estimate_ranged_flow(&aggregation.by_category, &dimension.registry, standard_representative)
    });
    if let Some(flow) = flow.as_ref().filter(|f| !f.is_complete()) {
        log::warn!(
            "No range for {} in '{}'; {} households left out of the flow estimate",
            flow.unranged_codes.join(", "),
            dimension.name,
            flow.unranged
        );
    }
    let estimated_flow = flow.as_ref().map(|f| f.flow);
    let unranged_count = flow.as_ref().map_or(0, |f| f.unranged);
    let per_capita_flow = dimension
        .per_capita_flow
        .then(|| estimate_per_capita_flow(aggregation.grand_total, AVERAGE_REMITTANCE_PER_PERSON));

    let mut narrative = Vec::new();
    narrative.extend(top_category_sentence(&ranking, &dimension.subject));
    narrative.extend(top_n_sentence(&top));
    narrative.extend(dominant_ward_sentence(&aggregation, &dimension.subject));
    for list in &indices {
        narrative.extend(index_extremes(list).as_ref().map(index_sentence));
    }
    if let Some(flow) = estimated_flow {
        narrative.push(flow_sentence(flow, aggregation.grand_total - unranged_count));
    }
    if unranged_count > 0 {
        narrative.push(unranged_sentence(unranged_count));
    }
    if let Some(flow) = per_capita_flow.filter(|_| aggregation.grand_total > 0) {
        narrative.push(per_capita_sentence(flow, aggregation.grand_total));
    }

    Ok(DimensionReport {
        aggregation,
        ranking,
        top,
        indices,
        estimated_flow,
        unranged_count,
        per_capita_flow,
        narrative,
    })
}

pub fn generate_summary(dimension: &DimensionDefinition, report: &DimensionReport) -> ProfileSummary {
    let top = report.ranking.first();
    ProfileSummary {
        dimension: dimension.name.clone(),
        title: dimension.title.clone(),
        grand_total: report.aggregation.grand_total,
        total_wards: report.aggregation.by_ward.len(),
        total_categories: report.aggregation.by_category.len(),
        top_category: top.map(|t| t.label.clone()),
        top_category_percentage: top.map_or(0.0, |t| t.percentage.value()),
        estimated_flow: report.estimated_flow,
        unranged_count: report.unranged_count,
        per_capita_flow: report.per_capita_flow,
        indices: report.extremes(),
        narrative: report.narrative.clone(),
        generated_at: chrono::Utc::now(),
    }
}
