use crate::config::MAX_FACT_COUNT;
use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// Group tag given to categories that are missing from a registry.
pub const OTHER_GROUP: &str = "OTHER";

/// One row of the fact CSV before validation.
#[derive(Debug, Deserialize)]
pub struct RawFactRow {
    #[serde(rename = "dimension")]
    pub dimension: Option<String>,
    #[serde(rename = "ward_number")]
    pub ward_number: Option<String>,
    #[serde(rename = "category_code")]
    pub category_code: Option<String>,
    #[serde(rename = "count")]
    pub count: Option<String>,
}

/// A single observation: `count` people or households in `ward_number`
/// fall into `category_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub ward_number: u32,
    pub category_code: String,
    pub count: u64,
}

impl Fact {
    /// Builds a fact, rejecting non-positive wards and counts that are
    /// negative or above [`MAX_FACT_COUNT`].
    pub fn new(ward_number: i64, category_code: impl Into<String>, count: i64) -> Result<Self> {
        let category_code = category_code.into();
        let ward = u32::try_from(ward_number)
            .ok()
            .filter(|w| *w > 0)
            .ok_or_else(|| ProfileError::InvalidWard {
                raw: ward_number.to_string(),
            })?;
        let count = u64::try_from(count)
            .ok()
            .filter(|c| *c <= MAX_FACT_COUNT)
            .ok_or_else(|| ProfileError::InvalidCount {
                ward: ward.to_string(),
                code: category_code.clone(),
                raw: count.to_string(),
            })?;
        Ok(Self {
            ward_number: ward,
            category_code,
            count,
        })
    }
}

/// Registry entry describing one category code of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub code: String,
    pub label: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub range_min: Option<f64>,
    #[serde(default)]
    pub range_max: Option<f64>,
}

impl CategoryDefinition {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            group: None,
            range_min: None,
            range_max: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_range(mut self, min: f64, max: Option<f64>) -> Self {
        self.range_min = Some(min);
        self.range_max = max;
        self
    }

    /// Stand-in for a code the registry does not know: labelled with the
    /// raw code and rolled up into [`OTHER_GROUP`].
    pub fn synthetic(code: &str) -> Self {
        Self::new(code, code).with_group(OTHER_GROUP)
    }

    pub fn is_open_ended(&self) -> bool {
        self.range_min.is_some() && self.range_max.is_none()
    }
}

/// A share of a whole, in percent.
///
/// The raw value feeds further arithmetic; [`Percentage::display`] gives the
/// two-decimal string used in tables.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Self = Self(0.0);

    /// `part / whole * 100`, or zero when `whole` is zero.
    pub fn of(part: u64, whole: u64) -> Self {
        if whole == 0 {
            return Self::ZERO;
        }
        Self(part as f64 / whole as f64 * 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn display(self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Municipality-wide (or ward-scoped) total for one category code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub code: String,
    pub label: String,
    pub group: Option<String>,
    pub total: u64,
    pub percentage: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WardTotal {
    pub ward: u32,
    pub total: u64,
    pub percentage: Percentage,
}

/// Roll-up of one group tag inside a ward, relative to that ward's total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub group: String,
    pub total: u64,
    pub percentage: Percentage,
}

/// Everything known about one ward within a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WardAggregate {
    pub ward: u32,
    pub total: u64,
    pub categories: Vec<CategoryTotal>,
    pub groups: Vec<GroupTotal>,
}

impl WardAggregate {
    pub fn group(&self, tag: &str) -> Option<&GroupTotal> {
        self.groups.iter().find(|g| g.group == tag)
    }

    pub fn category(&self, code: &str) -> Option<&CategoryTotal> {
        self.categories.iter().find(|c| c.code == code)
    }

    /// Share of a group in this ward; zero when the group is absent.
    pub fn group_percentage(&self, tag: &str) -> Percentage {
        self.group(tag).map_or(Percentage::ZERO, |g| g.percentage)
    }

    pub fn category_percentage(&self, code: &str) -> Percentage {
        self.category(code).map_or(Percentage::ZERO, |c| c.percentage)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: String,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage")]
    pub percentage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WardBreakdownRow {
    #[serde(rename = "Ward")]
    #[tabled(rename = "Ward")]
    pub ward: u32,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
    #[serde(rename = "ShareOfMunicipality")]
    #[tabled(rename = "ShareOfMunicipality")]
    pub share: String,
    #[serde(rename = "TopCategory")]
    #[tabled(rename = "TopCategory")]
    pub top_category: String,
    #[serde(rename = "GroupShares")]
    #[tabled(rename = "GroupShares")]
    pub group_shares: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IndexRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Ward")]
    #[tabled(rename = "Ward")]
    pub ward: u32,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "Components")]
    #[tabled(rename = "Components")]
    pub components: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WardFlowRow {
    #[serde(rename = "Ward")]
    #[tabled(rename = "Ward")]
    pub ward: u32,
    #[serde(rename = "Households")]
    #[tabled(rename = "Households")]
    pub households: String,
    #[serde(rename = "EstimatedFlow")]
    #[tabled(rename = "EstimatedFlow")]
    pub estimated_flow: String,
    #[serde(rename = "PerHousehold")]
    #[tabled(rename = "PerHousehold")]
    pub per_household: String,
}

/// Highest and lowest ward for a derived index.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IndexExtremes {
    pub index: String,
    pub highest_ward: u32,
    pub highest_score: f64,
    pub lowest_ward: u32,
    pub lowest_score: f64,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub dimension: String,
    pub title: String,
    pub grand_total: u64,
    pub total_wards: usize,
    pub total_categories: usize,
    pub top_category: Option<String>,
    pub top_category_percentage: f64,
    pub estimated_flow: Option<f64>,
    /// Count in buckets left out of `estimated_flow` for lack of a range.
    pub unranged_count: u64,
    pub per_capita_flow: Option<f64>,
    pub indices: Vec<IndexExtremes>,
    pub narrative: Vec<String>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
