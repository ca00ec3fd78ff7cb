use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AudienceError, AudienceResult};

/// Grouping value used for any absent or empty attribute.
pub const UNKNOWN_VALUE: &str = "Unknown";

/// Match value that targets clients whose attribute is missing.
pub const MISSING_SENTINEL: &str = "__MISSING__";

/// Attribute name of the birth date, the only field with date semantics.
pub const BIRTH_DATE_FIELD: &str = "birthDate";

// ─── Population ─────────────────────────────────────────────────────────────

/// Decrypted client record as handed over by the population store.
/// Every attribute is optional; normalization happens in the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRecord {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub preferences: Option<Vec<String>>,
    pub gender: Option<String>,
    pub country: Option<String>,
    pub languages: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub subscriptions: Option<Vec<String>>,
    pub preferred_contact_method: Option<String>,
    pub telegram_confirmed: Option<bool>,
}

/// Messaging channels a client can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    Email,
    Telegram,
}

impl Subscription {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Email => "email",
            Subscription::Telegram => "telegram",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "email" => Some(Subscription::Email),
            "telegram" => Some(Subscription::Telegram),
            _ => None,
        }
    }
}

// ─── Request ────────────────────────────────────────────────────────────────

/// `match` accepts either a single string or a list on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MatchInput {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterInput {
    pub field: String,
    #[serde(default, rename = "match")]
    pub match_values: Option<MatchInput>,
    #[serde(default)]
    pub current_month: Option<bool>,
    /// ISO date (`YYYY-MM-DD` or RFC 3339), birthDate only.
    #[serde(default)]
    pub min: Option<String>,
    /// ISO date (`YYYY-MM-DD` or RFC 3339), birthDate only.
    #[serde(default)]
    pub max: Option<String>,
}

/// Body of a segmentation strategy request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationRequest {
    #[serde(default)]
    pub filters: Option<Vec<FilterInput>>,
    #[serde(default)]
    pub max_criteria_used: Option<usize>,
    #[serde(default)]
    pub min_group_size: Option<usize>,
}

/// What a filter wants the attribute values to look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSpec {
    /// No value constraint on this field.
    Any,
    /// Attribute must be absent or empty.
    Missing,
    /// Attribute must contain at least one of these values.
    Values(Vec<String>),
}

/// Validated filter. Internal constraints are ANDed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: String,
    pub matcher: MatchSpec,
    pub current_month: bool,
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
}

impl FilterSpec {
    pub fn is_birth_date(&self) -> bool {
        self.field == BIRTH_DATE_FIELD
    }
}

impl TryFrom<FilterInput> for FilterSpec {
    type Error = AudienceError;

    fn try_from(input: FilterInput) -> AudienceResult<Self> {
        let field = input.field.trim().to_string();
        if field.is_empty() {
            return Err(AudienceError::Validation(
                "filter 'field' must not be empty".to_string(),
            ));
        }

        let matcher = match input.match_values {
            None => MatchSpec::Any,
            Some(MatchInput::One(value)) if value == MISSING_SENTINEL => MatchSpec::Missing,
            Some(MatchInput::One(value)) => MatchSpec::Values(vec![value]),
            Some(MatchInput::Many(values)) if values.is_empty() => MatchSpec::Any,
            Some(MatchInput::Many(values))
                if values.len() == 1 && values[0] == MISSING_SENTINEL =>
            {
                MatchSpec::Missing
            }
            Some(MatchInput::Many(values)) => MatchSpec::Values(values),
        };

        let min = input.min.as_deref().map(|raw| parse_filter_date("min", raw)).transpose()?;
        let max = input.max.as_deref().map(|raw| parse_filter_date("max", raw)).transpose()?;
        let current_month = input.current_month.unwrap_or(false);

        if field == BIRTH_DATE_FIELD {
            if matcher != MatchSpec::Any {
                return Err(AudienceError::Validation(
                    "birthDate filters use currentMonth/min/max, not 'match'".to_string(),
                ));
            }
        } else if current_month || min.is_some() || max.is_some() {
            return Err(AudienceError::Validation(format!(
                "currentMonth/min/max are only valid on birthDate, not '{field}'"
            )));
        }

        Ok(Self {
            field,
            matcher,
            current_month,
            min,
            max,
        })
    }
}

fn parse_filter_date(name: &str, raw: &str) -> AudienceResult<NaiveDate> {
    parse_iso_date(raw).ok_or_else(|| {
        AudienceError::Validation(format!("filter '{name}' is not an ISO date: {raw}"))
    })
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

// ─── Result ─────────────────────────────────────────────────────────────────

/// A cluster of clients proposed as one targeting unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SegmentGroup {
    pub criterion: String,
    /// Concrete attribute value, or `merged` for custom filter buckets.
    pub value: String,
    #[serde(rename = "clientIds")]
    #[schema(value_type = Vec<String>)]
    pub member_ids: BTreeSet<String>,
    #[serde(rename = "reason")]
    pub rationale: String,
}

impl SegmentGroup {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}

/// Outcome of one segmentation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    #[serde(rename = "coverage")]
    pub coverage_ratio: f64,
    #[serde(rename = "totalClients")]
    pub total_population: usize,
    #[serde(rename = "selectedClients")]
    #[schema(value_type = Vec<String>)]
    pub selected_client_ids: BTreeSet<String>,
    #[serde(rename = "segmentGroups")]
    pub segments: Vec<SegmentGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StrategyResult {
    /// Zero-coverage result for the given population size.
    pub fn empty(total_population: usize, message: Option<String>) -> Self {
        Self {
            coverage_ratio: 0.0,
            total_population,
            selected_client_ids: BTreeSet::new(),
            segments: Vec::new(),
            message,
        }
    }
}
