//! Segmentation engine: turns a request and a client population into a
//! coverage strategy.

use std::collections::HashSet;
use std::sync::Arc;

use audience_core::config::SegmentationConfig;
use audience_core::types::{ClientRecord, FilterSpec, SegmentationRequest, StrategyResult};
use audience_core::AudienceResult;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::attributes::ClientProfile;
use crate::builder::{Candidates, SegmentBuilder, SegmentationMode};
use crate::population::ClientSource;
use crate::report;
use crate::selector::{CoverageSelector, SelectionLimits};
use crate::{MAX_SEGMENT_GROUPS, MIN_GROUP_SIZE};

/// A validated request with its effective limits resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyPlan {
    pub mode: SegmentationMode,
    pub limits: SelectionLimits,
    pub max_attributes: usize,
}

impl StrategyPlan {
    /// Resolve request overrides against the configured limits.
    ///
    /// `maxCriteriaUsed` is clamped to `1..=max_segment_groups` in both modes,
    /// and the configured cap itself never exceeds [`MAX_SEGMENT_GROUPS`].
    /// `minGroupSize` can only raise the automatic-mode floor; in custom mode
    /// it replaces the (lower) custom default.
    pub fn from_request(
        request: SegmentationRequest,
        config: &SegmentationConfig,
    ) -> AudienceResult<Self> {
        let filters = request
            .filters
            .unwrap_or_default()
            .into_iter()
            .map(FilterSpec::try_from)
            .collect::<AudienceResult<Vec<_>>>()?;
        let mode = SegmentationMode::from_filters(filters);

        let cap = config.max_segment_groups.clamp(1, MAX_SEGMENT_GROUPS);
        let automatic_floor = config.min_group_size.max(MIN_GROUP_SIZE);
        let max_groups = request
            .max_criteria_used
            .map_or(cap, |n| n.clamp(1, cap));

        let min_gain = match mode {
            SegmentationMode::Automatic => request
                .min_group_size
                .unwrap_or(automatic_floor)
                .max(automatic_floor),
            SegmentationMode::Custom(_) => request
                .min_group_size
                .unwrap_or(config.custom_min_group_size)
                .max(1),
        };

        Ok(Self {
            mode,
            limits: SelectionLimits {
                max_groups,
                min_gain,
            },
            max_attributes: config.max_attributes,
        })
    }

    /// Pure, deterministic part of a strategy run.
    pub fn run(&self, profiles: &[ClientProfile], today: NaiveDate) -> StrategyResult {
        let total = profiles.len();
        if total == 0 {
            return StrategyResult::empty(0, None);
        }

        let candidates = SegmentBuilder::new(profiles, today)
            .max_attributes(self.max_attributes)
            .min_group_size(self.limits.min_gain)
            .build(&self.mode);

        let candidates = match candidates {
            Candidates::Groups(groups) => groups,
            Candidates::NoEligibleClients => return report::no_eligible_clients(total),
        };
        debug!(
            mode = self.mode.label(),
            candidates = candidates.len(),
            "Candidate groups built"
        );

        let selection = CoverageSelector::new(self.limits).select(candidates);
        report::assemble(selection, total)
    }
}

pub struct SegmentationEngine {
    source: Arc<dyn ClientSource>,
    config: SegmentationConfig,
}

impl SegmentationEngine {
    pub fn new(source: Arc<dyn ClientSource>, config: SegmentationConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Load the population and compute a coverage strategy for `request`.
    pub async fn plan(&self, request: SegmentationRequest) -> AudienceResult<StrategyResult> {
        let plan_id = Uuid::new_v4();
        let plan = StrategyPlan::from_request(request, &self.config)?;

        let records = self.source.load_clients().await?;
        let profiles = normalize_population(records);
        let today = Utc::now().date_naive();

        let result = plan.run(&profiles, today);

        metrics::counter!("segmentation.requests", "mode" => plan.mode.label()).increment(1);
        metrics::histogram!("segmentation.coverage").record(result.coverage_ratio);
        metrics::histogram!("segmentation.groups_selected").record(result.segments.len() as f64);

        info!(
            plan_id = %plan_id,
            mode = plan.mode.label(),
            clients = result.total_population,
            segments = result.segments.len(),
            coverage = result.coverage_ratio,
            "Segmentation strategy computed"
        );

        Ok(result)
    }
}

/// Normalize raw records, dropping ones without an id and repeated ids.
pub fn normalize_population(records: Vec<ClientRecord>) -> Vec<ClientProfile> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut profiles = Vec::with_capacity(records.len());

    for record in records {
        let profile = ClientProfile::from_record(record);
        if profile.id.is_empty() {
            warn!("Skipping client record without an id");
            continue;
        }
        if !seen.insert(profile.id.clone()) {
            warn!(client_id = %profile.id, "Skipping duplicate client record");
            continue;
        }
        profiles.push(profile);
    }

    profiles
}
