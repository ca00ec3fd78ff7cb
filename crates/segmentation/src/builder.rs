//! Segment builder: turns a population into candidate segment groups,
//! either from custom filters or from a full attribute scan.

use std::collections::{BTreeSet, HashMap};

use audience_core::types::{FilterSpec, SegmentGroup};
use chrono::NaiveDate;
use tracing::debug;

use crate::attributes::{is_unknown, Attribute, ClientProfile, AUTOMATIC_ATTRIBUTES};
use crate::filters::{eligible, satisfies};
use crate::{DEFAULT_AUTOMATIC_ATTRIBUTES, MIN_GROUP_SIZE};

/// Reported value of every custom-mode bucket.
pub const MERGED_VALUE: &str = "merged";

/// How candidates are produced, decided once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentationMode {
    Custom(Vec<FilterSpec>),
    Automatic,
}

impl SegmentationMode {
    pub fn from_filters(filters: Vec<FilterSpec>) -> Self {
        if filters.is_empty() {
            SegmentationMode::Automatic
        } else {
            SegmentationMode::Custom(filters)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SegmentationMode::Custom(_) => "custom",
            SegmentationMode::Automatic => "automatic",
        }
    }
}

/// Builder output. Custom mode short-circuits when its OR gate admits nobody.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    Groups(Vec<SegmentGroup>),
    NoEligibleClients,
}

pub struct SegmentBuilder<'a> {
    profiles: &'a [ClientProfile],
    today: NaiveDate,
    max_attributes: usize,
    min_group_size: usize,
}

impl<'a> SegmentBuilder<'a> {
    pub fn new(profiles: &'a [ClientProfile], today: NaiveDate) -> Self {
        Self {
            profiles,
            today,
            max_attributes: DEFAULT_AUTOMATIC_ATTRIBUTES,
            min_group_size: MIN_GROUP_SIZE,
        }
    }

    /// Number of entries of the automatic attribute list to scan.
    pub fn max_attributes(mut self, n: usize) -> Self {
        self.max_attributes = n.min(AUTOMATIC_ATTRIBUTES.len());
        self
    }

    /// Automatic-mode groups below this size are discarded.
    pub fn min_group_size(mut self, n: usize) -> Self {
        self.min_group_size = n;
        self
    }

    pub fn build(&self, mode: &SegmentationMode) -> Candidates {
        match mode {
            SegmentationMode::Custom(filters) => self.build_custom(filters),
            SegmentationMode::Automatic => Candidates::Groups(self.build_automatic()),
        }
    }

    fn build_custom(&self, filters: &[FilterSpec]) -> Candidates {
        let admitted: Vec<&ClientProfile> = self
            .profiles
            .iter()
            .filter(|p| eligible(p, filters, self.today))
            .collect();

        debug!(
            admitted = admitted.len(),
            population = self.profiles.len(),
            filters = filters.len(),
            "Custom filter gate evaluated"
        );

        if admitted.is_empty() {
            return Candidates::NoEligibleClients;
        }

        // One bucket per distinct field, in order of first reference.
        let mut buckets: Vec<(&str, BTreeSet<String>)> = Vec::new();
        for filter in filters {
            let slot = match buckets.iter().position(|(field, _)| *field == filter.field) {
                Some(slot) => slot,
                None => {
                    buckets.push((filter.field.as_str(), BTreeSet::new()));
                    buckets.len() - 1
                }
            };
            for profile in &admitted {
                if satisfies(profile, filter, self.today) {
                    buckets[slot].1.insert(profile.id.clone());
                }
            }
        }

        let groups = buckets
            .into_iter()
            .map(|(field, member_ids)| SegmentGroup {
                criterion: field.to_string(),
                value: MERGED_VALUE.to_string(),
                rationale: format!("{} clients match the {field} filter", member_ids.len()),
                member_ids,
            })
            .collect();

        Candidates::Groups(groups)
    }

    fn build_automatic(&self) -> Vec<SegmentGroup> {
        let mut groups: Vec<SegmentGroup> = Vec::new();

        for attr in AUTOMATIC_ATTRIBUTES.iter().take(self.max_attributes) {
            let mut index: HashMap<String, usize> = HashMap::new();
            let mut members: Vec<(String, BTreeSet<String>)> = Vec::new();

            for profile in self.profiles {
                for value in profile.attribute_values(*attr, self.today) {
                    if is_unknown(&value) {
                        continue;
                    }
                    let slot = *index.entry(value.clone()).or_insert_with(|| {
                        members.push((value.clone(), BTreeSet::new()));
                        members.len() - 1
                    });
                    members[slot].1.insert(profile.id.clone());
                }
            }

            let before = members.len();
            members.retain(|(_, ids)| ids.len() >= self.min_group_size);
            debug!(
                attribute = attr.name(),
                values = before,
                kept = members.len(),
                "Attribute scanned"
            );

            groups.extend(members.into_iter().map(|(value, member_ids)| SegmentGroup {
                criterion: attr.name().to_string(),
                rationale: automatic_rationale(*attr, &value, member_ids.len()),
                value,
                member_ids,
            }));
        }

        groups
    }
}

fn automatic_rationale(attr: Attribute, value: &str, size: usize) -> String {
    match attr {
        Attribute::BirthDate => {
            let age = value.trim_start_matches("Age-");
            format!("{size} clients are aged {age}")
        }
        _ => format!("{size} clients share {} = {value}", attr.name()),
    }
}
