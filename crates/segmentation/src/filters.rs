//! Filter evaluation: per-filter AND semantics, OR gate across filters.

use audience_core::types::{FilterSpec, MatchSpec};
use chrono::{Datelike, NaiveDate};

use crate::attributes::{is_unknown, ClientProfile};

/// True iff the profile satisfies at least one filter.
pub fn eligible(profile: &ClientProfile, filters: &[FilterSpec], today: NaiveDate) -> bool {
    filters.iter().any(|f| satisfies(profile, f, today))
}

/// Evaluate a single filter against a profile.
pub fn satisfies(profile: &ClientProfile, filter: &FilterSpec, today: NaiveDate) -> bool {
    if filter.is_birth_date() {
        return satisfies_birth_date(profile, filter, today);
    }

    let values = profile.values_of(&filter.field, today);
    match &filter.matcher {
        MatchSpec::Any => true,
        MatchSpec::Missing => values.iter().all(|v| is_unknown(v)),
        MatchSpec::Values(expected) => values.iter().any(|v| expected.contains(v)),
    }
}

fn satisfies_birth_date(profile: &ClientProfile, filter: &FilterSpec, today: NaiveDate) -> bool {
    let Some(born) = profile.parsed_birth_date() else {
        return false;
    };

    if filter.current_month && born.month() != today.month() {
        return false;
    }
    if filter.min.is_some_and(|min| born < min) {
        return false;
    }
    if filter.max.is_some_and(|max| born > max) {
        return false;
    }
    true
}
