//! Attribute extraction: normalizes raw client records into typed profiles
//! and exposes per-attribute value lists for grouping.

use audience_core::types::{parse_iso_date, ClientRecord, Subscription, UNKNOWN_VALUE};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

/// Attributes a profile can be grouped or filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    FirstName,
    LastName,
    BirthDate,
    Preferences,
    Gender,
    Country,
    Languages,
    Tags,
    Subscriptions,
    PreferredContactMethod,
    TelegramConfirmed,
}

/// Scan order for automatic segmentation.
pub const AUTOMATIC_ATTRIBUTES: [Attribute; 9] = [
    Attribute::BirthDate,
    Attribute::Preferences,
    Attribute::Gender,
    Attribute::Country,
    Attribute::Languages,
    Attribute::Tags,
    Attribute::Subscriptions,
    Attribute::PreferredContactMethod,
    Attribute::TelegramConfirmed,
];

impl Attribute {
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::FirstName => "firstName",
            Attribute::LastName => "lastName",
            Attribute::BirthDate => "birthDate",
            Attribute::Preferences => "preferences",
            Attribute::Gender => "gender",
            Attribute::Country => "country",
            Attribute::Languages => "languages",
            Attribute::Tags => "tags",
            Attribute::Subscriptions => "subscriptions",
            Attribute::PreferredContactMethod => "preferredContactMethod",
            Attribute::TelegramConfirmed => "telegramConfirmed",
        }
    }

    /// Field names are data-driven, so an unknown name is not an error.
    pub fn from_name(name: &str) -> Option<Self> {
        let attr = match name {
            "firstName" => Attribute::FirstName,
            "lastName" => Attribute::LastName,
            "birthDate" => Attribute::BirthDate,
            "preferences" => Attribute::Preferences,
            "gender" => Attribute::Gender,
            "country" => Attribute::Country,
            "languages" => Attribute::Languages,
            "tags" => Attribute::Tags,
            "subscriptions" => Attribute::Subscriptions,
            "preferredContactMethod" => Attribute::PreferredContactMethod,
            "telegramConfirmed" => Attribute::TelegramConfirmed,
            _ => return None,
        };
        Some(attr)
    }
}

/// Normalized, read-only projection of a client record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Kept raw; unparsable dates only exclude the client from age grouping.
    pub birth_date: Option<String>,
    pub preferences: Vec<String>,
    pub gender: String,
    pub country: String,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
    pub subscriptions: Vec<Subscription>,
    pub preferred_contact_method: String,
    pub telegram_confirmed: bool,
}

impl ClientProfile {
    pub fn from_record(record: ClientRecord) -> Self {
        let subscriptions = record
            .subscriptions
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| {
                let parsed = Subscription::parse(raw);
                if parsed.is_none() {
                    debug!(client_id = %record.id, channel = %raw, "Dropping unknown subscription channel");
                }
                parsed
            })
            .fold(Vec::new(), |mut acc, sub| {
                if !acc.contains(&sub) {
                    acc.push(sub);
                }
                acc
            });

        Self {
            id: record.id.trim().to_string(),
            first_name: scalar(record.first_name),
            last_name: scalar(record.last_name),
            birth_date: record
                .birth_date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            preferences: string_set(record.preferences),
            gender: scalar(record.gender),
            country: scalar(record.country),
            languages: string_set(record.languages),
            tags: string_set(record.tags),
            subscriptions,
            preferred_contact_method: scalar(record.preferred_contact_method),
            telegram_confirmed: record.telegram_confirmed.unwrap_or(false),
        }
    }

    pub fn parsed_birth_date(&self) -> Option<NaiveDate> {
        self.birth_date.as_deref().and_then(parse_iso_date)
    }

    /// Grouping values for a field name. Unknown names resolve to `Unknown`.
    pub fn values_of(&self, field: &str, today: NaiveDate) -> Vec<String> {
        match Attribute::from_name(field) {
            Some(attr) => self.attribute_values(attr, today),
            None => vec![UNKNOWN_VALUE.to_string()],
        }
    }

    pub fn attribute_values(&self, attr: Attribute, today: NaiveDate) -> Vec<String> {
        match attr {
            Attribute::BirthDate => match self.parsed_birth_date() {
                Some(born) => vec![format!("Age-{}", age_on(born, today))],
                None => vec![UNKNOWN_VALUE.to_string()],
            },
            Attribute::Preferences => list_or_unknown(&self.preferences),
            Attribute::Languages => list_or_unknown(&self.languages),
            Attribute::Tags => list_or_unknown(&self.tags),
            Attribute::Subscriptions => {
                let subs: Vec<String> = self
                    .subscriptions
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect();
                list_or_unknown(&subs)
            }
            Attribute::TelegramConfirmed => vec![self.telegram_confirmed.to_string()],
            Attribute::FirstName => scalar_or_unknown(&self.first_name),
            Attribute::LastName => scalar_or_unknown(&self.last_name),
            Attribute::Gender => scalar_or_unknown(&self.gender),
            Attribute::Country => scalar_or_unknown(&self.country),
            Attribute::PreferredContactMethod => {
                scalar_or_unknown(&self.preferred_contact_method)
            }
        }
    }
}

/// Whole years between `born` and `today`.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

pub fn is_unknown(value: &str) -> bool {
    value.is_empty() || value == UNKNOWN_VALUE
}

fn scalar(raw: Option<String>) -> String {
    raw.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn string_set(raw: Option<Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in raw.unwrap_or_default() {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn list_or_unknown(values: &[String]) -> Vec<String> {
    if values.is_empty() {
        vec![UNKNOWN_VALUE.to_string()]
    } else {
        values.to_vec()
    }
}

fn scalar_or_unknown(value: &str) -> Vec<String> {
    if value.is_empty() {
        vec![UNKNOWN_VALUE.to_string()]
    } else {
        vec![value.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn record(id: &str) -> ClientRecord {
        ClientRecord {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_age_subtracts_before_birthday() {
        let born = NaiveDate::from_ymd_opt(1990, 6, 16).unwrap();
        assert_eq!(age_on(born, today()), 33);
        let born = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        assert_eq!(age_on(born, today()), 34);
        let born = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(age_on(born, today()), 34);
    }

    #[test]
    fn test_birth_date_values() {
        let mut rec = record("c1");
        rec.birth_date = Some("1990-01-01".to_string());
        let profile = ClientProfile::from_record(rec);
        assert_eq!(profile.values_of("birthDate", today()), vec!["Age-34"]);

        let mut rec = record("c2");
        rec.birth_date = Some("not a date".to_string());
        let profile = ClientProfile::from_record(rec);
        assert_eq!(profile.values_of("birthDate", today()), vec![UNKNOWN_VALUE]);

        let profile = ClientProfile::from_record(record("c3"));
        assert_eq!(profile.values_of("birthDate", today()), vec![UNKNOWN_VALUE]);
    }

    #[test]
    fn test_empty_values_normalize_to_unknown() {
        let mut rec = record("c1");
        rec.gender = Some("   ".to_string());
        rec.tags = Some(vec!["".to_string()]);
        let profile = ClientProfile::from_record(rec);
        assert_eq!(profile.values_of("gender", today()), vec![UNKNOWN_VALUE]);
        assert_eq!(profile.values_of("tags", today()), vec![UNKNOWN_VALUE]);
        assert_eq!(profile.values_of("languages", today()), vec![UNKNOWN_VALUE]);
        assert_eq!(profile.values_of("subscriptions", today()), vec![UNKNOWN_VALUE]);
        assert_eq!(profile.values_of("telegramConfirmed", today()), vec!["false"]);
    }

    #[test]
    fn test_array_values_are_deduplicated() {
        let mut rec = record("c1");
        rec.languages = Some(vec!["es".to_string(), "en".to_string(), "es".to_string()]);
        rec.subscriptions = Some(vec![
            "Email".to_string(),
            "sms".to_string(),
            "telegram".to_string(),
            "email".to_string(),
        ]);
        rec.telegram_confirmed = Some(true);
        let profile = ClientProfile::from_record(rec);
        assert_eq!(profile.values_of("languages", today()), vec!["es", "en"]);
        assert_eq!(
            profile.values_of("subscriptions", today()),
            vec!["email", "telegram"]
        );
        assert_eq!(profile.values_of("telegramConfirmed", today()), vec!["true"]);
    }

    #[test]
    fn test_unrecognized_field_is_unknown() {
        let mut rec = record("c1");
        rec.country = Some("CR".to_string());
        let profile = ClientProfile::from_record(rec);
        assert_eq!(profile.values_of("shoeSize", today()), vec![UNKNOWN_VALUE]);
        assert_eq!(profile.values_of("country", today()), vec!["CR"]);
    }

    #[test]
    fn test_attribute_names_round_trip() {
        for attr in AUTOMATIC_ATTRIBUTES {
            assert_eq!(Attribute::from_name(attr.name()), Some(attr));
        }
        assert_eq!(Attribute::from_name("Country"), None);
    }
}
