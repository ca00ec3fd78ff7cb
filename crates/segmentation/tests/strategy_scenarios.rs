//! End-to-end strategy scenarios over small in-memory populations.

use std::collections::BTreeSet;
use std::sync::Arc;

use audience_core::config::SegmentationConfig;
use audience_core::types::{ClientRecord, FilterInput, MatchInput, SegmentationRequest, StrategyResult};
use audience_segmentation::engine::normalize_population;
use audience_segmentation::report::NO_ELIGIBLE_CLIENTS_MESSAGE;
use audience_segmentation::{InMemoryClientSource, SegmentationEngine, StrategyPlan};
use chrono::NaiveDate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

fn client(id: impl Into<String>) -> ClientRecord {
    ClientRecord {
        id: id.into(),
        ..Default::default()
    }
}

fn run(records: Vec<ClientRecord>, request: SegmentationRequest) -> StrategyResult {
    let plan = StrategyPlan::from_request(request, &SegmentationConfig::default()).unwrap();
    plan.run(&normalize_population(records), today())
}

fn filter(field: &str, values: MatchInput) -> FilterInput {
    FilterInput {
        field: field.to_string(),
        match_values: Some(values),
        ..Default::default()
    }
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// A varied but deterministic population.
fn mixed_population(n: usize) -> Vec<ClientRecord> {
    let countries = ["CR", "US", "MX", "", "ES"];
    let genders = ["female", "male", "", "nonbinary"];
    let prefs = ["coffee", "tea", "wine", "books", "travel", "music"];
    (0..n)
        .map(|i| ClientRecord {
            id: format!("client-{i:03}"),
            birth_date: match i % 7 {
                0 => None,
                1 => Some("garbage".to_string()),
                k => Some(format!("19{}-0{}-1{}", 70 + (i % 3), k, i % 9)),
            },
            gender: Some(genders[i % genders.len()].to_string()),
            country: Some(countries[i % countries.len()].to_string()),
            preferences: Some(vec![
                prefs[i % prefs.len()].to_string(),
                prefs[(i / 2) % prefs.len()].to_string(),
            ]),
            languages: if i % 3 == 0 {
                None
            } else {
                Some(vec!["es".to_string()])
            },
            tags: Some(vec![format!("tag-{}", i % 11)]),
            subscriptions: Some(if i % 2 == 0 {
                vec!["email".to_string()]
            } else {
                vec!["email".to_string(), "telegram".to_string()]
            }),
            preferred_contact_method: Some(if i % 4 == 0 { "phone" } else { "email" }.to_string()),
            telegram_confirmed: Some(i % 2 == 1),
            ..Default::default()
        })
        .collect()
}

fn assert_invariants(result: &StrategyResult) {
    assert!((0.0..=1.0).contains(&result.coverage_ratio));
    if result.total_population > 0 {
        let expected = result.selected_client_ids.len() as f64 / result.total_population as f64;
        assert!((result.coverage_ratio - expected).abs() < 1e-9);
    } else {
        assert_eq!(result.coverage_ratio, 0.0);
    }
    let union: BTreeSet<String> = result
        .segments
        .iter()
        .flat_map(|s| s.member_ids.iter().cloned())
        .collect();
    assert_eq!(union, result.selected_client_ids);
    assert!(result.segments.len() <= 5);
}

#[test]
fn test_scenario_a_majority_gender_group() {
    let records: Vec<ClientRecord> = (0..10)
        .map(|i| ClientRecord {
            gender: Some(if i < 6 { "female" } else { "male" }.to_string()),
            ..client(format!("c{i}"))
        })
        .collect();

    let result = run(records, SegmentationRequest::default());
    assert_invariants(&result);

    let female = result
        .segments
        .iter()
        .find(|s| s.criterion == "gender" && s.value == "female")
        .expect("female segment selected");
    assert_eq!(female.member_ids, ids(&["c0", "c1", "c2", "c3", "c4", "c5"]));
    assert_eq!(result.segments[0].value, "female");
    assert_eq!(result.coverage_ratio, 1.0);
    assert_eq!(
        result.message.as_deref(),
        Some("Created 2 segments covering 100.0% of your clients")
    );
}

#[test]
fn test_scenario_b_country_filter() {
    let mut records: Vec<ClientRecord> = (0..4)
        .map(|i| ClientRecord {
            country: Some("CR".to_string()),
            ..client(format!("cr{i}"))
        })
        .collect();
    records.push(client("x1"));
    records.push(ClientRecord {
        country: Some(String::new()),
        ..client("x2")
    });

    let request = SegmentationRequest {
        filters: Some(vec![filter("country", MatchInput::Many(vec!["CR".to_string()]))]),
        ..Default::default()
    };
    let result = run(records, request);
    assert_invariants(&result);

    assert!((result.coverage_ratio - 4.0 / 6.0).abs() < 1e-9);
    assert_eq!(result.segments.len(), 1);
    assert_eq!(result.segments[0].criterion, "country");
    assert_eq!(result.segments[0].value, "merged");
    assert_eq!(result.segments[0].member_ids, ids(&["cr0", "cr1", "cr2", "cr3"]));
}

#[test]
fn test_scenario_c_missing_tags() {
    let records = vec![
        ClientRecord {
            tags: Some(vec!["t1".to_string()]),
            ..client("a")
        },
        ClientRecord {
            tags: Some(vec![]),
            ..client("b")
        },
        client("c"),
        ClientRecord {
            tags: Some(vec!["t2".to_string(), "t3".to_string()]),
            ..client("d")
        },
        ClientRecord {
            tags: Some(vec!["t1".to_string()]),
            ..client("e")
        },
    ];

    let request = SegmentationRequest {
        filters: Some(vec![filter("tags", MatchInput::Many(vec!["__MISSING__".to_string()]))]),
        ..Default::default()
    };
    let result = run(records, request);
    assert_invariants(&result);

    assert_eq!(result.selected_client_ids, ids(&["b", "c"]));
    assert!((result.coverage_ratio - 2.0 / 5.0).abs() < 1e-9);
}

#[test]
fn test_scenario_d_empty_population() {
    let result = run(Vec::new(), SegmentationRequest::default());
    assert_eq!(result, StrategyResult::empty(0, None));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "coverage": 0.0,
            "totalClients": 0,
            "selectedClients": [],
            "segmentGroups": []
        })
    );
}

#[test]
fn test_scenario_e_no_group_reaches_minimum() {
    let records = (0..5)
        .map(|i| ClientRecord {
            gender: Some(format!("g{i}")),
            country: Some(format!("k{}", i % 3)),
            ..client(format!("c{i}"))
        })
        .collect();
    let result = run(records, SegmentationRequest::default());
    assert_invariants(&result);
    assert!(result.segments.is_empty());
    assert!(result.selected_client_ids.is_empty());
    assert_eq!(result.coverage_ratio, 0.0);
}

#[test]
fn test_properties_over_mixed_population() {
    for n in [0, 1, 3, 17, 60, 250] {
        let result = run(mixed_population(n), SegmentationRequest::default());
        assert_invariants(&result);
        assert_eq!(result.total_population, n);
        for segment in &result.segments {
            assert!(segment.member_ids.len() >= 3);
            assert_ne!(segment.value, "Unknown");
        }
    }
}

#[test]
fn test_same_input_gives_same_strategy() {
    let request = SegmentationRequest {
        filters: Some(vec![
            filter("country", MatchInput::One("CR".to_string())),
            filter("preferences", MatchInput::Many(vec!["tea".to_string(), "wine".to_string()])),
        ]),
        ..Default::default()
    };
    let first = run(mixed_population(120), request.clone());
    let second = run(mixed_population(120), request);
    assert_eq!(first, second);

    let first = run(mixed_population(120), SegmentationRequest::default());
    let second = run(mixed_population(120), SegmentationRequest::default());
    assert_eq!(first, second);
}

#[test]
fn test_unparsable_birth_date_only_affects_age_groups() {
    // c0..c2 have broken dates and live in CR; c3..c5 share an age and live in US.
    let records: Vec<ClientRecord> = (0..6)
        .map(|i| ClientRecord {
            birth_date: Some(if i < 3 { "31/31/1990" } else { "1990-01-01" }.to_string()),
            country: Some(if i < 3 { "CR" } else { "US" }.to_string()),
            ..client(format!("c{i}"))
        })
        .collect();
    let result = run(records, SegmentationRequest::default());
    assert_invariants(&result);

    let ages = result
        .segments
        .iter()
        .find(|s| s.criterion == "birthDate")
        .expect("age group");
    assert_eq!(ages.value, "Age-34");
    assert!(!ages.member_ids.contains("c0"));
    let countries = result
        .segments
        .iter()
        .find(|s| s.criterion == "country")
        .expect("country group");
    assert!(countries.member_ids.contains("c0"));
}

#[test]
fn test_birthday_month_filter() {
    let records = vec![
        ClientRecord {
            birth_date: Some("1991-05-02".to_string()),
            ..client("may")
        },
        ClientRecord {
            birth_date: Some("1991-06-02".to_string()),
            ..client("june")
        },
        ClientRecord {
            birth_date: Some("nope".to_string()),
            ..client("broken")
        },
    ];
    let request = SegmentationRequest {
        filters: Some(vec![FilterInput {
            field: "birthDate".to_string(),
            current_month: Some(true),
            ..Default::default()
        }]),
        ..Default::default()
    };
    let result = run(records, request);
    assert_eq!(result.selected_client_ids, ids(&["may"]));
    assert_eq!(result.segments[0].criterion, "birthDate");
}

#[test]
fn test_custom_filters_on_several_fields() {
    let records = vec![
        ClientRecord {
            country: Some("CR".to_string()),
            gender: Some("female".to_string()),
            ..client("a")
        },
        ClientRecord {
            country: Some("US".to_string()),
            gender: Some("female".to_string()),
            ..client("b")
        },
        ClientRecord {
            country: Some("US".to_string()),
            gender: Some("male".to_string()),
            ..client("c")
        },
        ClientRecord {
            country: Some("CR".to_string()),
            ..client("d")
        },
    ];
    let request = SegmentationRequest {
        filters: Some(vec![
            filter("country", MatchInput::One("CR".to_string())),
            filter("gender", MatchInput::One("female".to_string())),
            filter("country", MatchInput::One("MX".to_string())),
        ]),
        ..Default::default()
    };
    let result = run(records, request);
    assert_invariants(&result);

    // Both fields have two members; country is referenced first.
    let criteria: Vec<&str> = result.segments.iter().map(|s| s.criterion.as_str()).collect();
    assert_eq!(criteria, vec!["country", "gender"]);
    assert_eq!(result.segments[0].member_ids, ids(&["a", "d"]));
    assert_eq!(result.segments[1].member_ids, ids(&["a", "b"]));
    assert_eq!(result.selected_client_ids, ids(&["a", "b", "d"]));
}

#[test]
fn test_filter_on_unknown_field_matches_nobody() {
    let records = mixed_population(10);
    let request = SegmentationRequest {
        filters: Some(vec![filter("favouriteColour", MatchInput::One("blue".to_string()))]),
        ..Default::default()
    };
    let result = run(records, request);
    assert_eq!(result.total_population, 10);
    assert!(result.segments.is_empty());
    assert_eq!(result.coverage_ratio, 0.0);
    assert_eq!(result.message.as_deref(), Some(NO_ELIGIBLE_CLIENTS_MESSAGE));
}

#[test]
fn test_max_criteria_override_limits_segments() {
    let request = SegmentationRequest {
        max_criteria_used: Some(2),
        ..Default::default()
    };
    let result = run(mixed_population(200), request);
    assert_invariants(&result);
    assert!(result.segments.len() <= 2);
}

#[tokio::test]
async fn test_engine_round_trip_through_source() {
    let engine = SegmentationEngine::new(
        Arc::new(InMemoryClientSource::with_records(mixed_population(40))),
        SegmentationConfig::default(),
    );
    let result = engine.plan(SegmentationRequest::default()).await.unwrap();
    assert_invariants(&result);
    assert_eq!(result.total_population, 40);
    assert!(!result.segments.is_empty());
}
