use serde_json::{Value, json};

use super::group::{FieldGroupProcessor, GroupProcessor, GroupState};
use crate::test_helpers::factory::Factory;

fn feed(processor: &FieldGroupProcessor, records: Vec<Value>) -> Vec<Vec<(usize, String)>> {
    let mut state = processor.initial_state();
    records
        .into_iter()
        .map(|record| {
            let (next, outcome) = processor.process_record(&state, record).unwrap();
            state = next;
            outcome
                .group_changes
                .iter()
                .map(|c| (c.level, c.field.clone()))
                .collect()
        })
        .collect()
}

#[test]
fn first_record_opens_groups_without_a_break() {
    let processor = FieldGroupProcessor::new(["region"]);
    let (state, outcome) = processor
        .process_record(&GroupState::default(), Factory::record().create())
        .unwrap();

    assert!(outcome.group_changes.is_empty());
    assert!(!outcome.should_reset_variables);
    assert_eq!(outcome.group_values["region"], json!("north"));
    assert_eq!(state.records_seen, 1);
}

#[test]
fn outer_break_also_breaks_inner_levels() {
    let processor = FieldGroupProcessor::new(["region", "city"]);
    let rows = vec![
        Factory::record().with("region", "n").with("city", "a").create(),
        Factory::record().with("region", "n").with("city", "a").create(),
        Factory::record().with("region", "n").with("city", "b").create(),
        Factory::record().with("region", "s").with("city", "b").create(),
    ];

    let changes = feed(&processor, rows);

    assert_eq!(changes[0], vec![]);
    assert_eq!(changes[1], vec![]);
    assert_eq!(changes[2], vec![(1, "city".to_string())]);
    assert_eq!(
        changes[3],
        vec![(0, "region".to_string()), (1, "city".to_string())]
    );
}

#[test]
fn change_carries_previous_and_current_values() {
    let processor = FieldGroupProcessor::new(["region"]);
    let (state, _) = processor
        .process_record(&GroupState::default(), Factory::record().with("region", "a").create())
        .unwrap();
    let (_, outcome) = processor
        .process_record(&state, Factory::record().with("region", "b").create())
        .unwrap();

    let change = &outcome.group_changes[0];
    assert_eq!(change.previous, json!("a"));
    assert_eq!(change.current, json!("b"));
    assert!(outcome.should_reset_variables);
}

#[test]
fn missing_field_counts_as_null() {
    let processor = FieldGroupProcessor::new(["region"]);
    let changes = feed(
        &processor,
        vec![
            Factory::record().without("region").create(),
            Factory::record().with("region", Value::Null).create(),
            Factory::record().create(),
        ],
    );

    assert_eq!(changes[1], vec![]);
    assert_eq!(changes[2], vec![(0, "region".to_string())]);
}

#[test]
fn rejects_non_object_records() {
    let processor = FieldGroupProcessor::new(["region"]);
    assert!(processor.process_record(&GroupState::default(), json!(42)).is_err());
}

#[test]
fn validate_flags_blank_fields() {
    assert!(FieldGroupProcessor::new(["region"]).validate().is_ok());
    assert!(FieldGroupProcessor::new(["region", " "]).validate().is_err());
}
