use serde_json::{Value, json};

use super::group::GroupChange;
use super::variables::{ResetScope, RunningVariables, VariableKind, VariableSpec, VariableState};
use crate::test_helpers::factory::Factory;

fn change(level: usize) -> GroupChange {
    GroupChange {
        level,
        field: "region".to_string(),
        previous: json!("a"),
        current: json!("b"),
    }
}

fn vars() -> RunningVariables {
    RunningVariables::new(vec![
        VariableSpec::new("total", "amount", VariableKind::Sum, ResetScope::Report),
        VariableSpec::new("region_total", "amount", VariableKind::Sum, ResetScope::Group(0)),
        VariableSpec::new("rows", "amount", VariableKind::Count, ResetScope::Group(1)),
        VariableSpec::new("avg", "amount", VariableKind::Average, ResetScope::Report),
        VariableSpec::new("low", "amount", VariableKind::Min, ResetScope::Report),
        VariableSpec::new("high", "amount", VariableKind::Max, ResetScope::Report),
        VariableSpec::new("first", "id", VariableKind::First, ResetScope::Report),
        VariableSpec::new("last", "id", VariableKind::Last, ResetScope::Report),
    ])
}

#[test]
fn accumulates_every_kind() {
    let vars = vars();
    for amount in [10, 30, 20] {
        vars.update_variables_ordered(&Factory::record().with("id", amount / 10).with("amount", amount).create())
            .unwrap();
    }

    let values = vars.get_all_values();
    assert_eq!(values["total"], json!(60.0));
    assert_eq!(values["rows"], json!(3));
    assert_eq!(values["avg"], json!(20.0));
    assert_eq!(values["low"], json!(10));
    assert_eq!(values["high"], json!(30));
    assert_eq!(values["first"], json!(1));
    assert_eq!(values["last"], json!(2));
}

#[test]
fn nulls_are_counted_but_not_aggregated() {
    let vars = vars();
    vars.update_variables_ordered(&Factory::record().with("amount", Value::Null).create())
        .unwrap();

    let values = vars.get_all_values();
    assert_eq!(values["rows"], json!(1));
    assert_eq!(values["total"], json!(0.0));
    assert_eq!(values["avg"], Value::Null);
    assert_eq!(values["low"], Value::Null);
}

#[test]
fn scope_change_resets_only_matching_levels() {
    let vars = vars();
    let record = Factory::record().with("amount", 5).create();
    vars.update_variables_ordered(&record).unwrap();

    // Inner break: level-1 variables reset, level-0 keeps going.
    vars.handle_scope_change(&change(1));
    let values = vars.get_all_values();
    assert_eq!(values["rows"], json!(0));
    assert_eq!(values["region_total"], json!(5.0));

    // Outer break resets both group scopes, never the report scope.
    vars.handle_scope_change(&change(0));
    let values = vars.get_all_values();
    assert_eq!(values["region_total"], json!(0.0));
    assert_eq!(values["total"], json!(5.0));
}

#[test]
fn non_numeric_sum_input_rejects_the_whole_record() {
    let vars = vars();
    vars.update_variables_ordered(&Factory::record().with("amount", 4).create())
        .unwrap();

    let err = vars
        .update_variables_ordered(&Factory::record().with("amount", "lots").create())
        .unwrap_err();

    assert!(err.contains("variable 'total' expects a number in 'amount'"));
    let values = vars.get_all_values();
    assert_eq!(values["rows"], json!(1));
    assert_eq!(values["total"], json!(4.0));
}

#[test]
fn closing_the_handle_marks_it_dead() {
    let vars = vars();
    assert!(vars.is_alive());
    vars.close();
    assert!(!vars.is_alive());
}
