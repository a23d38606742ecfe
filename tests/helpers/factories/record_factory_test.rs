use crate::test_helpers::factory::Factory;
use serde_json::json;

#[test]
fn test_record_factory() {
    let record = Factory::record().with("region", "south").without("amount").create();

    assert_eq!(record["region"], json!("south"));
    assert_eq!(record["id"], json!(1));
    assert!(record.get("amount").is_none());
}

#[test]
fn test_record_factory_grouped_list() {
    let records = Factory::record().create_grouped(5, "region", &["a", "b"], 2);

    let regions: Vec<&str> = records.iter().map(|r| r["region"].as_str().unwrap()).collect();
    assert_eq!(regions, vec!["a", "a", "b", "b", "a"]);
    assert_eq!(records[4]["id"], json!(5));
    assert_eq!(records[4]["amount"], json!(50));
}
