//! Tests for utility helpers

use recharge_scheduler::util::{now_ms, whole_to_base_units, ResourceCost, ResourceKind, TokenQuantity};

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(b >= a);
    assert!(a > 1_600_000_000_000);
}

#[test]
fn test_resource_cost_ordering() {
    let cost = ResourceCost::none().with("seal", 1).with("lumber", 60_000);
    let kinds: Vec<_> = cost.iter().map(|(k, _)| k.as_str().to_string()).collect();
    assert_eq!(kinds, vec!["lumber", "seal"]);
    assert!(!cost.is_empty());
    assert!(ResourceCost::none().is_empty());
}

#[test]
fn test_resource_kind_display_and_serde() {
    let kind = ResourceKind::from("seal");
    assert_eq!(kind.to_string(), "seal");
    assert_eq!(serde_json::to_string(&kind).unwrap(), "\"seal\"");
}

#[test]
fn test_quantity_formats_with_precision() {
    assert_eq!(TokenQuantity::new(60_000, 4, "CLUMBER").to_string(), "6.0000 CLUMBER");
    assert_eq!(TokenQuantity::new(5, 2, "CFWTEMP").to_string(), "0.05 CFWTEMP");
    assert_eq!(TokenQuantity::new(16, 0, "CFWTEMP").to_string(), "16 CFWTEMP");
}

#[test]
fn test_whole_units_conversion() {
    assert_eq!(whole_to_base_units(6, 4), Some(60_000));
    assert_eq!(whole_to_base_units(16, 0), Some(16));
    assert_eq!(whole_to_base_units(u64::MAX, 1), None);
}
