//! Tests for configuration validation and environment overrides

use recharge_scheduler::config::{apply_overrides, EnvSettings, ResourceConfig, SchedulerConfig};

pub const CONFIG: &str = r#"{
    "owner": "player.wam",
    "collection": "castlesnftgo",
    "max_batch_size": 10,
    "confirmation_wait_secs": 20,
    "resources": {
        "seal": { "type": "units", "template_id": 411437 },
        "lumber": { "type": "fungible", "contract": "msourcegoods", "symbol": "CLUMBER", "precision": 4 },
        "finewood": { "type": "fungible", "contract": "msourcegoods", "symbol": "CFWTEMP", "precision": 4 }
    },
    "classes": [
        { "id": "castle", "template_id": 436421, "cooldown_hours": 24, "recipe_id": 1,
          "destination": "msourcekings", "recharge_cost": { "seal": 1 } },
        { "id": "carpenter", "template_id": 481431, "cooldown_hours": 24, "recipe_id": 2,
          "destination": "msourcegoods", "recharge_cost": { "seal": 1, "lumber": 6 } },
        { "id": "lumberjack", "template_id": 456608, "cooldown_hours": 24, "recipe_id": 1,
          "destination": "msourcegoods", "recharge_enabled": false }
    ],
    "claim": { "contract": "msourcestake" },
    "secondary": { "resource": "finewood", "fee": 16, "contract": "msourceguild", "template_id": 527506 },
    "recharge_after_production": true
}"#;

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_full_config_parses() {
    let cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    assert_eq!(cfg.classes.len(), 3);
    assert_eq!(cfg.classes[0].id, "castle");
    assert_eq!(cfg.claim.as_ref().unwrap().action, "claim");
    assert!(cfg.secondary.as_ref().unwrap().enabled);
    assert_eq!(
        cfg.resources["seal"],
        ResourceConfig::Units { template_id: 411_437 }
    );
    assert_eq!(cfg.attributes.charges, "Current Charges");
}

#[test]
fn test_duplicate_class_rejected() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.classes.push(cfg.classes[0].clone());
    assert!(cfg.validate().unwrap_err().contains("defined twice"));
}

#[test]
fn test_zero_batch_size_rejected() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.max_batch_size = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_recharge_without_cost_rejected() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.classes[2].recharge_enabled = true;
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("lumberjack"));
}

#[test]
fn test_secondary_must_use_fungible() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    cfg.secondary.as_mut().unwrap().resource = "seal".into();
    assert!(cfg.validate().unwrap_err().contains("fungible"));
}

#[test]
fn test_parse_error_reported() {
    let err = SchedulerConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_enable_overrides() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    apply_overrides(
        &mut cfg,
        vars(&[
            ("SCHEDULER_ENABLE_RECHARGE_CASTLE", "false"),
            ("SCHEDULER_OWNER", "Other.Wam"),
            ("PATH", "/usr/bin"),
        ]),
    )
    .unwrap();
    assert!(!cfg.class("castle").unwrap().recharge_enabled);
    assert!(cfg.class("carpenter").unwrap().recharge_enabled);
    assert_eq!(cfg.owner, "other.wam");
}

#[test]
fn test_bad_override_rejected() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    let err = apply_overrides(&mut cfg, vars(&[("SCHEDULER_ENABLE_RECHARGE_CASTLE", "maybe")]))
        .unwrap_err();
    assert!(err.contains("maybe"));
    let err = apply_overrides(&mut cfg, vars(&[("SCHEDULER_ENABLE_RECHARGE_MINER", "true")]))
        .unwrap_err();
    assert!(err.contains("miner"));
}

#[test]
fn test_env_settings_defaults() {
    let settings = EnvSettings::from_vars(vars(&[("SCHEDULER_RPC_URL", "http://localhost:8888")]));
    assert_eq!(settings.rpc_url, "http://localhost:8888");
    assert_eq!(settings.indexer_url, "https://wax.api.atomicassets.io");
    assert_eq!(settings.config_path.to_str(), Some("scheduler.json"));
}

#[test]
fn test_secondary_override() {
    let mut cfg = SchedulerConfig::from_json_str(CONFIG).unwrap();
    apply_overrides(&mut cfg, vars(&[("SCHEDULER_ENABLE_SECONDARY", "no")])).unwrap();
    assert!(!cfg.secondary.as_ref().unwrap().enabled);

    cfg.secondary = None;
    apply_overrides(&mut cfg, vars(&[("SCHEDULER_ENABLE_SECONDARY", "false")])).unwrap();
    let err = apply_overrides(&mut cfg, vars(&[("SCHEDULER_ENABLE_SECONDARY", "true")])).unwrap_err();
    assert!(err.contains("no secondary craft"));
}
