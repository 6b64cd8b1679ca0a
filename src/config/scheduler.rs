//! Scheduler configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::AttributeNames;

const fn default_true() -> bool {
    true
}

const fn default_page_size() -> u32 {
    40
}

const fn default_max_batch_size() -> usize {
    10
}

const fn default_pass_interval_secs() -> u64 {
    600
}

const fn default_confirmation_wait_secs() -> u64 {
    20
}

const fn default_throttle_backoff_secs() -> u64 {
    30
}

fn default_nft_contract() -> String {
    "atomicassets".into()
}

fn default_claim_action() -> String {
    "claim".into()
}

/// Source of one resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceConfig {
    /// Token balance.
    Fungible {
        /// Token contract.
        contract: String,
        /// Token symbol.
        symbol: String,
        /// Decimal places.
        precision: u8,
    },
    /// Owned single-use assets.
    Units {
        /// Template id of the unit assets.
        template_id: u64,
    },
}

impl ResourceConfig {
    /// Decimal places of a fungible pool; unit pools count whole assets.
    #[must_use]
    pub const fn precision(&self) -> u8 {
        match self {
            Self::Fungible { precision, .. } => *precision,
            Self::Units { .. } => 0,
        }
    }
}

/// One asset class. Position in [`SchedulerConfig::classes`] is priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Class identifier.
    pub id: String,
    /// Inventory template id.
    pub template_id: u64,
    /// Hours between productions.
    pub cooldown_hours: u32,
    /// Recipe used when producing.
    pub recipe_id: u64,
    /// Contract receiving recharges and crafts.
    pub destination: String,
    /// Resource name to whole quantity (tokens or unit assets) per recharge.
    #[serde(default)]
    pub recharge_cost: BTreeMap<String, u64>,
    /// Recharge depleted assets.
    #[serde(default = "default_true")]
    pub recharge_enabled: bool,
    /// Produce with eligible assets.
    #[serde(default = "default_true")]
    pub produce_enabled: bool,
}

/// Reward claim performed at the start of every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// Staking contract.
    pub contract: String,
    /// Action name.
    #[serde(default = "default_claim_action")]
    pub action: String,
}

/// Token-funded craft performed while a fungible pool covers its fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Fungible resource paying the fee.
    pub resource: String,
    /// Whole tokens per craft.
    pub fee: u64,
    /// Contract receiving the fee.
    pub contract: String,
    /// Template of the crafted pack.
    pub template_id: u64,
    /// Whether the craft runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Owning account.
    pub owner: String,
    /// Asset collection.
    pub collection: String,
    /// NFT contract used for unit transfers.
    #[serde(default = "default_nft_contract")]
    pub nft_contract: String,
    /// Inventory page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Largest production batch.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Seconds between passes.
    #[serde(default = "default_pass_interval_secs")]
    pub pass_interval_secs: u64,
    /// Seconds to wait after a phase that submitted transactions.
    #[serde(default = "default_confirmation_wait_secs")]
    pub confirmation_wait_secs: u64,
    /// Seconds to back off after a throttled submission.
    #[serde(default = "default_throttle_backoff_secs")]
    pub throttle_backoff_secs: u64,
    /// Attribute names on class assets.
    #[serde(default)]
    pub attributes: AttributeNames,
    /// Resource pools by name.
    pub resources: BTreeMap<String, ResourceConfig>,
    /// Classes in priority order.
    pub classes: Vec<ClassConfig>,
    /// Optional reward claim.
    #[serde(default)]
    pub claim: Option<ClaimConfig>,
    /// Optional token-funded craft.
    #[serde(default)]
    pub secondary: Option<SecondaryConfig>,
    /// Recharge again after production.
    #[serde(default = "default_true")]
    pub recharge_after_production: bool,
}

impl ClassConfig {
    /// Validate one class against the declared resources.
    pub fn validate(&self, resources: &BTreeMap<String, ResourceConfig>) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".into());
        }
        if self.destination.trim().is_empty() {
            return Err("destination must not be empty".into());
        }
        if self.recharge_enabled && self.recharge_cost.values().all(|q| *q == 0) {
            return Err("recharge_cost must not be empty when recharge is enabled".into());
        }
        for name in self.recharge_cost.keys() {
            if !resources.contains_key(name) {
                return Err(format!("recharge cost names unknown resource `{name}`"));
            }
        }
        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate all values and cross references.
    pub fn validate(&self) -> Result<(), String> {
        if self.owner.trim().is_empty() {
            return Err("owner must not be empty".into());
        }
        if self.collection.trim().is_empty() {
            return Err("collection must not be empty".into());
        }
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".into());
        }
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be greater than 0".into());
        }
        if self.pass_interval_secs == 0 {
            return Err("pass_interval_secs must be greater than 0".into());
        }
        if self.classes.is_empty() {
            return Err("at least one class must be defined".into());
        }
        for (name, resource) in &self.resources {
            match resource {
                ResourceConfig::Fungible {
                    contract,
                    symbol,
                    precision,
                } => {
                    if contract.is_empty() || symbol.is_empty() {
                        return Err(format!("resource `{name}` needs a contract and symbol"));
                    }
                    if *precision > 18 {
                        return Err(format!("resource `{name}` precision must be at most 18"));
                    }
                }
                ResourceConfig::Units { .. } => {}
            }
        }
        let mut seen = HashSet::new();
        for class in &self.classes {
            if !seen.insert(class.id.as_str()) {
                return Err(format!("class `{}` defined twice", class.id));
            }
            class
                .validate(&self.resources)
                .map_err(|e| format!("class `{}` invalid: {e}", class.id))?;
        }
        if let Some(secondary) = &self.secondary {
            match self.resources.get(&secondary.resource) {
                Some(ResourceConfig::Fungible { .. }) => {}
                Some(ResourceConfig::Units { .. }) => {
                    return Err("secondary craft must be paid from a fungible resource".into())
                }
                None => {
                    return Err(format!(
                        "secondary craft names unknown resource `{}`",
                        secondary.resource
                    ))
                }
            }
            if secondary.fee == 0 {
                return Err("secondary fee must be greater than 0".into());
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Look up a class by id.
    #[must_use]
    pub fn class(&self, id: &str) -> Option<&ClassConfig> {
        self.classes.iter().find(|c| c.id == id)
    }

    /// Mutable class lookup, used by environment overrides.
    pub fn class_mut(&mut self, id: &str) -> Option<&mut ClassConfig> {
        self.classes.iter_mut().find(|c| c.id.eq_ignore_ascii_case(id))
    }

    /// Interval between passes.
    #[must_use]
    pub const fn pass_interval(&self) -> Duration {
        Duration::from_secs(self.pass_interval_secs)
    }

    /// Wait after submitting transactions.
    #[must_use]
    pub const fn confirmation_wait(&self) -> Duration {
        Duration::from_secs(self.confirmation_wait_secs)
    }

    /// Wait after throttling.
    #[must_use]
    pub const fn throttle_backoff(&self) -> Duration {
        Duration::from_secs(self.throttle_backoff_secs)
    }
}
