//! In-memory chain: scripted inventory, balances and submission outcomes.
//!
//! Successful submissions are applied to the in-memory state (transfers move
//! balances and unit assets, `fix:` memos restore charges, crafts spend a
//! charge and stamp the claim reference), so consecutive passes observe the
//! effects of earlier ones.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    AssetQuery, AttributeNames, BalanceSource, ChainAction, InventorySource, RawAsset,
    SchedulerError, SubmitError, TransactionSubmitter,
};
use crate::util::clock::now_ms;
use crate::util::TokenQuantity;

/// Charges restored by a `fix:` memo unless configured otherwise.
pub const DEFAULT_RECHARGE_CHARGES: u32 = 1;

#[derive(Debug, Default)]
struct ChainState {
    assets: BTreeMap<u64, Vec<RawAsset>>,
    balances: BTreeMap<(String, String), TokenQuantity>,
    failing_templates: HashSet<u64>,
    failing_balances: HashSet<String>,
    outcomes: VecDeque<Result<(), SubmitError>>,
    submissions: Vec<Vec<ChainAction>>,
    page_requests: usize,
}

/// Shared, cloneable in-memory chain implementing every collaborator.
#[derive(Debug, Clone)]
pub struct InMemoryChain {
    state: Arc<Mutex<ChainState>>,
    attributes: AttributeNames,
    recharge_charges: u32,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    /// Empty chain using the default attribute names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::default())),
            attributes: AttributeNames::default(),
            recharge_charges: DEFAULT_RECHARGE_CHARGES,
        }
    }

    /// Charges set on an asset when a recharge lands.
    #[must_use]
    pub const fn with_recharge_charges(mut self, charges: u32) -> Self {
        self.recharge_charges = charges;
        self
    }

    /// Add assets of a template (class instances or unit tokens).
    pub fn add_assets(&self, template_id: u64, assets: impl IntoIterator<Item = RawAsset>) {
        self.state
            .lock()
            .assets
            .entry(template_id)
            .or_default()
            .extend(assets);
    }

    /// Add attribute-less assets with the given ids.
    pub fn add_units(&self, template_id: u64, ids: impl IntoIterator<Item = impl Into<String>>) {
        self.add_assets(template_id, ids.into_iter().map(RawAsset::bare));
    }

    /// Set a token balance, e.g. `set_balance("msourcegoods", "12.0000 CLUMBER")`.
    ///
    /// # Errors
    ///
    /// Fails when `quantity` is not valid token notation.
    pub fn set_balance(&self, contract: &str, quantity: &str) -> Result<(), SchedulerError> {
        let parsed = TokenQuantity::parse(quantity)?;
        self.state
            .lock()
            .balances
            .insert((contract.to_string(), parsed.symbol.clone()), parsed);
        Ok(())
    }

    /// Current balance in chain notation, if the account holds the token.
    #[must_use]
    pub fn balance(&self, contract: &str, symbol: &str) -> Option<String> {
        self.state
            .lock()
            .balances
            .get(&(contract.to_string(), symbol.to_string()))
            .map(ToString::to_string)
    }

    /// Make inventory queries for a template fail.
    pub fn fail_template(&self, template_id: u64) {
        self.state.lock().failing_templates.insert(template_id);
    }

    /// Make balance queries for a symbol fail.
    pub fn fail_balance(&self, symbol: &str) {
        self.state.lock().failing_balances.insert(symbol.to_string());
    }

    /// Queue outcomes for the next submissions; once exhausted, submissions
    /// succeed.
    pub fn script_outcomes(&self, outcomes: impl IntoIterator<Item = Result<(), SubmitError>>) {
        self.state.lock().outcomes.extend(outcomes);
    }

    /// Every submitted transaction, successful or not.
    #[must_use]
    pub fn submissions(&self) -> Vec<Vec<ChainAction>> {
        self.state.lock().submissions.clone()
    }

    /// Submitted transactions whose first action has the given name.
    #[must_use]
    pub fn submissions_named(&self, name: &str) -> Vec<Vec<ChainAction>> {
        self.state
            .lock()
            .submissions
            .iter()
            .filter(|tx| tx.iter().any(|a| a.name == name))
            .cloned()
            .collect()
    }

    /// Assets currently held for a template.
    #[must_use]
    pub fn assets(&self, template_id: u64) -> Vec<RawAsset> {
        self.state
            .lock()
            .assets
            .get(&template_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of inventory pages served.
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.state.lock().page_requests
    }

    fn apply(&self, state: &mut ChainState, action: &ChainAction) {
        let data = &action.data;
        let ids: Vec<String> = data
            .get("asset_ids")
            .and_then(serde_json::Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str().map(ToString::to_string))
                    .collect()
            })
            .unwrap_or_default();

        match action.name.as_str() {
            "transfer" => {
                if let Some(quantity) = data.get("quantity").and_then(serde_json::Value::as_str) {
                    if let Ok(sent) = TokenQuantity::parse(quantity) {
                        let key = (action.account.clone(), sent.symbol.clone());
                        if let Some(held) = state.balances.get_mut(&key) {
                            let spent = sent.rescale(held.precision).unwrap_or(u64::MAX);
                            held.amount = held.amount.saturating_sub(spent);
                        }
                    }
                } else {
                    for list in state.assets.values_mut() {
                        list.retain(|a| !ids.contains(&a.asset_id));
                    }
                }
                let fixed = data
                    .get("memo")
                    .and_then(serde_json::Value::as_str)
                    .and_then(|m| m.strip_prefix("fix:"));
                if let Some(asset_id) = fixed {
                    self.update_asset(state, asset_id, |asset, names, charges| {
                        asset.data.insert(names.charges.clone(), charges.to_string().into());
                    });
                }
            }
            "craft" => {
                let stamp = (now_ms() / 1000).to_string();
                for id in &ids {
                    self.update_asset(state, id, |asset, names, _| {
                        let left = charges_of(asset, &names.charges).map_or(0, |c| c.saturating_sub(1));
                        asset.data.insert(names.charges.clone(), left.to_string().into());
                        asset
                            .data
                            .insert(names.claim_reference.clone(), stamp.clone().into());
                    });
                }
            }
            _ => {}
        }
    }

    fn update_asset<F>(&self, state: &mut ChainState, asset_id: &str, f: F)
    where
        F: FnOnce(&mut RawAsset, &AttributeNames, u32),
    {
        let found = state
            .assets
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|a| a.asset_id == asset_id);
        if let Some(asset) = found {
            f(asset, &self.attributes, self.recharge_charges);
        }
    }
}

fn charges_of(asset: &RawAsset, name: &str) -> Option<u32> {
    match asset.data.get(name)? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|c| u32::try_from(c).ok()),
        _ => None,
    }
}

#[async_trait]
impl InventorySource for InMemoryChain {
    async fn fetch_page(
        &self,
        query: &AssetQuery,
        page: u32,
        limit: u32,
    ) -> Result<Vec<RawAsset>, SchedulerError> {
        let mut state = self.state.lock();
        state.page_requests += 1;
        if state.failing_templates.contains(&query.template_id) {
            return Err(SchedulerError::Fetch(format!(
                "template {} unavailable",
                query.template_id
            )));
        }
        let start = (page.max(1) as usize - 1) * limit as usize;
        Ok(state
            .assets
            .get(&query.template_id)
            .map(|list| list.iter().skip(start).take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl BalanceSource for InMemoryChain {
    async fn currency_balance(
        &self,
        contract: &str,
        _owner: &str,
        symbol: &str,
    ) -> Result<Vec<String>, SchedulerError> {
        let state = self.state.lock();
        if state.failing_balances.contains(symbol) {
            return Err(SchedulerError::Fetch(format!("{symbol} balance unavailable")));
        }
        Ok(state
            .balances
            .get(&(contract.to_string(), symbol.to_string()))
            .map(|q| vec![q.to_string()])
            .unwrap_or_default())
    }
}

#[async_trait]
impl TransactionSubmitter for InMemoryChain {
    async fn submit(&self, actions: Vec<ChainAction>) -> Result<(), SubmitError> {
        let mut state = self.state.lock();
        state.submissions.push(actions.clone());
        let outcome = state.outcomes.pop_front().unwrap_or(Ok(()));
        if outcome.is_ok() {
            for action in &actions {
                self.apply(&mut state, action);
            }
        }
        outcome
    }
}
