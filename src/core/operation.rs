//! Logical operations and their rendering into chain actions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::ledger::Grant;
use crate::util::{AssetId, ClassId, ResourceKind, TokenQuantity};

/// Memo attached to token deposits that precede the final action.
pub const DEPOSIT_MEMO: &str = "deposit";

/// One state-changing unit of work handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Restore charges of one asset by spending reserved resources.
    Recharge {
        /// Class of the asset.
        class: ClassId,
        /// Asset being recharged.
        asset: AssetId,
        /// Account receiving the payment.
        destination: String,
        /// Resources reserved for the payment, in kind order.
        grants: Vec<(ResourceKind, Grant)>,
    },
    /// Craft with a batch of eligible assets in one transaction.
    Produce {
        /// Class of the assets.
        class: ClassId,
        /// Crafting contract.
        destination: String,
        /// Recipe to craft.
        recipe_id: u64,
        /// Assets in the batch.
        assets: Vec<AssetId>,
    },
    /// Claim accrued staking rewards.
    Claim {
        /// Staking contract.
        contract: String,
        /// Action name on the contract.
        action: String,
    },
    /// Spend a fungible fee to craft a pack.
    TokenCraft {
        /// Resource paying the fee.
        kind: ResourceKind,
        /// Fee in base units.
        fee: u64,
        /// Account receiving the fee and performing the craft.
        contract: String,
        /// Template of the pack to craft.
        template_id: u64,
    },
}

impl Operation {
    /// Short label used in logs and audit events.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Recharge { .. } => "recharge",
            Self::Produce { .. } => "produce",
            Self::Claim { .. } => "claim",
            Self::TokenCraft { .. } => "token_craft",
        }
    }
}

/// Permission level used to sign an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    /// Signing account.
    pub actor: String,
    /// Permission name.
    pub permission: String,
}

/// A single named action inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainAction {
    /// Contract account.
    pub account: String,
    /// Action name.
    pub name: String,
    /// Signers.
    pub authorization: Vec<Authorization>,
    /// Structured payload.
    pub data: serde_json::Value,
}

/// How a fungible resource is transferred on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    /// Token contract.
    pub contract: String,
    /// Token symbol.
    pub symbol: String,
    /// Decimal places.
    pub precision: u8,
}

/// Renders [`Operation`]s into [`ChainAction`]s for one owner account.
#[derive(Debug, Clone)]
pub struct ActionBuilder {
    owner: String,
    permission: String,
    nft_contract: String,
    tokens: BTreeMap<ResourceKind, TokenSpec>,
}

impl ActionBuilder {
    /// Create a builder signing as `owner@active`.
    pub fn new(owner: impl Into<String>, nft_contract: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            permission: "active".into(),
            nft_contract: nft_contract.into(),
            tokens: BTreeMap::new(),
        }
    }

    /// Register how a fungible resource kind is transferred.
    #[must_use]
    pub fn with_token(mut self, kind: impl Into<ResourceKind>, spec: TokenSpec) -> Self {
        self.tokens.insert(kind.into(), spec);
        self
    }

    /// Owner account.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    fn action(&self, account: &str, name: &str, data: serde_json::Value) -> ChainAction {
        ChainAction {
            account: account.to_string(),
            name: name.to_string(),
            authorization: vec![Authorization {
                actor: self.owner.clone(),
                permission: self.permission.clone(),
            }],
            data,
        }
    }

    fn token_transfer(&self, kind: &ResourceKind, amount: u64, to: &str, memo: &str) -> ChainAction {
        let (contract, quantity) = match self.tokens.get(kind) {
            Some(spec) => (
                spec.contract.as_str(),
                TokenQuantity::new(amount, spec.precision, spec.symbol.clone()).to_string(),
            ),
            None => {
                tracing::warn!("no token spec for {}; using kind as symbol", kind);
                ("eosio.token", format!("{amount} {kind}"))
            }
        };
        self.action(
            contract,
            "transfer",
            json!({
                "from": self.owner,
                "to": to,
                "quantity": quantity,
                "memo": memo,
            }),
        )
    }

    fn nft_transfer(&self, ids: &[AssetId], to: &str, memo: &str) -> ChainAction {
        self.action(
            &self.nft_contract,
            "transfer",
            json!({
                "from": self.owner,
                "to": to,
                "asset_ids": ids,
                "memo": memo,
            }),
        )
    }

    /// Render an operation into its ordered action list.
    ///
    /// Recharges put fungible deposits before unit transfers; only the last
    /// action carries the `fix:<asset>` memo that names the recharged asset.
    #[must_use]
    pub fn build(&self, operation: &Operation) -> Vec<ChainAction> {
        match operation {
            Operation::Recharge {
                asset,
                destination,
                grants,
                ..
            } => {
                let mut ordered: Vec<&(ResourceKind, Grant)> = grants
                    .iter()
                    .filter(|(_, g)| g.quantity() > 0)
                    .collect();
                ordered.sort_by_key(|(_, g)| matches!(g, Grant::Tokens(_)));

                let fix_memo = format!("fix:{asset}");
                let last = ordered.len().saturating_sub(1);
                ordered
                    .into_iter()
                    .enumerate()
                    .map(|(i, (kind, grant))| {
                        let memo = if i == last { fix_memo.as_str() } else { DEPOSIT_MEMO };
                        match grant {
                            Grant::Amount(amount) => {
                                self.token_transfer(kind, *amount, destination, memo)
                            }
                            Grant::Tokens(ids) => self.nft_transfer(ids, destination, memo),
                        }
                    })
                    .collect()
            }
            Operation::Produce {
                destination,
                recipe_id,
                assets,
                ..
            } => vec![self.action(
                destination,
                "craft",
                json!({
                    "owner": self.owner,
                    "asset_ids": assets,
                    "recipe_id": recipe_id,
                }),
            )],
            Operation::Claim { contract, action } => {
                vec![self.action(contract, action, json!({ "player": self.owner }))]
            }
            Operation::TokenCraft {
                kind,
                fee,
                contract,
                template_id,
            } => vec![
                self.token_transfer(kind, *fee, contract, DEPOSIT_MEMO),
                self.action(
                    contract,
                    "craftwtoken",
                    json!({
                        "owner": self.owner,
                        "pack_to_craft_template_id": template_id,
                    }),
                ),
            ],
        }
    }
}
