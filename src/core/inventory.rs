//! Inventory and balance collaborators, pagination and attribute parsing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::classifier::{AssetInstance, ClaimReference};
use crate::core::SchedulerError;
use crate::util::{AssetId, TokenQuantity};

/// Default attribute holding the charge count.
pub const DEFAULT_CHARGES_ATTRIBUTE: &str = "Current Charges";
/// Default attribute holding the truncated last-claim timestamp.
pub const DEFAULT_CLAIM_ATTRIBUTE: &str = "Claim Reference Number";

/// Which assets to list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetQuery {
    /// Owning account.
    pub owner: String,
    /// Collection name.
    pub collection: String,
    /// Template id identifying the class or unit token.
    pub template_id: u64,
}

/// One asset as returned by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAsset {
    /// Asset id.
    pub asset_id: AssetId,
    /// Mutable/immutable attribute map.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl RawAsset {
    /// An asset without attributes.
    pub fn bare(asset_id: impl Into<AssetId>) -> Self {
        Self {
            asset_id: asset_id.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(name.to_string(), value.into());
        self
    }

    /// Attribute rendered as text; numbers are rendered without quotes.
    fn attr_text(&self, name: &str) -> Option<String> {
        match self.data.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Paginated asset listing (the indexer).
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch one page, 1-based.
    async fn fetch_page(
        &self,
        query: &AssetQuery,
        page: u32,
        limit: u32,
    ) -> Result<Vec<RawAsset>, SchedulerError>;
}

/// Fungible balance lookup (chain RPC).
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Balances of `symbol` issued by `contract` held by `owner`, in
    /// `"<amount> <SYMBOL>"` notation. Empty when the account holds none.
    async fn currency_balance(
        &self,
        contract: &str,
        owner: &str,
        symbol: &str,
    ) -> Result<Vec<String>, SchedulerError>;
}

/// Fetch every page of a query. Stops at the first page shorter than
/// `limit`.
///
/// # Errors
///
/// Propagates the first page error; partial results are discarded.
pub async fn fetch_all_assets<I>(
    source: &I,
    query: &AssetQuery,
    limit: u32,
) -> Result<Vec<RawAsset>, SchedulerError>
where
    I: InventorySource + ?Sized,
{
    let limit = limit.max(1);
    let mut all = Vec::new();
    let mut page = 1;
    loop {
        let items = source.fetch_page(query, page, limit).await?;
        let count = items.len();
        all.extend(items);
        tracing::debug!(
            "template {} page {} returned {} assets",
            query.template_id,
            page,
            count
        );
        if count < limit as usize {
            break;
        }
        page += 1;
    }
    Ok(all)
}

/// Attribute names used to interpret raw assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNames {
    /// Charge count attribute.
    pub charges: String,
    /// Last-claim attribute.
    pub claim_reference: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            charges: DEFAULT_CHARGES_ATTRIBUTE.into(),
            claim_reference: DEFAULT_CLAIM_ATTRIBUTE.into(),
        }
    }
}

/// Interpret one raw asset.
///
/// # Errors
///
/// [`SchedulerError::Malformed`] when the charge attribute is present but is
/// not a non-negative integer.
pub fn parse_instance(raw: &RawAsset, names: &AttributeNames) -> Result<AssetInstance, SchedulerError> {
    let charges = match raw.attr_text(&names.charges) {
        None => None,
        Some(text) => Some(text.trim().parse::<u32>().map_err(|_| {
            SchedulerError::Malformed(format!(
                "asset {}: `{}` = `{text}`",
                raw.asset_id, names.charges
            ))
        })?),
    };
    let last_claim = raw
        .attr_text(&names.claim_reference)
        .map(ClaimReference::new);
    Ok(AssetInstance {
        id: raw.asset_id.clone(),
        charges,
        last_claim,
    })
}

/// Interpret a page set, skipping (and logging) malformed assets.
#[must_use]
pub fn parse_instances(raw: &[RawAsset], names: &AttributeNames) -> Vec<AssetInstance> {
    raw.iter()
        .filter_map(|asset| match parse_instance(asset, names) {
            Ok(instance) => Some(instance),
            Err(e) => {
                tracing::warn!("skipping asset: {}", e);
                None
            }
        })
        .collect()
}

/// Read a fungible balance in base units of `precision`. An empty answer is
/// a zero balance.
///
/// # Errors
///
/// Propagates the source error, or [`SchedulerError::Malformed`] when the
/// reported quantity cannot be parsed or is for another symbol.
pub async fn fetch_balance<B>(
    source: &B,
    contract: &str,
    owner: &str,
    symbol: &str,
    precision: u8,
) -> Result<u64, SchedulerError>
where
    B: BalanceSource + ?Sized,
{
    let rows = source.currency_balance(contract, owner, symbol).await?;
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    let quantity = TokenQuantity::parse(first)?;
    if quantity.symbol != symbol {
        return Err(SchedulerError::Malformed(format!(
            "expected {symbol} balance, got `{first}`"
        )));
    }
    quantity
        .rescale(precision)
        .ok_or_else(|| SchedulerError::Malformed(format!("balance `{first}` overflows")))
}
