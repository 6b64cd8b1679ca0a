//! Builders to construct the pass orchestrator from configuration.

use crate::config::{ResourceConfig, SchedulerConfig};
use crate::core::{
    ActionBuilder, Allocator, AssetClass, BalanceSource, ClaimSpec, Delay, InventorySource,
    OperationExecutor, PassOrchestrator, PassSettings, ResourceSource, ResourceSpec,
    SchedulerError, TokenCraftSpec, TokenSpec, TransactionSubmitter,
};
use crate::util::{whole_to_base_units, ResourceCost, ResourceKind};

fn to_base_units(cfg: &SchedulerConfig, resource: &str, whole: u64) -> Result<u64, SchedulerError> {
    let precision = cfg
        .resources
        .get(resource)
        .map(ResourceConfig::precision)
        .ok_or_else(|| SchedulerError::Config(format!("unknown resource `{resource}`")))?;
    whole_to_base_units(whole, precision)
        .ok_or_else(|| SchedulerError::Config(format!("`{resource}` quantity {whole} overflows")))
}

/// Build asset classes in priority order, converting recharge costs from
/// whole tokens to ledger base units.
///
/// # Errors
///
/// [`SchedulerError::Config`] when a cost names an unknown resource or
/// overflows.
pub fn build_classes(cfg: &SchedulerConfig) -> Result<Vec<AssetClass>, SchedulerError> {
    cfg.classes
        .iter()
        .map(|class| {
            let mut cost = ResourceCost::none();
            for (resource, whole) in &class.recharge_cost {
                cost = cost.with(resource.as_str(), to_base_units(cfg, resource, *whole)?);
            }
            Ok(AssetClass {
                id: class.id.clone(),
                template_id: class.template_id,
                cooldown_hours: class.cooldown_hours,
                recipe_id: class.recipe_id,
                destination: class.destination.clone(),
                recharge_cost: cost,
                recharge_enabled: class.recharge_enabled,
                produce_enabled: class.produce_enabled,
            })
        })
        .collect()
}

/// Resource pools and where each is refreshed from.
#[must_use]
pub fn build_resources(cfg: &SchedulerConfig) -> Vec<ResourceSpec> {
    cfg.resources
        .iter()
        .map(|(name, resource)| ResourceSpec {
            kind: ResourceKind::new(name.as_str()),
            source: match resource {
                ResourceConfig::Fungible {
                    contract,
                    symbol,
                    precision,
                } => ResourceSource::Fungible {
                    contract: contract.clone(),
                    symbol: symbol.clone(),
                    precision: *precision,
                },
                ResourceConfig::Units { template_id } => ResourceSource::Units {
                    template_id: *template_id,
                },
            },
        })
        .collect()
}

/// Action builder knowing every fungible resource's token.
#[must_use]
pub fn build_action_builder(cfg: &SchedulerConfig) -> ActionBuilder {
    cfg.resources
        .iter()
        .fold(ActionBuilder::new(&cfg.owner, &cfg.nft_contract), |builder, (name, resource)| {
            match resource {
                ResourceConfig::Fungible {
                    contract,
                    symbol,
                    precision,
                } => builder.with_token(
                    name.as_str(),
                    TokenSpec {
                        contract: contract.clone(),
                        symbol: symbol.clone(),
                        precision: *precision,
                    },
                ),
                ResourceConfig::Units { .. } => builder,
            }
        })
}

/// Settings for each pass.
#[must_use]
pub fn build_settings(cfg: &SchedulerConfig) -> PassSettings {
    PassSettings {
        owner: cfg.owner.clone(),
        collection: cfg.collection.clone(),
        page_size: cfg.page_size,
        confirmation_wait: cfg.confirmation_wait(),
        throttle_backoff: cfg.throttle_backoff(),
        attributes: cfg.attributes.clone(),
        recharge_after_production: cfg.recharge_after_production,
    }
}

/// Build a ready orchestrator from validated configuration and the
/// collaborators it drives.
///
/// # Errors
///
/// [`SchedulerError::Config`] when the configuration is invalid.
pub fn build_orchestrator<I, B, S, D>(
    cfg: &SchedulerConfig,
    inventory: I,
    balances: B,
    submitter: S,
    delay: D,
) -> Result<PassOrchestrator<I, B, S, D>, SchedulerError>
where
    I: InventorySource,
    B: BalanceSource,
    S: TransactionSubmitter,
    D: Delay,
{
    cfg.validate()
        .map_err(|e| SchedulerError::Config(format!("config invalid: {e}")))?;

    let classes = build_classes(cfg)?;
    let executor = OperationExecutor::new(build_action_builder(cfg), submitter);
    let mut orchestrator = PassOrchestrator::new(
        build_settings(cfg),
        classes,
        build_resources(cfg),
        Allocator::new(cfg.max_batch_size),
        inventory,
        balances,
        executor,
        delay,
    );

    if let Some(claim) = &cfg.claim {
        orchestrator = orchestrator.with_claim(ClaimSpec {
            contract: claim.contract.clone(),
            action: claim.action.clone(),
        });
    }
    match &cfg.secondary {
        Some(secondary) if secondary.enabled => {
            orchestrator = orchestrator.with_secondary(TokenCraftSpec {
                kind: ResourceKind::new(secondary.resource.as_str()),
                fee: to_base_units(cfg, &secondary.resource, secondary.fee)?,
                contract: secondary.contract.clone(),
                template_id: secondary.template_id,
            });
        }
        Some(_) => tracing::info!("secondary craft configured but disabled"),
        None => {}
    }

    tracing::info!(
        "orchestrator ready: {} classes, {} resources",
        cfg.classes.len(),
        cfg.resources.len()
    );
    Ok(orchestrator)
}
