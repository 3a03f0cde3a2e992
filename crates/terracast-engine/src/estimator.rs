//! The estimation orchestrator.
//!
//! Drives the five phases over one request: graph sealing, provider
//! finalization, expansion, derivation, result assembly. Each phase
//! transition is asserted; cancellation is checked between phases and
//! before every instance dispatch.
//!
//! Determinism: definitions expand in address order, instances within
//! a dependency level derive in address order, and every aggregation
//! reads from sorted maps, so pool width never changes the output.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use terracast_core::envelope::InputEnvelope;
use terracast_core::error::{EstimateError, EstimateResult};
use terracast_core::input::ParsedConfig;
use terracast_core::usage::UsageContext;
use terracast_graph::{DependencyGraph, GraphBuilder, GraphError, NodeId};
use terracast_mappers::MapperRegistry;
use terracast_pricing::PricingSnapshot;

use crate::asset::AssetInstance;
use crate::context::{CancelSignal, EngineConfig};
use crate::cost::{CostGraph, Warning};
use crate::derive::derive_asset;
use crate::expand::{classify_count, classify_for_each, expand_definition, Cardinality, Expansion};
use crate::phase::{EnginePhase, PhaseMachine};
use crate::pool::{run_level, spawn_sampler, ProgressTracker};
use crate::provider;
use crate::result::{EstimationResult, GraphExport};

/// The estimation engine facade.
///
/// Holds the process-wide immutable collaborators (mapper registry,
/// configuration); everything request-scoped is passed to
/// [`estimate`](Self::estimate).
pub struct Estimator {
    registry: Arc<MapperRegistry>,
    config: EngineConfig,
}

impl Estimator {
    /// Creates an estimator with an explicit registry and config.
    #[must_use]
    pub fn new(registry: Arc<MapperRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// The built-in registry with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(MapperRegistry::builtin()), EngineConfig::default())
    }

    /// Runs one estimation.
    pub fn estimate(
        &self,
        envelope: &InputEnvelope,
        parsed: &ParsedConfig,
        snapshot: &PricingSnapshot,
        usage: &UsageContext,
        cancel: &CancelSignal,
    ) -> EstimateResult<EstimationResult> {
        let started = Instant::now();
        let mut phases = PhaseMachine::new();
        let mode = envelope.mode;

        assert!(
            !envelope.input_hash.is_empty(),
            "envelope reached the engine without an input hash"
        );
        cancel.check()?;

        // Phase: graph.
        phases.advance(EnginePhase::Graph);
        let graph = seal_graph(parsed)?;
        cancel.check()?;

        // Phase: providers.
        phases.advance(EnginePhase::Providers);
        let providers = provider::finalize(&parsed.providers, &graph, &self.config.hints);
        cancel.check()?;

        // Phase: expansion.
        phases.advance(EnginePhase::Expansion);
        let mut cost_graph = CostGraph::new(self.config.currency);
        let mut assets: Vec<AssetInstance> = Vec::new();

        let mut resources: Vec<_> = parsed.resources.iter().collect();
        resources.sort_by(|a, b| a.address.cmp(&b.address));
        for resource in resources {
            cancel.check()?;
            let definition_id = NodeId::new(&resource.address);
            let binding =
                providers.resolve_binding(resource.provider.as_deref(), &resource.resource_type);
            let expansion = expand_definition(
                &definition_id,
                &resource.resource_type,
                resource.count.as_ref(),
                resource.for_each.as_ref(),
                &resource.attributes,
                &binding,
                mode,
            )?;
            match expansion {
                Expansion::Instances(instances) => assets.extend(instances),
                Expansion::Bucket(bucket) => cost_graph.add_bucket(bucket),
            }
        }

        // Modules with unresolvable cardinality hide an unknown number
        // of resources; they bucket as a whole.
        let mut modules: Vec<_> = parsed.modules.iter().collect();
        modules.sort_by(|a, b| a.address.cmp(&b.address));
        for module in modules {
            cancel.check()?;
            let classified = match (&module.count, &module.for_each) {
                (Some(expr), _) => Some((classify_count(expr), expr.raw.clone())),
                (None, Some(expr)) => Some((classify_for_each(expr), expr.raw.clone())),
                (None, None) => None,
            };
            match classified {
                Some((Cardinality::Unknown { reason }, expression)) => {
                    if mode.is_strict() {
                        return Err(EstimateError::unknown_cardinality(
                            &module.address,
                            expression,
                        ));
                    }
                    cost_graph.add_bucket(crate::cost::SymbolicBucket::unknown(
                        &module.address,
                        reason,
                        expression,
                    ));
                }
                Some((Cardinality::Range {
                    reason,
                    lower,
                    upper,
                }, expression)) => {
                    if mode.is_strict() {
                        return Err(EstimateError::unknown_cardinality(
                            &module.address,
                            expression,
                        ));
                    }
                    cost_graph.add_bucket(crate::cost::SymbolicBucket::range(
                        &module.address,
                        reason,
                        expression,
                        lower,
                        upper,
                    ));
                }
                _ => {}
            }
        }

        debug!(
            instances = assets.len(),
            buckets = cost_graph.buckets().len(),
            "expansion complete"
        );
        cancel.check()?;

        // Phase: derivation.
        phases.advance(EnginePhase::Derivation);
        let mut warnings: Vec<Warning> = Vec::new();
        self.derive_all(
            assets,
            &graph,
            snapshot,
            usage,
            mode,
            envelope,
            cancel,
            &mut cost_graph,
            &mut warnings,
        )?;

        // Phase: complete.
        phases.advance(EnginePhase::Complete);
        let graph_export = envelope
            .options
            .include_dependency_graph
            .then(|| GraphExport::from_graph(&graph));

        let result = EstimationResult {
            input_hash: envelope.input_hash.clone(),
            mode,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            snapshot_id: snapshot.meta().id.to_string(),
            snapshot_hash: snapshot.content_hash().to_string(),
            cost_graph,
            warnings,
            options: envelope.options,
            graph_export,
            generated_at: Utc::now(),
            duration: started.elapsed(),
        };

        info!(
            input_hash = %result.input_hash,
            monthly = %result.total_monthly().to_decimal_string(),
            confidence = %result.confidence(),
            duration_ms = result.duration.as_millis() as u64,
            "estimation complete"
        );
        Ok(result)
    }

    /// Derives all assets level by level on the worker pool.
    #[allow(clippy::too_many_arguments)]
    fn derive_all(
        &self,
        mut assets: Vec<AssetInstance>,
        graph: &DependencyGraph,
        snapshot: &PricingSnapshot,
        usage: &UsageContext,
        mode: terracast_core::envelope::EstimationMode,
        envelope: &InputEnvelope,
        cancel: &CancelSignal,
        cost_graph: &mut CostGraph,
        warnings: &mut Vec<Warning>,
    ) -> EstimateResult<()> {
        // Dependency depth per definition node.
        let mut depth_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        for (depth, level) in graph.levels().into_iter().enumerate() {
            for id in level {
                depth_of.insert(id, depth);
            }
        }

        assets.sort_by(|a, b| {
            let da = depth_of.get(&a.definition_id).copied().unwrap_or(0);
            let db = depth_of.get(&b.definition_id).copied().unwrap_or(0);
            da.cmp(&db).then_with(|| a.address.cmp(&b.address))
        });

        let tracker = Arc::new(ProgressTracker::new(assets.len()));
        let _sampler = spawn_sampler(Arc::clone(&tracker), self.config.progress_interval);

        let mut index = 0;
        while index < assets.len() {
            cancel.check()?;
            let depth = depth_of
                .get(&assets[index].definition_id)
                .copied()
                .unwrap_or(0);
            let mut end = index;
            while end < assets.len()
                && depth_of
                    .get(&assets[end].definition_id)
                    .copied()
                    .unwrap_or(0)
                    == depth
            {
                end += 1;
            }
            let level: Vec<AssetInstance> = assets[index..end].to_vec();
            index = end;

            let include_lineage = envelope.options.include_lineage;
            let outputs = run_level(self.config.worker_width, level.clone(), |asset| {
                if cancel.is_cancelled() {
                    tracker.fail_one();
                    return Err(EstimateError::Cancelled);
                }
                let result = derive_asset(
                    asset,
                    graph,
                    &self.registry,
                    snapshot,
                    usage,
                    &self.config,
                    mode,
                    include_lineage,
                );
                match &result {
                    Ok(_) => tracker.complete_one(),
                    Err(_) => tracker.fail_one(),
                }
                result
            });

            // Results come back in dispatch order, which is address
            // order within the level.
            for (asset, output) in level.iter().zip(outputs) {
                let output = output?;
                warnings.extend(output.warnings);
                cost_graph.insert_asset(&asset.id, &asset.address, output.units);
            }
        }
        Ok(())
    }
}

/// Builds and seals the dependency graph, converting graph errors to
/// the engine's error taxonomy.
fn seal_graph(parsed: &ParsedConfig) -> EstimateResult<DependencyGraph> {
    GraphBuilder::from_config(parsed).seal().map_err(|e| match e {
        GraphError::Cycle { node } => EstimateError::Cycle {
            node: node.to_string(),
        },
        // from_config never emits dangling edges; reaching this is a
        // composition bug.
        GraphError::MissingEndpoint { node } => {
            panic!("dangling edge endpoint {node} in built graph")
        }
    })
}
