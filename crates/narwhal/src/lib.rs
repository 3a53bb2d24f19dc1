#![forbid(unsafe_code)]

//! Deterministic, continuity-preserving layout engine for alliance treaty graphs.
//!
//! A call takes the visible node ids, their adjacency and the opaque state returned by the
//! previous call, and returns anchored components/communities plus one target per node. The
//! engine keeps nothing between calls; continuity lives entirely in the caller-held state.
//!
//! Set `NARWHAL_LAYOUT_TIMING=1` to log per-call timings at `info` level.

mod algo;
pub mod config;
pub mod error;
pub mod geom;
pub mod graph;
pub mod hash;
pub mod registry;
pub mod state;
pub mod strategy;

pub use config::{FieldSpec, ResolvedConfig};
pub use error::{Error, Result};
pub use geom::Point;
pub use graph::{
    AdjacencyMap, CommunityLayout, ComponentLayout, Layout, LayoutMetadata, LayoutRequest,
    LayoutResponse, NodeTarget, StrategyConfig, adjacency_from_edges,
};
pub use registry::{StrategyEntry, StrategyOption, StrategyRegistry};
pub use state::LayoutState;
pub use strategy::{LayoutInput, LayoutOutput, LayoutStrategy, StrategyKind};

/// Dispatch entry point: runs `request.strategy_name` from `registry`.
///
/// Unknown strategy names are the only failure; malformed previous state and out-of-range
/// config values are recovered silently.
pub fn layout(registry: &StrategyRegistry, request: &LayoutRequest) -> Result<LayoutResponse> {
    let strategy = registry.get_strategy(&request.strategy_name)?;
    let kind = strategy.kind();
    let config = registry.resolve_config(&request.strategy_name, request.strategy_config.as_ref())?;
    let previous = LayoutState::coerce(kind, request.previous_state.as_ref());

    let span = tracing::debug_span!(
        "layout",
        strategy = kind.as_str(),
        temporal_key = request.temporal_key.as_str(),
        nodes = request.node_ids.len()
    );
    let _enter = span.enter();

    let timing_enabled = std::env::var("NARWHAL_LAYOUT_TIMING").ok().as_deref() == Some("1");
    let start = timing_enabled.then(std::time::Instant::now);

    let output = strategy.run(&LayoutInput {
        node_ids: &request.node_ids,
        adjacency: &request.adjacency_by_node_id,
        temporal_key: &request.temporal_key,
        previous: &previous,
        config: &config,
    });

    if let Some(s) = start {
        tracing::info!(
            strategy = kind.as_str(),
            elapsed = ?s.elapsed(),
            nodes = output.layout.node_targets.len(),
            components = output.layout.components.len(),
            "layout timing"
        );
    }

    Ok(LayoutResponse {
        layout: output.layout,
        metadata: LayoutMetadata {
            state: output.state.to_value()?,
        },
    })
}
