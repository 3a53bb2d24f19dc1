//! Continuity snapshots threaded between calls.
//!
//! The caller holds the snapshot as an opaque JSON value and passes it back on the next call.
//! Every strategy owns exactly one variant; anything else (missing, foreign, malformed) is
//! coerced to that strategy's empty snapshot.

use crate::error::Result;
use crate::geom::Point;
use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "snapshot")]
pub enum LayoutState {
    #[serde(rename = "hybrid-backbone")]
    HybridBackbone(ContinuityState),
    #[serde(rename = "temporal-anchor")]
    TemporalAnchor(ContinuityState),
    #[serde(rename = "barnes-hut-fa2")]
    BarnesHutFa2(ContinuityState),
    #[serde(rename = "stress-majorization")]
    StressMajorization(ContinuityState),
    #[serde(rename = "radial-sugiyama")]
    RadialSugiyama(ContinuityState),
    #[serde(rename = "fa2line")]
    Fa2Line(Fa2LineState),
}

/// Snapshot shared by the strategies built on the continuity base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuityState {
    #[serde(default)]
    pub temporal_key: String,
    /// Community anchors keyed by community id.
    #[serde(default)]
    pub anchors: BTreeMap<String, Point>,
    #[serde(default)]
    pub nodes: BTreeMap<String, ContinuityNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityNode {
    pub x: f64,
    pub y: f64,
    pub component: String,
    pub community: String,
}

impl ContinuityNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fa2LineState {
    #[serde(default)]
    pub temporal_key: String,
    /// Component anchors keyed by component id.
    #[serde(default)]
    pub anchors: BTreeMap<String, Point>,
    #[serde(default)]
    pub nodes: BTreeMap<String, Fa2LineNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fa2LineNode {
    pub x: f64,
    pub y: f64,
    pub component: String,
}

impl Fa2LineNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl LayoutState {
    pub fn empty(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Fa2Line => LayoutState::Fa2Line(Fa2LineState::default()),
            other => Self::from_continuity(other, ContinuityState::default()),
        }
    }

    /// Wraps a continuity snapshot in `kind`'s variant. `fa2line` has its own schema, so it
    /// gets an empty snapshot instead.
    pub fn from_continuity(kind: StrategyKind, snapshot: ContinuityState) -> Self {
        match kind {
            StrategyKind::HybridBackbone => LayoutState::HybridBackbone(snapshot),
            StrategyKind::TemporalAnchor => LayoutState::TemporalAnchor(snapshot),
            StrategyKind::BarnesHutFa2 => LayoutState::BarnesHutFa2(snapshot),
            StrategyKind::StressMajorization => LayoutState::StressMajorization(snapshot),
            StrategyKind::RadialSugiyama => LayoutState::RadialSugiyama(snapshot),
            StrategyKind::Fa2Line => LayoutState::Fa2Line(Fa2LineState::default()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            LayoutState::HybridBackbone(_) => StrategyKind::HybridBackbone,
            LayoutState::TemporalAnchor(_) => StrategyKind::TemporalAnchor,
            LayoutState::BarnesHutFa2(_) => StrategyKind::BarnesHutFa2,
            LayoutState::StressMajorization(_) => StrategyKind::StressMajorization,
            LayoutState::RadialSugiyama(_) => StrategyKind::RadialSugiyama,
            LayoutState::Fa2Line(_) => StrategyKind::Fa2Line,
        }
    }

    pub fn continuity(&self) -> Option<&ContinuityState> {
        match self {
            LayoutState::HybridBackbone(s)
            | LayoutState::TemporalAnchor(s)
            | LayoutState::BarnesHutFa2(s)
            | LayoutState::StressMajorization(s)
            | LayoutState::RadialSugiyama(s) => Some(s),
            LayoutState::Fa2Line(_) => None,
        }
    }

    pub fn fa2_line(&self) -> Option<&Fa2LineState> {
        match self {
            LayoutState::Fa2Line(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets an opaque previous-state value for `kind`.
    pub fn coerce(kind: StrategyKind, value: Option<&Value>) -> Self {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Self::empty(kind);
        };
        match LayoutState::deserialize(value) {
            Ok(state) if state.kind() == kind => state.sanitized(),
            Ok(state) => {
                tracing::debug!(
                    expected = kind.as_str(),
                    found = state.kind().as_str(),
                    "previous state belongs to another strategy; starting fresh"
                );
                Self::empty(kind)
            }
            Err(err) => {
                tracing::debug!(
                    strategy = kind.as_str(),
                    error = %err,
                    "previous state is malformed; starting fresh"
                );
                Self::empty(kind)
            }
        }
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn sanitized(mut self) -> Self {
        match &mut self {
            LayoutState::HybridBackbone(s)
            | LayoutState::TemporalAnchor(s)
            | LayoutState::BarnesHutFa2(s)
            | LayoutState::StressMajorization(s)
            | LayoutState::RadialSugiyama(s) => {
                s.anchors.retain(|_, p| p.is_bounded());
                s.nodes.retain(|_, n| n.position().is_bounded());
            }
            LayoutState::Fa2Line(s) => {
                s.anchors.retain(|_, p| p.is_bounded());
                s.nodes.retain(|_, n| n.position().is_bounded());
            }
        }
        self
    }
}
