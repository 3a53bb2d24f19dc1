use crate::config::ResolvedConfig;
use crate::error::Error;
use crate::graph::{AdjacencyMap, Layout};
use crate::state::LayoutState;
use serde::{Deserialize, Serialize};

/// Identifier of a built-in layout strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "hybrid-backbone")]
    HybridBackbone,
    #[serde(rename = "temporal-anchor")]
    TemporalAnchor,
    #[serde(rename = "barnes-hut-fa2")]
    BarnesHutFa2,
    #[serde(rename = "stress-majorization")]
    StressMajorization,
    #[serde(rename = "radial-sugiyama")]
    RadialSugiyama,
    #[serde(rename = "fa2line")]
    Fa2Line,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::HybridBackbone,
        StrategyKind::TemporalAnchor,
        StrategyKind::BarnesHutFa2,
        StrategyKind::StressMajorization,
        StrategyKind::RadialSugiyama,
        StrategyKind::Fa2Line,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::HybridBackbone => "hybrid-backbone",
            StrategyKind::TemporalAnchor => "temporal-anchor",
            StrategyKind::BarnesHutFa2 => "barnes-hut-fa2",
            StrategyKind::StressMajorization => "stress-majorization",
            StrategyKind::RadialSugiyama => "radial-sugiyama",
            StrategyKind::Fa2Line => "fa2line",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownStrategy {
            name: s.to_string(),
        })
    }
}

/// Everything a strategy needs for one call. Previous state is already coerced to this
/// strategy's variant and the config is already resolved against its fields.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub node_ids: &'a [String],
    pub adjacency: &'a AdjacencyMap,
    pub temporal_key: &'a str,
    pub previous: &'a LayoutState,
    pub config: &'a ResolvedConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutput {
    pub layout: Layout,
    pub state: LayoutState,
}

/// Uniform contract implemented by every positioning algorithm.
pub trait LayoutStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn run(&self, input: &LayoutInput<'_>) -> LayoutOutput;
}

#[cfg(test)]
mod tests {
    use super::StrategyKind;

    #[test]
    fn names_round_trip_through_from_name() {
        for kind in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(StrategyKind::from_name("unknown"), None);
    }

    #[test]
    fn parse_error_names_the_missing_strategy() {
        let err = "nope".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown strategy: nope");
    }
}
