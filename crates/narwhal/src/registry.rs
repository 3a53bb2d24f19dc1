use crate::algo::backbone::{self, BackbonePlacement};
use crate::algo::barnes_hut::{self, BarnesHutPlacement};
use crate::algo::continuity::ContinuityStrategy;
use crate::algo::fa2_line::{self, Fa2LineStrategy};
use crate::algo::radial_sugiyama::{self, RadialSugiyamaPlacement};
use crate::algo::stress::{self, StressPlacement};
use crate::algo::temporal::{self, TemporalPlacement};
use crate::config::{FieldSpec, ResolvedConfig};
use crate::error::{Error, Result};
use crate::graph::StrategyConfig;
use crate::strategy::{LayoutStrategy, StrategyKind};
use indexmap::IndexMap;
use serde::Serialize;

pub type SummarizeFn = fn(&ResolvedConfig) -> String;

/// `{value, label}` pair for a strategy picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub struct StrategyEntry {
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    pub summarize: SummarizeFn,
    pub algorithm: Box<dyn LayoutStrategy>,
}

/// Strategy lookup table, built once and passed by reference to [`crate::layout`].
///
/// Options are listed in registration order.
pub struct StrategyRegistry {
    entries: IndexMap<StrategyKind, StrategyEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Registers `entry` under its algorithm's kind, replacing any previous entry.
    pub fn insert(&mut self, entry: StrategyEntry) {
        self.entries.insert(entry.algorithm.kind(), entry);
    }

    pub fn with_defaults() -> Self {
        let mut reg = Self::new();

        reg.insert(StrategyEntry {
            label: "Hybrid backbone",
            fields: &backbone::FIELDS,
            summarize: backbone::summarize,
            algorithm: Box::new(ContinuityStrategy::new(
                StrategyKind::HybridBackbone,
                BackbonePlacement,
            )),
        });
        reg.insert(StrategyEntry {
            label: "Temporal anchor",
            fields: &temporal::FIELDS,
            summarize: temporal::summarize,
            algorithm: Box::new(ContinuityStrategy::new(
                StrategyKind::TemporalAnchor,
                TemporalPlacement,
            )),
        });
        reg.insert(StrategyEntry {
            label: "ForceAtlas2 (Barnes-Hut)",
            fields: &barnes_hut::FIELDS,
            summarize: barnes_hut::summarize,
            algorithm: Box::new(ContinuityStrategy::new(
                StrategyKind::BarnesHutFa2,
                BarnesHutPlacement,
            )),
        });
        reg.insert(StrategyEntry {
            label: "Stress majorization",
            fields: &stress::FIELDS,
            summarize: stress::summarize,
            algorithm: Box::new(ContinuityStrategy::new(
                StrategyKind::StressMajorization,
                StressPlacement,
            )),
        });
        reg.insert(StrategyEntry {
            label: "Radial Sugiyama",
            fields: &radial_sugiyama::FIELDS,
            summarize: radial_sugiyama::summarize,
            algorithm: Box::new(ContinuityStrategy::new(
                StrategyKind::RadialSugiyama,
                RadialSugiyamaPlacement,
            )),
        });
        reg.insert(StrategyEntry {
            label: "FA2 line",
            fields: &fa2_line::FIELDS,
            summarize: fa2_line::summarize,
            algorithm: Box::new(Fa2LineStrategy),
        });

        reg
    }

    fn entry(&self, name: &str) -> Result<&StrategyEntry> {
        StrategyKind::from_name(name)
            .and_then(|kind| self.entries.get(&kind))
            .ok_or_else(|| Error::UnknownStrategy {
                name: name.to_string(),
            })
    }

    /// Fails with [`Error::UnknownStrategy`] for names that are not registered.
    pub fn get_strategy(&self, name: &str) -> Result<&dyn LayoutStrategy> {
        Ok(self.entry(name)?.algorithm.as_ref())
    }

    pub fn options(&self) -> Vec<StrategyOption> {
        self.entries
            .iter()
            .map(|(kind, entry)| StrategyOption {
                value: kind.as_str(),
                label: entry.label,
            })
            .collect()
    }

    pub fn fields(&self, name: &str) -> Result<&'static [FieldSpec]> {
        Ok(self.entry(name)?.fields)
    }

    pub fn default_config(&self, name: &str) -> Result<StrategyConfig> {
        Ok(ResolvedConfig::defaults(self.entry(name)?.fields).to_map())
    }

    pub fn resolve_config(&self, name: &str, raw: Option<&StrategyConfig>) -> Result<ResolvedConfig> {
        Ok(ResolvedConfig::resolve(self.entry(name)?.fields, raw))
    }

    /// One-line, display-only description of `raw` after resolution.
    pub fn summarize_config(&self, name: &str, raw: Option<&StrategyConfig>) -> Result<String> {
        let entry = self.entry(name)?;
        Ok((entry.summarize)(&ResolvedConfig::resolve(entry.fields, raw)))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
