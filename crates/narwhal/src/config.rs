//! Strategy field descriptors and config resolution.

use crate::graph::StrategyConfig;
use serde::Serialize;
use std::collections::BTreeMap;

/// One editable numeric setting, as exposed to configuration UIs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(skip)]
    pub default: f64,
}

impl FieldSpec {
    /// Coerces a raw value into this field's published range.
    ///
    /// Missing and non-finite values fall back to the default; integer-step fields are rounded.
    pub fn resolve(&self, raw: Option<f64>) -> f64 {
        let v = raw.filter(|v| v.is_finite()).unwrap_or(self.default);
        let v = if self.step >= 1.0 && self.step.fract() == 0.0 {
            v.round()
        } else {
            v
        };
        v.clamp(self.min, self.max)
    }
}

pub const NODE_SPACING: FieldSpec = FieldSpec {
    key: "nodeSpacing",
    label: "Node spacing",
    min: 8.0,
    max: 120.0,
    step: 1.0,
    default: 28.0,
};

/// `stability` with a strategy-specific default.
pub const fn stability(default: f64) -> FieldSpec {
    FieldSpec {
        key: "stability",
        label: "Frame stability",
        min: 0.0,
        max: 0.95,
        step: 0.05,
        default,
    }
}

/// Configuration with every declared field present and in range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    values: BTreeMap<&'static str, f64>,
}

impl ResolvedConfig {
    pub fn resolve(fields: &[FieldSpec], raw: Option<&StrategyConfig>) -> Self {
        let values = fields
            .iter()
            .map(|f| {
                let raw_value = raw.and_then(|r| r.get(f.key)).copied();
                (f.key, f.resolve(raw_value))
            })
            .collect();
        Self { values }
    }

    pub fn defaults(fields: &[FieldSpec]) -> Self {
        Self::resolve(fields, None)
    }

    /// Value of a declared field. Undeclared keys read as `0.0`.
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or_default()
    }

    /// Integer view of a declared field, never below `floor`.
    pub fn get_usize(&self, key: &str, floor: usize) -> usize {
        let v = self.get(key);
        if v.is_finite() && v > 0.0 {
            (v.round() as usize).max(floor)
        } else {
            floor
        }
    }

    pub fn to_map(&self) -> StrategyConfig {
        self.values
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }
}

/// Formats a number for one-line summaries: integers without decimals, others with up to two.
pub fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
