//! Named timeframe presets: bar interval, lookback window and objective weights.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::optimizer::WeightVector;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lookback {
    pub days: i64,
    pub weeks: i64,
    pub months: i64,
    pub years: i64,
}

impl Lookback {
    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn weeks(weeks: i64) -> Self {
        Self {
            weeks,
            ..Self::default()
        }
    }

    pub fn months(months: i64) -> Self {
        Self {
            months,
            ..Self::default()
        }
    }

    pub fn years(years: i64) -> Self {
        Self {
            years,
            ..Self::default()
        }
    }

    /// Months count as 30 days and years as 365.
    pub fn duration(&self) -> Duration {
        Duration::days(self.days + 7 * self.weeks + 30 * self.months + 365 * self.years)
    }

    pub fn since_timestamp(&self, now: DateTime<Utc>) -> i64 {
        (now - self.duration()).timestamp()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Bar interval in minutes.
    pub interval: u32,
    pub lookback: Lookback,
    pub weights: WeightVector,
}

pub fn builtin_presets() -> BTreeMap<String, Preset> {
    let preset = |interval, lookback| Preset {
        interval,
        lookback,
        weights: WeightVector::total_return_only(),
    };
    BTreeMap::from([
        ("intraday_15m".to_string(), preset(15, Lookback::weeks(1))),
        ("intraday_4h".to_string(), preset(240, Lookback::weeks(3))),
        ("short_term".to_string(), preset(240, Lookback::months(2))),
        ("medium_term".to_string(), preset(1440, Lookback::months(6))),
        ("long_term".to_string(), preset(1440, Lookback::years(1))),
    ])
}

pub fn load_presets(path: &Path) -> anyhow::Result<BTreeMap<String, Preset>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read presets: {}", path.display()))?;
    let presets: BTreeMap<String, Preset> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse presets: {}", path.display()))?;
    for (name, p) in &presets {
        if p.interval == 0 {
            bail!("preset {name}: interval must be > 0");
        }
        p.weights
            .validate()
            .with_context(|| format!("preset {name}"))?;
    }
    Ok(presets)
}
