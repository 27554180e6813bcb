//! Price bars, ingestion ordering and the bar source boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StrategyError};

/// Timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(ts: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
        }
    }

    /// Bar whose four prices all equal `close`.
    pub fn flat(ts: i64, close: f64) -> Self {
        Self::new(ts, close, close, close, close)
    }
}

/// Bars held in strictly ascending timestamp order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Sorts the bars ascending and checks that timestamps are unique and
    /// prices are positive. Exchanges often hand data back newest-first.
    pub fn new(mut bars: Vec<Bar>) -> Result<Self> {
        bars.sort_by_key(|b| b.ts);

        for pair in bars.windows(2) {
            if pair[0].ts == pair[1].ts {
                return Err(StrategyError::InvalidBars(format!(
                    "duplicate timestamp {}",
                    pair[0].ts
                )));
            }
        }
        if let Some(b) = bars.iter().find(|b| {
            ![b.open, b.high, b.low, b.close]
                .iter()
                .all(|p| p.is_finite() && *p > 0.0)
        }) {
            return Err(StrategyError::InvalidBars(format!(
                "non-positive price at timestamp {}",
                b.ts
            )));
        }

        Ok(Self { bars })
    }

    /// Builds a series from closes only, one bar per `step` seconds.
    pub fn from_closes(closes: &[f64], start_ts: i64, step: i64) -> Result<Self> {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::flat(start_ts + i as i64 * step, c))
            .collect();
        Self::new(bars)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn since(&self, since: i64) -> Self {
        Self {
            bars: self.bars.iter().copied().filter(|b| b.ts >= since).collect(),
        }
    }
}

pub fn load_bars_from_csv(path: &Path) -> anyhow::Result<BarSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open csv: {}", path.display()))?;

    let mut bars = Vec::new();
    let mut skipped = 0_usize;
    for rec in rdr.records() {
        let r = match rec {
            Ok(x) => x,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        let ts = r
            .get(0)
            .and_then(|x| x.trim().parse::<i64>().ok())
            .map(|x| if x > MILLIS_THRESHOLD { x / 1000 } else { x });
        let o = r.get(1).and_then(|x| x.trim().parse::<f64>().ok());
        let h = r.get(2).and_then(|x| x.trim().parse::<f64>().ok());
        let l = r.get(3).and_then(|x| x.trim().parse::<f64>().ok());
        let c = r.get(4).and_then(|x| x.trim().parse::<f64>().ok());
        if let (Some(ts), Some(open), Some(high), Some(low), Some(close)) = (ts, o, h, l, c) {
            bars.push(Bar::new(ts, open, high, low, close));
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped malformed csv rows");
    }

    let series = BarSeries::new(bars)
        .with_context(|| format!("invalid bars in {}", path.display()))?;
    debug!(path = %path.display(), bars = series.len(), "loaded bars");
    Ok(series)
}

/// Supplies historical bars for a symbol. Implementations own any network or
/// file access; the returned series is already in ascending order.
pub trait BarSource {
    fn fetch(&self, symbol: &str, interval_minutes: u32, since: i64) -> anyhow::Result<BarSeries>;
}

/// Reads `<dir>/<SYMBOL>_<interval>.csv`.
#[derive(Clone, Debug)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, interval_minutes: u32) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_uppercase(), interval_minutes))
    }
}

impl BarSource for CsvBarSource {
    fn fetch(&self, symbol: &str, interval_minutes: u32, since: i64) -> anyhow::Result<BarSeries> {
        let path = self.path_for(symbol, interval_minutes);
        let series = load_bars_from_csv(&path)?.since(since);
        if series.is_empty() {
            bail!(
                "no bars at or after {} in {}",
                since,
                path.display()
            );
        }
        Ok(series)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub symbol: String,
    pub interval_minutes: u32,
    pub since: i64,
}

/// Memoizes another source by `(symbol, interval, since)`. Entries live until
/// they are invalidated or the cache is cleared.
///
/// The cache lock is held across a miss, so concurrent callers are
/// serialized and each key reaches the inner source at most once until it
/// is invalidated.
#[derive(Debug)]
pub struct MemoizedBarSource<S> {
    inner: S,
    cache: Mutex<HashMap<FetchKey, BarSeries>>,
}

impl<S: BarSource> MemoizedBarSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn invalidate(&self, key: &FetchKey) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<FetchKey, BarSeries>> {
        // A poisoned cache only means a fetch panicked; the map itself is intact.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: BarSource> BarSource for MemoizedBarSource<S> {
    fn fetch(&self, symbol: &str, interval_minutes: u32, since: i64) -> anyhow::Result<BarSeries> {
        let key = FetchKey {
            symbol: symbol.to_string(),
            interval_minutes,
            since,
        };
        let mut cache = self.lock();
        if let Some(hit) = cache.get(&key) {
            debug!(symbol, interval_minutes, since, "bar cache hit");
            return Ok(hit.clone());
        }
        let series = self.inner.fetch(symbol, interval_minutes, since)?;
        cache.insert(key, series.clone());
        Ok(series)
    }
}
