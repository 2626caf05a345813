//! Windowed quantile estimator backing `Summary` series.
//!
//! The window is split into `window_buckets` rotating slots. Each slot keeps
//! exact `seen`/`sum`/`min`/`max` plus a uniform reservoir (Algorithm R) of at
//! most `capacity` samples. When time moves past a slot boundary the oldest
//! slot is cleared and reused, so memory per series is bounded by
//! `window_buckets * capacity` no matter how many observations arrive.
//!
//! Quantiles are read from the union of live reservoirs, each sample weighted
//! by `seen / samples.len()` of its slot, and resolved with a weighted
//! nearest-rank walk over the sorted union. Sorting first makes the result
//! monotone in `p` for any state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::Rng;

/// A tracked percentile and its acceptable rank error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    pub value: f64,
    pub tolerance: f64,
}

impl Percentile {
    pub fn new(value: f64, tolerance: f64) -> Self {
        Self { value, tolerance }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Ordered target percentiles.
    pub percentiles: Vec<Percentile>,
    /// Full sliding window.
    pub window: Duration,
    /// Number of rotating slots the window is split into.
    pub window_buckets: usize,
    /// Upper bound on reservoir size per slot.
    pub max_samples: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            percentiles: [0.5, 0.75, 0.98, 0.99, 0.999]
                .into_iter()
                .map(|p| Percentile::new(p, 0.05))
                .collect(),
            window: Duration::from_secs(600),
            window_buckets: 5,
            max_samples: 4096,
        }
    }
}

const MIN_RESERVOIR: usize = 64;

impl SummaryConfig {
    /// Reservoir size per slot: `ceil(1 / tol^2)` for the tightest tolerance.
    pub fn reservoir_capacity(&self) -> usize {
        let tightest = self
            .percentiles
            .iter()
            .map(|p| p.tolerance)
            .filter(|t| *t > 0.0)
            .fold(f64::INFINITY, f64::min);
        let upper = self.max_samples.max(MIN_RESERVOIR);
        if !tightest.is_finite() {
            return upper;
        }
        let wanted = (1.0 / (tightest * tightest)).ceil();
        if wanted >= upper as f64 {
            upper
        } else {
            (wanted as usize).max(MIN_RESERVOIR)
        }
    }

    fn slot_len(&self) -> Duration {
        let buckets = self.window_buckets.max(1) as u32;
        (self.window / buckets).max(Duration::from_millis(1))
    }
}

#[derive(Debug, Default)]
struct Slot {
    samples: Vec<f64>,
    seen: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Slot {
    fn offer(&mut self, v: f64, capacity: usize) {
        if self.seen == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.seen += 1;
        self.sum += v;

        if self.samples.len() < capacity {
            self.samples.push(v);
        } else {
            let j = rand::thread_rng().gen_range(0..self.seen);
            if (j as usize) < capacity {
                self.samples[j as usize] = v;
            }
        }
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.seen = 0;
        self.sum = 0.0;
        self.min = 0.0;
        self.max = 0.0;
    }

    fn weight(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.seen as f64 / self.samples.len() as f64
        }
    }
}

#[derive(Debug)]
struct WindowState {
    slots: Vec<Slot>,
    current: usize,
    slot_started: Instant,
    count: u64,
    sum: f64,
    last: f64,
}

impl WindowState {
    fn rotate(&mut self, now: Instant, slot_len: Duration) {
        let elapsed = now.saturating_duration_since(self.slot_started);
        if elapsed < slot_len {
            return;
        }
        let steps = elapsed.as_nanos() / slot_len.as_nanos();
        let n = self.slots.len();
        if steps >= n as u128 {
            self.slots.iter_mut().for_each(Slot::clear);
            self.slot_started = now;
            return;
        }
        for _ in 0..steps {
            self.current = (self.current + 1) % n;
            self.slots[self.current].clear();
        }
        self.slot_started += slot_len * steps as u32;
    }
}

/// Point-in-time view of one summary series.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    /// Exact lifetime observation count.
    pub count: u64,
    /// Exact lifetime sum.
    pub sum: f64,
    /// Most recent observation.
    pub last: f64,
    /// Window mean, min and max.
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `(percentile, estimate)` in configured order.
    pub quantiles: Vec<(f64, f64)>,
}

/// Count + sum + windowed quantiles.
#[derive(Debug)]
pub struct Summary {
    cfg: Arc<SummaryConfig>,
    capacity: usize,
    slot_len: Duration,
    state: Mutex<WindowState>,
}

impl Summary {
    pub fn new(cfg: Arc<SummaryConfig>) -> Self {
        Self::new_at(cfg, Instant::now())
    }

    pub(crate) fn new_at(cfg: Arc<SummaryConfig>, now: Instant) -> Self {
        let buckets = cfg.window_buckets.max(1);
        let state = WindowState {
            slots: (0..buckets).map(|_| Slot::default()).collect(),
            current: 0,
            slot_started: now,
            count: 0,
            sum: 0.0,
            last: 0.0,
        };
        Self {
            capacity: cfg.reservoir_capacity(),
            slot_len: cfg.slot_len(),
            cfg,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        // Poisoned state is still exportable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn observe(&self, value: f64) {
        self.observe_at(value, Instant::now());
    }

    pub(crate) fn observe_at(&self, value: f64, now: Instant) {
        let mut st = self.lock();
        st.rotate(now, self.slot_len);
        st.count += 1;
        st.sum += value;
        st.last = value;
        let cur = st.current;
        st.slots[cur].offer(value, self.capacity);
    }

    pub fn count(&self) -> u64 {
        self.lock().count
    }

    pub fn sum(&self) -> f64 {
        self.lock().sum
    }

    /// Current estimate for percentile `p` (0.0 when the window is empty).
    pub fn quantile(&self, p: f64) -> f64 {
        let mut st = self.lock();
        st.rotate(Instant::now(), self.slot_len);
        let weighted = collect_weighted(&st.slots);
        weighted_rank(&weighted, p)
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> SummarySnapshot {
        let mut st = self.lock();
        st.rotate(now, self.slot_len);

        let weighted = collect_weighted(&st.slots);
        let quantiles = self
            .cfg
            .percentiles
            .iter()
            .map(|p| (p.value, weighted_rank(&weighted, p.value)))
            .collect();

        let live = st.slots.iter().filter(|s| s.seen > 0);
        let (mut seen, mut sum) = (0u64, 0.0f64);
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for s in live {
            seen += s.seen;
            sum += s.sum;
            min = min.min(s.min);
            max = max.max(s.max);
        }
        let (mean, min, max) = if seen == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (sum / seen as f64, min, max)
        };

        SummarySnapshot {
            count: st.count,
            sum: st.sum,
            last: st.last,
            mean,
            min,
            max,
            quantiles,
        }
    }
}

fn collect_weighted(slots: &[Slot]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = slots
        .iter()
        .flat_map(|s| {
            let w = s.weight();
            s.samples.iter().map(move |v| (*v, w))
        })
        .collect();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

/// Weighted nearest-rank over samples sorted by value.
fn weighted_rank(sorted: &[(f64, f64)], p: f64) -> f64 {
    let Some(&(last, _)) = sorted.last() else {
        return 0.0;
    };
    let total: f64 = sorted.iter().map(|(_, w)| w).sum();
    let target = p.clamp(0.0, 1.0) * total;
    let mut acc = 0.0;
    for &(v, w) in sorted {
        acc += w;
        if acc >= target {
            return v;
        }
    }
    last
}
