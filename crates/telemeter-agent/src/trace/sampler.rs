//! Sampling decisions for new traces.

use std::sync::Mutex;
use std::time::Instant;

/// Sampler kinds accepted in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerType {
    Const,
    Probabilistic,
    RateLimiting,
}

impl SamplerType {
    pub fn as_str(self) -> &'static str {
        match self {
            SamplerType::Const => "const",
            SamplerType::Probabilistic => "probabilistic",
            SamplerType::RateLimiting => "ratelimiting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "const" => Some(SamplerType::Const),
            "probabilistic" => Some(SamplerType::Probabilistic),
            "ratelimiting" | "rate-limiting" => Some(SamplerType::RateLimiting),
            _ => None,
        }
    }
}

/// Token bucket refilled continuously (credits/sec, best-effort).
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last: Instant,
}

impl TokenBucket {
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self::new_at(capacity, refill_per_sec, Instant::now())
    }

    fn new_at(capacity: f64, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec,
            last: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
    }

    /// Take one credit if available.
    pub fn try_take(&mut self) -> bool {
        self.try_take_at(Instant::now())
    }

    fn try_take_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub enum Sampler {
    /// Sample everything (`param != 0`) or nothing.
    Const { decision: bool },
    /// Sample a trace when its id falls below `rate * u64::MAX`.
    Probabilistic { rate: f64, boundary: u64 },
    /// At most `param` new traces per second.
    RateLimiting { max_per_sec: f64, bucket: Mutex<TokenBucket> },
}

impl Sampler {
    pub fn new(kind: SamplerType, param: f64) -> Self {
        match kind {
            SamplerType::Const => Sampler::Const {
                decision: param != 0.0,
            },
            SamplerType::Probabilistic => {
                let rate = param.clamp(0.0, 1.0);
                let boundary = if rate >= 1.0 {
                    u64::MAX
                } else {
                    (rate * u64::MAX as f64) as u64
                };
                Sampler::Probabilistic { rate, boundary }
            }
            SamplerType::RateLimiting => {
                let max_per_sec = param.max(0.0);
                Sampler::RateLimiting {
                    max_per_sec,
                    bucket: Mutex::new(TokenBucket::new(max_per_sec.max(1.0), max_per_sec)),
                }
            }
        }
    }

    pub fn kind(&self) -> SamplerType {
        match self {
            Sampler::Const { .. } => SamplerType::Const,
            Sampler::Probabilistic { .. } => SamplerType::Probabilistic,
            Sampler::RateLimiting { .. } => SamplerType::RateLimiting,
        }
    }

    /// Decide for a brand-new trace.
    pub fn is_sampled(&self, trace_id: u64) -> bool {
        match self {
            Sampler::Const { decision } => *decision,
            Sampler::Probabilistic { rate, boundary } => *rate >= 1.0 || trace_id < *boundary,
            Sampler::RateLimiting { bucket, .. } => bucket
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .try_take(),
        }
    }
}
