use std::time::Duration;

/// One unit of stimulus presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial<K> {
    pub index: usize,
    pub kind: K,
    /// Clock reading at stimulus onset, once the stimulus has been shown.
    pub onset_ns: Option<u64>,
}

impl<K> Trial<K> {
    pub fn new(index: usize, kind: K) -> Self {
        Self {
            index,
            kind,
            onset_ns: None,
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult<K> {
    pub trial: Trial<K>,
    pub responded: bool,
    pub latency: Option<Duration>,
    pub correct: bool,
}

impl<K> TrialResult<K> {
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(duration_ms)
    }
}

/// Latency from `onset` to `response`. A response reading earlier than the
/// onset reading means the clock misbehaved; the latency is then absent.
pub fn latency_between(onset: u64, response: u64) -> Option<Duration> {
    response.checked_sub(onset).map(Duration::from_nanos)
}

pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

pub fn ns_to_ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}

/// Whole milliseconds, rounded to nearest.
pub fn ns_to_whole_ms(ns: u64) -> u64 {
    (ns + 500_000) / 1_000_000
}
