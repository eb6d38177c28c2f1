use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" for reservation timestamps and TTL checks.
///
/// The engine never reads the wall clock directly. Production code wires in
/// a [`SystemClock`]; tests and simulations drive a [`ManualClock`] so expiry
/// behavior can be asserted without sleeping.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now_in_s(&self) -> i64;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl Clock for SystemClock {
    fn now_in_s(&self) -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs() as i64
    }
}

/// A clock whose time only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<RwLock<i64>>,
}

impl ManualClock {
    pub fn new(time: i64) -> Self {
        ManualClock { time: Arc::new(RwLock::new(time)) }
    }

    pub fn set(&self, time: i64) {
        *self.time.write().expect("lock poisoned") = time;
    }

    pub fn advance(&self, delta: i64) {
        *self.time.write().expect("lock poisoned") += delta;
    }
}

impl Clock for ManualClock {
    fn now_in_s(&self) -> i64 {
        *self.time.read().expect("lock poisoned")
    }
}
