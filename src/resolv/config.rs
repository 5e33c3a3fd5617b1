//! Tuning the resolver engine.

use super::conf::ResolvConf;
use std::cmp;
use std::time::Duration;

//------------ Configuration Constants ----------------------------------------

/// Configuration limits for the interval between cache sweeps.
const SWEEP_INTERVAL: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(300),
    Duration::from_secs(1),
    Duration::from_secs(86400),
);

/// Configuration limits for the initial retransmit timeout.
const RETRANSMIT_TIMEOUT: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(1),
    Duration::from_millis(10),
    Duration::from_secs(60),
);

/// Configuration limits for the number of retransmissions.
const MAX_RETRIES: DefMinMax<u8> = DefMinMax::new(4, 0, 32);

/// Configuration limits for how long negative answers are cached.
const NEGATIVE_TTL: DefMinMax<u32> = DefMinMax::new(300, 1, 86400);

/// Configuration limits for how long a timed out query is remembered.
const FAILURE_HOLD: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(30),
    Duration::from_secs(1),
    Duration::from_secs(300),
);

/// The largest factor the retransmit timeout grows to.
const MAX_BACKOFF_SHIFT: u32 = 4;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//------------ Config ---------------------------------------------------------

/// Configuration for a resolver engine.
///
/// All setters silently limit their values to a sensible range.
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between cache sweeps.
    sweep_interval: Duration,

    /// Timeout before the first retransmission.
    retransmit_timeout: Duration,

    /// Number of retransmissions before a query times out.
    max_retries: u8,

    /// Time in seconds negative answers are kept.
    negative_ttl: u32,

    /// Time a timed out query is reported as failed.
    failure_hold: Duration,

    /// Whether the driver should return once the engine is idle.
    shutdown_when_idle: bool,
}

impl Config {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a config using timeout and attempts of a resolver config.
    pub fn from_conf(conf: &ResolvConf) -> Self {
        let mut res = Self::new();
        res.set_retransmit_timeout(conf.timeout);
        res.set_max_retries(
            u8::try_from(conf.attempts.saturating_sub(1)).unwrap_or(u8::MAX),
        );
        res
    }

    /// Returns the interval between cache sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Sets the interval between cache sweeps.
    ///
    /// The value is limited to between one second and one day.
    pub fn set_sweep_interval(&mut self, value: Duration) {
        self.sweep_interval = SWEEP_INTERVAL.limit(value)
    }

    /// Returns the initial retransmit timeout.
    pub fn retransmit_timeout(&self) -> Duration {
        self.retransmit_timeout
    }

    /// Sets the initial retransmit timeout.
    ///
    /// The timeout doubles with every retransmission up to sixteen times
    /// this value.
    pub fn set_retransmit_timeout(&mut self, value: Duration) {
        self.retransmit_timeout = RETRANSMIT_TIMEOUT.limit(value)
    }

    /// Returns the maximum number of retransmissions.
    pub fn max_retries(&self) -> u8 {
        self.max_retries
    }

    /// Sets the maximum number of retransmissions.
    pub fn set_max_retries(&mut self, value: u8) {
        self.max_retries = MAX_RETRIES.limit(value)
    }

    /// Returns how many seconds negative answers are cached.
    pub fn negative_ttl(&self) -> u32 {
        self.negative_ttl
    }

    /// Sets how many seconds negative answers are cached.
    pub fn set_negative_ttl(&mut self, value: u32) {
        self.negative_ttl = NEGATIVE_TTL.limit(value)
    }

    /// Returns how long a timed out query is reported as failed.
    pub fn failure_hold(&self) -> Duration {
        self.failure_hold
    }

    /// Sets how long a timed out query is reported as failed.
    pub fn set_failure_hold(&mut self, value: Duration) {
        self.failure_hold = FAILURE_HOLD.limit(value)
    }

    /// Returns whether the driver stops once the engine is idle.
    pub fn shutdown_when_idle(&self) -> bool {
        self.shutdown_when_idle
    }

    /// Sets whether the driver stops once the engine is idle.
    pub fn set_shutdown_when_idle(&mut self, value: bool) {
        self.shutdown_when_idle = value
    }

    /// Returns the timeout after the given retransmission step.
    pub fn backoff(&self, step: u8) -> Duration {
        let shift = cmp::min(u32::from(step), MAX_BACKOFF_SHIFT);
        self.retransmit_timeout * (1 << shift)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sweep_interval: SWEEP_INTERVAL.default(),
            retransmit_timeout: RETRANSMIT_TIMEOUT.default(),
            max_retries: MAX_RETRIES.default(),
            negative_ttl: NEGATIVE_TTL.default(),
            failure_hold: FAILURE_HOLD.default(),
            shutdown_when_idle: false,
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn limits() {
        let mut config = Config::new();
        config.set_sweep_interval(Duration::ZERO);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
        config.set_retransmit_timeout(Duration::from_secs(3600));
        assert_eq!(config.retransmit_timeout(), Duration::from_secs(60));
        config.set_max_retries(200);
        assert_eq!(config.max_retries(), 32);
        config.set_negative_ttl(0);
        assert_eq!(config.negative_ttl(), 1);
        config.set_failure_hold(Duration::from_secs(1000));
        assert_eq!(config.failure_hold(), Duration::from_secs(300));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(4, 16)]
    #[case(9, 16)]
    fn backoff(#[case] step: u8, #[case] secs: u64) {
        assert_eq!(Config::new().backoff(step), Duration::from_secs(secs));
    }

    #[test]
    fn from_resolv_conf() {
        let mut conf = ResolvConf::new();
        conf.timeout = Duration::from_secs(2);
        conf.attempts = 3;
        let config = Config::from_conf(&conf);
        assert_eq!(config.retransmit_timeout(), Duration::from_secs(2));
        assert_eq!(config.max_retries(), 2);
    }
}
