//! Manager configuration.
//!
//! [`BddConfig`] fixes sizes at construction time. [`Options`] holds the
//! runtime knobs that can be read and changed on a live manager, either
//! through typed accessors or through the flat key/value surface
//! ([`ConfigKey`] + [`OptionValue`]).

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::bdd::Bdd;
use crate::cache::DEFAULT_CACHE_BITS;
use crate::error::{Error, Result};
use crate::subtable::DEFAULT_BUCKET_BITS;

/// Construction-time configuration of a [`Bdd`](crate::bdd::Bdd).
#[derive(Debug, Clone)]
pub struct BddConfig {
    /// Initial node storage capacity.
    pub capacity: usize,
    /// Computed table size in bits (2^bits slots).
    pub cache_bits: usize,
    /// Initial subtable size in bits (2^bits buckets per level).
    pub subtable_bits: usize,
    /// Initial runtime options.
    pub options: Options,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            capacity: 1 << 12,
            cache_bits: DEFAULT_CACHE_BITS,
            subtable_bits: DEFAULT_BUCKET_BITS,
            options: Options::default(),
        }
    }
}

impl BddConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_cache_bits(mut self, bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);
        self.cache_bits = bits;
        self
    }

    pub fn with_subtable_bits(mut self, bits: usize) -> Self {
        assert!(bits <= 24, "Subtable bits must be in range 0..=24, got {}", bits);
        self.subtable_bits = bits;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }
}

/// Runtime options of a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Automatic dynamic reordering.
    pub reordering: bool,
    /// Automatic garbage collection at safe points.
    pub garbage_collection: bool,
    /// Memory budget in bytes, reported only (0 = unlimited).
    pub max_memory: u64,
    /// Below this many allocated nodes no automatic collection happens.
    pub loose_up_to: usize,
    /// Upper bound on computed table slots.
    pub max_cache_hard: usize,
    /// Hit ratio (percent) above which the computed table grows.
    pub min_hit: u32,
    /// Sifting stops moving a variable once the size exceeds `max_growth` times the best size.
    pub max_growth: f64,
    /// Maximum number of swaps in one reordering.
    pub max_swaps: usize,
    /// Maximum number of variables sifted in one reordering.
    pub max_vars: usize,
    /// Current computed table size. Read-only.
    pub max_cache_soft: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reordering: false,
            garbage_collection: true,
            max_memory: 0,
            loose_up_to: 1 << 14,
            max_cache_hard: 1 << 20,
            min_hit: 30,
            max_growth: 1.2,
            max_swaps: 2_000_000,
            max_vars: 1000,
            max_cache_soft: 1 << DEFAULT_CACHE_BITS,
        }
    }
}

/// The recognized configuration keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Reordering,
    GarbageCollection,
    MaxMemory,
    LooseUpTo,
    MaxCacheHard,
    MinHit,
    MaxGrowth,
    MaxSwaps,
    MaxVars,
    MaxCacheSoft,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 10] = [
        ConfigKey::Reordering,
        ConfigKey::GarbageCollection,
        ConfigKey::MaxMemory,
        ConfigKey::LooseUpTo,
        ConfigKey::MaxCacheHard,
        ConfigKey::MinHit,
        ConfigKey::MaxGrowth,
        ConfigKey::MaxSwaps,
        ConfigKey::MaxVars,
        ConfigKey::MaxCacheSoft,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::Reordering => "reordering",
            ConfigKey::GarbageCollection => "garbage_collection",
            ConfigKey::MaxMemory => "max_memory",
            ConfigKey::LooseUpTo => "loose_up_to",
            ConfigKey::MaxCacheHard => "max_cache_hard",
            ConfigKey::MinHit => "min_hit",
            ConfigKey::MaxGrowth => "max_growth",
            ConfigKey::MaxSwaps => "max_swaps",
            ConfigKey::MaxVars => "max_vars",
            ConfigKey::MaxCacheSoft => "max_cache_soft",
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, ConfigKey::MaxCacheSoft)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownParameter(s.to_string()))
    }
}

/// A value on the flat configuration surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        OptionValue::Int(i)
    }
}

impl From<f64> for OptionValue {
    fn from(x: f64) -> Self {
        OptionValue::Float(x)
    }
}

impl OptionValue {
    fn as_bool(self, key: ConfigKey) -> Result<bool> {
        match self {
            OptionValue::Bool(b) => Ok(b),
            OptionValue::Int(0) => Ok(false),
            OptionValue::Int(1) => Ok(true),
            other => Err(Error::invalid_value(key.name(), other)),
        }
    }

    fn as_count(self, key: ConfigKey) -> Result<u64> {
        match self {
            OptionValue::Int(i) if i >= 0 => Ok(i as u64),
            other => Err(Error::invalid_value(key.name(), other)),
        }
    }

    fn as_float(self, key: ConfigKey) -> Result<f64> {
        match self {
            OptionValue::Float(x) if x.is_finite() => Ok(x),
            OptionValue::Int(i) => Ok(i as f64),
            other => Err(Error::invalid_value(key.name(), other)),
        }
    }
}

/// A validated write of one option.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Setting {
    Reordering(bool),
    GarbageCollection(bool),
    MaxMemory(u64),
    LooseUpTo(usize),
    MaxCacheHard(usize),
    MinHit(u32),
    MaxGrowth(f64),
    MaxSwaps(usize),
    MaxVars(usize),
}

impl Setting {
    /// Validates `value` for `key`.
    ///
    /// Returns `Ok(None)` for read-only keys.
    pub fn parse(key: ConfigKey, value: OptionValue) -> Result<Option<Setting>> {
        let setting = match key {
            ConfigKey::Reordering => Setting::Reordering(value.as_bool(key)?),
            ConfigKey::GarbageCollection => Setting::GarbageCollection(value.as_bool(key)?),
            ConfigKey::MaxMemory => Setting::MaxMemory(value.as_count(key)?),
            ConfigKey::LooseUpTo => Setting::LooseUpTo(value.as_count(key)? as usize),
            ConfigKey::MaxCacheHard => {
                let slots = value.as_count(key)?;
                if slots == 0 {
                    return Err(Error::invalid_value(key.name(), value));
                }
                Setting::MaxCacheHard(slots as usize)
            }
            ConfigKey::MinHit => {
                let percent = value.as_count(key)?;
                if percent > 100 {
                    return Err(Error::invalid_value(key.name(), value));
                }
                Setting::MinHit(percent as u32)
            }
            ConfigKey::MaxGrowth => {
                let growth = value.as_float(key)?;
                if growth < 1.0 {
                    return Err(Error::invalid_value(key.name(), value));
                }
                Setting::MaxGrowth(growth)
            }
            ConfigKey::MaxSwaps => Setting::MaxSwaps(value.as_count(key)? as usize),
            ConfigKey::MaxVars => Setting::MaxVars(value.as_count(key)? as usize),
            ConfigKey::MaxCacheSoft => return Ok(None),
        };
        Ok(Some(setting))
    }
}

impl Options {
    pub fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::Reordering(b) => self.reordering = b,
            Setting::GarbageCollection(b) => self.garbage_collection = b,
            Setting::MaxMemory(n) => self.max_memory = n,
            Setting::LooseUpTo(n) => self.loose_up_to = n,
            Setting::MaxCacheHard(n) => self.max_cache_hard = n,
            Setting::MinHit(p) => self.min_hit = p,
            Setting::MaxGrowth(g) => self.max_growth = g,
            Setting::MaxSwaps(n) => self.max_swaps = n,
            Setting::MaxVars(n) => self.max_vars = n,
        }
    }

    pub fn get(&self, key: ConfigKey) -> OptionValue {
        match key {
            ConfigKey::Reordering => OptionValue::Bool(self.reordering),
            ConfigKey::GarbageCollection => OptionValue::Bool(self.garbage_collection),
            ConfigKey::MaxMemory => OptionValue::Int(self.max_memory as i64),
            ConfigKey::LooseUpTo => OptionValue::Int(self.loose_up_to as i64),
            ConfigKey::MaxCacheHard => OptionValue::Int(self.max_cache_hard as i64),
            ConfigKey::MinHit => OptionValue::Int(self.min_hit as i64),
            ConfigKey::MaxGrowth => OptionValue::Float(self.max_growth),
            ConfigKey::MaxSwaps => OptionValue::Int(self.max_swaps as i64),
            ConfigKey::MaxVars => OptionValue::Int(self.max_vars as i64),
            ConfigKey::MaxCacheSoft => OptionValue::Int(self.max_cache_soft as i64),
        }
    }

    /// Every writable option of `self`, as settings.
    pub fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::Reordering(self.reordering),
            Setting::GarbageCollection(self.garbage_collection),
            Setting::MaxMemory(self.max_memory),
            Setting::LooseUpTo(self.loose_up_to),
            Setting::MaxCacheHard(self.max_cache_hard),
            Setting::MinHit(self.min_hit),
            Setting::MaxGrowth(self.max_growth),
            Setting::MaxSwaps(self.max_swaps),
            Setting::MaxVars(self.max_vars),
        ]
    }
}

impl Bdd {
    /// Writes one option and adjusts the engine to the new value.
    pub fn apply_setting(&self, setting: Setting) {
        debug!("Setting {:?}", setting);
        self.options_mut().apply(setting);

        match setting {
            Setting::MaxCacheHard(slots) => {
                let mut cache = self.cache_mut();
                if cache.capacity() > slots {
                    // Largest power of two not above the bound
                    let bits = (usize::BITS - 1 - slots.leading_zeros()) as usize;
                    cache.resize(bits);
                    self.options_mut().max_cache_soft = cache.capacity();
                }
            }
            Setting::LooseUpTo(nodes) => self.counters_mut().next_gc = nodes,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_key_round_trip() {
        for key in ConfigKey::ALL {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_key() {
        let err = "max_nodes".parse::<ConfigKey>().unwrap_err();
        assert!(matches!(err, Error::UnknownParameter(k) if k == "max_nodes"));
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!(
            Setting::parse(ConfigKey::Reordering, true.into()).unwrap(),
            Some(Setting::Reordering(true))
        );
        assert_eq!(
            Setting::parse(ConfigKey::Reordering, OptionValue::Int(0)).unwrap(),
            Some(Setting::Reordering(false))
        );
        assert_eq!(
            Setting::parse(ConfigKey::MaxGrowth, OptionValue::Int(2)).unwrap(),
            Some(Setting::MaxGrowth(2.0))
        );
        assert_eq!(Setting::parse(ConfigKey::MaxCacheSoft, OptionValue::Int(5)).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(
            Setting::parse(ConfigKey::Reordering, OptionValue::Int(2)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            Setting::parse(ConfigKey::MaxSwaps, OptionValue::Int(-1)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            Setting::parse(ConfigKey::MinHit, OptionValue::Int(101)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            Setting::parse(ConfigKey::MaxGrowth, OptionValue::Float(0.5)),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            Setting::parse(ConfigKey::LooseUpTo, OptionValue::Bool(true)),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_apply_and_get() {
        let mut opts = Options::default();
        opts.apply(Setting::MaxVars(7));
        assert_eq!(opts.get(ConfigKey::MaxVars), OptionValue::Int(7));
        opts.apply(Setting::GarbageCollection(false));
        assert_eq!(opts.get(ConfigKey::GarbageCollection), OptionValue::Bool(false));
    }

    #[test]
    fn test_settings_restore_snapshot() {
        let before = Options::default();
        let mut opts = before.clone();
        opts.apply(Setting::MaxSwaps(1));
        opts.apply(Setting::Reordering(true));
        for s in before.settings() {
            opts.apply(s);
        }
        assert_eq!(opts, before);
    }

    #[test]
    fn test_max_cache_hard_shrinks_cache() {
        let bdd = Bdd::new(BddConfig::default().with_cache_bits(10));
        assert_eq!(bdd.options().max_cache_soft, 1024);
        bdd.apply_setting(Setting::MaxCacheHard(300));
        assert_eq!(bdd.options().max_cache_hard, 300);
        assert_eq!(bdd.options().max_cache_soft, 256);

        // Raising the bound does not grow the table by itself
        bdd.apply_setting(Setting::MaxCacheHard(1 << 20));
        assert_eq!(bdd.options().max_cache_soft, 256);
    }

    #[test]
    fn test_builder() {
        let options = Options {
            max_swaps: 3,
            ..Options::default()
        };
        let config = BddConfig::default().with_subtable_bits(4).with_options(options.clone());
        assert_eq!(config.subtable_bits, 4);
        let bdd = Bdd::new(config);
        assert_eq!(bdd.options().max_swaps, 3);
        assert!(ConfigKey::MaxCacheSoft.is_read_only());
        assert!(!ConfigKey::MaxGrowth.is_read_only());
    }

    #[test]
    fn test_options_serde() {
        let opts = Options::default();
        let json = serde_json::to_string(&opts).unwrap();
        let back: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }
}
