//! Engine configuration and its recommended defaults.

use crate::address::{LongAddress, ShortAddress};
use crate::radio::RadioMode;

/// Which side of a ranging exchange this engine instance plays.
/// Fixed for the engine's lifetime.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Tag,
    Anchor,
}

/// Named tunables with the defaults this protocol recommends. Kept as
/// plain `const`s (not a struct) so `Config::default()` can reference them
/// individually.
pub mod recommended {
    pub const RANGE_INTERVAL_MS: u32 = 1500;
    pub const RESET_PERIOD_MS: u32 = 2000;
    pub const INACTIVITY_MS: u32 = 2000;
    pub const DEFAULT_REPLY_DELAY_US: u32 = 3000;
    pub const BLINK_INTERVAL: u8 = 5;
    pub const MAX_DEVICES: usize = 12;
    pub const ENABLE_RANGE_REPORT: bool = false;
    pub const HIGH_POWER: bool = false;
}

/// Engine-wide configuration. Peer table capacity is not part of this
/// struct — it's fixed at compile time by `PeerTable<const N: usize>`'s
/// type parameter, independent of any runtime `Config` value.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub role: Role,
    pub short_address: ShortAddress,
    pub long_address: LongAddress,

    pub range_interval_ms: u32,
    pub reset_period_ms: u32,
    pub inactivity_ms: u32,
    pub default_reply_delay_us: u32,
    pub blink_interval: u8,

    pub enable_range_report: bool,
    pub high_power: bool,
    pub mode: RadioMode,
}

impl Config {
    pub fn new_tag(short_address: ShortAddress, long_address: LongAddress) -> Self {
        Config {
            role: Role::Tag,
            short_address,
            long_address,
            range_interval_ms: recommended::RANGE_INTERVAL_MS,
            reset_period_ms: recommended::RESET_PERIOD_MS,
            inactivity_ms: recommended::INACTIVITY_MS,
            default_reply_delay_us: recommended::DEFAULT_REPLY_DELAY_US,
            blink_interval: recommended::BLINK_INTERVAL,
            enable_range_report: recommended::ENABLE_RANGE_REPORT,
            high_power: recommended::HIGH_POWER,
            mode: RadioMode::default(),
        }
    }

    pub fn new_anchor(short_address: ShortAddress, long_address: LongAddress) -> Self {
        Config {
            role: Role::Anchor,
            ..Config::new_tag(short_address, long_address)
        }
    }
}
