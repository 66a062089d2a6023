use crate::use_cases::SessionSettings;
use std::{env, net::IpAddr, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_BUFFER_CAPACITY: usize = 64;

pub const DEFAULT_TICK_RATE: u32 = 60;
const MAX_TICK_RATE: u32 = 240;

pub fn http_host() -> IpAddr {
    env::var("PONG_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

pub fn http_port() -> u16 {
    env::var("PONG_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

/// Ticks per second, clamped to `1..=240`.
pub fn tick_rate() -> u32 {
    parse_tick_rate(env::var("PONG_TICK_RATE").ok().as_deref())
}

pub fn tick_interval() -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate()))
}

/// Fixed seed for serve directions; unset means a fresh seed per process.
pub fn rng_seed() -> Option<u64> {
    env::var("PONG_RNG_SEED")
        .ok()
        .and_then(|v| v.trim().parse().ok())
}

pub fn session_settings() -> SessionSettings {
    SessionSettings {
        command_capacity: COMMAND_CHANNEL_CAPACITY,
        outbound_capacity: OUTBOUND_BUFFER_CAPACITY,
        tick_interval: tick_interval(),
        rng_seed: rng_seed(),
        ..SessionSettings::default()
    }
}

fn parse_tick_rate(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_TICK_RATE)
        .clamp(1, MAX_TICK_RATE)
}
