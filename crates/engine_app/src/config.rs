//! Server configuration.
//!
//! Command-line flags, each with an environment fallback, validated into the
//! settings the tick loop and simulation consume.

use clap::{Parser, ValueEnum};
use engine_math::Vec2;
use engine_net::{DEFAULT_NATS_URL, WireFormat};
use engine_spatial::{QuadTreeConfig, SpatialConfig};

use crate::tick::TickConfig;

/// Errors produced while validating [`AppConfig`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("tick rate must be a positive number, got {0}")]
    InvalidTickRate(f64),

    #[error("spatial rebuild interval must be at least 1 tick")]
    InvalidRebuildInterval,

    #[error("arena size must be a positive number, got {0}")]
    InvalidArenaSize(f32),

    #[error("outbound buffer must hold at least one message")]
    InvalidOutboundBuffer,
}

/// Wire format flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WireFormatArg {
    Json,
    Msgpack,
}

impl From<WireFormatArg> for WireFormat {
    fn from(arg: WireFormatArg) -> Self {
        match arg {
            WireFormatArg::Json => WireFormat::Json,
            WireFormatArg::Msgpack => WireFormat::MessagePack,
        }
    }
}

/// Authoritative game server.
#[derive(Debug, Clone, Parser)]
#[command(name = "engine_app", version, about = "Authoritative fixed-rate game server")]
pub struct AppConfig {
    /// NATS server URL.
    #[arg(long, env = "NATS_URL", default_value = DEFAULT_NATS_URL)]
    pub nats_url: String,

    /// Simulation ticks per second.
    #[arg(long, env = "TICK_RATE", default_value_t = 60.0)]
    pub tick_rate: f64,

    /// Ticks between full rebuilds of the collision index.
    #[arg(long, env = "SPATIAL_REBUILD_INTERVAL", default_value_t = 4)]
    pub spatial_rebuild_interval: u64,

    /// Side length of the square arena, centred on the origin.
    #[arg(long, env = "ARENA_SIZE", default_value_t = 200.0)]
    pub arena_size: f32,

    /// Payload encoding for client traffic.
    #[arg(long, env = "WIRE_FORMAT", value_enum, default_value_t = WireFormatArg::Json)]
    pub wire_format: WireFormatArg,

    /// Stop after this many ticks (0 = run until interrupted).
    #[arg(long, env = "MAX_TICKS", default_value_t = 0)]
    pub max_ticks: u64,

    /// Frames buffered per connection. A client that falls this far behind
    /// is disconnected.
    #[arg(long, env = "OUTBOUND_BUFFER", default_value_t = 64)]
    pub outbound_buffer: usize,

    /// Seconds without any client message before its connection is closed
    /// (0 = never).
    #[arg(long, env = "IDLE_TIMEOUT_SECS", default_value_t = 30)]
    pub idle_timeout_secs: u64,

    /// Health pickups placed at startup.
    #[arg(long, env = "PICKUPS", default_value_t = 4)]
    pub pickups: usize,

    /// Start without a boss.
    #[arg(long, env = "NO_BOSS")]
    pub no_boss: bool,
}

impl AppConfig {
    /// Check every value and derive the tick and simulation settings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(TickConfig, SimConfig), ConfigError> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }
        if self.spatial_rebuild_interval == 0 {
            return Err(ConfigError::InvalidRebuildInterval);
        }
        if !(self.arena_size.is_finite() && self.arena_size > 0.0) {
            return Err(ConfigError::InvalidArenaSize(self.arena_size));
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidOutboundBuffer);
        }

        let tick = TickConfig {
            tick_rate: self.tick_rate,
            max_ticks: self.max_ticks,
            idle_timeout_ticks: (self.idle_timeout_secs as f64 * self.tick_rate).ceil() as u64,
        };
        let sim = SimConfig {
            dt: (1.0 / self.tick_rate) as f32,
            arena_half_extent: self.arena_size / 2.0,
            spawn_boss: !self.no_boss,
            pickups: self.pickups,
            spatial: SpatialConfig {
                tree: QuadTreeConfig::default(),
                rebuild_interval: self.spatial_rebuild_interval,
            },
            ..SimConfig::default()
        };
        Ok((tick, sim))
    }
}

/// Gameplay tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Seconds per tick.
    pub dt: f32,
    /// The arena spans `[-h, h]` on both axes.
    pub arena_half_extent: f32,
    /// Where players spawn and respawn.
    pub spawn_point: Vec2,

    pub player_speed: f32,
    pub player_health: f32,
    pub player_radius: f32,

    pub weapon_cooldown_ticks: u32,
    pub projectile_speed: f32,
    pub projectile_damage: f32,
    pub projectile_radius: f32,
    pub projectile_lifetime_ticks: u32,

    pub spawn_boss: bool,
    pub boss_health: f32,
    pub boss_speed: f32,
    pub boss_radius: f32,
    pub boss_cooldown_ticks: u32,
    /// Volleys fired before the boss switches pattern.
    pub boss_volleys_per_pattern: u32,
    pub boss_projectile_speed: f32,
    pub boss_projectile_damage: f32,

    pub pickups: usize,
    pub pickup_heal: f32,
    /// Maximum distance between a player and what it interacts with.
    pub interact_range: f32,

    pub spatial: SpatialConfig,
}

impl SimConfig {
    /// The fastest any entity can move, in units per second.
    #[must_use]
    pub fn max_speed(&self) -> f32 {
        self.player_speed
            .max(self.projectile_speed)
            .max(self.boss_speed)
            .max(self.boss_projectile_speed)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            arena_half_extent: 100.0,
            spawn_point: Vec2::new(0.0, 40.0),
            player_speed: 12.0,
            player_health: 100.0,
            player_radius: 0.5,
            weapon_cooldown_ticks: 10,
            projectile_speed: 30.0,
            projectile_damage: 10.0,
            projectile_radius: 0.2,
            projectile_lifetime_ticks: 120,
            spawn_boss: true,
            boss_health: 2000.0,
            boss_speed: 4.0,
            boss_radius: 2.0,
            boss_cooldown_ticks: 45,
            boss_volleys_per_pattern: 4,
            boss_projectile_speed: 15.0,
            boss_projectile_damage: 8.0,
            pickups: 4,
            pickup_heal: 25.0,
            interact_range: 1.5,
            spatial: SpatialConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let mut argv = vec!["engine_app"];
        argv.extend_from_slice(args);
        AppConfig::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let config = parse(&[]);
        let (tick, sim) = config.validate().unwrap();
        assert_eq!(tick.tick_rate, 60.0);
        assert_eq!(tick.max_ticks, 0);
        assert_eq!(tick.idle_timeout_ticks, 1800);
        assert_eq!(sim.spatial.rebuild_interval, 4);
        assert_eq!(sim.arena_half_extent, 100.0);
        assert!(sim.spawn_boss);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--tick-rate",
            "30",
            "--spatial-rebuild-interval",
            "2",
            "--wire-format",
            "msgpack",
            "--no-boss",
            "--idle-timeout-secs",
            "0",
        ]);
        let (tick, sim) = config.validate().unwrap();
        assert_eq!(tick.tick_rate, 30.0);
        assert_eq!(tick.idle_timeout_ticks, 0);
        assert!((sim.dt - 1.0 / 30.0).abs() < 1e-6);
        assert_eq!(sim.spatial.rebuild_interval, 2);
        assert!(!sim.spawn_boss);
        assert_eq!(WireFormat::from(config.wire_format), WireFormat::MessagePack);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert_eq!(
            parse(&["--tick-rate", "0"]).validate().unwrap_err(),
            ConfigError::InvalidTickRate(0.0)
        );
        assert_eq!(
            parse(&["--spatial-rebuild-interval", "0"]).validate().unwrap_err(),
            ConfigError::InvalidRebuildInterval
        );
        assert_eq!(
            parse(&["--arena-size=-5"]).validate().unwrap_err(),
            ConfigError::InvalidArenaSize(-5.0)
        );
        assert_eq!(
            parse(&["--outbound-buffer", "0"]).validate().unwrap_err(),
            ConfigError::InvalidOutboundBuffer
        );
    }

    #[test]
    fn test_max_speed() {
        let sim = SimConfig::default();
        assert_eq!(sim.max_speed(), sim.projectile_speed);
    }
}
