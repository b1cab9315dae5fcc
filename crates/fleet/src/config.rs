//! Fleet configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::FleetError;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tankfleet.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub team: TeamConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub world: WorldConfig,
}

impl Config {
    /// Load configuration from `path`, or from `tankfleet.toml` if present,
    /// or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, FleetError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => {
                info!("No {} found, using default config", DEFAULT_CONFIG_FILE);
                return Ok(Self::default());
            }
        };

        let contents = std::fs::read_to_string(path).map_err(|source| FleetError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self, FleetError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints the rest of the fleet relies on.
    pub fn validate(&self) -> Result<(), FleetError> {
        if self.team.name.is_empty() {
            return Err(FleetError::InvalidConfig("team name must not be empty".into()));
        }
        // Own tanks are recognised by a single trailing digit.
        if !(1..=10).contains(&self.team.size) {
            return Err(FleetError::InvalidConfig(format!(
                "team size must be between 1 and 10, got {}",
                self.team.size
            )));
        }
        if self.policy.disengage_radius < self.policy.engage_radius {
            return Err(FleetError::InvalidConfig(format!(
                "disengage radius {} is below engage radius {}",
                self.policy.disengage_radius, self.policy.engage_radius
            )));
        }
        Ok(())
    }
}

/// Game server address.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Hostname to connect to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to connect to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8052
}

/// Team settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TeamConfig {
    /// Name prefix shared by all tanks of the team.
    #[serde(default = "default_team_name")]
    pub name: String,
    /// Number of tanks to spawn.
    #[serde(default = "default_team_size")]
    pub size: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: default_team_name(),
            size: default_team_size(),
        }
    }
}

fn default_team_name() -> String {
    "tankfleet".to_string()
}
fn default_team_size() -> usize {
    4
}

/// Decision policy tuning. Distances are arena units, angles degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Lock onto an enemy at or below this distance.
    pub engage_radius: f64,
    /// Drop a locked enemy beyond this distance.
    pub disengage_radius: f64,
    /// Turret sweep per tick while scanning.
    pub radar_step: f64,
    /// Beyond this distance from the center, head back to it.
    pub outer_radius: f64,
    /// Radius of the patrol circle.
    pub patrol_radius: f64,
    /// Patrol angular speed in degrees per second.
    pub patrol_speed: f64,
    /// Extra distance added to patrol moves.
    pub patrol_overshoot: f64,
    /// Distance kept from a snitch carrier.
    pub carrier_standoff: f64,
    /// Ammo after collecting an ammo pickup.
    pub max_ammo: u32,
    /// Pickups this close to a tank are considered collected by it.
    pub pickup_radius: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            engage_radius: 70.0,
            disengage_radius: 80.0,
            radar_step: 60.0,
            outer_radius: 40.0,
            patrol_radius: 30.0,
            patrol_speed: 10.0,
            patrol_overshoot: 10.0,
            carrier_standoff: 20.0,
            max_ammo: 10,
            pickup_radius: 10.0,
        }
    }
}

/// World state cache timing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorldConfig {
    /// Enemies not reported for this long are evicted.
    #[serde(default = "default_enemy_ttl")]
    pub enemy_ttl_ms: u64,
    /// Pickups not reported for this long are evicted.
    #[serde(default = "default_pickup_ttl")]
    pub pickup_ttl_ms: u64,
    /// Eviction sweep cadence.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_ms: u64,
}

impl WorldConfig {
    pub fn enemy_ttl(&self) -> Duration {
        Duration::from_millis(self.enemy_ttl_ms)
    }

    pub fn pickup_ttl(&self) -> Duration {
        Duration::from_millis(self.pickup_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            enemy_ttl_ms: default_enemy_ttl(),
            pickup_ttl_ms: default_pickup_ttl(),
            sweep_interval_ms: default_sweep_interval(),
        }
    }
}

fn default_enemy_ttl() -> u64 {
    3_000
}
fn default_pickup_ttl() -> u64 {
    15_000
}
fn default_sweep_interval() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8052);
        assert_eq!(config.team.size, 4);
        assert_eq!(config.policy.engage_radius, 70.0);
        assert_eq!(config.world.enemy_ttl(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [team]
            name = "reds"

            [policy]
            engage_radius = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(config.team.name, "reds");
        assert_eq!(config.team.size, 4);
        assert_eq!(config.policy.engage_radius, 60.0);
        assert_eq!(config.policy.disengage_radius, 80.0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::parse("[team]\nsize = 11"),
            Err(FleetError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("[team]\nname = \"\""),
            Err(FleetError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("[policy]\nengage_radius = 90.0"),
            Err(FleetError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::parse("[server]\nport = \"x\""),
            Err(FleetError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"10.0.0.2\"\nport = 9000").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.host, "10.0.0.2");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(FleetError::ConfigRead { .. })
        ));
    }
}
