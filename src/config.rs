use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assignment::capacity::{DEFAULT_HIGH_SECURITY_CAPACITY, DEFAULT_STANDARD_CAPACITY};
use crate::assignment::{ConfigError, SeedPolicy, SlotCapacityModel};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_PATH_VAR: &str = "SLOT_OCCUPANCY_CONFIG";

/// Runtime settings.
///
/// Resolved in three layers: built-in defaults, then the JSON file named by
/// `SLOT_OCCUPANCY_CONFIG`, then individual environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    pub standard_capacity: usize,
    pub high_security_capacity: usize,
    pub slots_csv: PathBuf,
    pub units_csv: PathBuf,
    pub occupancy_csv: PathBuf,
    /// Salt for generated occupancy; `None` seeds from slot ids alone
    pub fallback_salt: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            standard_capacity: DEFAULT_STANDARD_CAPACITY,
            high_security_capacity: DEFAULT_HIGH_SECURITY_CAPACITY,
            slots_csv: PathBuf::from("data/slots.csv"),
            units_csv: PathBuf::from("data/units.csv"),
            occupancy_csv: PathBuf::from("data/occupancy.csv"),
            fallback_salt: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.capacity_model()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_error = |message: String| ConfigError::File {
            path: path.display().to_string(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))
    }

    /// Applies overrides from `lookup`, normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.port = port;
        }
        if let Some(standard) = parse_var(&lookup, "STANDARD_CAPACITY")? {
            self.standard_capacity = standard;
        }
        if let Some(high_security) = parse_var(&lookup, "HIGH_SECURITY_CAPACITY")? {
            self.high_security_capacity = high_security;
        }
        if let Some(salt) = parse_var(&lookup, "FALLBACK_SALT")? {
            self.fallback_salt = Some(salt);
        }
        if let Some(path) = lookup("SLOTS_CSV") {
            self.slots_csv = PathBuf::from(path);
        }
        if let Some(path) = lookup("UNITS_CSV") {
            self.units_csv = PathBuf::from(path);
        }
        if let Some(path) = lookup("OCCUPANCY_CSV") {
            self.occupancy_csv = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn capacity_model(&self) -> Result<SlotCapacityModel, ConfigError> {
        SlotCapacityModel::new(self.standard_capacity, self.high_security_capacity)
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        match self.fallback_salt {
            Some(salt) => SeedPolicy::Salted(salt),
            None => SeedPolicy::SlotIdentity,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}
