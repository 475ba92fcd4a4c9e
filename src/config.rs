//! Run configuration, loadable from YAML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SoupError;
use crate::simulation::SimulationParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub random_seed: u64,
    pub grid_width: usize,
    pub grid_height: usize,
    pub program_size: usize,
    pub epochs: usize,
    pub mutation_rate: f64,
    /// Manhattan radius for partner selection.
    pub neighbor_radius: usize,
    /// Interpreter step budget per pair.
    pub max_steps: usize,
    pub read_head_position: usize,
    /// Defaults to `program_size` (the start of the second program).
    pub write_head_position: Option<usize>,
    /// Epochs between status lines.
    pub eval_interval: usize,
    /// Programs dumped at the end of the run.
    pub num_print_programs: usize,
    /// Run the lineage-tracing variant.
    pub tracer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            random_seed: 42,
            grid_width: 32,
            grid_height: 32,
            program_size: 64,
            epochs: 1000,
            mutation_rate: 0.001,
            neighbor_radius: 2,
            max_steps: 8192,
            read_head_position: 0,
            write_head_position: None,
            eval_interval: 50,
            num_print_programs: 4,
            tracer: false,
        }
    }
}

impl Config {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, SoupError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Write a starting-point config file holding the default values.
    pub fn write_template<P: AsRef<Path>>(path: P) -> Result<(), SoupError> {
        let yaml = serde_yaml::to_string(&Config::default())?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SoupError> {
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(SoupError::EmptyGrid { width: self.grid_width, height: self.grid_height });
        }
        if self.program_size == 0 {
            return Err(SoupError::EmptyProgram);
        }
        if self.tracer && self.program_size > u16::MAX as usize + 1 {
            return Err(SoupError::ProgramTooLong(self.program_size));
        }
        if self.epochs == 0 {
            return Err(SoupError::ZeroEpochs);
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) || !self.mutation_rate.is_finite() {
            return Err(SoupError::BadMutationRate(self.mutation_rate));
        }
        if self.neighbor_radius == 0 {
            return Err(SoupError::ZeroRadius);
        }
        if self.max_steps == 0 {
            return Err(SoupError::ZeroSteps);
        }
        let tape_len = 2 * self.program_size;
        if self.read_head_position >= tape_len {
            return Err(SoupError::HeadOutOfRange {
                name: "read",
                pos: self.read_head_position,
                len: tape_len,
            });
        }
        if let Some(pos) = self.write_head_position {
            if pos >= tape_len {
                return Err(SoupError::HeadOutOfRange { name: "write", pos, len: tape_len });
            }
        }
        Ok(())
    }

    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            seed: self.random_seed,
            mutation_rate: self.mutation_rate,
            max_steps: self.max_steps,
            neighbor_radius: self.neighbor_radius,
            read_head: self.read_head_position,
            write_head: self.write_head_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = Config::default();
        config.grid_width = 17;
        config.tracer = true;
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.grid_width, 17);
        assert!(back.tracer);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("grid_width: 8\ngrid_height: 8\n").unwrap();
        assert_eq!(config.grid_width, 8);
        assert_eq!(config.program_size, Config::default().program_size);
    }

    #[test]
    fn validation_catches_structural_errors() {
        let mut config = Config::default();
        config.neighbor_radius = 0;
        assert!(matches!(config.validate(), Err(SoupError::ZeroRadius)));

        let mut config = Config::default();
        config.mutation_rate = -0.1;
        assert!(matches!(config.validate(), Err(SoupError::BadMutationRate(_))));

        let mut config = Config::default();
        config.read_head_position = 200; // past the 128-byte pair tape
        assert!(matches!(config.validate(), Err(SoupError::HeadOutOfRange { .. })));

        let mut config = Config::default();
        config.tracer = true;
        config.program_size = 100_000;
        assert!(matches!(config.validate(), Err(SoupError::ProgramTooLong(_))));
    }
}
