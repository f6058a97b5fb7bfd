//! World configuration.

use serde::{Deserialize, Serialize};

/// Sizing and tuning knobs for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Pixel width of a cell, carried through save files for the renderer.
    pub cell_width: u32,
    /// Pixel height of a cell.
    pub cell_height: u32,
    /// Row that gases drift towards.
    pub cloud_line_y: i32,
    /// Steps executed per [`World::advance`](crate::World::advance) call.
    pub game_speed: u32,
    /// RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 144,
            height: 81,
            cell_width: 8,
            cell_height: 8,
            cloud_line_y: 10,
            game_speed: 1,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Config for a `width` x `height` grid with every other knob defaulted.
    #[must_use]
    pub fn sized(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Builder-style seed override.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the config for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(ConfigError::InvalidCellSize);
        }
        if self.game_speed == 0 {
            return Err(ConfigError::InvalidGameSpeed);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions (width, height) must be non-zero")]
    InvalidDimensions,
    #[error("Cell size must be non-zero")]
    InvalidCellSize,
    #[error("Game speed must be at least one step per frame")]
    InvalidGameSpeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        let config = SimConfig::sized(0, 10);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDimensions)));
    }

    #[test]
    fn zero_game_speed_is_rejected() {
        let config = SimConfig {
            game_speed: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGameSpeed)));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SimConfig = serde_json::from_str(r#"{"width": 32, "seed": 7}"#).unwrap();
        assert_eq!(config.width, 32);
        assert_eq!(config.height, 81);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.cloud_line_y, 10);
    }
}
