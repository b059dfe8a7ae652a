mod loader;

use crate::geometry::GeometryParams;
use crate::spectrum::DispersionParams;
use crate::spring::SpringParams;
use crate::tracer::TraceParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Main simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PrismConfig {
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub optics: OpticsConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

/// Crystal shape
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeometryConfig {
    /// Crystal size relative to the smaller viewport dimension
    #[serde(default = "default_crystal_scale")]
    pub crystal_scale: f64,
    #[serde(default = "default_subdivision_level")]
    pub subdivision_level: u32,
    /// Spike/crater extrusion depth
    #[serde(default = "default_facet_depth")]
    pub facet_depth: f64,
    #[serde(default = "default_spike_seed")]
    pub spike_seed: u32,
    #[serde(default = "default_jitter_seed")]
    pub jitter_seed: u32,
}

fn default_crystal_scale() -> f64 {
    1.0
}

fn default_subdivision_level() -> u32 {
    1
}

fn default_facet_depth() -> f64 {
    0.12
}

fn default_spike_seed() -> u32 {
    1
}

fn default_jitter_seed() -> u32 {
    2
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            crystal_scale: default_crystal_scale(),
            subdivision_level: default_subdivision_level(),
            facet_depth: default_facet_depth(),
            spike_seed: default_spike_seed(),
            jitter_seed: default_jitter_seed(),
        }
    }
}

impl GeometryConfig {
    pub fn params(&self) -> GeometryParams {
        GeometryParams {
            subdivision_level: self.subdivision_level,
            facet_depth: self.facet_depth,
            spike_seed: self.spike_seed,
            jitter_seed: self.jitter_seed,
            ..GeometryParams::default()
        }
    }
}

/// Material and tracer settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpticsConfig {
    /// Refractive index at the red end of the spectrum
    #[serde(default = "default_ior_base")]
    pub ior_base: f64,
    #[serde(default = "default_abbe_number")]
    pub abbe_number: f64,
    #[serde(default = "default_dispersion_strength")]
    pub dispersion_strength: f64,
    #[serde(default = "default_absorption")]
    pub absorption: f64,
    #[serde(default = "default_spectral_samples")]
    pub spectral_samples: usize,
    #[serde(default = "default_max_bounces")]
    pub max_bounces: u32,
    #[serde(default = "default_wall_reflectance")]
    pub wall_reflectance: f64,
    #[serde(default = "default_tir_reflectance")]
    pub tir_reflectance: f64,
}

fn default_ior_base() -> f64 {
    1.52
}

fn default_abbe_number() -> f64 {
    40.0
}

fn default_dispersion_strength() -> f64 {
    1.0
}

fn default_absorption() -> f64 {
    0.1
}

fn default_spectral_samples() -> usize {
    crate::DEFAULT_SPECTRAL_SAMPLES
}

fn default_max_bounces() -> u32 {
    crate::DEFAULT_BOUNCES
}

fn default_wall_reflectance() -> f64 {
    0.7
}

fn default_tir_reflectance() -> f64 {
    0.5
}

impl Default for OpticsConfig {
    fn default() -> Self {
        Self {
            ior_base: default_ior_base(),
            abbe_number: default_abbe_number(),
            dispersion_strength: default_dispersion_strength(),
            absorption: default_absorption(),
            spectral_samples: default_spectral_samples(),
            max_bounces: default_max_bounces(),
            wall_reflectance: default_wall_reflectance(),
            tir_reflectance: default_tir_reflectance(),
        }
    }
}

impl OpticsConfig {
    pub fn dispersion(&self) -> DispersionParams {
        DispersionParams {
            samples: self.spectral_samples,
            ior_base: self.ior_base,
            abbe_number: self.abbe_number,
            dispersion_strength: self.dispersion_strength,
        }
    }

    pub fn trace_params(&self) -> TraceParams {
        TraceParams {
            max_bounces: self.max_bounces,
            absorption: self.absorption,
            wall_reflectance: self.wall_reflectance,
            tir_reflectance: self.tir_reflectance,
            ..TraceParams::default()
        }
    }
}

/// Pointer smoothing and idle spin
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default = "default_mass")]
    pub mass: f64,
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    #[serde(default = "default_damping")]
    pub damping: f64,
    /// Idle spin in radians per frame
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f64,
}

fn default_mass() -> f64 {
    1.0
}

fn default_stiffness() -> f64 {
    120.0
}

fn default_damping() -> f64 {
    20.0
}

fn default_rotation_speed() -> f64 {
    0.003
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            mass: default_mass(),
            stiffness: default_stiffness(),
            damping: default_damping(),
            rotation_speed: default_rotation_speed(),
        }
    }
}

impl MotionConfig {
    pub fn spring(&self) -> SpringParams {
        SpringParams {
            mass: self.mass,
            stiffness: self.stiffness,
            damping: self.damping,
        }
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "{} must be in [{}, {}], got {}",
            name, min, max, value
        )))
    }
}

impl PrismConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load from `config_path`, or the first default location that exists,
    /// or built-in defaults when none does
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["prism.yaml", "prism.yml", "./config/prism.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check every value against its supported range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if !(g.crystal_scale.is_finite() && g.crystal_scale > 0.0) {
            return Err(ConfigError::Validation(format!(
                "geometry.crystal_scale must be positive, got {}",
                g.crystal_scale
            )));
        }
        if g.subdivision_level > 4 {
            return Err(ConfigError::Validation(format!(
                "geometry.subdivision_level must be at most 4, got {}",
                g.subdivision_level
            )));
        }
        check_range("geometry.facet_depth", g.facet_depth, 0.0, 1.0)?;

        let o = &self.optics;
        check_range("optics.ior_base", o.ior_base, 1.0, 2.5)?;
        check_range("optics.abbe_number", o.abbe_number, 15.0, 70.0)?;
        check_range("optics.dispersion_strength", o.dispersion_strength, 0.1, 3.0)?;
        check_range("optics.absorption", o.absorption, 0.0, 0.8)?;
        check_range("optics.wall_reflectance", o.wall_reflectance, 0.0, 1.0)?;
        check_range("optics.tir_reflectance", o.tir_reflectance, 0.0, 1.0)?;
        if o.spectral_samples == 0 {
            return Err(ConfigError::Validation(
                "optics.spectral_samples must be at least 1".to_string(),
            ));
        }

        let m = &self.motion;
        check_range("motion.mass", m.mass, 0.5, 3.0)?;
        check_range("motion.stiffness", m.stiffness, 50.0, 300.0)?;
        check_range("motion.damping", m.damping, 10.0, 40.0)?;
        check_range("motion.rotation_speed", m.rotation_speed, 0.0, 0.01)?;

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PrismConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.optics.spectral_samples, 15);
        assert_eq!(config.optics.max_bounces, 5);
        assert!((config.optics.wall_reflectance - 0.7).abs() < 1e-12);
        assert!((config.optics.tir_reflectance - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = PrismConfig::default();
        config.optics.ior_base = 3.0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("optics.ior_base"));

        let mut config = PrismConfig::default();
        config.motion.damping = 5.0;
        assert!(config.validate().is_err());

        let mut config = PrismConfig::default();
        config.optics.abbe_number = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = PrismConfig::default();
        config.geometry.crystal_scale = 0.0;
        assert!(config.validate().is_err());

        let mut config = PrismConfig::default();
        config.optics.spectral_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_accepts_range_edges() {
        let mut config = PrismConfig::default();
        config.optics.ior_base = 2.5;
        config.optics.abbe_number = 15.0;
        config.optics.dispersion_strength = 3.0;
        config.optics.absorption = 0.8;
        config.motion.mass = 0.5;
        config.motion.stiffness = 300.0;
        config.motion.rotation_speed = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PrismConfig = serde_yaml::from_str("optics:\n  ior_base: 1.8\n").unwrap();
        assert!((config.optics.ior_base - 1.8).abs() < 1e-12);
        assert!((config.optics.abbe_number - 40.0).abs() < 1e-12);
        assert_eq!(config.geometry, GeometryConfig::default());
        assert_eq!(config.motion, MotionConfig::default());
    }

    #[test]
    fn test_params_conversion() {
        let config = PrismConfig::default();
        let trace = config.optics.trace_params();
        assert_eq!(trace.max_bounces, 5);
        assert!((trace.min_intensity - 0.01).abs() < 1e-12);

        let dispersion = config.optics.dispersion();
        assert_eq!(dispersion.samples, 15);

        let geometry = config.geometry.params();
        assert_eq!(geometry.subdivision_level, 1);

        let spring = config.motion.spring();
        assert!((spring.stiffness - 120.0).abs() < 1e-12);
    }

    #[test]
    fn test_config_serde_roundtrip_json() {
        let config = PrismConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PrismConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound("prism.yaml".to_string());
        assert!(err.to_string().contains("prism.yaml"));

        let err = ConfigError::Parse(serde_yaml::from_str::<PrismConfig>("optics: [").unwrap_err());
        assert!(err.to_string().contains("parse"));

        let err = ConfigError::Validation("bad ior".to_string());
        assert!(err.to_string().contains("bad ior"));
    }

    #[test]
    fn test_load_or_default_with_path() {
        let result = PrismConfig::load_or_default(Some(Path::new("/nonexistent/prism.yaml")));
        assert!(matches!(result.unwrap_err(), ConfigError::NotFound(_)));
    }
}
