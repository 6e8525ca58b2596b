//! All of the user config for Stormfield.

use color_eyre::eyre::{ContextCompat as _, Result};

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// The fill colour of the particle circles. Any CSS-style colour string.
    pub circle_colour: String,
    /// The colour of the lines connecting nearby particles.
    pub line_colour: String,
    /// The background the storm composites over. A fully transparent value
    /// falls back to white rather than propagating transparency.
    pub background: String,
    /// Velocity scale in pixels per frame. Velocity components are bounded to
    /// `[-speed/2, speed/2]`.
    pub speed: f32,
    /// Fraction of `speed` applied as a random perturbation to velocity each
    /// frame. `0.0` disables the random walk entirely.
    pub drift: f32,
    /// Lower and upper bounds of a particle's oscillating radius, in pixels.
    pub size_range: [f32; 2],
    /// Override the particle count that the adapter normally derives from the
    /// terminal's area.
    pub num_particles: Option<usize>,
    /// Target frame rate
    pub frame_rate: u32,
    /// Suppress all drawing and looping.
    pub hidden: bool,
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory.join("stormfield").join("stormfield.log");

        Self {
            circle_colour: "#3498db".into(),
            line_colour: "rgb(52, 152, 219)".into(),
            background: "white".into(),
            speed: 16.0,
            drift: 0.35,
            size_range: [2.0, 4.0],
            num_particles: None,
            frame_rate: 30,
            hidden: false,
            log_level: LogLevel::Off,
            log_path,
        }
    }
}

impl Config {
    /// The default location of the main config file.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let directory = dirs::config_dir().context("Couldn't find a user config directory")?;
        Ok(directory.join("stormfield").join("stormfield.toml"))
    }

    /// Load config from a TOML file. A missing file is not an error, it just
    /// means all defaults.
    pub fn load(maybe_path: Option<&std::path::Path>) -> Result<Self> {
        let path = match maybe_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
