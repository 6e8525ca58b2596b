//! All the CLI arguments for Stormfield

/// Which of the two animated widgets to run.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    /// The full-terminal particle storm background.
    Storm,
    /// The rotating polygon of connected vertices.
    Polygon,
}

/// Render an animated particle storm in your terminal
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about)]
#[non_exhaustive]
pub struct CliArgs {
    /// The widget to run.
    #[arg(short, long, value_enum, default_value = "storm")]
    pub widget: Widget,

    /// Path to a Stormfield config file. Defaults to
    /// `$XDG_CONFIG_HOME/stormfield/stormfield.toml`.
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the maximum log level from the config file.
    #[arg(long)]
    pub log_level: Option<crate::config::LogLevel>,

    /// Override the log file location from the config file.
    #[arg(long)]
    pub log_path: Option<std::path::PathBuf>,

    /// Suppress all drawing. The frame loop never starts and no particles are
    /// created. Mostly useful for debugging the rest of the pipeline.
    #[arg(long)]
    pub hidden: bool,
}
