//! Main entrypoint for running Stormfield

use std::sync::Arc;

use clap::Parser as _;
use color_eyre::eyre::{ContextCompat as _, Result};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

use crate::cli_args::CliArgs;
use crate::renderer::Renderer;
use crate::shared_state::SharedState;

/// Commands to control the various tasks.
#[non_exhaustive]
#[derive(Clone, Copy, Debug)]
pub enum Protocol {
    /// The user's TTY was resized: a fresh measurement of the host container.
    Resize {
        /// Width of new terminal, in cells.
        width: u16,
        /// Height of new terminal, in cells.
        height: u16,
    },
    /// Fresh engine parameters derived by the adapter.
    Storm(crate::adapter::StormParams),
    /// The entire application is exiting.
    End,
}

/// Main entrypoint.
pub async fn run(state_arc: &Arc<SharedState>) -> Result<()> {
    let cli_args = setup(state_arc).await?;
    let protocol_tx = state_arc.protocol_tx.clone();

    let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(4);
    let renderer_handle = Renderer::start(Arc::clone(state_arc), frames_rx);

    // Subscribe every task before the first measurement is broadcast, so
    // nobody can miss it.
    let widget_handle = match cli_args.widget {
        crate::cli_args::Widget::Storm => {
            let adapter_protocol = protocol_tx.subscribe();
            let adapter_state = Arc::clone(state_arc);
            tokio::spawn(async move {
                crate::adapter::Adapter::start(adapter_state, adapter_protocol).await
            });

            let storm_protocol = protocol_tx.subscribe();
            let storm_state = Arc::clone(state_arc);
            tokio::spawn(async move {
                crate::storm::main::Storm::start(storm_state, storm_protocol, frames_tx).await
            })
        }
        crate::cli_args::Widget::Polygon => {
            let polygon_protocol = protocol_tx.subscribe();
            let polygon_state = Arc::clone(state_arc);
            tokio::spawn(async move {
                crate::polygon::Polygon::start(polygon_state, polygon_protocol, frames_tx).await
            })
        }
    };

    let signal_tx = protocol_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            broadcast_protocol_end(&signal_tx);
        }
    });

    // The first measurement of the host. Without a usable TTY there is no
    // drawing surface at all: everything winds down without an error.
    match Renderer::get_users_tty_size() {
        Ok(size) => {
            let columns: u16 = size.cols.try_into()?;
            let rows: u16 = size.rows.try_into()?;
            state_arc.set_tty_size(columns, rows).await;
            protocol_tx.send(Protocol::Resize {
                width: columns,
                height: rows,
            })?;
        }
        Err(error) => {
            tracing::warn!("No usable TTY, nothing to draw onto: {error:?}");
            broadcast_protocol_end(&protocol_tx);
        }
    }

    widget_handle.await??;
    renderer_handle.await??;

    Ok(())
}

/// Signal all task loops to exit.
///
/// We keep it in its own function because we need to handle the error
/// separately. If the error were to be bubbled with `?` as usual, there's a
/// chance it would never be logged, because the protocol end signal is itself
/// what allows the central error handler to even be reached.
pub fn broadcast_protocol_end(protocol_tx: &tokio::sync::broadcast::Sender<Protocol>) {
    tracing::debug!("Broadcasting the protocol `End` message to all listeners");
    let result = protocol_tx.send(Protocol::End);
    if let Err(error) = result {
        tracing::error!("{error:?}");
    }
}

/// Prepare the application to start.
async fn setup(state: &Arc<SharedState>) -> Result<CliArgs> {
    let cli_args = CliArgs::parse();

    let config_result = crate::config::Config::load(cli_args.config.as_deref());
    let mut config = match config_result {
        Ok(config) => config,
        Err(config_error) => {
            color_eyre::eyre::bail!("Bad config file: {config_error:?}");
        }
    };

    if cli_args.hidden {
        config.hidden = true;
    }

    *state.config.write().await = config;

    setup_logging(cli_args.clone(), state).await?;

    tracing::info!("Starting Stormfield");
    tracing::debug!("Loaded config: {:?}", state.config.read().await);

    Ok(cli_args)
}

/// Setup logging.
async fn setup_logging(cli_args: CliArgs, state: &Arc<SharedState>) -> Result<()> {
    let are_log_filters_manually_set = std::env::var("STORMFIELD_LOG").is_ok();
    let mut path = state.config.read().await.log_path.clone();

    if let Some(cli_override_path) = cli_args.log_path {
        path = cli_override_path;
    }

    let mut level = state.config.read().await.log_level.clone();
    if let Some(cli_override_level) = cli_args.log_level {
        level = cli_override_level;
    }
    let level_as_string = format!("{level:?}").to_lowercase();

    let is_loggable =
        !matches!(level, crate::config::LogLevel::Off) || are_log_filters_manually_set;
    if !is_loggable {
        return Ok(());
    }

    let directory = path.parent().context("Couldn't get log path's parent")?;
    std::fs::create_dir_all(directory)?;
    let file = std::fs::File::create(&path)?;

    let filters = if are_log_filters_manually_set {
        if let Ok(user_filters) = std::env::var("STORMFIELD_LOG") {
            std::env::set_var("RUST_LOG", user_filters);
        }
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("error".parse()?)
            .from_env_lossy()
    } else {
        tracing_subscriber::EnvFilter::builder()
            .with_default_directive("off".parse()?)
            .from_env_lossy()
            .add_directive(format!("stormfield={level_as_string}").parse()?)
    };

    let logfile_layer = tracing_subscriber::fmt::layer()
        .with_writer(file)
        .with_filter(filters);
    tracing_subscriber::registry().with(logfile_layer).init();

    let mut is_logging = state.is_logging.write().await;
    *is_logging = true;
    drop(is_logging);

    Ok(())
}
