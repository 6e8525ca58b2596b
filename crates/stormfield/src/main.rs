//! Just `main()`. Keep as small as possible.

pub mod adapter;
pub mod canvas;
pub mod cli_args;
pub mod colour;
pub mod config;
pub mod polygon;
pub mod renderer;
pub mod run;
pub mod shared_state;
pub mod surface;

/// The particle storm itself.
pub mod storm {
    pub mod main;
    pub mod particle;
}

use color_eyre::eyre::Result;

#[expect(
    clippy::print_stderr,
    reason = "It's our central place for communicating errors to the user on the CLI"
)]
#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let state_arc = shared_state::SharedState::init();
    let result = run::run(&std::sync::Arc::clone(&state_arc)).await;

    let logpath = state_arc.config.read().await.log_path.clone();
    let is_logging = *state_arc.is_logging.read().await;
    tracing::debug!("Stormfield is exiting");

    match result {
        Ok(()) => {
            if is_logging {
                eprintln!("Logs saved to {}", logpath.display());
            }
        }
        Err(error) => {
            tracing::error!("{error:?}");
            eprintln!("Error: {error}");
            if is_logging {
                eprintln!("See {} for more details", logpath.display());
            }
            return Err(error);
        }
    }

    Ok(())
}
