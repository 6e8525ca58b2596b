//! Render finished canvas frames to the user's terminal.

use std::sync::Arc;

use color_eyre::eyre::Result;
use termwiz::surface::Change as TermwizChange;
use termwiz::terminal::buffered::BufferedTerminal;
use termwiz::terminal::{ScreenSize, Terminal as TermwizTerminal};
use tokio::sync::mpsc;

use crate::shared_state::SharedState;

/// How often we poll the terminal for size changes. This is our stand-in for
/// continuous size observation of the host container.
const RESIZE_POLL: std::time::Duration = std::time::Duration::from_millis(250);

/// `Renderer`
pub struct Renderer {
    /// Shared app state.
    pub state: Arc<SharedState>,
    /// The flattened background colour that frames composite over.
    pub background: crate::colour::Colour,
}

impl Renderer {
    /// Create a renderer to render to a user's terminal.
    async fn new(state: Arc<SharedState>) -> Self {
        let background_spec = state.config.read().await.background.clone();
        let background = crate::adapter::Adapter::resolve_background(&background_spec);
        Self { state, background }
    }

    /// Instantiate and run.
    pub fn start(
        state: Arc<SharedState>,
        frames_rx: mpsc::Receiver<crate::canvas::Canvas>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let protocol_tx = state.protocol_tx.clone();
            let mut renderer = Self::new(Arc::clone(&state)).await;
            let result = renderer.run(frames_rx).await;
            if let Err(error) = result {
                crate::run::broadcast_protocol_end(&protocol_tx);
                return Err(error);
            }
            Ok(())
        })
    }

    /// We need this just because I can't figure out how to pass
    /// `Box<dyn Terminal>` to `BufferedTerminal::new()`.
    fn get_termwiz_terminal() -> Result<impl TermwizTerminal> {
        let capabilities = termwiz::caps::Capabilities::new_from_env()?;
        Ok(termwiz::terminal::new_terminal(capabilities)?)
    }

    /// Just for initialisation.
    pub fn get_users_tty_size() -> Result<ScreenSize> {
        let mut terminal = Self::get_termwiz_terminal()?;
        Ok(terminal.get_screen_size()?)
    }

    /// Check whether the user's terminal changed size, and propagate the new
    /// measurement if so.
    async fn handle_resize<T: TermwizTerminal + Send>(
        &mut self,
        composited_terminal: &mut BufferedTerminal<T>,
    ) -> Result<()> {
        let is_resized = composited_terminal.check_for_resize()?;
        if !is_resized {
            return Ok(());
        }

        composited_terminal.repaint()?;
        let (width, height) = composited_terminal.dimensions();
        let columns: u16 = width.try_into()?;
        let rows: u16 = height.try_into()?;
        self.state.set_tty_size(columns, rows).await;
        self.state.protocol_tx.send(crate::run::Protocol::Resize {
            width: columns,
            height: rows,
        })?;

        Ok(())
    }

    /// Listen for frames from whichever widget is running and paint them.
    /// Lives in its own method so errors can be caught and the user's
    /// terminal always returned to cooked mode.
    async fn run(&mut self, mut frames: mpsc::Receiver<crate::canvas::Canvas>) -> Result<()> {
        // An unobtainable drawing surface isn't an error, there's just
        // nothing to do.
        let mut users_terminal = match Self::get_termwiz_terminal() {
            Ok(terminal) => terminal,
            Err(error) => {
                tracing::warn!("No drawable terminal surface: {error:?}");
                crate::run::broadcast_protocol_end(&self.state.protocol_tx);
                return Ok(());
            }
        };

        tracing::debug!("Putting user's terminal into raw mode");
        users_terminal.set_raw_mode()?;
        let mut composited_terminal = BufferedTerminal::new(users_terminal)?;
        composited_terminal.add_change(TermwizChange::ClearScreen(
            termwiz::color::ColorAttribute::Default,
        ));

        let mut protocol_rx = self.state.protocol_tx.subscribe();
        let mut resize_poll = tokio::time::interval(RESIZE_POLL);

        tracing::debug!("Starting render loop");
        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        let result = loop {
            tokio::select! {
                maybe_frame = frames.recv() => {
                    match maybe_frame {
                        Some(canvas) => {
                            let frame = crate::surface::canvas_to_surface(&canvas, self.background);
                            composited_terminal.draw_from_screen(&frame, 0, 0);
                            composited_terminal.flush()?;
                        }
                        None => break Ok(()),
                    }
                },
                _ = resize_poll.tick() => {
                    if let Err(error) = self.handle_resize(&mut composited_terminal).await {
                        break Err(error);
                    }
                },
                Ok(message) = protocol_rx.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break Ok(());
                    }
                }
            }
        };

        tracing::debug!("Putting user's terminal back into cooked mode");
        composited_terminal.add_change(TermwizChange::ClearScreen(
            termwiz::color::ColorAttribute::Default,
        ));
        composited_terminal.flush()?;
        composited_terminal.terminal().set_cooked_mode()?;

        result
    }
}
