//! The shared data that all the tasks use. Access is mediated with locks to
//! support asynchronicity.

use std::sync::Arc;

use tokio::sync::RwLock;

/// The size of the user's terminal, in cells.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[expect(
    clippy::exhaustive_structs,
    reason = "It's very unlikely that this is going to have any more fields added to it"
)]
pub struct TTYSize {
    /// Width of the TTY
    pub width: u16,
    /// Height of the TTY
    pub height: u16,
}

/// All the shared data the app uses.
#[non_exhaustive]
pub struct SharedState {
    /// The channel on which all protocol messages are sent.
    pub protocol_tx: tokio::sync::broadcast::Sender<crate::run::Protocol>,
    /// User config.
    pub config: RwLock<crate::config::Config>,
    /// Just the size of the user's terminal. The adapter derives everything
    /// else from this.
    pub tty_size: RwLock<TTYSize>,
    /// Is the application logging?
    pub is_logging: RwLock<bool>,
}

impl SharedState {
    /// Initialise the shared state.
    #[must_use]
    pub fn init() -> Arc<Self> {
        let (protocol_tx, _) = tokio::sync::broadcast::channel(64);
        Arc::new(Self {
            protocol_tx,
            config: RwLock::default(),
            tty_size: RwLock::default(),
            is_logging: RwLock::default(),
        })
    }

    /// Update the shared TTY size.
    pub async fn set_tty_size(&self, width: u16, height: u16) {
        let mut tty_size = self.tty_size.write().await;
        *tty_size = TTYSize { width, height };
    }

    /// Get the current TTY size.
    pub async fn get_tty_size(&self) -> TTYSize {
        *self.tty_size.read().await
    }
}
