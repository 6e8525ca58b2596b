//! Bridge the terminal's real-time size to the storm engine's parameters.
//!
//! The terminal is our host container: every resize is a new measurement of
//! its bounding box, from which the particle count is derived. Parameter sets
//! are only pushed onward when they actually change, so no-op layout passes
//! don't churn the particle set.

use std::sync::Arc;

use color_eyre::eyre::Result;

use crate::shared_state::SharedState;

/// The maximum separation, in pixels, at which two particles are connected by
/// a line.
pub const LINE_DISTANCE: f32 = 100.0;

/// Everything the engine needs from a single measurement of the host.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct StormParams {
    /// Canvas width in pixels.
    pub width: f32,
    /// Canvas height in pixels.
    pub height: f32,
    /// How many particles to simulate.
    pub num_particles: usize,
    /// The connective line distance threshold.
    pub line_distance: f32,
}

/// Watches the host size and feeds derived parameters to the engine.
pub struct Adapter {
    /// The last parameter set we pushed, for deduplication.
    last_pushed: Option<StormParams>,
    /// A user-configured particle count, bypassing the area derivation.
    num_particles_override: Option<usize>,
}

impl Adapter {
    /// Instantiate.
    #[must_use]
    pub const fn new(num_particles_override: Option<usize>) -> Self {
        Self {
            last_pushed: None,
            num_particles_override,
        }
    }

    /// Derive engine parameters from pixel dimensions. The additive constant
    /// keeps even a degenerate zero-area host at a nonzero particle count.
    #[must_use]
    pub fn derive(&self, width: f32, height: f32) -> StormParams {
        let area = f64::from(width) * f64::from(height);
        let num_particles = match self.num_particles_override {
            Some(count) => count,
            None => ((area + 300_000.0) / 7000.0).ceil() as usize,
        };

        StormParams {
            width,
            height,
            num_particles,
            line_distance: LINE_DISTANCE,
        }
    }

    /// Handle a new terminal measurement. Returns the derived parameters only
    /// when they differ from the last pushed set.
    pub fn observe(&mut self, columns: u16, rows: u16) -> Option<StormParams> {
        // Half-block cells are two pixels tall.
        let params = self.derive(f32::from(columns), f32::from(rows) * 2.0);

        if self.last_pushed == Some(params) {
            return None;
        }
        self.last_pushed = Some(params);
        Some(params)
    }

    /// Resolve the configured background to a concrete colour, substituting
    /// white for full transparency so the storm never blends with nothing.
    #[must_use]
    pub fn resolve_background(spec: &str) -> crate::colour::Colour {
        if crate::colour::is_transparent(spec) {
            return crate::colour::WHITE;
        }
        crate::colour::convert_to_rgba(spec, 1.0)
    }

    /// Listen for resizes and push fresh parameters to the engine.
    pub async fn start(
        state: Arc<SharedState>,
        mut protocol: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
    ) -> Result<()> {
        let num_particles_override = state.config.read().await.num_particles;
        let mut adapter = Self::new(num_particles_override);

        // The host may already have been measured before this task started.
        let initial = state.get_tty_size().await;
        if initial.width > 0 && initial.height > 0 {
            if let Some(params) = adapter.observe(initial.width, initial.height) {
                state.protocol_tx.send(crate::run::Protocol::Storm(params))?;
            }
        }

        loop {
            match protocol.recv().await {
                Ok(crate::run::Protocol::Resize { width, height }) => {
                    if let Some(params) = adapter.observe(width, height) {
                        tracing::debug!("Host resized, pushing {params:?}");
                        state.protocol_tx.send(crate::run::Protocol::Storm(params))?;
                    }
                }
                Ok(crate::run::Protocol::End) => break,
                Ok(crate::run::Protocol::Storm(_)) => (),
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                Err(error) => {
                    tracing::error!("Adapter protocol receive: {error:?}");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn particle_count_derivation() {
        let adapter = Adapter::new(None);
        // 600x400 pixels: ceil((240000 + 300000) / 7000)
        assert_eq!(adapter.derive(600.0, 400.0).num_particles, 78);
        // Even a zero-area host keeps a nonzero floor.
        assert_eq!(adapter.derive(0.0, 0.0).num_particles, 43);
        assert_eq!(adapter.derive(600.0, 400.0).line_distance, 100.0);
    }

    #[test]
    fn a_configured_count_bypasses_derivation() {
        let adapter = Adapter::new(Some(7));
        assert_eq!(adapter.derive(600.0, 400.0).num_particles, 7);
    }

    #[test]
    fn identical_measurements_push_only_once() {
        let mut adapter = Adapter::new(None);
        let first = adapter.observe(80, 24);
        assert!(first.is_some());
        assert!(adapter.observe(80, 24).is_none());
        // A real change pushes again.
        assert!(adapter.observe(81, 24).is_some());
    }

    #[test]
    fn rows_count_double_in_pixels() {
        let mut adapter = Adapter::new(None);
        let params = adapter.observe(100, 30).unwrap();
        assert_eq!(params.width, 100.0);
        assert_eq!(params.height, 60.0);
    }

    #[test]
    fn transparent_backgrounds_fall_back_to_white() {
        assert_eq!(
            Adapter::resolve_background("rgba(0, 0, 0, 0)"),
            crate::colour::WHITE
        );
        assert_eq!(
            Adapter::resolve_background("black"),
            (0.0, 0.0, 0.0, 1.0)
        );
    }
}
