//! The particle field engine: owns the particle set, advances it every frame
//! and paints particles plus connective edges onto a canvas.
//!
//! The rendering follows the "trimmed line" style: connecting lines stop at
//! each particle's circle boundary rather than at its centre, so no opaque
//! masking disc is ever needed and the storm composites cleanly over any
//! background.

use std::sync::Arc;

use color_eyre::eyre::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng as _;

use super::particle::Particle;
use crate::adapter::StormParams;
use crate::canvas::Canvas;
use crate::shared_state::SharedState;

/// `blur_level_max` is this multiple of the maximum particle size.
const BLUR_LEVEL_MAX_FACTOR: f32 = 5.0;

/// The particle storm engine.
pub struct Storm {
    /// Geometry and count, as last derived by the adapter. `None` until the
    /// first measurement arrives, which means "hidden".
    params: Option<StormParams>,
    /// Velocity scale in pixels per frame.
    speed: f32,
    /// Random walk magnitude as a fraction of `speed`.
    drift: f32,
    /// Particle size bounds.
    size_range: [f32; 2],
    /// Explicitly suppress all drawing and particle creation.
    hidden: bool,
    /// Resolved fill colour of the particle circles.
    circle_colour: crate::colour::Colour,
    /// Resolved colour of the connecting lines.
    line_colour: crate::colour::Colour,
    /// The particles themselves, exclusively owned here.
    particles: Vec<Particle>,
    /// The uniform random source driving all stochastic steps.
    rng: SmallRng,
    /// Target frame rate.
    frame_rate: u32,
    /// The time at which the previous frame was rendered.
    last_frame_tick: std::time::Instant,
}

impl Storm {
    /// Instantiate from user config. The engine stays hidden until the
    /// adapter pushes its first parameter set.
    #[must_use]
    pub fn new(config: &crate::config::Config) -> Self {
        Self {
            params: None,
            speed: config.speed,
            drift: config.drift,
            size_range: config.size_range,
            hidden: config.hidden,
            circle_colour: crate::colour::convert_to_rgba(&config.circle_colour, 1.0),
            line_colour: crate::colour::convert_to_rgba(&config.line_colour, 1.0),
            particles: Vec::new(),
            rng: SmallRng::from_entropy(),
            frame_rate: config.frame_rate,
            last_frame_tick: std::time::Instant::now(),
        }
    }

    /// Apply a new parameter set from the adapter. The previous particle set
    /// is discarded in full; no per-particle identity survives.
    pub fn configure(&mut self, params: StormParams) {
        tracing::debug!("Reinitialising storm with {params:?}");
        self.params = Some(params);
        self.initialise();
    }

    /// Build a fresh particle set for the current parameters. A no-op while
    /// hidden.
    fn initialise(&mut self) {
        self.particles.clear();
        if self.hidden {
            return;
        }
        let Some(params) = self.params else {
            return;
        };

        let bounds = (params.width, params.height);
        for _ in 0..params.num_particles {
            self.particles.push(Particle::spawn(
                &mut self.rng,
                bounds,
                self.speed,
                self.size_range,
            ));
        }
    }

    /// Is there anything to animate at all?
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.params.is_some() && !self.hidden
    }

    /// Advance the whole field by one frame, then re-establish back-to-front
    /// paint order (descending size, stable on ties).
    pub fn step(&mut self) {
        let Some(params) = self.params else {
            return;
        };
        let bounds = (params.width, params.height);

        for particle in &mut self.particles {
            particle.integrate(&mut self.rng, bounds, self.speed, self.drift, self.size_range);
        }

        self.particles.sort_by(|a, b| b.size.total_cmp(&a.size));
    }

    /// All unordered particle pairs within the line distance threshold. Each
    /// pair appears exactly once, as `(i, j)` with `j < i`.
    #[must_use]
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let Some(params) = self.params else {
            return Vec::new();
        };

        let mut edges = Vec::new();
        for (i, particle) in self.particles.iter().enumerate() {
            for (j, other) in self.particles.iter().enumerate().take(i) {
                if particle.distance_to(other) <= params.line_distance {
                    edges.push((i, j));
                }
            }
        }
        edges
    }

    /// Paint the current frame: connecting lines first, then the circles on
    /// top of them.
    pub fn paint(&self, canvas: &mut Canvas) {
        if !self.is_active() {
            return;
        }

        let blur_level_max = self.size_range[1] * BLUR_LEVEL_MAX_FACTOR;
        let (line_red, line_green, line_blue, _) = self.line_colour;
        let glow_colour = (line_red, line_green, line_blue, 0.5);

        for (i, j) in self.edges() {
            let particle = &self.particles[i];
            let other = &self.particles[j];
            let distance = particle.distance_to(other);

            // Pull each endpoint in to its particle's circle boundary.
            let (from, to) = if distance > f32::EPSILON {
                let unit = (
                    (other.x - particle.x) / distance,
                    (other.y - particle.y) / distance,
                );
                (
                    (
                        particle.x + unit.0 * particle.size,
                        particle.y + unit.1 * particle.size,
                    ),
                    (other.x - unit.0 * other.size, other.y - unit.1 * other.size),
                )
            } else {
                ((particle.x, particle.y), (other.x, other.y))
            };

            let from_stop = (
                line_red,
                line_green,
                line_blue,
                1.0 - particle.blur_level / blur_level_max,
            );
            let to_stop = (
                line_red,
                line_green,
                line_blue,
                1.0 - other.blur_level / blur_level_max,
            );
            let glow_radius = particle.blur_level.max(other.blur_level);

            canvas.stroke_gradient_line(from, to, (from_stop, to_stop), glow_radius, glow_colour);
        }

        for particle in &self.particles {
            let (red, green, blue, _) = self.circle_colour;
            let alpha = 1.0 - particle.blur_level / blur_level_max;
            canvas.fill_circle(
                (particle.x, particle.y),
                particle.size,
                (red, green, blue, alpha),
            );
        }
    }

    /// Sleep until the next frame render is due.
    async fn sleep_until_next_frame_tick(&mut self) {
        let target = std::time::Duration::from_micros(
            1_000_000u64.wrapping_div(self.frame_rate.max(1).into()),
        );
        if let Some(wait) = target.checked_sub(self.last_frame_tick.elapsed()) {
            tokio::time::sleep(wait).await;
        }
        self.last_frame_tick = std::time::Instant::now();
    }

    /// Render one frame and send it off to the renderer.
    async fn render(&mut self, output: &tokio::sync::mpsc::Sender<Canvas>) -> Result<()> {
        if self.hidden {
            return Ok(());
        }
        let Some(params) = self.params else {
            return Ok(());
        };

        self.step();

        let mut canvas = Canvas::new(params.width as u32, params.height as u32);
        self.paint(&mut canvas);

        // A torn-down renderer isn't an error, the frame just has nowhere to
        // go. The `End` message will arrive soon enough.
        if output.send(canvas).await.is_err() {
            tracing::debug!("No rendering surface attached, dropping frame");
        }
        Ok(())
    }

    /// Our main entrypoint: run the frame loop until the `End` message.
    pub async fn start(
        state: Arc<SharedState>,
        mut protocol: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        output: tokio::sync::mpsc::Sender<Canvas>,
    ) -> Result<()> {
        let config = state.config.read().await.clone();
        let mut storm = Self::new(&config);

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                () = storm.sleep_until_next_frame_tick() => {
                    storm.render(&output).await?;
                },
                Ok(message) = protocol.recv() => {
                    match message {
                        crate::run::Protocol::End => break,
                        crate::run::Protocol::Storm(params) => storm.configure(params),
                        crate::run::Protocol::Resize { .. } => (),
                    }
                }
            }
        }

        tracing::debug!("Storm engine loop finished");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng as _;

    fn test_storm(num_particles: usize) -> Storm {
        let config = crate::config::Config::default();
        let mut storm = Storm::new(&config);
        storm.rng = SmallRng::seed_from_u64(42);
        storm.configure(StormParams {
            width: 200.0,
            height: 150.0,
            num_particles,
            line_distance: 100.0,
        });
        storm
    }

    #[test]
    fn count_invariant_holds_for_empty_and_large_sets() {
        assert_eq!(test_storm(0).particles.len(), 0);
        assert_eq!(test_storm(500).particles.len(), 500);
    }

    #[test]
    fn particles_stay_bounded_across_whole_field_steps() {
        let mut storm = test_storm(50);
        for _ in 0..200 {
            storm.step();
            for particle in &storm.particles {
                assert!((0.0..=200.0).contains(&particle.x));
                assert!((0.0..=150.0).contains(&particle.y));
                assert!(particle.vx.abs() <= storm.speed / 2.0);
                assert!(particle.vy.abs() <= storm.speed / 2.0);
            }
        }
    }

    #[test]
    fn stepping_sorts_particles_back_to_front() {
        let mut storm = test_storm(100);
        storm.step();
        for window in storm.particles.windows(2) {
            assert!(window[0].size >= window[1].size);
        }
    }

    #[test]
    fn edge_selection_is_symmetric() {
        let mut storm = test_storm(40);
        storm.step();

        // The forward evaluation order must find exactly the same undirected
        // adjacency as the backward one the engine uses.
        let line_distance = storm.params.unwrap().line_distance;
        let mut forward = Vec::new();
        for i in 0..storm.particles.len() {
            for j in (i + 1)..storm.particles.len() {
                if storm.particles[i].distance_to(&storm.particles[j]) <= line_distance {
                    forward.push((j, i));
                }
            }
        }

        let mut backward = storm.edges();
        forward.sort_unstable();
        backward.sort_unstable();
        assert_eq!(forward, backward);
        assert!(!backward.is_empty());
    }

    #[test]
    fn reconfiguring_discards_the_old_set_entirely() {
        let mut storm = test_storm(30);
        storm.step();
        storm.configure(StormParams {
            width: 100.0,
            height: 50.0,
            num_particles: 10,
            line_distance: 100.0,
        });
        assert_eq!(storm.particles.len(), 10);
        for particle in &storm.particles {
            assert!((0.0..=100.0).contains(&particle.x));
            assert!((0.0..=50.0).contains(&particle.y));
        }
    }

    #[test]
    fn hidden_suppresses_particles_and_painting() {
        let mut config = crate::config::Config::default();
        config.hidden = true;
        let mut storm = Storm::new(&config);
        storm.configure(StormParams {
            width: 200.0,
            height: 150.0,
            num_particles: 100,
            line_distance: 100.0,
        });
        assert!(storm.particles.is_empty());
        assert!(!storm.is_active());

        let mut canvas = Canvas::new(20, 20);
        storm.paint(&mut canvas);
        for y in 0..20 {
            for x in 0..20 {
                assert_eq!(canvas.pixel(x, y).unwrap().3, 0.0);
            }
        }
    }

    #[test]
    fn painting_reaches_the_canvas() {
        let mut storm = test_storm(20);
        storm.step();
        let mut canvas = Canvas::new(200, 150);
        storm.paint(&mut canvas);

        let painted = (0..150)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y).unwrap().3 > 0.0)
            .count();
        assert!(painted > 0);
    }
}
