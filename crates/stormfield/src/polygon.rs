//! The companion widget: a rotating polygon of connected vertices, each one
//! jittering around its base radius. Much simpler than the storm, but it
//! consumes the same canvas and the same frame-loop pattern, including
//! pause-on-hover/resume-on-leave.

use std::sync::Arc;

use color_eyre::eyre::Result;
use rand::rngs::SmallRng;
use rand::Rng as _;
use rand::SeedableRng as _;

use crate::canvas::Canvas;
use crate::shared_state::SharedState;

/// The rendered radius of each vertex's circle, in pixels.
const VERTEX_RADIUS: f32 = 4.0;

/// A vertex is either an opaque index or a keyed, labelled item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vertex {
    /// A plain numbered vertex.
    Index(usize),
    /// A vertex carrying user content.
    Keyed {
        /// The identifier handed back on click.
        key: String,
        /// The text shown next to the vertex.
        label: String,
    },
}

/// Per-vertex animation state.
#[derive(Debug, Clone)]
struct VertexState {
    /// Fixed angular position around the polygon.
    angle: f32,
    /// The base radius, before jitter.
    radius: f32,
    /// Current jitter offset from the base radius.
    offset: f32,
    /// Jitter velocity.
    velocity: f32,
    /// What this vertex represents.
    vertex: Vertex,
}

/// The rotating polygon widget.
pub struct Polygon {
    /// Animation state per vertex.
    vertices: Vec<VertexState>,
    /// Current whole-polygon rotation.
    rotation_angle: f32,
    /// Rotation applied each frame.
    rotation_speed: f32,
    /// Maximum radial jitter, in pixels.
    movement_amplitude: f32,
    /// Base radius of the polygon.
    size: f32,
    /// Whether the animation loop is paused (pointer hovering a vertex).
    paused: bool,
    /// The uniform random source for the jitter.
    rng: SmallRng,
}

impl Polygon {
    /// Lay the vertices out in an equilateral configuration.
    #[must_use]
    pub fn new(
        vertices: Vec<Vertex>,
        size: f32,
        rotation_speed: f32,
        movement_amplitude: f32,
    ) -> Self {
        let mut rng = SmallRng::from_entropy();
        let amplitude = size * movement_amplitude;
        let angle_increment = std::f32::consts::TAU / vertices.len().max(1) as f32;

        let states = vertices
            .into_iter()
            .enumerate()
            .map(|(index, vertex)| VertexState {
                angle: index as f32 * angle_increment,
                radius: size,
                offset: 0.0,
                velocity: rng.gen_range(-amplitude / 200.0..=amplitude / 200.0),
                vertex,
            })
            .collect();

        Self {
            vertices: states,
            rotation_angle: 0.0,
            rotation_speed: rotation_speed / 100.0,
            movement_amplitude: amplitude,
            size,
            paused: false,
            rng,
        }
    }

    /// A polygon of plain numbered vertices.
    #[must_use]
    pub fn with_count(
        count: usize,
        size: f32,
        rotation_speed: f32,
        movement_amplitude: f32,
    ) -> Self {
        let vertices = (0..count).map(Vertex::Index).collect();
        Self::new(vertices, size, rotation_speed, movement_amplitude)
    }

    /// The square canvas edge needed to contain the polygon at maximum
    /// jitter.
    #[must_use]
    pub fn canvas_size(&self) -> f32 {
        2.0 * (self.size + self.movement_amplitude)
    }

    /// Advance rotation and jitter by one frame. Does nothing while paused.
    pub fn tick(&mut self) {
        if self.paused {
            return;
        }

        self.rotation_angle += self.rotation_speed;

        let amplitude = self.movement_amplitude;
        for vertex in &mut self.vertices {
            vertex.velocity += self.rng.gen_range(-amplitude / 400.0..=amplitude / 400.0);
            vertex.velocity = vertex
                .velocity
                .clamp(-amplitude / 50.0, amplitude / 50.0);
            // A slight oscillation around the base radius.
            vertex.offset = (vertex.offset + vertex.velocity)
                .clamp(-amplitude / 2.0, amplitude / 2.0);
        }
    }

    /// Stop animating, as when a pointer enters a vertex.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume animating, as when the pointer leaves again.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Current screen positions of all vertices.
    #[must_use]
    pub fn points(&self) -> Vec<(f32, f32, &Vertex)> {
        let centre = self.size + self.movement_amplitude;
        self.vertices
            .iter()
            .map(|vertex| {
                let radius = vertex.radius + vertex.offset;
                let angle = vertex.angle + self.rotation_angle;
                (
                    centre + radius * angle.cos(),
                    centre + radius * angle.sin(),
                    &vertex.vertex,
                )
            })
            .collect()
    }

    /// Resolve a click at the given canvas position to the vertex under it,
    /// if any.
    #[must_use]
    pub fn click(&self, x: f32, y: f32) -> Option<&Vertex> {
        self.points()
            .into_iter()
            .find(|(vertex_x, vertex_y, _)| {
                (x - vertex_x).hypot(y - vertex_y) <= VERTEX_RADIUS
            })
            .map(|(_, _, vertex)| vertex)
    }

    /// Paint the polygon: the connecting ring first, then the vertex circles.
    pub fn paint(&self, canvas: &mut Canvas, circle_colour: crate::colour::Colour, line_colour: crate::colour::Colour) {
        let points = self.points();
        if points.is_empty() {
            return;
        }

        for (index, point) in points.iter().enumerate() {
            let next = &points[(index + 1) % points.len()];
            canvas.stroke_gradient_line(
                (point.0, point.1),
                (next.0, next.1),
                (line_colour, line_colour),
                0.0,
                (0.0, 0.0, 0.0, 0.0),
            );
        }

        for (x, y, _) in &points {
            canvas.fill_circle((*x, *y), VERTEX_RADIUS, circle_colour);
        }
    }

    /// Run the widget's own frame loop until the `End` message.
    pub async fn start(
        state: Arc<SharedState>,
        mut protocol: tokio::sync::broadcast::Receiver<crate::run::Protocol>,
        output: tokio::sync::mpsc::Sender<Canvas>,
    ) -> Result<()> {
        let config = state.config.read().await.clone();
        let circle_colour = crate::colour::convert_to_rgba(&config.circle_colour, 1.0);
        let line_colour = crate::colour::convert_to_rgba(&config.line_colour, 0.4);

        // The stock widget: a pentagon at radius 100 with moderate jitter.
        let mut polygon = Self::with_count(5, 100.0, 6.0, 0.6);
        let frame_duration =
            std::time::Duration::from_micros(1_000_000u64.wrapping_div(config.frame_rate.max(1).into()));
        let mut interval = tokio::time::interval(frame_duration);

        #[expect(
            clippy::integer_division_remainder_used,
            reason = "This is caused by the `tokio::select!`"
        )]
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if config.hidden {
                        continue;
                    }
                    polygon.tick();
                    let edge = polygon.canvas_size().ceil() as u32;
                    let mut canvas = Canvas::new(edge, edge);
                    polygon.paint(&mut canvas, circle_colour, line_colour);
                    if output.send(canvas).await.is_err() {
                        tracing::debug!("No rendering surface attached, dropping frame");
                    }
                },
                Ok(message) = protocol.recv() => {
                    if matches!(message, crate::run::Protocol::End) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
