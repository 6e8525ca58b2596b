//! A plain RGBA pixel canvas for the storm to paint on.
//!
//! All drawing is alpha-blended (source-over) and silently clipped at the
//! canvas edges, so callers can paint glow halos and circles that hang over
//! the boundary without bounds arithmetic of their own.

use crate::colour::Colour;

/// A fixed-size RGBA pixel buffer.
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The pixels themselves.
    image: image::RgbaImage,
}

impl Canvas {
    /// Create a fully transparent canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            image: image::RgbaImage::new(width, height),
        }
    }

    /// Reset every pixel, either to a flat colour or to full transparency.
    pub fn clear(&mut self, maybe_colour: Option<Colour>) {
        let fill = match maybe_colour {
            Some(colour) => to_bytes(colour),
            None => image::Rgba([0, 0, 0, 0]),
        };
        for pixel in self.image.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Read back a single pixel. `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Colour> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let image::Rgba([red, green, blue, alpha]) = *self.image.get_pixel(x, y);
        Some((
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
            f32::from(alpha) / 255.0,
        ))
    }

    /// Source-over blend a colour onto one pixel. Out-of-bounds writes are
    /// dropped.
    pub fn blend_pixel(&mut self, x: i64, y: i64, colour: Colour) {
        if x < 0 || y < 0 {
            return;
        }
        let (col, row) = (x as u32, y as u32);
        if col >= self.width || row >= self.height {
            return;
        }

        let image::Rgba([red, green, blue, alpha]) = *self.image.get_pixel(col, row);
        let destination = (
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
            f32::from(alpha) / 255.0,
        );

        let source_alpha = colour.3.clamp(0.0, 1.0);
        let out_alpha = source_alpha + destination.3 * (1.0 - source_alpha);
        if out_alpha <= 0.0 {
            self.image.put_pixel(col, row, image::Rgba([0, 0, 0, 0]));
            return;
        }

        let blend = |source: f32, dest: f32| {
            (source * source_alpha + dest * destination.3 * (1.0 - source_alpha)) / out_alpha
        };
        let blended = (
            blend(colour.0, destination.0),
            blend(colour.1, destination.1),
            blend(colour.2, destination.2),
            out_alpha,
        );
        self.image.put_pixel(col, row, to_bytes(blended));
    }

    /// Stroke a one-pixel line whose opacity fades linearly from the `from`
    /// endpoint's alpha to the `to` endpoint's alpha, with an optional soft
    /// glow halo underneath.
    pub fn stroke_gradient_line(
        &mut self,
        from: (f32, f32),
        to: (f32, f32),
        stops: (Colour, Colour),
        glow_radius: f32,
        glow: Colour,
    ) {
        if glow_radius >= 1.0 && glow.3 > 0.0 {
            self.stroke_glow(from, to, glow_radius, glow);
        }

        let delta = (to.0 - from.0, to.1 - from.1);
        let steps = delta.0.abs().max(delta.1.abs()).ceil().max(1.0);
        let count = steps as i64;
        for step in 0..=count {
            let position = step as f32 / steps;
            let x = from.0 + delta.0 * position;
            let y = from.1 + delta.1 * position;
            let colour = (
                lerp(stops.0 .0, stops.1 .0, position),
                lerp(stops.0 .1, stops.1 .1, position),
                lerp(stops.0 .2, stops.1 .2, position),
                lerp(stops.0 .3, stops.1 .3, position),
            );
            self.blend_pixel(x.round() as i64, y.round() as i64, colour);
        }
    }

    /// A linear-falloff halo around a segment, standing in for canvas-style
    /// shadow blur.
    fn stroke_glow(&mut self, from: (f32, f32), to: (f32, f32), radius: f32, glow: Colour) {
        let min_x = (from.0.min(to.0) - radius).floor() as i64;
        let max_x = (from.0.max(to.0) + radius).ceil() as i64;
        let min_y = (from.1.min(to.1) - radius).floor() as i64;
        let max_y = (from.1.max(to.1) + radius).ceil() as i64;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let distance = segment_distance((x as f32 + 0.5, y as f32 + 0.5), from, to);
                if distance > radius {
                    continue;
                }
                let falloff = 1.0 - distance / radius;
                self.blend_pixel(x, y, (glow.0, glow.1, glow.2, glow.3 * falloff));
            }
        }
    }

    /// Paint a filled circle, blended with whatever is already there.
    pub fn fill_circle(&mut self, centre: (f32, f32), radius: f32, colour: Colour) {
        if radius <= 0.0 || colour.3 <= 0.0 {
            return;
        }

        let min_x = (centre.0 - radius).floor() as i64;
        let max_x = (centre.0 + radius).ceil() as i64;
        let min_y = (centre.1 - radius).floor() as i64;
        let max_y = (centre.1 + radius).ceil() as i64;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 + 0.5 - centre.0;
                let dy = y as f32 + 0.5 - centre.1;
                if dx * dx + dy * dy <= radius * radius {
                    self.blend_pixel(x, y, colour);
                }
            }
        }
    }
}

/// Linear interpolation.
fn lerp(start: f32, end: f32, position: f32) -> f32 {
    start + (end - start) * position
}

/// Shortest distance from a point to a line segment.
fn segment_distance(point: (f32, f32), start: (f32, f32), end: (f32, f32)) -> f32 {
    let segment = (end.0 - start.0, end.1 - start.1);
    let length_squared = segment.0 * segment.0 + segment.1 * segment.1;
    if length_squared <= f32::EPSILON {
        return (point.0 - start.0).hypot(point.1 - start.1);
    }

    let along = ((point.0 - start.0) * segment.0 + (point.1 - start.1) * segment.1)
        / length_squared;
    let clamped = along.clamp(0.0, 1.0);
    let nearest = (start.0 + segment.0 * clamped, start.1 + segment.1 * clamped);
    (point.0 - nearest.0).hypot(point.1 - nearest.1)
}

/// Quantise to the 8-bit buffer format.
fn to_bytes(colour: Colour) -> image::Rgba<u8> {
    image::Rgba([
        (colour.0.clamp(0.0, 1.0) * 255.0).round() as u8,
        (colour.1.clamp(0.0, 1.0) * 255.0).round() as u8,
        (colour.2.clamp(0.0, 1.0) * 255.0).round() as u8,
        (colour.3.clamp(0.0, 1.0) * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    const RED: Colour = (1.0, 0.0, 0.0, 1.0);
    const BLUE: Colour = (0.0, 0.0, 1.0, 1.0);

    #[test]
    fn clearing_fills_every_pixel() {
        let mut canvas = Canvas::new(4, 4);
        canvas.clear(Some(RED));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(canvas.pixel(x, y).unwrap(), RED);
            }
        }
        canvas.clear(None);
        assert_eq!(canvas.pixel(0, 0).unwrap().3, 0.0);
    }

    #[test]
    fn out_of_bounds_writes_are_dropped() {
        let mut canvas = Canvas::new(2, 2);
        canvas.blend_pixel(-1, 0, RED);
        canvas.blend_pixel(0, 5, RED);
        canvas.fill_circle((-10.0, -10.0), 3.0, RED);
        assert_eq!(canvas.pixel(0, 0).unwrap().3, 0.0);
    }

    #[test]
    fn opaque_blend_replaces_and_half_blend_mixes() {
        let mut canvas = Canvas::new(1, 1);
        canvas.clear(Some(RED));
        canvas.blend_pixel(0, 0, BLUE);
        assert_eq!(canvas.pixel(0, 0).unwrap(), BLUE);

        canvas.clear(Some((0.0, 0.0, 0.0, 1.0)));
        canvas.blend_pixel(0, 0, (1.0, 1.0, 1.0, 0.5));
        let mixed = canvas.pixel(0, 0).unwrap();
        assert!((mixed.0 - 0.5).abs() < 0.01);
        assert_eq!(mixed.3, 1.0);
    }

    #[test]
    fn gradient_line_fades_between_endpoints() {
        let mut canvas = Canvas::new(11, 1);
        canvas.stroke_gradient_line(
            (0.0, 0.0),
            (10.0, 0.0),
            ((1.0, 1.0, 1.0, 1.0), (1.0, 1.0, 1.0, 0.0)),
            0.0,
            (0.0, 0.0, 0.0, 0.0),
        );
        let start_alpha = canvas.pixel(0, 0).unwrap().3;
        let middle_alpha = canvas.pixel(5, 0).unwrap().3;
        assert_eq!(start_alpha, 1.0);
        assert!(middle_alpha > 0.3 && middle_alpha < 0.7);
    }

    #[test]
    fn glow_reaches_beyond_the_core_stroke() {
        let mut canvas = Canvas::new(11, 9);
        canvas.stroke_gradient_line(
            (2.0, 4.0),
            (8.0, 4.0),
            ((1.0, 1.0, 1.0, 1.0), (1.0, 1.0, 1.0, 1.0)),
            3.0,
            (1.0, 1.0, 1.0, 0.5),
        );
        // A pixel two rows off the stroke only gets painted by the halo.
        assert!(canvas.pixel(5, 2).unwrap().3 > 0.0);
        // But nothing beyond the glow radius.
        assert_eq!(canvas.pixel(5, 8).unwrap().3, 0.0);
    }

    #[test]
    fn filled_circle_covers_centre_but_not_corners() {
        let mut canvas = Canvas::new(9, 9);
        canvas.fill_circle((4.5, 4.5), 3.0, RED);
        assert_eq!(canvas.pixel(4, 4).unwrap(), RED);
        assert_eq!(canvas.pixel(0, 0).unwrap().3, 0.0);
        assert_eq!(canvas.pixel(8, 8).unwrap().3, 0.0);
    }
}
