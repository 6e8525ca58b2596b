//! Convert a finished canvas frame into terminal cells.
//!
//! Each terminal cell holds two vertically stacked "pixels": the upper half
//! block (▀) is coloured with the cell's foreground and the lower half with
//! its background. So a canvas of `columns x (rows * 2)` pixels maps onto the
//! whole terminal.

use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

use crate::canvas::Canvas;
use crate::colour::Colour;

/// Composite a (possibly translucent) colour over an opaque background.
/// Terminal cells can't be translucent themselves, so every frame is
/// flattened before it is sent off.
#[must_use]
pub fn composite_over(colour: Colour, background: Colour) -> Colour {
    let alpha = colour.3.clamp(0.0, 1.0);
    (
        colour.0 * alpha + background.0 * (1.0 - alpha),
        colour.1 * alpha + background.1 * (1.0 - alpha),
        colour.2 * alpha + background.2 * (1.0 - alpha),
        1.0,
    )
}

/// Flatten a canvas over the given background and encode it as a termwiz
/// surface of half-block cells.
#[must_use]
pub fn canvas_to_surface(canvas: &Canvas, background: Colour) -> termwiz::surface::Surface {
    let columns = canvas.width as usize;
    let rows = (canvas.height as usize).div_ceil(2);
    let mut surface = termwiz::surface::Surface::new(columns, rows);

    for row in 0..rows {
        surface.add_change(TermwizChange::CursorPosition {
            x: TermwizPosition::Absolute(0),
            y: TermwizPosition::Absolute(row),
        });
        for column in 0..columns {
            let x = column as u32;
            let y = (row * 2) as u32;
            let upper = canvas.pixel(x, y).unwrap_or(background);
            let lower = canvas.pixel(x, y + 1).unwrap_or(background);
            surface.add_changes(vec![
                make_fg_colour(composite_over(upper, background)),
                make_bg_colour(composite_over(lower, background)),
            ]);
            surface.add_change("▀");
        }
    }

    surface
}

/// Make a Termwiz colour attribute.
#[must_use]
pub const fn make_colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
    termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
        colour.0, colour.1, colour.2, colour.3,
    ))
}

/// Make a Termwiz foreground colour change.
#[must_use]
pub const fn make_fg_colour(colour: Colour) -> TermwizChange {
    let colour_attribute = make_colour_attribute(colour);
    TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(colour_attribute))
}

/// Make a Termwiz background colour change.
#[must_use]
pub const fn make_bg_colour(colour: Colour) -> TermwizChange {
    let colour_attribute = make_colour_attribute(colour);
    TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(colour_attribute))
}

#[cfg(test)]
mod test {
    use super::*;

    const BLACK: Colour = (0.0, 0.0, 0.0, 1.0);
    const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

    #[test]
    fn compositing_over_an_opaque_background() {
        assert_eq!(composite_over((1.0, 0.0, 0.0, 1.0), WHITE), (1.0, 0.0, 0.0, 1.0));
        assert_eq!(composite_over((1.0, 0.0, 0.0, 0.0), WHITE), WHITE);
        let half = composite_over((0.0, 0.0, 0.0, 0.5), WHITE);
        assert!((half.0 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn two_pixel_rows_become_one_cell_row() {
        let mut canvas = Canvas::new(2, 4);
        canvas.clear(Some(BLACK));
        canvas.blend_pixel(0, 0, WHITE);
        canvas.blend_pixel(1, 3, WHITE);

        let mut surface = canvas_to_surface(&canvas, BLACK);
        assert_eq!(surface.dimensions(), (2, 2));

        let cells = surface.screen_cells();
        let top_left = &cells[0][0];
        assert_eq!(top_left.str(), "▀");
        assert_eq!(top_left.attrs().foreground(), make_colour_attribute(WHITE));
        assert_eq!(top_left.attrs().background(), make_colour_attribute(BLACK));

        let bottom_right = &cells[1][1];
        assert_eq!(bottom_right.attrs().foreground(), make_colour_attribute(BLACK));
        assert_eq!(bottom_right.attrs().background(), make_colour_attribute(WHITE));
    }
}
