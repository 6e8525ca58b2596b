//! Convert user-supplied colour strings to concrete RGBA values.
//!
//! Parsing never fails upward: anything unparseable becomes [`DEFAULT_COLOUR`]
//! at the requested opacity, with a diagnostic in the logs. The storm is
//! decorative, so a wrong colour beats a crash.

/// An RGBA colour, each channel in `0.0..=1.0`.
pub type Colour = (f32, f32, f32, f32);

/// The colour substituted for any colour string we can't make sense of.
pub const DEFAULT_COLOUR: palette::Srgb<u8> = palette::Srgb::new(52, 152, 219);

/// A default pure white.
pub const WHITE: Colour = (1.0, 1.0, 1.0, 1.0);

/// Resolve a colour specification to an RGBA value at the given opacity.
///
/// Accepts hex (`#3498db`), CSS named colours (`white`) and functional
/// notation (`rgb(52, 152, 219)`, `rgba(0, 0, 0, 0.5)`). The spec's own alpha
/// channel, if any, is discarded in favour of `opacity`.
#[must_use]
pub fn convert_to_rgba(spec: &str, opacity: f32) -> Colour {
    let rgb = match parse(spec) {
        Some((rgb, _alpha)) => rgb,
        None => {
            tracing::error!("Invalid colour input: '{spec}'");
            DEFAULT_COLOUR
        }
    };

    let float: palette::Srgb<f32> = rgb.into_format();
    (float.red, float.green, float.blue, opacity.clamp(0.0, 1.0))
}

/// Whether a colour specification resolves to a fully transparent colour.
/// Unparseable input is not transparent, it's the (opaque) default colour.
#[must_use]
pub fn is_transparent(spec: &str) -> bool {
    match parse(spec) {
        Some((_rgb, alpha)) => alpha == 0.0,
        None => false,
    }
}

/// Parse a colour specification into an 8-bit RGB triple plus its own alpha.
fn parse(spec: &str) -> Option<(palette::Srgb<u8>, f32)> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.eq_ignore_ascii_case("transparent") {
        return Some((palette::Srgb::new(0, 0, 0), 0.0));
    }

    if let Some(functional) = parse_functional(trimmed) {
        return Some(functional);
    }

    // Named before hex: a bare 6-letter name could otherwise be misread as
    // hex digits.
    if let Some(named) = palette::named::from_str(&trimmed.to_ascii_lowercase()) {
        return Some((named, 1.0));
    }

    if let Ok(hex) = trimmed.parse::<palette::Srgb<u8>>() {
        return Some((hex, 1.0));
    }

    None
}

/// Parse `rgb(r, g, b)` and `rgba(r, g, b, a)` notation.
fn parse_functional(spec: &str) -> Option<(palette::Srgb<u8>, f32)> {
    let lower = spec.to_ascii_lowercase();
    let arguments = lower
        .strip_prefix("rgba")
        .or_else(|| lower.strip_prefix("rgb"))?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;

    let channels: Vec<&str> = arguments.split(',').map(str::trim).collect();
    if channels.len() != 3 && channels.len() != 4 {
        return None;
    }

    let mut rgb = [0u8; 3];
    for (slot, channel) in rgb.iter_mut().zip(&channels) {
        let value = channel.parse::<f32>().ok()?;
        *slot = value.clamp(0.0, 255.0).round() as u8;
    }

    let alpha = match channels.get(3) {
        Some(channel) => channel.parse::<f32>().ok()?.clamp(0.0, 1.0),
        None => 1.0,
    };

    Some((palette::Srgb::new(rgb[0], rgb[1], rgb[2]), alpha))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unparseable_input_falls_back_deterministically() {
        let fallback = convert_to_rgba("not-a-color", 0.5);
        assert_eq!(
            fallback,
            (52.0 / 255.0, 152.0 / 255.0, 219.0 / 255.0, 0.5)
        );
        // And again, same answer.
        assert_eq!(convert_to_rgba("not-a-color", 0.5), fallback);
    }

    #[test]
    fn hex_and_functional_agree() {
        let hex = convert_to_rgba("#3498db", 1.0);
        let functional = convert_to_rgba("rgb(52, 152, 219)", 1.0);
        assert_eq!(hex, functional);
    }

    #[test]
    fn named_colours() {
        assert_eq!(convert_to_rgba("white", 1.0), WHITE);
        assert_eq!(convert_to_rgba("  Black ", 1.0), (0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn opacity_overrides_the_specs_own_alpha() {
        let colour = convert_to_rgba("rgba(255, 0, 0, 0.1)", 0.9);
        assert_eq!(colour, (1.0, 0.0, 0.0, 0.9));
    }

    #[test]
    fn transparency_predicate() {
        assert!(is_transparent("rgba(0, 0, 0, 0)"));
        assert!(is_transparent("transparent"));
        assert!(!is_transparent("white"));
        assert!(!is_transparent("rgba(0, 0, 0, 0.01)"));
        assert!(!is_transparent("not-a-color"));
    }
}
