#![forbid(unsafe_code)]

//! Perceptual classification of CSS color strings.
//!
//! The painter never needs to know *which* blue a page uses, only whether a
//! computed value is close enough to the brand blue to be replaced. Colors
//! are parsed from the two notations browsers hand back from
//! `getComputedStyle` and from presentation attributes (`rgb()/rgba()` and
//! 3- or 6-digit hex), converted to HSV and bucketed into a [`Category`].
//!
//! # Invariants
//!
//! 1. Classification is total: malformed or missing input is
//!    [`Category::Neither`], never an error.
//! 2. The same channel values classify identically regardless of notation.
//! 3. All blueish bounds are inclusive.

/// Lower hue bound (degrees) of the blueish band.
pub const BLUE_HUE_MIN: f64 = 190.0;
/// Upper hue bound (degrees) of the blueish band.
pub const BLUE_HUE_MAX: f64 = 225.0;
/// Minimum saturation for a blueish color.
pub const BLUE_MIN_SATURATION: f64 = 0.25;
/// Minimum value (brightness) for a blueish color.
pub const BLUE_MIN_VALUE: f64 = 0.35;
/// Per-channel floor for a whiteish color.
pub const WHITE_MIN_CHANNEL: u8 = 245;

/// Perceptual bucket a color falls into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Category {
    Blueish,
    Whiteish,
    #[default]
    Neither,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blueish => "blueish",
            Self::Whiteish => "whiteish",
            Self::Neither => "neither",
        }
    }
}

/// An opaque 8-bit sRGB triple. Alpha is ignored by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to hue/saturation/value using the min/max channel formulas.
    ///
    /// Hue is in `[0, 360)`, saturation and value in `[0, 1]`. Achromatic
    /// colors report a hue of `0`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn to_hsv(self) -> Hsv {
        let rn = f64::from(self.r) / 255.0;
        let gn = f64::from(self.g) / 255.0;
        let bn = f64::from(self.b) / 255.0;
        let max = rn.max(gn).max(bn);
        let min = rn.min(gn).min(bn);
        let delta = max - min;

        let mut h = 0.0;
        if delta != 0.0 {
            h = if max == rn {
                ((gn - bn) / delta) % 6.0
            } else if max == gn {
                (bn - rn) / delta + 2.0
            } else {
                (rn - gn) / delta + 4.0
            };
            h *= 60.0;
            if h < 0.0 {
                h += 360.0;
            }
        }
        let s = if max == 0.0 { 0.0 } else { delta / max };
        Hsv { h, s, v: max }
    }

    #[must_use]
    pub const fn is_whiteish(self) -> bool {
        self.r >= WHITE_MIN_CHANNEL && self.g >= WHITE_MIN_CHANNEL && self.b >= WHITE_MIN_CHANNEL
    }

    #[must_use]
    pub fn category(self) -> Category {
        if self.to_hsv().is_blueish() {
            Category::Blueish
        } else if self.is_whiteish() {
            Category::Whiteish
        } else {
            Category::Neither
        }
    }

    /// Lowercase `#rrggbb` form.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Hue in degrees, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    #[must_use]
    pub const fn new(h: f64, s: f64, v: f64) -> Self {
        Self { h, s, v }
    }

    #[must_use]
    pub fn is_blueish(self) -> bool {
        (BLUE_HUE_MIN..=BLUE_HUE_MAX).contains(&self.h)
            && self.s >= BLUE_MIN_SATURATION
            && self.v >= BLUE_MIN_VALUE
    }
}

/// Parse a CSS color in `rgb()`, `rgba()`, `#rgb` or `#rrggbb` notation.
///
/// Only the first three components of the functional notation are read;
/// alpha and anything after it are ignored. Components may be separated by
/// commas or whitespace, may carry decimals or a `%` suffix, and are clamped
/// to `0..=255`.
#[must_use]
pub fn parse_css_color(input: &str) -> Option<Rgb> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    parse_rgb_function(s)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let mut doubled = [0u8; 3];
            for (slot, digit) in doubled.iter_mut().zip(hex.bytes()) {
                let nibble = char::from(digit).to_digit(16)?;
                *slot = (nibble * 17) as u8;
            }
            Some(Rgb::new(doubled[0], doubled[1], doubled[2]))
        }
        6 => Some(Rgb::new(pair(0)?, pair(2)?, pair(4)?)),
        _ => None,
    }
}

fn parse_rgb_function(s: &str) -> Option<Rgb> {
    let open = s.find('(')?;
    let name = s[..open].trim();
    if !(name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba")) {
        return None;
    }
    let body = s[open + 1..].split(')').next().unwrap_or_default();
    let mut parts = body
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty());
    let r = parse_channel(parts.next()?)?;
    let g = parse_channel(parts.next()?)?;
    let b = parse_channel(parts.next()?)?;
    Some(Rgb::new(r, g, b))
}

fn parse_channel(token: &str) -> Option<u8> {
    let (number, percent) = match token.strip_suffix('%') {
        Some(pct) => (pct, true),
        None => (token, false),
    };
    let mut value = number.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    if percent {
        // Multiply first: `2.55` is not exact and halves would round down.
        value = value * 255.0 / 100.0;
    }
    Some(value.round().clamp(0.0, 255.0) as u8)
}

/// Classify a CSS color string. Unparseable input is [`Category::Neither`].
#[must_use]
pub fn classify(input: &str) -> Category {
    parse_css_color(input).map_or(Category::Neither, Rgb::category)
}

/// Classify a possibly-missing CSS color string.
#[must_use]
pub fn classify_opt(input: Option<&str>) -> Category {
    input.map_or(Category::Neither, classify)
}

#[must_use]
pub fn is_blueish(input: &str) -> bool {
    classify(input) == Category::Blueish
}

#[must_use]
pub fn is_whiteish(input: &str) -> bool {
    classify(input) == Category::Whiteish
}
