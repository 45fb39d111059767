/// Accent palette handed out to identities in order of appearance.
pub const IDENTITY_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#FFE66D", "#95E1D3", "#F38181", "#AA96DA", "#FCBAD3", "#A8D8EA",
    "#FF9F43", "#6C5CE7",
];

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` / `RRGGBB` (case-insensitive).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..*self
        }
    }

    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// Hue in degrees, saturation and value in `[0, 1]`.
    pub fn to_hsv(&self) -> (f32, f32, f32) {
        let r = self.r as f32 / 255.0;
        let g = self.g as f32 / 255.0;
        let b = self.b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };
        (hue, saturation, max)
    }

    pub fn from_hsv(hue: f32, saturation: f32, value: f32, alpha: u8) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_byte = |f: f32| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgba(to_byte(r), to_byte(g), to_byte(b), alpha)
    }

    /// Same hue, value scaled by `factor` (< 1 darkens).
    pub fn darkened(&self, factor: f32) -> Self {
        let (h, s, v) = self.to_hsv();
        Self::from_hsv(h, s, v * factor, self.a)
    }

    /// Same hue, value raised toward 1 and saturation eased by `amount`.
    pub fn lightened(&self, amount: f32) -> Self {
        let (h, s, v) = self.to_hsv();
        let amount = amount.clamp(0.0, 1.0);
        Self::from_hsv(h, s * (1.0 - amount * 0.5), v + (1.0 - v) * amount, self.a)
    }

    /// Same hue, saturation pushed toward 1.
    pub fn saturated(&self, amount: f32) -> Self {
        let (h, s, v) = self.to_hsv();
        Self::from_hsv(h, s + (1.0 - s) * amount.clamp(0.0, 1.0), v, self.a)
    }

    pub fn lerp(&self, other: &Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// Palette entry for the `index`-th identity, wrapping around.
pub fn palette_color(index: usize) -> Color {
    Color::from_hex(IDENTITY_PALETTE[index % IDENTITY_PALETTE.len()]).unwrap_or(Color::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::with_hash("#FF6B6B", Color::rgb(255, 107, 107))]
    #[case::without_hash("4ecdc4", Color::rgb(78, 205, 196))]
    #[case::padded(" #000000 ", Color::BLACK)]
    fn test_from_hex(#[case] input: &str, #[case] expected: Color) {
        assert_eq!(Color::from_hex(input), Some(expected));
    }

    #[rstest]
    #[case::short("#FFF")]
    #[case::non_hex("#GG0000")]
    #[case::empty("")]
    #[case::multibyte("#ÄÄÄÄ")]
    fn test_from_hex_rejects(#[case] input: &str) {
        assert!(Color::from_hex(input).is_none());
    }

    #[test]
    fn test_to_hex_roundtrip() {
        let c = Color::rgb(0xAA, 0x96, 0xDA);
        assert_eq!(c.to_hex(), "#AA96DA");
        assert_eq!(Color::from_hex(&c.to_hex()), Some(c));
    }

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), palette_color(10));
        assert_eq!(palette_color(1), Color::rgb(0x4E, 0xCD, 0xC4));
    }

    #[test]
    fn test_hsv_primary_colors() {
        let (h, s, v) = Color::rgb(255, 0, 0).to_hsv();
        assert_relative_eq!(h, 0.0);
        assert_relative_eq!(s, 1.0);
        assert_relative_eq!(v, 1.0);

        let (h, _, _) = Color::rgb(0, 0, 255).to_hsv();
        assert_relative_eq!(h, 240.0);
    }

    #[test]
    fn test_hsv_roundtrip_palette() {
        for hex in IDENTITY_PALETTE {
            let c = Color::from_hex(hex).unwrap();
            let (h, s, v) = c.to_hsv();
            let back = Color::from_hsv(h, s, v, 255);
            assert!((back.r as i32 - c.r as i32).abs() <= 1, "{hex}");
            assert!((back.g as i32 - c.g as i32).abs() <= 1, "{hex}");
            assert!((back.b as i32 - c.b as i32).abs() <= 1, "{hex}");
        }
    }

    #[test]
    fn test_darkened_and_lightened_preserve_hue() {
        let accent = Color::from_hex("#FF9F43").unwrap();
        let (hue, _, value) = accent.to_hsv();

        let dark = accent.darkened(0.3);
        let (dark_hue, _, dark_value) = dark.to_hsv();
        assert!((dark_hue - hue).abs() < 3.0);
        assert!(dark_value < value);

        let light = Color::from_hex("#6C5CE7").unwrap();
        let (light_hue, _, light_value) = light.to_hsv();
        let (lighter_hue, _, lighter_value) = light.lightened(0.5).to_hsv();
        assert!((lighter_hue - light_hue).abs() < 3.0);
        assert!(lighter_value > light_value);
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(Color::WHITE.with_alpha(0.0).a, 0);
        assert_eq!(Color::WHITE.with_alpha(1.0).a, 255);
        assert_eq!(Color::WHITE.with_alpha(2.0).a, 255);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Color::BLACK;
        let b = Color::WHITE;
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5).r, 128);
    }
}
