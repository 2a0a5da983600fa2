use crate::foundation::error::{VeilError, VeilResult};

/// Straight-alpha RGBA8 color parsed from the strings stored on text overlays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#RRGGBB` / `#RRGGBB@alpha` form accepted by ffmpeg color options.
    pub fn to_ffmpeg(self) -> String {
        if self.a == 255 {
            format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!(
                "0x{:02X}{:02X}{:02X}@{:.3}",
                self.r,
                self.g,
                self.b,
                f64::from(self.a) / 255.0
            )
        }
    }
}

const NAMED: &[(&str, Rgba8)] = &[
    ("white", Rgba8::rgb(255, 255, 255)),
    ("black", Rgba8::rgb(0, 0, 0)),
    ("red", Rgba8::rgb(255, 0, 0)),
    ("green", Rgba8::rgb(0, 128, 0)),
    ("lime", Rgba8::rgb(0, 255, 0)),
    ("blue", Rgba8::rgb(0, 0, 255)),
    ("yellow", Rgba8::rgb(255, 255, 0)),
    ("cyan", Rgba8::rgb(0, 255, 255)),
    ("magenta", Rgba8::rgb(255, 0, 255)),
    ("orange", Rgba8::rgb(255, 165, 0)),
    ("purple", Rgba8::rgb(128, 0, 128)),
    ("pink", Rgba8::rgb(255, 192, 203)),
    ("gray", Rgba8::rgb(128, 128, 128)),
    ("grey", Rgba8::rgb(128, 128, 128)),
    ("silver", Rgba8::rgb(192, 192, 192)),
    ("navy", Rgba8::rgb(0, 0, 128)),
    (
        "transparent",
        Rgba8 {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        },
    ),
];

/// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(r,g,b)`, `rgba(r,g,b,a)` or a common CSS name.
pub fn parse_color(s: &str) -> VeilResult<Rgba8> {
    let s = s.trim();
    if s.is_empty() {
        return Err(VeilError::validation("color must be non-empty"));
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_fn(args);
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, c)| *c)
        .ok_or_else(|| VeilError::validation(format!("unknown color \"{s}\"")))
}

fn parse_hex(s: &str) -> VeilResult<Rgba8> {
    fn hex_byte(pair: &str) -> VeilResult<u8> {
        u8::from_str_radix(pair, 16)
            .map_err(|_| VeilError::validation(format!("invalid hex byte \"{pair}\"")))
    }

    if !s.is_ascii() {
        return Err(VeilError::validation("hex color must be ascii"));
    }
    match s.len() {
        3 => {
            let mut c = [0u8; 3];
            for (i, ch) in s.chars().enumerate() {
                let v = hex_byte(&ch.to_string())?;
                c[i] = v * 17;
            }
            Ok(Rgba8::rgb(c[0], c[1], c[2]))
        }
        6 => Ok(Rgba8::rgb(
            hex_byte(&s[0..2])?,
            hex_byte(&s[2..4])?,
            hex_byte(&s[4..6])?,
        )),
        8 => Ok(Rgba8 {
            r: hex_byte(&s[0..2])?,
            g: hex_byte(&s[2..4])?,
            b: hex_byte(&s[4..6])?,
            a: hex_byte(&s[6..8])?,
        }),
        _ => Err(VeilError::validation(
            "hex color must be #RGB, #RRGGBB or #RRGGBBAA (case-insensitive)",
        )),
    }
}

fn parse_rgb_fn(args: &str) -> VeilResult<Rgba8> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(VeilError::validation(
            "rgb()/rgba() expects 3 or 4 components",
        ));
    }
    let channel = |p: &str| -> VeilResult<u8> {
        p.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, 255.0) as u8)
            .ok_or_else(|| VeilError::validation(format!("invalid color channel \"{p}\"")))
    };
    let a = match parts.get(3) {
        Some(p) => p
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .ok_or_else(|| VeilError::validation(format!("invalid alpha \"{p}\"")))?,
        None => 255,
    };
    Ok(Rgba8 {
        r: channel(parts[0])?,
        g: channel(parts[1])?,
        b: channel(parts[2])?,
        a,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/color.rs"]
mod tests;
