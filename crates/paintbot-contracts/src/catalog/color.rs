pub const LIGHT_TEXT_COLOR: &str = "#ffffff";
pub const DARK_TEXT_COLOR: &str = "#000000";

const LIGHTNESS_THRESHOLD: f64 = 0.6;

fn parse_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// HSL lightness of a hex color, `None` when the input is not a 3/6 digit hex.
pub fn lightness(hex: &str) -> Option<f64> {
    let (r, g, b) = parse_rgb(hex)?;
    let max = r.max(g).max(b) as f64 / 255.0;
    let min = r.min(g).min(b) as f64 / 255.0;
    Some((max + min) / 2.0)
}

/// Malformed colors count as dark.
pub fn is_light(hex: &str) -> bool {
    lightness(hex)
        .map(|value| value > LIGHTNESS_THRESHOLD)
        .unwrap_or(false)
}

pub fn text_color(hex: &str) -> &'static str {
    if is_light(hex) {
        DARK_TEXT_COLOR
    } else {
        LIGHT_TEXT_COLOR
    }
}

/// Canonical `#RRGGBB` spelling accepted by the messaging platform.
pub fn normalize_hex(hex: &str) -> Option<String> {
    let (r, g, b) = parse_rgb(hex)?;
    Some(format!("#{r:02X}{g:02X}{b:02X}"))
}
