use crossterm::style::Color;

// the 13 foreground colors a field name can hash into, in SGR order 31..36, 91..97
pub const FIELD_PALETTE: [Color; 13] = [
    Color::DarkRed,
    Color::DarkGreen,
    Color::DarkYellow,
    Color::DarkBlue,
    Color::DarkMagenta,
    Color::DarkCyan,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

pub const TIME_COLOR: Color = Color::DarkCyan;

pub const PLACEHOLDER_COLOR: Color = Color::DarkYellow;

const HASH_MASK: u32 = 0x7FFF_FFFF;

/// Picks a stable color for a field name.
///
/// The name is folded with `hash = hash * 31 + code_point`, kept in the
/// non-negative 31-bit range, and reduced modulo the palette size. The same
/// name always maps to the same color, across runs. An empty name has no color.
pub fn field_color(name: &str) -> Option<Color> {
    if name.is_empty() {
        return None;
    }

    let hash = name.chars().fold(0u32, |hash, c| {
        (hash.wrapping_mul(31).wrapping_add(c as u32)) & HASH_MASK
    });

    Some(FIELD_PALETTE[hash as usize % FIELD_PALETTE.len()])
}
