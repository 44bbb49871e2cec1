//! Deterministic tag colors

/// Palette used for tag chips, indexed by [`color_for_tag`]
pub const PALETTE: [&str; 10] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#14b8a6",
    "#3b82f6", "#6366f1", "#a855f7", "#ec4899", "#64748b",
];

/// Pick a palette color for a tag.
///
/// 32-bit wrapping `h = c + ((h << 5) - h)` over UTF-16 code units, so the
/// web client computes the same color for the same tag.
pub fn color_for_tag(tag: &str) -> &'static str {
    let hash = tag.encode_utf16().fold(0i32, |h, c| {
        (c as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h))
    });
    PALETTE[(hash.unsigned_abs() as usize) % PALETTE.len()]
}
