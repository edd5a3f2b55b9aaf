//! The fixed qualitative palette series are coloured with.

use plotters::style::RGBColor;

/// ColorBrewer "Paired", twelve colours.
pub const PAIRED: [RGBColor; 12] = [
    RGBColor(166, 206, 227),
    RGBColor(31, 120, 180),
    RGBColor(178, 223, 138),
    RGBColor(51, 160, 44),
    RGBColor(251, 154, 153),
    RGBColor(227, 26, 28),
    RGBColor(253, 191, 111),
    RGBColor(255, 127, 0),
    RGBColor(202, 178, 214),
    RGBColor(106, 61, 154),
    RGBColor(255, 255, 153),
    RGBColor(177, 89, 40),
];

/// Colour for the `index`-th series, cycling after twelve.
pub fn color(index: usize) -> RGBColor {
    PAIRED[index % PAIRED.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_distinct_and_cycle() {
        for i in 0..PAIRED.len() {
            for j in (i + 1)..PAIRED.len() {
                assert_ne!(PAIRED[i], PAIRED[j]);
            }
        }
        assert_eq!(color(12), color(0));
        assert_eq!(color(13), PAIRED[1]);
    }
}
