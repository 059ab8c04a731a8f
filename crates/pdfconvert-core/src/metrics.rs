//! Helvetica font metrics
//!
//! Advance widths of the standard Helvetica font for printable ASCII, in
//! 1/1000 em. Characters outside that range are drawn as `?` by the text
//! encoders in this crate and measured accordingly.

const FIRST_CHAR: u8 = b' ';

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

/// Ascender minus descender (718 - -207)
const HELVETICA_HEIGHT: f64 = 925.0;

/// Map text to the single-byte encoding used when drawing with Helvetica.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            _ => b'?',
        })
        .collect()
}

fn glyph_width(byte: u8) -> u16 {
    byte.checked_sub(FIRST_CHAR)
        .and_then(|index| HELVETICA_WIDTHS.get(index as usize))
        .copied()
        .unwrap_or(HELVETICA_WIDTHS[(b'?' - FIRST_CHAR) as usize])
}

/// Width of `text` set in Helvetica at `font_size` points
pub fn text_width(text: &str, font_size: f64) -> f64 {
    let units: u32 = encode_text(text)
        .into_iter()
        .map(|b| glyph_width(b) as u32)
        .sum();
    units as f64 * font_size / 1000.0
}

/// Line height of Helvetica at `font_size` points
pub fn text_height(font_size: f64) -> f64 {
    HELVETICA_HEIGHT * font_size / 1000.0
}
