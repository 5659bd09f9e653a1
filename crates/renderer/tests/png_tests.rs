//! Tests for PNG encoding of raster surfaces.

use std::io::Read;

use renderer::arrows::{new_surface, surface_to_rgba, ArrowGlyph, ArrowStyle};
use renderer::png::{create_png, encode_surface};
use renderer::Color;

// ============================================================================
// Helper functions
// ============================================================================

/// Walk the chunk list, returning `(type, data)` pairs.
fn chunks(png: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
    let mut out = Vec::new();
    let mut pos = 8;
    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
        out.push((kind, png[pos + 8..pos + 8 + len].to_vec()));
        pos += 12 + len;
    }
    out
}

fn inflate(data: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).unwrap();
    out
}

// ============================================================================
// Encoder tests
// ============================================================================

#[test]
fn test_chunk_layout() {
    let png = create_png(&[0u8; 3 * 2 * 4], 3, 2).unwrap();
    let kinds: Vec<[u8; 4]> = chunks(&png).into_iter().map(|(k, _)| k).collect();
    assert_eq!(kinds, vec![*b"IHDR", *b"IDAT", *b"IEND"]);

    let (_, ihdr) = &chunks(&png)[0];
    assert_eq!(u32::from_be_bytes(ihdr[0..4].try_into().unwrap()), 3);
    assert_eq!(u32::from_be_bytes(ihdr[4..8].try_into().unwrap()), 2);
    assert_eq!(ihdr[8], 8);
    assert_eq!(ihdr[9], 6);
}

#[test]
fn test_scanlines_carry_filter_byte() {
    let pixels: Vec<u8> = (0..4 * 2 * 4).map(|i| i as u8).collect();
    let png = create_png(&pixels, 4, 2).unwrap();
    let idat = &chunks(&png)[1].1;
    let raw = inflate(idat);

    assert_eq!(raw.len(), 2 * (1 + 4 * 4));
    assert_eq!(raw[0], 0);
    assert_eq!(raw[17], 0);
    assert_eq!(&raw[1..17], &pixels[0..16]);
}

#[test]
fn test_empty_image_rejected() {
    assert!(create_png(&[], 0, 4).is_err());
    assert!(create_png(&[], 4, 0).is_err());
}

#[test]
fn test_encode_surface_keeps_drawn_pixels() {
    let mut pixmap = new_surface(32, 16).unwrap();
    let glyph = ArrowGlyph::new(ArrowStyle::default()).unwrap();
    glyph.draw(&mut pixmap, 2.0, 8.0, 24.0, 0.0, Color::rgb(255, 0, 0));

    let png = encode_surface(&pixmap).unwrap();
    let raw = inflate(&chunks(&png)[1].1);

    let rgba: Vec<u8> = raw
        .chunks_exact(1 + 32 * 4)
        .flat_map(|row| row[1..].to_vec())
        .collect();
    assert_eq!(rgba, surface_to_rgba(&pixmap));
    assert!(rgba.chunks_exact(4).any(|p| p[3] == 255 && p[0] == 255));
}
