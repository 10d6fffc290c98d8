// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory detection overlays
//!
//! Burns bounding boxes and class-label tags into a copy of the raster.
//! Everything happens on owned pixel buffers; there is no on-disk handoff,
//! so concurrent requests can never observe each other's artifacts.

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use super::postprocess::Detection;

/// Box border thickness in pixels
const BORDER_THICKNESS: i32 = 2;

/// Glyph cell geometry for the label text
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Vertical padding around the label text inside its tag
const LABEL_PAD: u32 = 2;

const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Per-class box colors, cycled by class index
const CLASS_PALETTE: [[u8; 3]; 10] = [
    [230, 57, 70],
    [46, 134, 171],
    [241, 143, 1],
    [42, 157, 143],
    [142, 68, 173],
    [231, 111, 81],
    [38, 70, 83],
    [0, 121, 140],
    [188, 108, 37],
    [96, 108, 56],
];

/// Burn detection overlays into a copy of the raster.
///
/// Output dimensions always equal the input's, and the channel layout
/// follows the input (RGB in, RGB out).
pub fn draw_detections(image: &DynamicImage, detections: &[Detection]) -> DynamicImage {
    let mut canvas = image.to_rgba8();

    for detection in detections {
        draw_detection(&mut canvas, detection);
    }

    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }
}

fn draw_detection(canvas: &mut RgbaImage, detection: &Detection) {
    let color = class_color(detection.class_id);

    let x = detection.x.round() as i32;
    let y = detection.y.round() as i32;
    let width = detection.width.round().max(1.0) as u32;
    let height = detection.height.round().max(1.0) as u32;

    // Nested hollow rects give the border its thickness
    for inset in 0..BORDER_THICKNESS {
        let w = width.saturating_sub(2 * inset as u32);
        let h = height.saturating_sub(2 * inset as u32);
        if w < 2 || h < 2 {
            break;
        }
        draw_hollow_rect_mut(canvas, Rect::at(x + inset, y + inset).of_size(w, h), color);
    }

    let text = format!("{} {:.2}", detection.label, detection.confidence).to_uppercase();
    draw_label_tag(canvas, &text, x, y, color);
}

/// Draw a filled tag with the label text, sitting on top of the box edge
/// (or inside it when the box touches the top of the image).
fn draw_label_tag(canvas: &mut RgbaImage, text: &str, x: i32, y: i32, color: Rgba<u8>) {
    let tag_width = text.len() as u32 * GLYPH_ADVANCE + 2 * LABEL_PAD;
    let tag_height = GLYPH_HEIGHT + 2 * LABEL_PAD;

    let tag_y = if y >= tag_height as i32 {
        y - tag_height as i32
    } else {
        y.max(0)
    };
    let tag_x = x.max(0);

    draw_filled_rect_mut(
        canvas,
        Rect::at(tag_x, tag_y).of_size(tag_width, tag_height),
        color,
    );

    let mut pen_x = tag_x + LABEL_PAD as i32;
    let pen_y = tag_y + LABEL_PAD as i32;
    for ch in text.chars() {
        draw_glyph(canvas, ch, pen_x, pen_y);
        pen_x += GLYPH_ADVANCE as i32;
    }
}

fn class_color(class_id: usize) -> Rgba<u8> {
    let [r, g, b] = CLASS_PALETTE[class_id % CLASS_PALETTE.len()];
    Rgba([r, g, b, 255])
}

fn draw_glyph(canvas: &mut RgbaImage, ch: char, x: i32, y: i32) {
    let rows = match glyph(ch) {
        Some(rows) => rows,
        None => return,
    };

    let (width, height) = canvas.dimensions();
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            let px = x + col as i32;
            let py = y + row as i32;
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                canvas.put_pixel(px as u32, py as u32, LABEL_TEXT_COLOR);
            }
        }
    }
}

/// 5x7 row bitmaps for the label charset (uppercase letters, digits,
/// space and dot); anything else is skipped.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ' ' => [0b00000; 7],
        _ => return None,
    };
    Some(rows)
}
