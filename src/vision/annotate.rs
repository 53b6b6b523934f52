use std::io::Cursor;

use ab_glyph::{FontArc, PxScale};
use bytes::{BufMut, Bytes, BytesMut};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::constants::{FRAME_BOUNDARY, TITLE_BAR_HEIGHT};

use super::types::Classification;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TITLE_LEFT: [f32; 3] = [0.0, 0.0, 255.0];
const TITLE_RIGHT: [f32; 3] = [255.0, 0.0, 0.0];
const BOX_THICKNESS: u32 = 3;
const STATS_BOX: (u32, u32, u32, u32) = (10, 60, 300, 150);
/// Share of the original pixel kept under the stats box.
const STATS_BOX_KEEP: f32 = 0.4;
const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("failed to read overlay font {path}: {source}")]
    FontIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid overlay font {0}")]
    FontInvalid(String),
    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Draws detection boxes and the decorative overlay. Captions need a TTF
/// font; without one only the shapes are drawn.
#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    pub fn load(font_path: Option<&str>) -> Result<Self, AnnotateError> {
        let Some(path) = font_path else {
            tracing::info!("No overlay font configured, captions disabled");
            return Ok(Self::default());
        };
        let bytes = std::fs::read(path).map_err(|source| AnnotateError::FontIo {
            path: path.to_string(),
            source,
        })?;
        let font =
            FontArc::try_from_vec(bytes).map_err(|_| AnnotateError::FontInvalid(path.to_string()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn draw_face(&self, frame: &mut RgbImage, rect: (u32, u32, u32, u32), result: &Classification) {
        let (x, y, w, h) = rect;
        for inset in 0..BOX_THICKNESS {
            if w <= inset * 2 || h <= inset * 2 {
                break;
            }
            draw_hollow_rect_mut(
                frame,
                Rect::at((x + inset) as i32, (y + inset) as i32).of_size(w - inset * 2, h - inset * 2),
                BOX_COLOR,
            );
        }

        let caption = format!("{} ({:.2}%)", result.label, result.confidence);
        let scale = PxScale::from(24.0);
        let text_h = self.text_height(scale, &caption);
        let top = (y as i32 - 10 - text_h).max(0);
        self.text(frame, BOX_COLOR, x as i32, top, scale, &caption);
    }

    pub fn draw_overlay(&self, frame: &mut RgbImage, total: u64, confirmed: u64) {
        self.title_bar(frame);
        self.stats_box(frame);

        self.text(
            frame,
            TEXT_COLOR,
            10,
            10,
            PxScale::from(30.0),
            "Virtual Doctor - Emotion Detection",
        );
        self.text(
            frame,
            TEXT_COLOR,
            20,
            72,
            PxScale::from(18.0),
            &format!("Total Detections: {total}"),
        );
        self.text(
            frame,
            TEXT_COLOR,
            20,
            102,
            PxScale::from(18.0),
            &format!("Consistent Detections: {confirmed}"),
        );

        let (w, h) = frame.dimensions();
        let x = (w / 2) as i32 - 100;
        let y = h as i32 - 20 - 30;
        self.text(frame, TEXT_COLOR, x, y.max(0), PxScale::from(30.0), "Virtual Doctor");
    }

    fn title_bar(&self, frame: &mut RgbImage) {
        let (w, h) = frame.dimensions();
        let rows = (TITLE_BAR_HEIGHT + 1).min(h);
        for col in 0..w {
            let ratio = col as f32 / w as f32;
            let color = Rgb([0usize, 1, 2].map(|c| {
                (TITLE_LEFT[c] * (1.0 - ratio) + TITLE_RIGHT[c] * ratio) as u8
            }));
            for row in 0..rows {
                frame.put_pixel(col, row, color);
            }
        }
    }

    fn stats_box(&self, frame: &mut RgbImage) {
        let (w, h) = frame.dimensions();
        let (x0, y0, x1, y1) = STATS_BOX;
        for y in y0..=y1.min(h.saturating_sub(1)) {
            for x in x0..=x1.min(w.saturating_sub(1)) {
                let px = frame.get_pixel_mut(x, y);
                px.0 = px.0.map(|c| (c as f32 * STATS_BOX_KEEP) as u8);
            }
        }
    }

    fn text_height(&self, scale: PxScale, text: &str) -> i32 {
        self.font
            .as_ref()
            .map(|font| text_size(scale, font, text).1 as i32)
            .unwrap_or(0)
    }

    fn text(&self, frame: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: PxScale, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(frame, color, x, y, scale, font, text);
        }
    }
}

pub fn encode_jpeg(frame: &RgbImage) -> Result<Vec<u8>, AnnotateError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), JPEG_QUALITY);
    frame.write_with_encoder(encoder)?;
    Ok(out)
}

/// Wraps one JPEG as a `multipart/x-mixed-replace` part.
pub fn multipart_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{FRAME_BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut buf = BytesMut::with_capacity(header.len() + jpeg.len() + 2);
    buf.put_slice(header.as_bytes());
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}
