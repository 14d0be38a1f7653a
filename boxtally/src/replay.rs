//! Redraw logged detections onto the frames they were inferred on.
//!
//! Unlike the stats pipeline, every frame is scaled against its own pixel size,
//! since sampled frames are stored at whatever resolution they were captured.

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::dimensions::{image_file_name, ImageDimensions};
use crate::loader::load_records;
use crate::record::ScaledBox;
use crate::scaler::scale_record;

/// Subdirectory written beside the frames when no output directory is given
pub const LABELLED_DIR: &str = "labelled_images";

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const TEXT_COLOR: Rgba<u8> = Rgba([36, 255, 12, 255]);
const TEXT_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 140]);
const TEXT_SCALE: f32 = 24.0;

/// How detections are drawn
pub struct FrameStyle {
    pub thickness: u32,
    pub min_confidence: f64,
    /// Labels are only drawn when a font is available
    pub font: Option<FontVec>,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            thickness: 2,
            min_confidence: 0.0,
            font: None,
        }
    }
}

impl FrameStyle {
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Invalid font {}: {e}", path.display()))?;
        self.font = Some(font);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub frames_written: usize,
    pub records_without_image: usize,
    pub records_skipped: usize,
    pub outputs: Vec<PathBuf>,
}

/// Draw every record of `log_path` whose frame exists in `images_dir`.
///
/// `images_dir` defaults to the log's directory; outputs go to `output_dir`
/// or to `labelled_images/` inside the image directory.
pub fn replay_log(
    log_path: &Path,
    images_dir: Option<&Path>,
    output_dir: Option<&Path>,
    style: &FrameStyle,
) -> Result<ReplaySummary> {
    let records = load_records(log_path)?;
    let images_dir = images_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| log_path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| images_dir.join(LABELLED_DIR));

    let mut summary = ReplaySummary::default();
    let mut written = HashSet::new();

    for record in &records {
        let Some(name) = record.image_file().and_then(image_file_name) else {
            debug!("Record {} has no image_file, skipping", record.index);
            summary.records_without_image += 1;
            continue;
        };

        let frame_path = images_dir.join(name);
        if !frame_path.is_file() {
            debug!("Frame {} not found, skipping", frame_path.display());
            summary.records_without_image += 1;
            continue;
        }

        let frame = image::open(&frame_path)
            .with_context(|| format!("Failed to open frame {}", frame_path.display()))?;
        let dims = ImageDimensions {
            width: frame.width(),
            height: frame.height(),
        };

        let objects = match scale_record(record, dims) {
            Ok(objects) => objects,
            Err(e) => {
                warn!("{}{e}", crate::color_utils::symbols::warning());
                summary.records_skipped += 1;
                continue;
            }
        };

        let mut canvas = frame.to_rgba8();
        draw_objects(&mut canvas, &objects, style);

        let output_path = output_dir.join(name);
        save_frame(canvas, &output_path)?;
        debug!(
            "Drew {} object(s) on {}",
            objects.len(),
            output_path.display()
        );

        if written.insert(output_path.clone()) {
            summary.frames_written += 1;
            summary.outputs.push(output_path);
        }
    }

    Ok(summary)
}

/// Draw boxes (and labels, when the style has a font) onto an RGBA frame
pub fn draw_objects(canvas: &mut RgbaImage, objects: &[ScaledBox], style: &FrameStyle) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    for object in objects.iter().filter(|o| o.conf >= style.min_confidence) {
        let x1 = object.x1.clamp(0, i64::from(width) - 1) as i32;
        let y1 = object.y1.clamp(0, i64::from(height) - 1) as i32;
        let x2 = object.x2.clamp(0, i64::from(width) - 1) as i32;
        let y2 = object.y2.clamp(0, i64::from(height) - 1) as i32;
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));

        for offset in 0..style.thickness as i32 {
            let rect_width = (right - left + 1 + offset * 2) as u32;
            let rect_height = (bottom - top + 1 + offset * 2) as u32;
            let rect = Rect::at(left - offset, top - offset).of_size(rect_width, rect_height);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }

        if let Some(font) = &style.font {
            draw_label(canvas, font, object, left, top);
        }
    }
}

fn draw_label(canvas: &mut RgbaImage, font: &FontVec, object: &ScaledBox, left: i32, top: i32) {
    let text = format!("{} {:.2}", object.class_name, object.conf);
    let scale = PxScale::from(TEXT_SCALE);
    let (text_width, text_height) = text_size(scale, font, &text);

    // Above the box when there is room, otherwise just inside it
    let text_y = if top >= text_height as i32 + 6 {
        top - text_height as i32 - 6
    } else {
        top + 2
    };
    let text_x = left + 2;

    for dx in 0..text_width + 4 {
        for dy in 0..text_height + 4 {
            let px = text_x - 2 + dx as i32;
            let py = text_y - 2 + dy as i32;
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height()
            {
                blend_pixel(canvas, px as u32, py as u32, TEXT_BACKGROUND);
            }
        }
    }

    draw_text_mut(canvas, TEXT_COLOR, text_x, text_y, scale, font, &text);
}

fn blend_pixel(canvas: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) {
    let alpha = f32::from(color.0[3]) / 255.0;
    let pixel = canvas.get_pixel_mut(x, y);
    for channel in 0..3 {
        let base = f32::from(pixel.0[channel]);
        let over = f32::from(color.0[channel]);
        pixel.0[channel] = (base * (1.0 - alpha) + over * alpha).round() as u8;
    }
    pixel.0[3] = pixel.0[3].max(color.0[3]);
}

/// Save a frame, dropping alpha for formats without it
fn save_frame(canvas: RgbaImage, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let keep_alpha = output_path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == "png")
        .unwrap_or(false);

    let output = if keep_alpha {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    };

    output
        .save(output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn object(x1: i64, y1: i64, x2: i64, y2: i64, conf: f64) -> ScaledBox {
        ScaledBox {
            x1,
            y1,
            x2,
            y2,
            conf,
            class_name: "cardboard".to_string(),
        }
    }

    #[test]
    fn test_draw_objects_outlines_box() {
        let mut canvas = RgbaImage::new(50, 50);
        draw_objects(&mut canvas, &[object(10, 10, 30, 30, 0.9)], &FrameStyle::default());

        assert_eq!(*canvas.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(30, 20), BOX_COLOR);
        // Interior stays untouched
        assert_eq!(*canvas.get_pixel(20, 20), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_objects_respects_min_confidence() {
        let mut canvas = RgbaImage::new(50, 50);
        let style = FrameStyle {
            min_confidence: 0.5,
            ..FrameStyle::default()
        };
        draw_objects(&mut canvas, &[object(10, 10, 30, 30, 0.2)], &style);
        assert_eq!(*canvas.get_pixel(10, 10), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_objects_clamps_out_of_frame_boxes() {
        let mut canvas = RgbaImage::new(20, 20);
        draw_objects(
            &mut canvas,
            &[object(-5, -5, 100, 100, 1.0), object(7, 7, 7, 7, 1.0)],
            &FrameStyle::default(),
        );
        assert_eq!(*canvas.get_pixel(0, 0), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(19, 19), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(7, 7), BOX_COLOR);
    }

    #[test]
    fn test_replay_log_writes_labelled_frames() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        image::RgbImage::new(40, 20).save(dir.join("frame_1.png")).unwrap();

        let log_path = dir.join("sampling_inference_out.json");
        fs::write(
            &log_path,
            concat!(
                "{\"image_file\": \"frame_1.png\", \"bboxes\": [[0.25, 0.25, 0.75, 0.75]], \"labels\": [\"pet\"], \"vals\": {\"confs\": [0.9]}}\n",
                "{\"image_file\": \"frame_2.png\", \"bboxes\": [], \"labels\": []}\n",
                "{\"image_file\": \"frame_1.png\", \"bboxes\": [[0.1, 0.1, 0.2, 0.2]], \"labels\": []}\n",
            ),
        )
        .unwrap();

        let summary = replay_log(&log_path, None, None, &FrameStyle::default()).unwrap();
        assert_eq!(summary.frames_written, 1);
        assert_eq!(summary.records_without_image, 1);
        assert_eq!(summary.records_skipped, 1);

        let output = dir.join(LABELLED_DIR).join("frame_1.png");
        assert_eq!(summary.outputs, vec![output.clone()]);
        let drawn = image::open(&output).unwrap().to_rgba8();
        // 0.25 * 40 = 10, 0.25 * 20 = 5
        assert_eq!(*drawn.get_pixel(10, 5), BOX_COLOR);
    }

    #[test]
    fn test_invalid_font_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let font_path = temp_dir.path().join("broken.ttf");
        fs::write(&font_path, b"not a font").unwrap();
        assert!(FrameStyle::default().with_font_file(&font_path).is_err());
    }
}
