//! Locate-and-click of template images on screen.
//!
//! Best-effort: `Ok(false)` means the template is not currently visible.
//! Matching is an exact-window scan with a small per-channel tolerance;
//! the template must have been captured at the same screen resolution.

use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{Rgba, RgbaImage};
use tracing::{debug, info};
use xcap::Monitor;

use super::InputDriver;

/// Per-channel difference still accepted as the same pixel.
const CHANNEL_TOLERANCE: u8 = 12;

/// Load `<folder>/<template_name>.png`, find it on the primary monitor
/// and click its center.
pub fn locate_and_click(input: &mut InputDriver, template_name: &str, folder: &Path) -> Result<bool> {
    let template_path = folder.join(format!("{template_name}.png"));
    let template = image::open(&template_path)
        .with_context(|| format!("failed to load template image {}", template_path.display()))?
        .to_rgba8();

    let monitor = primary_monitor()?;
    let monitor_x = monitor.x().context("failed to read monitor position")?;
    let monitor_y = monitor.y().context("failed to read monitor position")?;
    let screen = monitor.capture_image().context("failed to capture screen")?;

    match locate(&screen, &template) {
        Some((x, y)) => {
            let center_x = monitor_x + (x + template.width() / 2) as i32;
            let center_y = monitor_y + (y + template.height() / 2) as i32;
            info!(template = template_name, x = center_x, y = center_y, "template found, clicking");
            input.click_at(center_x, center_y)?;
            Ok(true)
        }
        None => {
            debug!(template = template_name, "template not found on screen");
            Ok(false)
        }
    }
}

fn primary_monitor() -> Result<Monitor> {
    let monitors = Monitor::all().context("failed to enumerate monitors")?;
    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().context("failed to query monitor")? {
            return Ok(monitor);
        }
        if fallback.is_none() {
            fallback = Some(monitor);
        }
    }
    match fallback {
        Some(monitor) => Ok(monitor),
        None => bail!("no monitors detected"),
    }
}

/// Scan `screen` for `template`, returning the top-left match position.
fn locate(screen: &RgbaImage, template: &RgbaImage) -> Option<(u32, u32)> {
    let (screen_w, screen_h) = screen.dimensions();
    let (template_w, template_h) = template.dimensions();
    if template_w == 0 || template_h == 0 || template_w > screen_w || template_h > screen_h {
        return None;
    }
    for y in 0..=(screen_h - template_h) {
        for x in 0..=(screen_w - template_w) {
            if window_matches(screen, template, x, y) {
                return Some((x, y));
            }
        }
    }
    None
}

fn window_matches(screen: &RgbaImage, template: &RgbaImage, origin_x: u32, origin_y: u32) -> bool {
    let (template_w, template_h) = template.dimensions();

    // Corner and center probes reject most positions before the full scan.
    let probes = [
        (0, 0),
        (template_w - 1, 0),
        (0, template_h - 1),
        (template_w - 1, template_h - 1),
        (template_w / 2, template_h / 2),
    ];
    for (px, py) in probes {
        if !pixel_close(screen.get_pixel(origin_x + px, origin_y + py), template.get_pixel(px, py)) {
            return false;
        }
    }

    for ty in 0..template_h {
        for tx in 0..template_w {
            if !pixel_close(screen.get_pixel(origin_x + tx, origin_y + ty), template.get_pixel(tx, ty)) {
                return false;
            }
        }
    }
    true
}

/// Alpha is ignored; screenshots and exported templates disagree on it.
fn pixel_close(a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
    a.0.iter()
        .zip(b.0.iter())
        .take(3)
        .all(|(x, y)| x.abs_diff(*y) <= CHANNEL_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn locates_an_embedded_template() {
        let mut screen = filled(64, 48, [10, 10, 10, 255]);
        for dy in 0..8 {
            for dx in 0..8 {
                screen.put_pixel(20 + dx, 12 + dy, Rgba([200, 50, 50, 255]));
            }
        }
        let template = filled(8, 8, [200, 50, 50, 255]);
        assert_eq!(locate(&screen, &template), Some((20, 12)));
    }

    #[test]
    fn tolerates_small_channel_differences() {
        let screen = filled(16, 16, [100, 100, 100, 255]);
        let template = filled(4, 4, [104, 96, 100, 0]);
        assert_eq!(locate(&screen, &template), Some((0, 0)));
    }

    #[test]
    fn misses_when_template_is_absent() {
        let screen = filled(32, 32, [0, 0, 0, 255]);
        let template = filled(4, 4, [255, 255, 255, 255]);
        assert_eq!(locate(&screen, &template), None);
    }

    #[test]
    fn template_larger_than_screen_never_matches() {
        let screen = filled(8, 8, [0, 0, 0, 255]);
        let template = filled(16, 16, [0, 0, 0, 255]);
        assert_eq!(locate(&screen, &template), None);
    }
}
