//! Figure comparison harness.
//!
//! Each test builds a figure, renders it and compares the pixels against a
//! baseline image stored in the repository. A missing baseline is adopted
//! from the current render (inspect it before committing). On mismatch the
//! actual, baseline and an amplified difference image land in
//! `tests/failed/` for visual inspection.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use image::RgbImage;
use latviz::{style_scope, Figure, Style};

/// Root mean square pixel difference below which two renders count as equal.
/// Antialiasing may round differently across backend versions, so exact
/// equality would be too brittle.
const RMS_TOLERANCE: f64 = 10.0;

// The harness switches the global style, so comparisons must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

/// A small fixed style so baselines do not depend on the house style.
fn test_style() -> Style {
    let mut style = Style::default();
    style.width_px = 320;
    style.height_px = 240;
    style.draw_text = false;
    style
}

fn baseline_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/baseline_plots")
}

fn failed_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/failed")
}

/// Render the figure produced by `build` and compare it against the
/// `<name>.png` baseline.
pub fn assert_figure<F>(name: &str, build: F)
where
    F: FnOnce(&mut Figure) -> anyhow::Result<()>,
{
    let _ = env_logger::builder().is_test(true).try_init();
    let _serial = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _style = style_scope(test_style());

    let mut fig = Figure::new();
    build(&mut fig).expect("building the figure failed");
    // Text rendering depends on the fonts installed in the environment.
    fig.clear_text();

    let (w, h) = (fig.style().width_px, fig.style().height_px);
    let buffer = fig.render_rgb().expect("rendering failed");
    let actual = RgbImage::from_raw(w, h, buffer).expect("render buffer has the wrong size");

    let baseline_path = baseline_dir().join(format!("{name}.png"));
    if !baseline_path.exists() {
        fs::create_dir_all(baseline_dir()).expect("creating the baseline directory failed");
        actual
            .save(&baseline_path)
            .expect("writing the new baseline failed");
        eprintln!(
            "adopted a new baseline for {name:?} at {}; verify it visually",
            baseline_path.display()
        );
        return;
    }

    let baseline = image::open(&baseline_path)
        .expect("reading the baseline image failed")
        .to_rgb8();
    if baseline.dimensions() != actual.dimensions() {
        save_failure(name, &actual, &baseline);
        panic!(
            "figure {name:?} is {:?} but the baseline is {:?}",
            actual.dimensions(),
            baseline.dimensions()
        );
    }

    let rms = rms_difference(&actual, &baseline);
    if rms > RMS_TOLERANCE {
        save_failure(name, &actual, &baseline);
        panic!(
            "figure {name:?} differs from its baseline: rms {rms:.3} > {RMS_TOLERANCE} \
             (images saved to {})",
            failed_dir().display()
        );
    }
}

fn rms_difference(a: &RgbImage, b: &RgbImage) -> f64 {
    let sum: f64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    (sum / a.as_raw().len() as f64).sqrt()
}

fn save_failure(name: &str, actual: &RgbImage, baseline: &RgbImage) {
    let dir = failed_dir();
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let _ = actual.save(dir.join(format!("{name}_actual.png")));
    let _ = baseline.save(dir.join(format!("{name}_baseline.png")));

    if actual.dimensions() == baseline.dimensions() {
        let (w, h) = actual.dimensions();
        let mut diff = RgbImage::new(w, h);
        for (d, (a, b)) in diff
            .pixels_mut()
            .zip(actual.pixels().zip(baseline.pixels()))
        {
            for i in 0..3 {
                // Amplify so single-step differences are visible.
                let delta = (a.0[i] as i16 - b.0[i] as i16).unsigned_abs();
                d.0[i] = delta.saturating_mul(10).min(255) as u8;
            }
        }
        let _ = diff.save(dir.join(format!("{name}_diff.png")));
    }
}
