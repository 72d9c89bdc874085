//! Style sheets and the scoped global style state.
//!
//! The active style is process-global so that every newly created
//! [`Figure`](crate::figure::Figure) picks it up, but each figure carries its
//! own snapshot: changing the global style never affects figures that were
//! already created. [`style_scope`] provides guaranteed restoration for test
//! and batch-render scopes, including on panic.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Rendering defaults applied to every new figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Figure size in pixels.
    pub width_px: u32,
    pub height_px: u32,
    /// Dots per inch, used to convert point sizes to pixels.
    pub dpi: f64,
    /// Figure background color.
    pub background: [u8; 3],
    /// Foreground color for axes, labels and annotations.
    pub foreground: [u8; 3],
    /// Base line width for axis frames, in points.
    pub line_width: f64,
    /// Label font size in points.
    pub font_size: f64,
    /// Categorical color cycle.
    pub palette: Vec<[u8; 3]>,
    /// Default colormap name for continuous data.
    pub cmap: String,
    /// Default margin fraction applied by the decoration pipeline.
    pub margin: f64,
    /// Whether text (labels, annotations, colorbar captions) is drawn at all.
    pub draw_text: bool,
}

impl Default for Style {
    /// The house style: a small 3.4 x 2.8 inch figure at 160 dpi with a
    /// nearly-black foreground and a Set1-derived palette whose yellow slot
    /// is replaced by the corresponding Set2 color.
    fn default() -> Self {
        let nearly_black = [38, 38, 38];
        let mut palette = set1_palette();
        palette[5] = [255, 217, 47]; // Set2 slot 5, Set1's yellow is too light
        Style {
            width_px: 544,  // 3.4 in * 160 dpi
            height_px: 448, // 2.8 in * 160 dpi
            dpi: 160.0,
            background: [255, 255, 255],
            foreground: nearly_black,
            line_width: 0.6,
            font_size: 7.0,
            palette,
            cmap: "viridis".to_string(),
            margin: crate::config::DEFAULT_MARGIN,
            draw_text: true,
        }
    }
}

fn set1_palette() -> Vec<[u8; 3]> {
    colorous::SET1
        .iter()
        .take(8)
        .map(|c| [c.r, c.g, c.b])
        .collect()
}

static CURRENT_STYLE: Mutex<Option<Style>> = Mutex::new(None);

fn lock_style() -> std::sync::MutexGuard<'static, Option<Style>> {
    // A panic while the lock was held (e.g. inside a failing figure test)
    // must not take down every later style access.
    CURRENT_STYLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of the active global style.
pub fn current_style() -> Style {
    lock_style().get_or_insert_with(Style::default).clone()
}

/// Replace the active global style.
pub fn use_style(style: Style) {
    *lock_style() = Some(style);
}

/// Scoped style guard returned by [`style_scope`]. Restores the previous
/// global style when dropped, on every exit path.
#[must_use = "the previous style is restored when the guard is dropped"]
pub struct StyleGuard {
    previous: Option<Style>,
}

impl Drop for StyleGuard {
    fn drop(&mut self) {
        *lock_style() = self.previous.take();
    }
}

/// Activate `style` for the lifetime of the returned guard.
pub fn style_scope(style: Style) -> StyleGuard {
    let mut current = lock_style();
    let previous = current.replace(style);
    StyleGuard { previous }
}

/// Serializes unit tests that write the global style; the test runner is
/// multi-threaded.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
