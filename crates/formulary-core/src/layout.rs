//! Auto-scale geometry
//!
//! Computes the zoom and centering offsets used to fit rendered content
//! into a viewport. All lengths are in pixels.

use serde::Serialize;

/// Margin used instead of the padding when scaling previews
pub const PREVIEW_MARGIN: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOptions {
    pub min_scale: f64,
    pub max_scale: f64,
    pub padding: f64,
    /// Small thumbnails: fit both axes and never upscale
    pub preview: bool,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            min_scale: 0.05,
            max_scale: 10.0,
            padding: 40.0,
            preview: false,
        }
    }
}

impl ScaleOptions {
    pub fn preview() -> Self {
        Self {
            preview: true,
            ..Self::default()
        }
    }

    fn margin(&self) -> f64 {
        if self.preview {
            PREVIEW_MARGIN
        } else {
            self.padding
        }
    }

    /// Largest scale auto-fit will pick
    fn auto_cap(&self) -> f64 {
        if self.preview {
            1.0
        } else {
            3.0
        }
    }
}

/// Result of fitting content into a container
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleOutcome {
    pub scale: f64,
    /// Scale at which the content fills the available width
    pub fit_width: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Extra room needed right of the content when it overflows
    pub overflow_x: f64,
    /// Extra room needed below the content when it overflows
    pub overflow_y: f64,
}

impl ScaleOutcome {
    fn identity() -> Self {
        Self {
            scale: 1.0,
            fit_width: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            overflow_x: 0.0,
            overflow_y: 0.0,
        }
    }
}

/// Fit `content` into `container`
///
/// A `requested` scale of `None` or zero means auto-fit: previews fit both
/// axes, everything else fits the width. The result is clamped to
/// `[min(min_scale, fit_width), max_scale]`, so content that can't reach the
/// minimum scale while still fitting is allowed to shrink further.
pub fn fit_scale(
    container: Size,
    content: Size,
    requested: Option<f64>,
    options: &ScaleOptions,
) -> ScaleOutcome {
    if content.width == 0.0 || content.height == 0.0 {
        return ScaleOutcome::identity();
    }

    let margin = options.margin();
    let scale_x = (container.width - margin * 2.0).max(0.0) / content.width;
    let scale_y = (container.height - margin * 2.0).max(0.0) / content.height;

    let fit_width = scale_x.min(options.auto_cap());

    let scale = match requested {
        Some(s) if s != 0.0 && !s.is_nan() => s,
        _ => {
            let auto = if options.preview {
                scale_x.min(scale_y)
            } else {
                scale_x
            };
            auto.min(options.auto_cap())
        }
    };

    let floor = options.min_scale.min(fit_width);
    let scale = scale.min(options.max_scale).max(floor);

    let (offset_x, overflow_x) = center(container.width, content.width, scale);
    let (offset_y, overflow_y) = center(container.height, content.height, scale);

    ScaleOutcome {
        scale,
        fit_width,
        offset_x,
        offset_y,
        overflow_x,
        overflow_y,
    }
}

/// Leading offset and trailing overflow along one axis
fn center(available: f64, length: f64, scale: f64) -> (f64, f64) {
    let scaled = length * scale;
    if scaled < available {
        (((available - scaled) / 2.0).floor(), 0.0)
    } else {
        (0.0, (scaled - length).ceil())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_content_is_identity() {
        let outcome = fit_scale(
            Size::new(500.0, 300.0),
            Size::new(0.0, 40.0),
            Some(2.0),
            &ScaleOptions::default(),
        );
        assert_eq!(outcome, ScaleOutcome::identity());
    }

    #[test]
    fn test_auto_fit_width_caps_at_three() {
        // 420 / 100 = 4.2, capped at 3
        let outcome = fit_scale(
            Size::new(500.0, 300.0),
            Size::new(100.0, 50.0),
            None,
            &ScaleOptions::default(),
        );
        assert_eq!(outcome.scale, 3.0);
        assert_eq!(outcome.fit_width, 3.0);
        assert_eq!(outcome.offset_x, 100.0);
        assert_eq!(outcome.offset_y, 75.0);
        assert_eq!(outcome.overflow_x, 0.0);
    }

    #[test]
    fn test_auto_fit_ignores_height_outside_previews() {
        // Width allows 2x; height would only allow 0.5x
        let outcome = fit_scale(
            Size::new(280.0, 130.0),
            Size::new(100.0, 100.0),
            Some(0.0),
            &ScaleOptions::default(),
        );
        assert_eq!(outcome.scale, 2.0);
        assert_eq!(outcome.offset_x, 40.0);
        assert_eq!(outcome.overflow_x, 0.0);
        assert_eq!(outcome.offset_y, 0.0);
        assert_eq!(outcome.overflow_y, 100.0);
    }

    #[test]
    fn test_preview_fits_both_axes() {
        let outcome = fit_scale(
            Size::new(216.0, 100.0),
            Size::new(400.0, 100.0),
            None,
            &ScaleOptions::preview(),
        );
        assert_eq!(outcome.scale, 0.5);
        assert_eq!(outcome.fit_width, 0.5);
        assert_eq!(outcome.offset_x, 8.0);
        assert_eq!(outcome.offset_y, 25.0);
    }

    #[test]
    fn test_preview_never_upscales() {
        let outcome = fit_scale(
            Size::new(400.0, 400.0),
            Size::new(10.0, 10.0),
            None,
            &ScaleOptions::preview(),
        );
        assert_eq!(outcome.scale, 1.0);
        assert_eq!(outcome.fit_width, 1.0);
    }

    #[test]
    fn test_requested_scale_is_clamped() {
        let container = Size::new(500.0, 300.0);
        let content = Size::new(100.0, 50.0);
        let options = ScaleOptions::default();

        let zoomed = fit_scale(container, content, Some(5.0), &options);
        assert_eq!(zoomed.scale, 5.0);
        assert_eq!(zoomed.offset_x, 0.0);
        assert_eq!(zoomed.overflow_x, 400.0);
        assert_eq!(zoomed.offset_y, 25.0);

        assert_eq!(fit_scale(container, content, Some(20.0), &options).scale, 10.0);
        assert_eq!(fit_scale(container, content, Some(0.01), &options).scale, 0.05);
    }

    #[test]
    fn test_minimum_relaxes_for_wide_content() {
        // Fitting needs 0.02, below the usual 0.05 floor
        let outcome = fit_scale(
            Size::new(180.0, 300.0),
            Size::new(5000.0, 10.0),
            Some(0.01),
            &ScaleOptions::default(),
        );
        assert_eq!(outcome.fit_width, 0.02);
        assert_eq!(outcome.scale, 0.02);
    }

    #[test]
    fn test_container_smaller_than_padding() {
        let outcome = fit_scale(
            Size::new(60.0, 60.0),
            Size::new(100.0, 10.0),
            None,
            &ScaleOptions::default(),
        );
        assert_eq!(outcome.fit_width, 0.0);
        assert_eq!(outcome.scale, 0.0);
        assert_eq!(outcome.offset_x, 30.0);
    }
}
