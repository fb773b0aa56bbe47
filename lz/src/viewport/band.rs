//! Activation band geometry

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::section::SectionKey;

fn default_top_offset_px() -> f64 {
    80.0
}

fn default_bottom_exclusion() -> f64 {
    0.6
}

/// Horizontal strip near the top of the viewport that decides which section
/// is current.
///
/// The band runs from `top_offset_px` (below the sticky header) down to
/// `viewport_height * (1 - bottom_exclusion)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivationBand {
    #[serde(rename = "top-offset-px", default = "default_top_offset_px")]
    pub top_offset_px: f64,

    /// Fraction of the viewport height excluded from the bottom
    #[serde(rename = "bottom-exclusion", default = "default_bottom_exclusion")]
    pub bottom_exclusion: f64,
}

impl Default for ActivationBand {
    fn default() -> Self {
        Self {
            top_offset_px: default_top_offset_px(),
            bottom_exclusion: default_bottom_exclusion(),
        }
    }
}

impl ActivationBand {
    pub fn new(top_offset_px: f64, bottom_exclusion: f64) -> Self {
        Self {
            top_offset_px,
            bottom_exclusion,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.top_offset_px.is_finite() || self.top_offset_px < 0.0 {
            return Err(ConfigError::InvalidTopOffset {
                value: self.top_offset_px,
            });
        }
        if !(0.0..1.0).contains(&self.bottom_exclusion) {
            return Err(ConfigError::InvalidBottomExclusion {
                value: self.bottom_exclusion,
            });
        }
        Ok(())
    }

    /// Band edges in viewport coordinates for a given viewport height
    pub fn bounds(&self, viewport_height: f64) -> (f64, f64) {
        let top = self.top_offset_px;
        let bottom = viewport_height * (1.0 - self.bottom_exclusion);
        (top, bottom)
    }

    /// Whether a rectangle intersects the band.
    ///
    /// When the viewport is too short for the band to have height, the band
    /// collapses to the line at `top_offset_px`.
    pub fn intersects(&self, rect: &Rect, viewport_height: f64) -> bool {
        let (top, bottom) = self.bounds(viewport_height);
        if bottom <= top {
            return rect.top <= top && rect.bottom > top;
        }
        rect.top < bottom && rect.bottom > top
    }
}

/// Vertical extent of a section's anchor, relative to the viewport top
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn from_height(top: f64, height: f64) -> Self {
        Self {
            top,
            bottom: top + height,
        }
    }
}

/// One observation of a group's anchors
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportFrame<K> {
    pub viewport_height: f64,
    pub rects: Vec<(K, Rect)>,
}

impl<K: SectionKey> ViewportFrame<K> {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            viewport_height,
            rects: Vec::new(),
        }
    }

    pub fn with_rect(mut self, id: K, rect: Rect) -> Self {
        self.rects.push((id, rect));
        self
    }

    pub fn rect(&self, id: K) -> Option<&Rect> {
        self.rects.iter().find(|(k, _)| *k == id).map(|(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band_bounds() {
        let band = ActivationBand::default();
        let (top, bottom) = band.bounds(1000.0);
        assert_eq!(top, 80.0);
        assert!((bottom - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersects_band() {
        let band = ActivationBand::default();

        // Just scrolled past the sticky header
        assert!(band.intersects(&Rect::new(60.0, 700.0), 1000.0));
        // Entirely above the band
        assert!(!band.intersects(&Rect::new(-500.0, 50.0), 1000.0));
        // Still in the lower 60% of the viewport
        assert!(!band.intersects(&Rect::new(450.0, 900.0), 1000.0));
        // Edges are exclusive
        assert!(!band.intersects(&Rect::new(400.0, 900.0), 1000.0));
        assert!(!band.intersects(&Rect::new(0.0, 80.0), 1000.0));
    }

    #[test]
    fn test_degenerate_band_collapses_to_line() {
        let band = ActivationBand::default();
        // 150 * 0.4 = 60 < 80
        assert!(band.intersects(&Rect::new(50.0, 120.0), 150.0));
        assert!(!band.intersects(&Rect::new(90.0, 140.0), 150.0));
    }

    #[test]
    fn test_validate_band() {
        assert!(ActivationBand::default().validate().is_ok());
        assert!(matches!(
            ActivationBand::new(-1.0, 0.6).validate(),
            Err(ConfigError::InvalidTopOffset { .. })
        ));
        assert!(matches!(
            ActivationBand::new(80.0, 1.0).validate(),
            Err(ConfigError::InvalidBottomExclusion { .. })
        ));
        assert!(ActivationBand::new(f64::NAN, 0.5).validate().is_err());
    }
}
