//! Page geometry and image placement
//!
//! Resolves named paper sizes to point dimensions and computes where a
//! raster image lands on a page under a fit policy. Everything here is pure:
//! no I/O, no shared state, safe to call from any thread.
//!
//! Coordinates follow the PDF convention: points (1/72 inch), origin at the
//! bottom-left corner of the page.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConvertError;

/// Margin left around a contained image, split evenly on the constraining axis.
pub const CONTAIN_MARGIN: f64 = 40.0;

/// Named paper size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [PageSize::A4, PageSize::Letter, PageSize::Legal];

    /// Portrait (width, height) in points
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }

    /// Look up a size by name. Unknown names resolve to A4.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "letter" => PageSize::Letter,
            "legal" => PageSize::Legal,
            _ => PageSize::A4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Only "landscape" selects landscape; anything else is portrait.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("landscape") {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// How an image's bounding box is mapped onto a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Shrink to fit entirely, keeping aspect ratio and a margin
    #[default]
    Contain,
    /// Grow to fill the page, keeping aspect ratio; overflows one axis
    Cover,
    /// Fill the page exactly, ignoring aspect ratio
    Stretch,
}

impl FromStr for FitPolicy {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(FitPolicy::Contain),
            "cover" => Ok(FitPolicy::Cover),
            "stretch" => Ok(FitPolicy::Stretch),
            _ => Err(ConvertError::InvalidFitPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FitPolicy::Contain => "contain",
            FitPolicy::Cover => "cover",
            FitPolicy::Stretch => "stretch",
        };
        f.write_str(name)
    }
}

/// Resolved page size in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageDimensions {
    pub width: f64,
    pub height: f64,
}

impl PageDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Resolve a named size and orientation to point dimensions.
///
/// Landscape swaps the portrait width and height; nothing else changes.
pub fn resolve_page_size(size: PageSize, orientation: Orientation) -> PageDimensions {
    let (width, height) = size.dimensions();
    match orientation {
        Orientation::Portrait => PageDimensions::new(width, height),
        Orientation::Landscape => PageDimensions::new(height, width),
    }
}

/// Intrinsic pixel size of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageDescriptor {
    width: u32,
    height: u32,
    aspect_ratio: f64,
}

impl ImageDescriptor {
    pub fn new(width: u32, height: u32) -> Result<Self, ConvertError> {
        if width == 0 || height == 0 {
            return Err(ConvertError::DegenerateImage(format!(
                "image has zero extent ({}x{})",
                width, height
            )));
        }

        Ok(Self {
            width,
            height,
            aspect_ratio: width as f64 / height as f64,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// width / height
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
}

/// Rectangle at which an image is drawn, in page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    fn centered(page: PageDimensions, width: f64, height: f64) -> Self {
        Self {
            x: (page.width - width) / 2.0,
            y: (page.height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Compute where `image` is drawn on a page of size `page` under `fit`.
///
/// `Cover` may return a rectangle larger than the page; clipping is the
/// drawing code's job.
pub fn place_image(
    image: &ImageDescriptor,
    page: PageDimensions,
    fit: FitPolicy,
) -> Result<Placement, ConvertError> {
    if !(page.width > 0.0 && page.height > 0.0) {
        return Err(ConvertError::DegenerateImage(format!(
            "page has non-positive extent ({}x{})",
            page.width, page.height
        )));
    }

    let aspect_ratio = image.aspect_ratio();
    let wider_than_page = aspect_ratio > page.aspect_ratio();

    let placement = match fit {
        FitPolicy::Contain => {
            let (width, height) = if wider_than_page {
                let width = page.width - CONTAIN_MARGIN;
                (width, width / aspect_ratio)
            } else {
                let height = page.height - CONTAIN_MARGIN;
                (height * aspect_ratio, height)
            };
            Placement::centered(page, width, height)
        }
        FitPolicy::Cover => {
            let (width, height) = if wider_than_page {
                (page.height * aspect_ratio, page.height)
            } else {
                (page.width, page.width / aspect_ratio)
            };
            Placement::centered(page, width, height)
        }
        FitPolicy::Stretch => Placement {
            x: 0.0,
            y: 0.0,
            width: page.width,
            height: page.height,
        },
    };

    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPS: f64 = 1e-9;

    fn a4() -> PageDimensions {
        resolve_page_size(PageSize::A4, Orientation::Portrait)
    }

    #[test]
    fn test_page_size_table() {
        assert_eq!(PageSize::A4.dimensions(), (595.0, 842.0));
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        assert_eq!(PageSize::Legal.dimensions(), (612.0, 1008.0));
    }

    #[test]
    fn test_unknown_page_size_falls_back_to_a4() {
        assert_eq!(PageSize::from_name("tabloid"), PageSize::A4);
        assert_eq!(PageSize::from_name(""), PageSize::A4);
        assert_eq!(PageSize::from_name("LETTER"), PageSize::Letter);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let page = resolve_page_size(PageSize::Legal, Orientation::Landscape);
        assert_eq!(page, PageDimensions::new(1008.0, 612.0));
    }

    #[test]
    fn test_orientation_from_name() {
        assert_eq!(Orientation::from_name("landscape"), Orientation::Landscape);
        assert_eq!(Orientation::from_name("sideways"), Orientation::Portrait);
    }

    #[test]
    fn test_fit_policy_parses_known_values() {
        assert_eq!("contain".parse::<FitPolicy>().unwrap(), FitPolicy::Contain);
        assert_eq!("Cover".parse::<FitPolicy>().unwrap(), FitPolicy::Cover);
        assert_eq!("stretch".parse::<FitPolicy>().unwrap(), FitPolicy::Stretch);
    }

    #[test]
    fn test_fit_policy_rejects_unknown_value() {
        let err = "fill".parse::<FitPolicy>().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFitPolicy(ref v) if v == "fill"));
    }

    #[test]
    fn test_zero_height_image_is_degenerate() {
        assert!(matches!(
            ImageDescriptor::new(100, 0),
            Err(ConvertError::DegenerateImage(_))
        ));
    }

    #[test]
    fn test_zero_height_page_is_degenerate() {
        let image = ImageDescriptor::new(100, 100).unwrap();
        let result = place_image(&image, PageDimensions::new(595.0, 0.0), FitPolicy::Contain);
        assert!(matches!(result, Err(ConvertError::DegenerateImage(_))));
    }

    #[test]
    fn test_contain_wide_image_constrained_by_width() {
        let image = ImageDescriptor::new(2000, 1000).unwrap();
        let placement = place_image(&image, a4(), FitPolicy::Contain).unwrap();

        assert!((placement.width - 555.0).abs() < EPS);
        assert!((placement.height - 277.5).abs() < EPS);
        assert!((placement.x - 20.0).abs() < EPS);
        assert!((placement.y - (842.0 - 277.5) / 2.0).abs() < EPS);
    }

    #[test]
    fn test_contain_tall_image_constrained_by_height() {
        let image = ImageDescriptor::new(500, 1000).unwrap();
        let placement = place_image(&image, a4(), FitPolicy::Contain).unwrap();

        assert!((placement.height - 802.0).abs() < EPS);
        assert!((placement.width - 401.0).abs() < EPS);
        assert!((placement.y - 20.0).abs() < EPS);
    }

    #[test]
    fn test_cover_wide_image_overflows_horizontally() {
        let image = ImageDescriptor::new(2000, 1000).unwrap();
        let placement = place_image(&image, a4(), FitPolicy::Cover).unwrap();

        assert!((placement.height - 842.0).abs() < EPS);
        assert!((placement.width - 1684.0).abs() < EPS);
        assert!(placement.x < 0.0);
        assert!((placement.y).abs() < EPS);
    }

    #[test]
    fn test_cover_tall_image_overflows_vertically() {
        let image = ImageDescriptor::new(100, 1000).unwrap();
        let placement = place_image(&image, a4(), FitPolicy::Cover).unwrap();

        assert!((placement.width - 595.0).abs() < EPS);
        assert!((placement.height - 5950.0).abs() < EPS);
        assert!(placement.y < 0.0);
    }

    #[test]
    fn test_stretch_fills_page() {
        let image = ImageDescriptor::new(31, 7).unwrap();
        let placement = place_image(&image, a4(), FitPolicy::Stretch).unwrap();
        assert_eq!(
            placement,
            Placement {
                x: 0.0,
                y: 0.0,
                width: 595.0,
                height: 842.0
            }
        );
    }

    #[test]
    fn test_square_image_on_square_page_uses_height_branch() {
        let image = ImageDescriptor::new(10, 10).unwrap();
        let page = PageDimensions::new(500.0, 500.0);
        let placement = place_image(&image, page, FitPolicy::Contain).unwrap();
        assert!((placement.width - 460.0).abs() < EPS);
        assert!((placement.height - 460.0).abs() < EPS);
    }
}
