//! Property tests for page sizing, image placement, watermark tiling and
//! page range parsing.

use pdfconvert_core::layout::CONTAIN_MARGIN;
use pdfconvert_core::watermark::{TextExtent, GRID_COLUMNS, GRID_ROWS};
use pdfconvert_core::{
    parse_page_ranges, place_image, resolve_page_size, watermark_marks, ConvertError, FitPolicy,
    ImageDescriptor, Orientation, PageDimensions, PageSize,
};
use proptest::prelude::*;

const EPS: f64 = 1e-6;

fn page_size() -> impl Strategy<Value = PageSize> {
    prop::sample::select(PageSize::ALL.to_vec())
}

fn fit_policy() -> impl Strategy<Value = FitPolicy> {
    prop::sample::select(vec![FitPolicy::Contain, FitPolicy::Cover, FitPolicy::Stretch])
}

fn page() -> impl Strategy<Value = PageDimensions> {
    (page_size(), any::<bool>()).prop_map(|(size, landscape)| {
        let orientation = if landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        resolve_page_size(size, orientation)
    })
}

fn image() -> impl Strategy<Value = ImageDescriptor> {
    (1u32..10_000, 1u32..10_000).prop_map(|(w, h)| ImageDescriptor::new(w, h).unwrap())
}

proptest! {
    /// Landscape is the portrait size with the axes swapped
    #[test]
    fn landscape_swaps_portrait(size in page_size()) {
        let portrait = resolve_page_size(size, Orientation::Portrait);
        let landscape = resolve_page_size(size, Orientation::Landscape);
        prop_assert_eq!(landscape.width, portrait.height);
        prop_assert_eq!(landscape.height, portrait.width);
    }

    /// Contain keeps the margin on the constraining axis, never leaves the
    /// page and is centered
    #[test]
    fn contain_fits_and_centers(image in image(), page in page()) {
        let p = place_image(&image, page, FitPolicy::Contain).unwrap();

        let width_bound = (p.width - (page.width - CONTAIN_MARGIN)).abs() < EPS;
        let height_bound = (p.height - (page.height - CONTAIN_MARGIN)).abs() < EPS;
        prop_assert!(width_bound || height_bound);
        prop_assert!(p.width <= page.width + EPS);
        prop_assert!(p.height <= page.height + EPS);

        prop_assert!((p.x + p.width / 2.0 - page.width / 2.0).abs() < EPS);
        prop_assert!((p.y + p.height / 2.0 - page.height / 2.0).abs() < EPS);
        prop_assert!((p.width / p.height - image.aspect_ratio()).abs() < 1e-6 * image.aspect_ratio());
    }

    /// On portrait pages an image wider than the page stays inside the
    /// margin box on both axes
    #[test]
    fn contain_respects_margin_box_when_wider(image in image(), page in page()) {
        prop_assume!(page.height >= page.width);
        prop_assume!(image.aspect_ratio() > page.aspect_ratio());
        let p = place_image(&image, page, FitPolicy::Contain).unwrap();
        prop_assert!(p.width <= page.width - CONTAIN_MARGIN + EPS);
        prop_assert!(p.height <= page.height - CONTAIN_MARGIN + EPS);
    }

    #[test]
    fn stretch_ignores_aspect_ratio(image in image(), page in page()) {
        let p = place_image(&image, page, FitPolicy::Stretch).unwrap();
        prop_assert_eq!((p.x, p.y, p.width, p.height), (0.0, 0.0, page.width, page.height));
    }

    /// Cover matches the page on one axis and overflows (or matches) on the other
    #[test]
    fn cover_fills_page(image in image(), page in page()) {
        let p = place_image(&image, page, FitPolicy::Cover).unwrap();

        let width_matches = (p.width - page.width).abs() < EPS;
        let height_matches = (p.height - page.height).abs() < EPS;
        prop_assert!(width_matches || height_matches);
        prop_assert!(p.width >= page.width - EPS);
        prop_assert!(p.height >= page.height - EPS);
    }

    #[test]
    fn placement_is_deterministic(image in image(), page in page(), fit in fit_policy()) {
        let first = place_image(&image, page, fit).unwrap();
        let second = place_image(&image, page, fit).unwrap();
        prop_assert_eq!(first.x.to_bits(), second.x.to_bits());
        prop_assert_eq!(first.y.to_bits(), second.y.to_bits());
        prop_assert_eq!(first.width.to_bits(), second.width.to_bits());
        prop_assert_eq!(first.height.to_bits(), second.height.to_bits());
    }

    /// Parsed ranges are sorted, unique and in bounds
    #[test]
    fn page_ranges_sorted_unique_in_bounds(
        total in 1u32..200,
        tokens in prop::collection::vec((1u32..200, 0u32..5), 1..10),
    ) {
        let list = tokens
            .iter()
            .map(|&(start, len)| if len == 0 {
                start.to_string()
            } else {
                format!("{}-{}", start, start + len)
            })
            .collect::<Vec<_>>()
            .join(",");
        let in_bounds = tokens.iter().all(|&(start, len)| start + len <= total);

        match parse_page_ranges(&list, total) {
            Ok(pages) => {
                prop_assert!(in_bounds);
                prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(pages.iter().all(|&p| p >= 1 && p <= total));
            }
            Err(err) => {
                prop_assert!(!in_bounds);
                prop_assert!(matches!(err, ConvertError::InvalidPageRange(_)));
            }
        }
    }
}

#[test]
fn page_range_examples() {
    assert_eq!(
        parse_page_ranges("1,3,5-7,10-15", 20).unwrap(),
        vec![1, 3, 5, 6, 7, 10, 11, 12, 13, 14, 15]
    );
    assert!(matches!(
        parse_page_ranges("2-1", 5),
        Err(ConvertError::InvalidPageRange(_))
    ));
    assert_eq!(parse_page_ranges("1,1,2", 5).unwrap(), vec![1, 2]);
}

#[test]
fn repeated_watermark_on_a4_has_six_marks() {
    let page = PageDimensions::new(595.0, 842.0);
    let extent = TextExtent::measure("CONFIDENTIAL", 50.0);
    let marks = watermark_marks(page, extent, true, false);
    assert_eq!(marks.len(), (GRID_COLUMNS * GRID_ROWS) as usize);
    assert_eq!(marks.len(), 6);
}
