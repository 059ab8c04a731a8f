//! Image conversion options
//!
//! The front end sends a JSON object with the keys `pageSize`,
//! `orientation`, `quality`, `fit` and `combine`. Every key is optional.

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::layout::{resolve_page_size, FitPolicy, Orientation, PageDimensions, PageSize};

/// Re-encode quality. Affects image bytes only, never layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

impl Quality {
    /// Unknown names resolve to the default.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Quality::Low,
            "medium" => Quality::Medium,
            _ => Quality::High,
        }
    }

    /// JPEG quality (1-100)
    pub fn jpeg_quality(self) -> u8 {
        match self {
            Quality::Low => 50,
            Quality::Medium => 70,
            Quality::High => 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub quality: Quality,
    pub fit: FitPolicy,
    /// Put every image into one document instead of one document each
    pub combine: bool,
}

/// Wire form of the options, before validation
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    page_size: Option<String>,
    orientation: Option<String>,
    quality: Option<String>,
    fit: Option<String>,
    combine: Option<CombineFlag>,
}

/// The web form posts `"combine"` / `"separate"`; API clients send a bool.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CombineFlag {
    Flag(bool),
    Mode(String),
}

impl CombineFlag {
    fn enabled(&self) -> bool {
        match self {
            CombineFlag::Flag(flag) => *flag,
            CombineFlag::Mode(mode) => mode.eq_ignore_ascii_case("combine"),
        }
    }
}

impl TryFrom<RawOptions> for ConversionOptions {
    type Error = ConvertError;

    fn try_from(raw: RawOptions) -> Result<Self, Self::Error> {
        let fit = match raw.fit.as_deref() {
            None | Some("") => FitPolicy::default(),
            Some(name) => name.parse()?,
        };

        Ok(Self {
            page_size: raw
                .page_size
                .as_deref()
                .map(PageSize::from_name)
                .unwrap_or_default(),
            orientation: raw
                .orientation
                .as_deref()
                .map(Orientation::from_name)
                .unwrap_or_default(),
            quality: raw
                .quality
                .as_deref()
                .map(Quality::from_name)
                .unwrap_or_default(),
            fit,
            combine: raw.combine.as_ref().is_some_and(CombineFlag::enabled),
        })
    }
}

impl ConversionOptions {
    /// Parse the JSON options object. Blank input yields the defaults.
    pub fn from_json(input: &str) -> Result<Self, ConvertError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: RawOptions = serde_json::from_str(input)
            .map_err(|e| ConvertError::InvalidRequest(format!("Invalid options JSON: {}", e)))?;
        Self::try_from(raw)
    }

    /// Page size after applying orientation
    pub fn page_dimensions(&self) -> PageDimensions {
        resolve_page_size(self.page_size, self.orientation)
    }
}
