// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Pagekeep.

use chrono::{DateTime, Local, TimeZone};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a `Uuid`-backed identifier with the usual conversions.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a scanned collection.
    CollectionId
);

uuid_id!(
    /// Unique identifier for a PDF document in the library.
    DocumentId
);

uuid_id!(
    /// Unique identifier for a library folder.
    FolderId
);

/// `strftime` pattern used for timestamp-derived names, e.g. `2025-01-01-10-00-00`.
pub const TIMESTAMP_NAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Where a scanned collection's pages came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionSource {
    /// Captured with the document camera.
    Scan,
    /// Picked from the photo library.
    PhotoImport,
}

impl CollectionSource {
    /// Default collection name for this source at the given instant.
    ///
    /// Scans get a bare timestamp; imports are prefixed with `Photos-`.
    pub fn default_name<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let stamp = at.format(TIMESTAMP_NAME_FORMAT);
        match self {
            Self::Scan => stamp.to_string(),
            Self::PhotoImport => format!("Photos-{stamp}"),
        }
    }

    /// Default name using the local clock.
    pub fn default_name_now(&self) -> String {
        self.default_name(&Local::now())
    }

    /// Stable keyword used in persisted metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::PhotoImport => "photo-import",
        }
    }

    /// Parse the keyword written by [`CollectionSource::as_str`].
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "scan" => Some(Self::Scan),
            "photo-import" => Some(Self::PhotoImport),
            _ => None,
        }
    }
}

/// Display orientation of a captured page, expressed as the clockwise
/// rotation needed to show it upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageOrientation {
    #[default]
    Up,
    /// Rotate 90 degrees clockwise to display.
    Right,
    /// Rotate 180 degrees to display.
    Down,
    /// Rotate 270 degrees clockwise to display.
    Left,
}

impl PageOrientation {
    /// Orientation after one further clockwise quarter turn.
    pub fn rotated_clockwise(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    /// Whether displaying the page swaps its width and height.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::Right | Self::Left)
    }
}

/// One raster image representing a scanned or imported document page.
///
/// Pages are anonymous: identity is their position in the owning
/// collection. Moving a page between collections clones the pixels.
#[derive(Debug, Clone)]
pub struct PageImage {
    image: DynamicImage,
    orientation: PageOrientation,
}

impl PageImage {
    /// Wrap an upright image.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: PageOrientation::Up,
        }
    }

    /// Wrap an image that still needs `orientation` applied for display.
    pub fn with_orientation(image: DynamicImage, orientation: PageOrientation) -> Self {
        Self { image, orientation }
    }

    /// Raw pixel content as captured.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn orientation(&self) -> PageOrientation {
        self.orientation
    }

    /// Displayed (width, height) in pixels, orientation applied.
    pub fn dimensions(&self) -> (u32, u32) {
        let (w, h) = (self.image.width(), self.image.height());
        if self.orientation.is_quarter_turn() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// True when either displayed side is shorter than `min_dimension`.
    pub fn is_degenerate(&self, min_dimension: u32) -> bool {
        let (w, h) = self.dimensions();
        w < min_dimension.max(1) || h < min_dimension.max(1)
    }

    /// Pixels rotated upright.
    pub fn upright(&self) -> DynamicImage {
        match self.orientation {
            PageOrientation::Up => self.image.clone(),
            PageOrientation::Right => self.image.rotate90(),
            PageOrientation::Down => self.image.rotate180(),
            PageOrientation::Left => self.image.rotate270(),
        }
    }

    /// Consume the page and return upright pixels.
    pub fn into_upright(self) -> DynamicImage {
        match self.orientation {
            PageOrientation::Up => self.image,
            _ => self.upright(),
        }
    }
}

impl From<DynamicImage> for PageImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

/// Total orders offered for list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    CreatedDescending,
    /// Alphabetical by display name, case-insensitive.
    NameAscending,
    /// Largest first.
    SizeDescending,
}

impl SortOrder {
    /// Parse a user-facing keyword (`date`, `name`, `size`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "date" | "created" => Some(Self::CreatedDescending),
            "name" => Some(Self::NameAscending),
            "size" => Some(Self::SizeDescending),
            _ => None,
        }
    }
}

/// Returns the trimmed name, or `None` when nothing but whitespace remains.
pub fn normalized_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::RgbImage;

    #[test]
    fn scan_names_are_bare_timestamps() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(CollectionSource::Scan.default_name(&at), "2025-01-01-10-00-00");
        assert_eq!(
            CollectionSource::PhotoImport.default_name(&at),
            "Photos-2025-01-01-10-00-00"
        );
    }

    #[test]
    fn source_keywords_round_trip() {
        for source in [CollectionSource::Scan, CollectionSource::PhotoImport] {
            assert_eq!(CollectionSource::from_keyword(source.as_str()), Some(source));
        }
        assert_eq!(CollectionSource::from_keyword("fax"), None);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let page = PageImage::with_orientation(
            DynamicImage::ImageRgb8(RgbImage::new(40, 10)),
            PageOrientation::Right,
        );
        assert_eq!(page.dimensions(), (10, 40));
        assert_eq!(page.upright().width(), 10);
    }

    #[test]
    fn degenerate_threshold() {
        let thin = PageImage::new(DynamicImage::ImageRgb8(RgbImage::new(100, 1)));
        assert!(thin.is_degenerate(4));
        let empty = PageImage::new(DynamicImage::ImageRgb8(RgbImage::new(0, 0)));
        assert!(empty.is_degenerate(0));
        let page = PageImage::new(DynamicImage::ImageRgb8(RgbImage::new(8, 8)));
        assert!(!page.is_degenerate(4));
    }

    #[test]
    fn blank_names_normalize_to_none() {
        assert_eq!(normalized_name("   \t"), None);
        assert_eq!(normalized_name("  Tax 2024 "), Some("Tax 2024"));
    }

    #[test]
    fn sort_keywords() {
        assert_eq!(SortOrder::from_keyword("Name"), Some(SortOrder::NameAscending));
        assert_eq!(SortOrder::from_keyword("size"), Some(SortOrder::SizeDescending));
        assert_eq!(SortOrder::default(), SortOrder::CreatedDescending);
    }
}
