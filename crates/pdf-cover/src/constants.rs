//! Shared constants for cover composition and merging

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Cover Image Encoding
// =============================================================================

/// JPEG quality used when embedding the cover image
pub const COVER_JPEG_QUALITY: u8 = 90;

/// Resource name of the cover image XObject on the cover page
pub const COVER_IMAGE_NAME: &str = "Im0";

/// PDF version written for composed and merged documents
pub const PDF_VERSION: &str = "1.7";

// =============================================================================
// Page Tree
// =============================================================================

/// Page attributes a page may inherit from its ancestors in the page tree
pub const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

// =============================================================================
// Preview
// =============================================================================

/// Aspect ratio assumed for preview placeholders when a page has no usable MediaBox
pub const FALLBACK_PAGE_ASPECT: f32 = 0.7;

/// Border width of preview placeholders (pixels)
pub const PLACEHOLDER_BORDER_PX: u32 = 2;
