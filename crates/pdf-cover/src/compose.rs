//! Cover page synthesis
//!
//! Renders a raster image onto a single page of a named size. The image is
//! scaled to touch either both side edges or both top/bottom edges and is
//! centered on the other axis, so it is never cropped or stretched.

use crate::constants::{COVER_IMAGE_NAME, COVER_JPEG_QUALITY, PDF_VERSION};
use crate::types::*;
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use lopdf::{Dictionary, Document, Object, Stream};

/// Where the image is drawn on the page, in points from the lower-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit an `iw`×`ih` image onto a `page_w`×`page_h` page without distortion.
///
/// A relatively wider image spans the full page width; anything else spans
/// the full page height.
pub fn fit_image(iw: u32, ih: u32, page_w: f32, page_h: f32) -> Placement {
    let aspect = iw as f32 / ih as f32;
    let page_aspect = page_w / page_h;

    let (width, height) = if aspect > page_aspect {
        (page_w, page_w / aspect)
    } else {
        (page_h * aspect, page_h)
    };

    Placement {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

/// Build a single-page PDF showing `image` on a page of the named size.
///
/// `resolution_hint` is written into the embedded JPEG as its pixel density;
/// the pixel dimensions are left untouched.
pub fn compose_cover_page(
    image: &RasterImage,
    page_geometry_name: &str,
    resolution_hint: u16,
) -> Result<Vec<u8>> {
    let geometry = PageGeometry::from_name(page_geometry_name)?;
    let (iw, ih) = image.dimensions();
    if iw == 0 || ih == 0 {
        return Err(CoverError::InvalidImage(format!(
            "image has no pixels ({iw}x{ih})"
        )));
    }

    let (page_w, page_h) = geometry.dimensions_pt();
    let placement = fit_image(iw, ih, page_w, page_h);
    let jpeg = encode_jpeg(image, resolution_hint)?;

    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(image_xobject(iw, ih, jpeg));
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        draw_image_ops(&placement).into_bytes(),
    ));

    let mut xobjects = Dictionary::new();
    xobjects.set(COVER_IMAGE_NAME, Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_w),
                Object::Real(page_h),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]));

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(vec![Object::Reference(page_id)])),
        ("Count", Object::Integer(1)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;

    log::info!(
        "Created cover page ({:.1} KB, page_size={}, image {}x{})",
        bytes.len() as f32 / 1024.0,
        geometry.name(),
        iw,
        ih
    );
    Ok(bytes)
}

fn encode_jpeg(image: &RasterImage, dpi: u16) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, COVER_JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(dpi));
    encoder.encode_image(image)?;
    Ok(bytes)
}

fn image_xobject(width: u32, height: u32, jpeg: Vec<u8>) -> Stream {
    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(b"DCTDecode".to_vec())),
    ]);
    let mut stream = Stream::new(dict, jpeg);
    // Already DCT-compressed
    stream.allows_compression = false;
    stream
}

fn draw_image_ops(p: &Placement) -> String {
    format!(
        "q\n{:.4} 0 0 {:.4} {:.4} {:.4} cm\n/{} Do\nQ\n",
        p.width, p.height, p.x, p.y, COVER_IMAGE_NAME
    )
}
