use crate::constants::{FALLBACK_PAGE_ASPECT, PLACEHOLDER_BORDER_PX};
use crate::merge::{inherited_attribute, load_pdf};
use crate::types::*;
use image::imageops::FilterType;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

/// Small picture of a document's first page for display next to the cover.
///
/// Uses the largest JPEG drawn on the first page when there is one, otherwise
/// a blank placeholder with the page's proportions. Any failure yields `None`.
pub async fn first_page_preview(path: impl AsRef<Path>, max_size: (u32, u32)) -> Option<RasterImage> {
    let path = path.as_ref();
    let doc = match load_pdf(path).await {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("Failed to render first page of '{}': {}", path.display(), e);
            return None;
        }
    };

    tokio::task::spawn_blocking(move || render_preview(&doc, max_size))
        .await
        .ok()
        .flatten()
}

fn render_preview(doc: &Document, max_size: (u32, u32)) -> Option<RasterImage> {
    let page_id = *doc.get_pages().values().next()?;
    let page = doc.get_dictionary(page_id).ok()?;

    let image = largest_page_jpeg(doc, page).unwrap_or_else(|| placeholder(doc, page_id, max_size));
    Some(shrink_to_fit(image, max_size))
}

fn page_attribute<'d>(doc: &'d Document, page: &'d Dictionary, key: &[u8]) -> Option<&'d Object> {
    page.get(key)
        .ok()
        .or_else(|| inherited_attribute(doc, page, key))
        .and_then(|obj| resolve(doc, obj))
}

fn resolve<'d>(doc: &'d Document, obj: &'d Object) -> Option<&'d Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn largest_page_jpeg(doc: &Document, page: &Dictionary) -> Option<RasterImage> {
    let resources = page_attribute(doc, page, b"Resources")?.as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?)?.as_dict().ok()?;

    xobjects
        .iter()
        .filter_map(|(_, obj)| resolve(doc, obj)?.as_stream().ok())
        .filter(|stream| is_jpeg_image(&stream.dict))
        .filter_map(|stream| image::load_from_memory(&stream.content).ok())
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
        .map(|img| img.to_rgb8())
}

fn is_jpeg_image(dict: &Dictionary) -> bool {
    let is_image = matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image");
    let is_dct = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => name.as_slice() == b"DCTDecode",
        Ok(Object::Array(filters)) => {
            filters.len() == 1 && matches!(&filters[0], Object::Name(name) if name.as_slice() == b"DCTDecode")
        }
        _ => false,
    };
    is_image && is_dct
}

fn placeholder(doc: &Document, page_id: ObjectId, max_size: (u32, u32)) -> RasterImage {
    let aspect = page_aspect(doc, page_id).unwrap_or(FALLBACK_PAGE_ASPECT);
    let height = max_size.1.max(1);
    let width = ((height as f32 * aspect).round() as u32).max(1);

    RasterImage::from_fn(width, height, |x, y| {
        let border = x < PLACEHOLDER_BORDER_PX
            || y < PLACEHOLDER_BORDER_PX
            || x + PLACEHOLDER_BORDER_PX >= width
            || y + PLACEHOLDER_BORDER_PX >= height;
        if border {
            image::Rgb([0x99, 0x99, 0x99])
        } else {
            image::Rgb([0xff, 0xff, 0xff])
        }
    })
}

fn page_aspect(doc: &Document, page_id: ObjectId) -> Option<f32> {
    let page = doc.get_dictionary(page_id).ok()?;
    let media_box = page_attribute(doc, page, b"MediaBox")?.as_array().ok()?;
    if media_box.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = media_box.iter().filter_map(|o| o.as_float().ok()).collect();
    let (w, h) = ((coords.get(2)? - coords.first()?).abs(), (coords.get(3)? - coords.get(1)?).abs());
    (h > 0.0).then_some(w / h)
}

/// Downscale to fit inside `max_size`, keeping the aspect ratio. Never upscales.
pub fn shrink_to_fit(image: RasterImage, max_size: (u32, u32)) -> RasterImage {
    let (w, h) = image.dimensions();
    let (max_w, max_h) = max_size;
    if w <= max_w && h <= max_h {
        return image;
    }
    image::DynamicImage::ImageRgb8(image)
        .resize(max_w.max(1), max_h.max(1), FilterType::Lanczos3)
        .into_rgb8()
}
