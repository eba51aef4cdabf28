//! Putting a synthesized cover in front of an existing document
//!
//! 1. Compose the cover page from the image
//! 2. Copy the cover page and the kept source pages into a fresh document
//! 3. Carry over the source's document information dictionary
//! 4. Write the result through a temporary file and rename it into place

mod copy;
mod io;

pub(crate) use copy::inherited_attribute;
pub use io::{load_pdf, page_count};

use crate::compose::compose_cover_page;
use crate::constants::PDF_VERSION;
use crate::types::*;
use copy::PageCopier;
use io::write_atomically;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::PathBuf;

/// Index of the first source page carried into the output.
///
/// The original first page is only dropped when something would remain.
pub fn start_index(source_page_count: usize, drop_original_first_page: bool) -> usize {
    if drop_original_first_page && source_page_count > 1 {
        1
    } else {
        0
    }
}

/// Compose a cover for `request.cover_image` and write
/// `[cover] + source pages` to `request.output_path`.
///
/// Returns the absolute path of the written document.
pub async fn merge(request: MergeRequest) -> Result<PathBuf> {
    let source_path = std::path::absolute(&request.source_document_path)?;
    match tokio::fs::metadata(&source_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(CoverError::NotFound(source_path)),
    }
    let output_path = std::path::absolute(&request.output_path)?;

    log::info!(
        "Injecting cover into '{}' -> '{}' (remove_first={})",
        source_path.display(),
        output_path.display(),
        request.drop_original_first_page
    );

    let source_bytes = tokio::fs::read(&source_path).await?;
    let result = tokio::task::spawn_blocking(move || {
        merge_sync(&source_bytes, &request, &output_path).map(|pages| (output_path, pages))
    })
    .await?;

    match result {
        Ok((path, pages)) => {
            log::info!("Successfully wrote '{}' ({} pages)", path.display(), pages);
            Ok(path)
        }
        Err(e) => {
            log::error!("Failed to inject cover into '{}': {}", source_path.display(), e);
            Err(e)
        }
    }
}

fn merge_sync(source_bytes: &[u8], request: &MergeRequest, output_path: &std::path::Path) -> Result<usize> {
    let cover_bytes = compose_cover_page(
        &request.cover_image,
        &request.page_geometry_name,
        request.resolution_hint,
    )?;
    let cover = Document::load_mem(&cover_bytes)?;
    let source = Document::load_mem(source_bytes)?;

    let mut output = build_merged(&cover, &source, request.drop_original_first_page)?;
    let page_count = output.get_pages().len();

    let mut bytes = Vec::new();
    output.save_to(&mut bytes)?;
    write_atomically(output_path, &bytes)?;
    Ok(page_count)
}

/// Assemble the output document from the cover and the source.
pub(crate) fn build_merged(
    cover: &Document,
    source: &Document,
    drop_original_first_page: bool,
) -> Result<Document> {
    let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
    let start = start_index(source_pages.len(), drop_original_first_page);

    let mut output = Document::with_version(PDF_VERSION);
    let pages_id = output.new_object_id();
    let mut kids = Vec::with_capacity(1 + source_pages.len() - start);

    let cover_page = cover
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| CoverError::InvalidImage("composed cover has no page".to_string()))?;
    let cover_id = output.new_object_id();
    let mut cover_copier = PageCopier::new(cover);
    cover_copier.reserve_page(cover_page, cover_id);
    cover_copier.copy_page(&mut output, cover_page, cover_id, pages_id)?;
    kids.push(Object::Reference(cover_id));

    let mut copier = PageCopier::new(source);
    for &dropped in &source_pages[..start] {
        copier.drop_page(dropped);
    }
    let kept: Vec<(ObjectId, ObjectId)> = source_pages[start..]
        .iter()
        .map(|&page_id| (page_id, output.new_object_id()))
        .collect();
    for &(page_id, new_id) in &kept {
        copier.reserve_page(page_id, new_id);
    }
    for &(page_id, new_id) in &kept {
        copier.copy_page(&mut output, page_id, new_id, pages_id)?;
        kids.push(Object::Reference(new_id));
    }

    let count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    output.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    output.trailer.set("Root", catalog_id);

    if let Ok(info) = source.trailer.get(b"Info") {
        let info = copier.copy_object(&mut output, info)?;
        output.trailer.set("Info", info);
    }

    Ok(output)
}
