//! Downloading candidate images
//!
//! Thumbnails are fetched for every candidate right after a search; the full
//! resolution image only once the user has picked one.

use crate::types::*;
use pdf_cover::shrink_to_fit;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared client for searches and image downloads
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("coverj/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// GET `url` and decode the body as an RGB image.
pub async fn download_image(client: &reqwest::Client, url: &str) -> Result<RasterImage> {
    let bytes = get_bytes(client, url).await?;
    let image = tokio::task::spawn_blocking(move || decode(&bytes)).await??;
    Ok(image)
}

/// Download the chosen candidate's full resolution image.
pub async fn fetch_full_image(
    client: &reqwest::Client,
    candidate: &SearchCandidate,
) -> Result<RasterImage> {
    log::info!(
        "Downloading full cover for '{}' from {}",
        candidate.title,
        candidate.source_name
    );
    download_image(client, &candidate.full_resolution_url).await
}

/// Fill in `thumbnail_image` for each candidate whose thumbnail downloads.
///
/// At most `max_concurrency` downloads are in flight. A failed download
/// leaves that candidate without a thumbnail.
pub async fn materialize_thumbnails(
    client: &reqwest::Client,
    mut candidates: Vec<SearchCandidate>,
    target_size: (u32, u32),
    max_concurrency: usize,
) -> Vec<SearchCandidate> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let client = client.clone();
        let url = candidate.thumbnail_url.clone();
        let semaphore = semaphore.clone();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, None);
            };
            match download_thumbnail(&client, &url, target_size).await {
                Ok(image) => (index, Some(image)),
                Err(e) => {
                    log::warn!("Failed to download thumbnail from {}: {}", url, e);
                    (index, None)
                }
            }
        });
    }

    let mut downloaded = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Some(image))) => {
                candidates[index].thumbnail_image = Some(image);
                downloaded += 1;
            }
            Ok((_, None)) => {}
            Err(e) => log::warn!("Thumbnail download error: {}", e),
        }
    }

    log::debug!("Downloaded {}/{} thumbnails", downloaded, candidates.len());
    candidates
}

async fn download_thumbnail(
    client: &reqwest::Client,
    url: &str,
    target_size: (u32, u32),
) -> Result<RasterImage> {
    let bytes = get_bytes(client, url).await?;
    let image =
        tokio::task::spawn_blocking(move || decode(&bytes).map(|img| shrink_to_fit(img, target_size)))
            .await??;
    Ok(image)
}

async fn get_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.bytes().await?.to_vec())
}

fn decode(bytes: &[u8]) -> Result<RasterImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not an image"), Err(FetchError::Image(_))));
    }
}
