//! Search backends
//!
//! Each backend turns a query into candidates from its own JSON schema.

use crate::types::*;
use serde_json::Value;

pub const GOOGLE_BOOKS_URL: &str = "https://www.googleapis.com/books/v1/volumes";
pub const OPEN_LIBRARY_SEARCH_URL: &str = "https://openlibrary.org/search.json";
pub const OPEN_LIBRARY_COVER_URL: &str = "https://covers.openlibrary.org/b/olid/{olid}-L.jpg";

/// Google Books rejects larger pages
const GOOGLE_BOOKS_MAX_RESULTS: usize = 40;
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone)]
pub enum SearchBackend {
    GoogleBooks {
        endpoint: String,
        api_key: Option<String>,
    },
    OpenLibrary {
        endpoint: String,
        /// Cover image URL with an `{olid}` placeholder
        cover_url_template: String,
    },
}

impl SearchBackend {
    pub fn google_books(api_key: Option<String>) -> Self {
        SearchBackend::GoogleBooks {
            endpoint: GOOGLE_BOOKS_URL.to_string(),
            api_key,
        }
    }

    pub fn open_library() -> Self {
        SearchBackend::OpenLibrary {
            endpoint: OPEN_LIBRARY_SEARCH_URL.to_string(),
            cover_url_template: OPEN_LIBRARY_COVER_URL.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchBackend::GoogleBooks { .. } => "Google Books",
            SearchBackend::OpenLibrary { .. } => "Open Library",
        }
    }

    /// Query the backend for at most `cap` candidates.
    pub async fn search(
        &self,
        client: &reqwest::Client,
        query: &str,
        cap: usize,
    ) -> Result<Vec<SearchCandidate>> {
        match self {
            SearchBackend::GoogleBooks { endpoint, api_key } => {
                let mut params = vec![
                    ("q", query.to_string()),
                    ("maxResults", cap.min(GOOGLE_BOOKS_MAX_RESULTS).to_string()),
                    ("printType", "books".to_string()),
                ];
                if let Some(key) = api_key.as_deref().filter(|k| !k.is_empty()) {
                    params.push(("key", key.to_string()));
                }
                let body = get_json(client, endpoint, &params).await?;
                parse_google_books(&body)
            }
            SearchBackend::OpenLibrary {
                endpoint,
                cover_url_template,
            } => {
                let params = vec![
                    ("title", query.to_string()),
                    ("limit", cap.to_string()),
                    (
                        "fields",
                        "title,author_name,cover_edition_key,edition_key".to_string(),
                    ),
                ];
                let body = get_json(client, endpoint, &params).await?;
                parse_open_library(&body, cover_url_template)
            }
        }
    }
}

async fn get_json(
    client: &reqwest::Client,
    endpoint: &str,
    params: &[(&str, String)],
) -> Result<Value> {
    let response = client.get(endpoint).query(params).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::Malformed(format!("{endpoint} returned invalid JSON: {e}")))
}

/// Read a Google Books `volumes` response.
pub fn parse_google_books(body: &Value) -> Result<Vec<SearchCandidate>> {
    let Some(items) = list_field(body, "items")? else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for item in items {
        let info = item.get("volumeInfo");
        let images = info.and_then(|i| i.get("imageLinks"));

        let Some(thumbnail) = image_link(images, "thumbnail") else {
            continue;
        };
        let full = image_link(images, "large")
            .or_else(|| image_link(images, "medium"))
            .unwrap_or(thumbnail);

        candidates.push(SearchCandidate::new(
            text_field(info, "title"),
            joined_names(info, "authors"),
            upgrade_to_https(thumbnail),
            upgrade_to_https(full),
            "Google Books",
        ));
    }
    Ok(candidates)
}

/// Read an Open Library `search.json` response.
pub fn parse_open_library(body: &Value, cover_url_template: &str) -> Result<Vec<SearchCandidate>> {
    let Some(docs) = list_field(body, "docs")? else {
        return Ok(Vec::new());
    };

    let mut candidates = Vec::new();
    for doc in docs {
        let olid = doc
            .get("cover_edition_key")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                doc.get("edition_key")
                    .and_then(|v| v.as_array())
                    .and_then(|keys| keys.first())
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
            });
        let Some(olid) = olid else {
            continue;
        };

        let cover_url = cover_url_template.replace("{olid}", olid);
        candidates.push(SearchCandidate::new(
            text_field(Some(doc), "title"),
            joined_names(Some(doc), "author_name"),
            cover_url.clone(),
            cover_url,
            "Open Library",
        ));
    }
    Ok(candidates)
}

/// `Ok(None)` when the list is absent, an error when the document or the
/// field has the wrong shape.
fn list_field<'v>(body: &'v Value, key: &str) -> Result<Option<&'v Vec<Value>>> {
    let object = body
        .as_object()
        .ok_or_else(|| FetchError::Malformed("response is not a JSON object".to_string()))?;
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(list)) => Ok(Some(list)),
        Some(_) => Err(FetchError::Malformed(format!("`{key}` is not an array"))),
    }
}

fn image_link<'v>(images: Option<&'v Value>, name: &str) -> Option<&'v str> {
    images
        .and_then(|links| links.get(name))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

fn text_field(value: Option<&Value>, key: &str) -> String {
    value
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn joined_names(value: Option<&Value>, key: &str) -> String {
    let names: Vec<&str> = value
        .and_then(|v| v.get(key))
        .and_then(|v| v.as_array())
        .map(|list| list.iter().filter_map(|n| n.as_str()).collect())
        .unwrap_or_default();
    if names.is_empty() {
        UNKNOWN.to_string()
    } else {
        names.join(", ")
    }
}

fn upgrade_to_https(url: &str) -> String {
    url.replace("http://", "https://")
}
