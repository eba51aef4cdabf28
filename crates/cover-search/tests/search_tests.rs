use cover_search::*;
use std::io::Cursor;
use std::sync::mpsc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl StubServer {
    fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.join();
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([30, 60, 90]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Serves fixed routes; anything else is a 404.
fn spawn_stub_server(routes: Vec<(&'static str, u16, Vec<u8>)>) -> StubServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            seen.lock().unwrap().push(url.clone());
            let path = url.split('?').next().unwrap_or(&url);

            let response = match routes.iter().find(|(route, _, _)| *route == path) {
                Some((_, status, body)) => {
                    tiny_http::Response::from_data(body.clone()).with_status_code(*status)
                }
                None => tiny_http::Response::from_data(b"not found".to_vec()).with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    StubServer {
        base_url,
        requests,
        shutdown_tx,
        handle,
    }
}

/// Answers every request with `body` after `delay`, each on its own thread,
/// and records the most requests ever in flight at once.
fn spawn_slow_server(delay: Duration, body: Vec<u8>) -> (StubServer, Arc<AtomicUsize>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let peak_seen = peak.clone();

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        let mut responders = Vec::new();
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };
            seen.lock().unwrap().push(request.url().to_string());

            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak_seen.fetch_max(now, Ordering::SeqCst);
            let in_flight = in_flight.clone();
            let body = body.clone();
            responders.push(thread::spawn(move || {
                thread::sleep(delay);
                // Leave before answering so a freed slot is never counted twice
                in_flight.fetch_sub(1, Ordering::SeqCst);
                let _ = request.respond(tiny_http::Response::from_data(body));
            }));
        }
        for responder in responders {
            let _ = responder.join();
        }
    });

    let server = StubServer {
        base_url,
        requests,
        shutdown_tx,
        handle,
    };
    (server, peak)
}

fn google_body(base_url: &str) -> Vec<u8> {
    serde_json::json!({
        "items": [
            {
                "volumeInfo": {
                    "title": "Dune",
                    "authors": ["Frank Herbert"],
                    "imageLinks": { "thumbnail": format!("{base_url}/img/dune.png") }
                }
            },
            {
                "volumeInfo": {
                    "title": "Dune Messiah",
                    "imageLinks": { "thumbnail": format!("{base_url}/img/missing.png") }
                }
            }
        ]
    })
    .to_string()
    .into_bytes()
}

fn open_library_body() -> Vec<u8> {
    serde_json::json!({
        "docs": [
            { "title": "dune ", "author_name": ["F. Herbert"], "cover_edition_key": "OL1M" },
            { "title": "Children of Dune", "edition_key": ["OL2M"] }
        ]
    })
    .to_string()
    .into_bytes()
}

fn backends(base_url: &str) -> Vec<SearchBackend> {
    vec![
        SearchBackend::GoogleBooks {
            endpoint: format!("{base_url}/books/v1/volumes"),
            api_key: Some("secret".to_string()),
        },
        SearchBackend::OpenLibrary {
            endpoint: format!("{base_url}/search.json"),
            cover_url_template: format!("{base_url}/covers/{{olid}}-L.jpg"),
        },
    ]
}

#[tokio::test]
async fn test_search_merges_backends_in_priority_order() {
    let server = spawn_stub_server(vec![
        ("/books/v1/volumes", 200, google_body("http://img.example")),
        ("/search.json", 200, open_library_body()),
    ]);
    let aggregator = CandidateAggregator::new(http_client().unwrap(), backends(&server.base_url));

    let found = aggregator.search("Dune", 8).await;
    let titles: Vec<_> = found.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Dune Messiah", "Children of Dune"]);
    assert_eq!(found[0].source_name, "Google Books");
    assert_eq!(found[2].source_name, "Open Library");
    assert_eq!(
        found[2].thumbnail_url,
        format!("{}/covers/OL2M-L.jpg", server.base_url)
    );

    let requested = server.requested();
    let google = requested.iter().find(|u| u.starts_with("/books")).unwrap();
    assert!(google.contains("q=Dune"));
    assert!(google.contains("maxResults=8"));
    assert!(google.contains("printType=books"));
    assert!(google.contains("key=secret"));
    let open_library = requested.iter().find(|u| u.starts_with("/search.json")).unwrap();
    assert!(open_library.contains("title=Dune"));
    assert!(open_library.contains("limit=8"));

    server.stop();
}

#[tokio::test]
async fn test_failing_backend_degrades_to_other_results() {
    let server = spawn_stub_server(vec![
        ("/books/v1/volumes", 503, b"overloaded".to_vec()),
        ("/search.json", 200, open_library_body()),
    ]);
    let aggregator = CandidateAggregator::new(http_client().unwrap(), backends(&server.base_url));

    let found = aggregator.search("Dune", 8).await;
    let titles: Vec<_> = found.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["dune ", "Children of Dune"]);

    server.stop();
}

#[tokio::test]
async fn test_malformed_response_counts_as_no_results() {
    let server = spawn_stub_server(vec![
        ("/books/v1/volumes", 200, b"{not json".to_vec()),
        ("/search.json", 200, b"[]".to_vec()),
    ]);
    let aggregator = CandidateAggregator::new(http_client().unwrap(), backends(&server.base_url));

    assert!(aggregator.search("Dune", 8).await.is_empty());
    server.stop();
}

#[tokio::test]
async fn test_search_truncates_to_max_results() {
    let server = spawn_stub_server(vec![
        ("/books/v1/volumes", 200, google_body("http://img.example")),
        ("/search.json", 200, open_library_body()),
    ]);
    let aggregator = CandidateAggregator::new(http_client().unwrap(), backends(&server.base_url));

    let found = aggregator.search("Dune", 1).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Dune");
    server.stop();
}

#[tokio::test]
async fn test_thumbnail_failures_are_isolated() {
    let server = spawn_stub_server(vec![("/img/dune.png", 200, png_bytes(300, 400))]);
    let base_url = server.base_url.clone();
    let candidates = vec![
        SearchCandidate::new(
            "Dune",
            "Frank Herbert",
            format!("{base_url}/img/dune.png"),
            format!("{base_url}/img/dune.png"),
            "Google Books",
        ),
        SearchCandidate::new(
            "Dune Messiah",
            "Unknown",
            format!("{base_url}/img/missing.png"),
            format!("{base_url}/img/missing.png"),
            "Google Books",
        ),
        SearchCandidate::new(
            "Dune again",
            "Unknown",
            format!("{base_url}/img/dune.png"),
            format!("{base_url}/img/dune.png"),
            "Open Library",
        ),
    ];

    let client = http_client().unwrap();
    let materialized = materialize_thumbnails(&client, candidates, (150, 200), 2).await;

    assert_eq!(materialized.len(), 3);
    assert_eq!(materialized[0].title, "Dune");
    assert_eq!(
        materialized[0].thumbnail_image.as_ref().unwrap().dimensions(),
        (150, 200)
    );
    assert!(materialized[1].thumbnail_image.is_none());
    assert!(materialized[2].thumbnail_image.is_some());

    server.stop();
}

#[tokio::test]
async fn test_thumbnail_downloads_respect_concurrency_limit() {
    let (server, peak) = spawn_slow_server(Duration::from_millis(150), png_bytes(60, 80));
    let candidates: Vec<_> = (0..6)
        .map(|i| {
            let url = format!("{}/img/{i}.png", server.base_url);
            SearchCandidate::new(format!("Book {i}"), "Unknown", url.clone(), url, "Open Library")
        })
        .collect();

    let client = http_client().unwrap();
    let materialized = materialize_thumbnails(&client, candidates, (150, 200), 2).await;

    assert_eq!(materialized.len(), 6);
    for (i, candidate) in materialized.iter().enumerate() {
        assert_eq!(candidate.title, format!("Book {i}"));
        assert_eq!(candidate.thumbnail_image.as_ref().unwrap().dimensions(), (60, 80));
    }
    assert_eq!(server.requested().len(), 6);
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "{peak} downloads ran at once");

    server.stop();
}

#[tokio::test]
async fn test_full_image_is_fetched_from_full_resolution_url() {
    let server = spawn_stub_server(vec![
        ("/thumb.png", 200, png_bytes(30, 40)),
        ("/full.png", 200, png_bytes(600, 800)),
    ]);
    let candidate = SearchCandidate::new(
        "Dune",
        "Frank Herbert",
        format!("{}/thumb.png", server.base_url),
        format!("{}/full.png", server.base_url),
        "Google Books",
    );

    let client = http_client().unwrap();
    let full = fetch_full_image(&client, &candidate).await.unwrap();
    assert_eq!(full.dimensions(), (600, 800));
    assert!(candidate.thumbnail_image.is_none());
    assert_eq!(server.requested(), vec!["/full.png".to_string()]);

    server.stop();
}

#[tokio::test]
async fn test_download_image_reports_status() {
    let server = spawn_stub_server(vec![]);
    let client = http_client().unwrap();
    match download_image(&client, &format!("{}/gone.png", server.base_url)).await {
        Err(FetchError::Status { status, .. }) => assert_eq!(status, 404),
        other => panic!("Expected Status error, got {other:?}"),
    }
    server.stop();
}

#[tokio::test]
async fn test_openai_producer_downloads_generated_image() {
    let server = spawn_stub_server(vec![("/generated.png", 200, png_bytes(64, 112))]);
    let response = serde_json::json!({
        "data": [{ "url": format!("{}/generated.png", server.base_url) }]
    });
    let api = spawn_stub_server(vec![(
        "/v1/images/generations",
        200,
        response.to_string().into_bytes(),
    )]);

    let producer = OpenAiImageProducer::new(
        http_client().unwrap(),
        Some("sk-test".to_string()),
        "dall-e-3",
    )
    .with_endpoint(format!("{}/v1/images/generations", api.base_url));
    let request = GenerationRequest {
        prompt: build_default_prompt("Dune"),
        size: "1024x1792".to_string(),
        quality: "standard".to_string(),
    };

    let image = producer.produce(&request).await.unwrap();
    assert_eq!(image.dimensions(), (64, 112));

    api.stop();
    server.stop();
}

#[tokio::test]
async fn test_openai_producer_surfaces_upstream_message() {
    let body = serde_json::json!({
        "error": { "message": "Your request was rejected by the safety system." }
    });
    let api = spawn_stub_server(vec![(
        "/v1/images/generations",
        400,
        body.to_string().into_bytes(),
    )]);

    let producer = OpenAiImageProducer::new(
        http_client().unwrap(),
        Some("sk-test".to_string()),
        "dall-e-2",
    )
    .with_endpoint(format!("{}/v1/images/generations", api.base_url));
    let request = GenerationRequest {
        prompt: "x".to_string(),
        size: "512x512".to_string(),
        quality: "standard".to_string(),
    };

    match producer.produce(&request).await {
        Err(GenerationError::Upstream(msg)) => {
            assert_eq!(msg, "Your request was rejected by the safety system.")
        }
        other => panic!("Expected Upstream error, got {other:?}"),
    }
    api.stop();
}

#[tokio::test]
async fn test_openai_producer_unreachable_asset() {
    let api_response = |base: &str| {
        serde_json::json!({ "data": [{ "url": format!("{base}/expired.png") }] })
            .to_string()
            .into_bytes()
    };
    let assets = spawn_stub_server(vec![]);
    let api = spawn_stub_server(vec![(
        "/v1/images/generations",
        200,
        api_response(&assets.base_url),
    )]);

    let producer = OpenAiImageProducer::new(
        http_client().unwrap(),
        Some("sk-test".to_string()),
        "dall-e-3",
    )
    .with_endpoint(format!("{}/v1/images/generations", api.base_url));
    let request = GenerationRequest {
        prompt: "x".to_string(),
        size: "1024x1024".to_string(),
        quality: "standard".to_string(),
    };

    assert!(matches!(
        producer.produce(&request).await,
        Err(GenerationError::Download(_))
    ));
    api.stop();
    assets.stop();
}
