//! Integration tests for inventory-pdf.
//!
//! Photos come from an in-process mock fetcher, except for one test that
//! serves a WebP over a real loopback HTTP server to exercise the reqwest
//! transport. Nothing here reaches the internet.

use async_trait::async_trait;
use chrono::NaiveDate;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use inventory_pdf::pipeline::canvas::{DrawOp, Page};
use inventory_pdf::pipeline::fetch::{FetchError, FetchedImage, ImageFetcher};
use inventory_pdf::pipeline::image::{EmbedFormat, ImageResolver, ResolvedImage};
use inventory_pdf::{
    generate, generate_to_dir, plan, DocumentVariant, FooterPolicy, GenerateError,
    GenerationConfig, HttpFetcher, ImageWarning,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

const SENTINEL: &str = "Non spécifié";
const HEADER: &str = "SKU,Dénomination,Couleur,Matière,Dimension,Poids,Stockage,Emplacement,Photo";

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

fn webp_bytes() -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([30, 160, 90, 255]))),
        ImageFormat::WebP,
    )
}

fn jpeg_bytes() -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 100, 50]))),
        ImageFormat::Jpeg,
    )
}

fn png_bytes() -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))),
        ImageFormat::Png,
    )
}

/// Serves canned responses by URL and counts requests.
#[derive(Default)]
struct MockFetcher {
    responses: HashMap<String, Result<FetchedImage, FetchError>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    fn with(mut self, url: &str, response: Result<FetchedImage, FetchError>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

/// Logs show up with `RUST_LOG=inventory_pdf=debug cargo test -- --nocapture`.
fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_with(fetcher: Arc<MockFetcher>) -> GenerationConfig {
    init_logs();
    GenerationConfig::builder()
        .fetcher(fetcher)
        .edition_date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())
        .build()
        .unwrap()
}

fn rows(n: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..n {
        csv.push_str(&format!(
            "S{i},Chaise {i},Rouge,Bois,45x45x90,4 kg,Réserve,A{i},\n"
        ));
    }
    csv
}

fn texts(pages: &[Page]) -> Vec<&str> {
    pages.iter().flat_map(|p| p.texts()).collect()
}

fn footer_count(page: &Page) -> usize {
    page.texts().filter(|t| t.starts_with("FDD LUMA/ARLES")).count()
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_row_without_photo() {
    let fetcher = Arc::new(MockFetcher::default());
    let config = config_with(Arc::clone(&fetcher));
    let csv = "SKU,Dénomination,Photo\nA1,Chaise,\n";

    let doc = generate(csv.as_bytes(), DocumentVariant::List, "Mobilier.csv", &config)
        .await
        .unwrap();

    assert_eq!(doc.pages.len(), 1);
    assert_eq!(fetcher.calls(), 0, "empty photo must not trigger a fetch");
    assert!(doc.warnings.is_empty());
    assert_eq!(doc.stats.placeholder_boxes, 1);

    let page = &doc.pages[0];
    let boxes = page
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::StrokeRect(r) if r.width == 70.0 && r.height == 70.0))
        .count();
    assert_eq!(boxes, 1);

    let t: Vec<_> = page.texts().collect();
    assert!(t.contains(&"Pas d'image"));
    assert!(t.contains(&"SKU: A1"));
    assert!(t.contains(&"Dénomination: Chaise"));
    assert!(t.contains(&format!("Couleur: {SENTINEL}, Matière: {SENTINEL}").as_str()));
    assert!(t.contains(&format!("Dimension: {SENTINEL}, Poids: {SENTINEL}").as_str()));
    assert!(t.contains(&format!("Stockage: {SENTINEL}, Emplacement: {SENTINEL}").as_str()));
    assert!(doc.pdf.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn webp_photo_is_transcoded_to_png() {
    let url = "https://example.com/a.webp";
    let webp = webp_bytes();
    let fetcher = Arc::new(
        MockFetcher::default().with(url, Ok(FetchedImage::new(webp.clone(), Some("image/webp")))),
    );
    let config = config_with(Arc::clone(&fetcher));

    let resolver = ImageResolver::new(fetcher.clone(), None, &config);
    let res = resolver.resolve(1, Some("(https://example.com/a.webp)")).await;
    match res.image {
        ResolvedImage::Transcoded(img) => {
            assert_eq!(img.format, EmbedFormat::Png);
            assert_ne!(img.data, webp);
            assert!(img.data.starts_with(b"\x89PNG\r\n\x1a\n"));
        }
        other => panic!("expected transcoded PNG, got {other:?}"),
    }

    let csv = format!("{HEADER}\nA1,Lampe,,,,,,,[photo]({url})\n");
    let doc = generate(csv.as_bytes(), DocumentVariant::Form, "Lampes.csv", &config)
        .await
        .unwrap();
    assert_eq!(doc.stats.images_transcoded, 1);
    assert_eq!(doc.pages[0].image_count(), 1);
    assert!(doc.warnings.is_empty());
}

#[tokio::test]
async fn overflow_produces_pages_and_single_footer() {
    let fetcher = Arc::new(MockFetcher::default());
    let config = config_with(fetcher);
    let csv = rows(12);

    let doc = generate(csv.as_bytes(), DocumentVariant::List, "Stock.csv", &config)
        .await
        .unwrap();

    assert!(doc.pages.len() >= 2);
    assert_eq!(doc.pages.len(), 3); // 4 + 5 + 3
    let footers: Vec<_> = doc.pages.iter().map(footer_count).collect();
    assert_eq!(footers.iter().sum::<usize>(), 1);
    assert_eq!(*footers.last().unwrap(), 1);
}

#[tokio::test]
async fn malformed_csv_fails_without_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with(Arc::new(MockFetcher::default()));
    let bad = b"SKU,Photo\nA1,\xff\xfe\xfd\n";

    let err = generate(bad, DocumentVariant::Form, "x.csv", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::CsvParse { .. }), "got {err:?}");

    let err = generate_to_dir(bad, DocumentVariant::Form, "x.csv", dir.path(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::CsvParse { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// ── Layout properties ────────────────────────────────────────────────────────

#[tokio::test]
async fn page_count_matches_formula_and_blocks_never_split() {
    let config = config_with(Arc::new(MockFetcher::default()));
    for (variant, first_page) in [(DocumentVariant::Form, 3usize), (DocumentVariant::List, 4)] {
        for n in [0usize, 1, first_page, first_page + 1, first_page + 5, first_page + 6, 23] {
            let doc = generate(rows(n).as_bytes(), variant, "s.csv", &config).await.unwrap();
            let expected = if n <= first_page {
                1
            } else {
                1 + (n - first_page).div_ceil(5)
            };
            assert_eq!(doc.pages.len(), expected, "{variant} with {n} records");

            let footer_y = 841.89 - 50.0 - 50.0;
            for p in &doc.placements {
                assert!(p.image.y + 120.0 <= footer_y + 1e-3);
            }
            // Every record's SKU line is on the page its placement names.
            for (i, p) in doc.placements.iter().enumerate() {
                let sku = format!("SKU: S{i}");
                assert!(doc.pages[p.page_index].texts().any(|t| t == sku));
            }
        }
    }
}

#[tokio::test]
async fn plan_agrees_with_generate() {
    let config = config_with(Arc::new(MockFetcher::default()));
    let csv = rows(9);
    let p = plan(csv.as_bytes(), DocumentVariant::Form, "s.csv", &config).unwrap();
    let doc = generate(csv.as_bytes(), DocumentVariant::Form, "s.csv", &config)
        .await
        .unwrap();
    assert_eq!(p.pages, doc.pages.len());
    assert_eq!(p.placements, doc.placements);
}

#[tokio::test]
async fn footer_on_every_page_when_configured() {
    let fetcher = Arc::new(MockFetcher::default());
    let config = GenerationConfig::builder()
        .fetcher(fetcher)
        .footer_policy(FooterPolicy::EveryPage)
        .build()
        .unwrap();
    let doc = generate(rows(12).as_bytes(), DocumentVariant::List, "s.csv", &config)
        .await
        .unwrap();
    assert_eq!(doc.pages.len(), 3);
    assert!(doc.pages.iter().all(|p| footer_count(p) == 1));
}

#[tokio::test]
async fn output_is_deterministic() {
    let jpeg = jpeg_bytes();
    let fetcher = Arc::new(
        MockFetcher::default()
            .with("https://x/a.jpg", Ok(FetchedImage::new(jpeg.clone(), Some("image/jpeg"))))
            .with("https://x/b.jpg", Ok(FetchedImage::new(jpeg, Some("image/jpeg; charset=binary")))),
    );
    let config = config_with(fetcher);
    let csv = format!(
        "{HEADER}\nA1,Chaise,,,,,,,https://x/a.jpg\nA2,Table,,,,,,,(https://x/b.jpg)\nA3,Banc,,,,,,,\n"
    );

    let first = generate(csv.as_bytes(), DocumentVariant::Form, "s.csv", &config).await.unwrap();
    let second = generate(csv.as_bytes(), DocumentVariant::Form, "s.csv", &config).await.unwrap();
    assert_eq!(first.pdf, second.pdf);
    assert_eq!(first.pages, second.pages);
    assert_eq!(first.stats.images_fetched, 2);
}

// ── Images ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failures_become_warnings_in_record_order() {
    let fetcher = Arc::new(
        MockFetcher::default()
            .with("https://x/ok.png", Ok(FetchedImage::new(png_bytes(), Some("image/png"))))
            .with("https://x/gif", Ok(FetchedImage::new(b"GIF89a".to_vec(), Some("image/gif"))))
            .with("https://x/down", Err(FetchError::Status(503))),
    );
    let config = config_with(Arc::clone(&fetcher));
    let csv = format!(
        "{HEADER}\n\
         A1,,,,,,,,https://x/ok.png\n\
         A2,,,,,,,,https://x/gif\n\
         A3,,,,,,,,not a url\n\
         A4,,,,,,,,https://x/down\n\
         A5,,,,,,,,https://x/missing\n"
    );

    let doc = generate(csv.as_bytes(), DocumentVariant::List, "s.csv", &config)
        .await
        .unwrap();

    assert_eq!(doc.warnings.len(), 4);
    let records: Vec<_> = doc.warnings.iter().map(ImageWarning::record).collect();
    assert_eq!(records, vec![2, 3, 4, 5]);
    assert!(matches!(doc.warnings[0], ImageWarning::UnsupportedType { .. }));
    assert!(matches!(doc.warnings[1], ImageWarning::MissingUrl { .. }));
    assert!(matches!(doc.warnings[2], ImageWarning::HttpStatus { status: 503, .. }));
    assert!(matches!(doc.warnings[3], ImageWarning::HttpStatus { status: 404, .. }));

    assert_eq!(doc.stats.images_fetched, 1);
    assert_eq!(doc.stats.placeholder_boxes, 4);
    let all = texts(&doc.pages);
    assert_eq!(all.iter().filter(|t| **t == "Erreur Image").count(), 4);
    // "not a url" never reaches the fetcher
    assert_eq!(fetcher.calls(), 4);
}

#[tokio::test]
async fn placeholder_asset_replaces_error_box() {
    let assets = tempfile::tempdir().unwrap();
    std::fs::write(assets.path().join("no-image.png"), png_bytes()).unwrap();
    std::fs::write(assets.path().join("logo.png"), png_bytes()).unwrap();

    let config = GenerationConfig::builder()
        .fetcher(Arc::new(MockFetcher::default()))
        .assets_dir(assets.path())
        .build()
        .unwrap();
    let csv = format!("{HEADER}\nA1,,,,,,,,https://x/gone.png\nA2,,,,,,,,https://x/gone2.png\nA3,,,,,,,,\n");

    let doc = generate(csv.as_bytes(), DocumentVariant::List, "s.csv", &config)
        .await
        .unwrap();

    assert_eq!(doc.warnings.len(), 2);
    assert_eq!(doc.stats.placeholder_assets, 2);
    // logo + two placeholder assets; the empty photo is still a drawn box
    assert_eq!(doc.pages[0].image_count(), 3);
    let all = texts(&doc.pages);
    assert!(!all.contains(&"Erreur Image"));
    assert!(all.contains(&"Pas d'image"));
    assert!(!all.contains(&"LUMA ARLES"));
}

// ── Output ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn writes_artifact_and_reports_url() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("uploads");
    let config = config_with(Arc::new(MockFetcher::default()));

    let result = generate_to_dir(
        rows(2).as_bytes(),
        DocumentVariant::Form,
        "Mobilier Salle 2.csv",
        &out,
        &config,
    )
    .await
    .unwrap();

    assert_eq!(result.artifact_path, out.join("bon_d'enlevement_mobilier.pdf"));
    assert_eq!(result.file_url, "/uploads/bon_d'enlevement_mobilier.pdf");
    let bytes = std::fs::read(&result.artifact_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    // Only the artifact: no temp file left over.
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
}

#[tokio::test]
async fn list_title_uses_sanitised_name() {
    let config = config_with(Arc::new(MockFetcher::default()));
    let doc = generate(rows(1).as_bytes(), DocumentVariant::List, "Expo Été.csv", &config)
        .await
        .unwrap();
    assert_eq!(doc.artifact_name, "liste_expo.pdf");
    let all = texts(&doc.pages);
    assert!(all.contains(&"Liste de expo"));
    assert!(all.contains(&"Service de Production"));
    assert!(all.contains(&"Date : 07/03/2024"));
}

// ── Real HTTP ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_fetcher_transcodes_served_webp() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().expect("tcp listener");
    let body = webp_bytes();
    std::thread::spawn(move || {
        if let Ok(req) = server.recv() {
            let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"image/webp"[..]).unwrap();
            let _ = req.respond(tiny_http::Response::from_data(body).with_header(header));
        }
    });

    // Same reqwest transport as the default, minus any proxy from the environment.
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap();
    let config = GenerationConfig::builder()
        .fetcher(Arc::new(HttpFetcher::with_client(client)))
        .fetch_timeout_secs(5)
        .build()
        .unwrap();
    let csv = format!("{HEADER}\nA1,Lampe,,,,,,,[img](http://{addr}/lampe.webp)\n");
    let doc = generate(csv.as_bytes(), DocumentVariant::List, "s.csv", &config)
        .await
        .unwrap();

    assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
    assert_eq!(doc.stats.images_transcoded, 1);
}
