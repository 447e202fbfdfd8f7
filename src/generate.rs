//! Generation entry points.
//!
//! The pipeline runs in two phases. Phase 1 resolves every record's photo
//! concurrently (bounded by `concurrency`, results kept in record order).
//! Phase 2 is a single sequential draw pass followed by PDF serialisation,
//! run on the blocking pool. Each call owns its own layout cursor and
//! canvas, so concurrent calls never interfere.

use crate::config::GenerationConfig;
use crate::error::GenerateError;
use crate::output::{GeneratedDocument, GenerationResult, GenerationStats, LayoutPlan};
use crate::pipeline::assets::Assets;
use crate::pipeline::compose::{compose, ComposeContext};
use crate::pipeline::fetch::{HttpFetcher, ImageFetcher};
use crate::pipeline::image::{ImageResolver, Resolution};
use crate::pipeline::input::decode_csv;
use crate::pipeline::layout::{LayoutEngine, LayoutMetrics};
use crate::pipeline::normalize::{artifact_name, artifact_stem, normalize, CanonicalRecord};
use crate::pipeline::pdf::write_pdf;
use crate::variant::DocumentVariant;
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Decode and normalise uploaded CSV bytes.
fn load_records(csv: &[u8], config: &GenerationConfig) -> Result<Vec<CanonicalRecord>, GenerateError> {
    let rows = decode_csv(csv, config.delimiter)?;
    Ok(normalize(&rows))
}

/// Generate a document in memory.
///
/// # Arguments
/// * `csv` — uploaded CSV bytes, header row first
/// * `variant` — form or list
/// * `source_name` — original file name of the upload; only used to derive
///   the artifact name and the list title
/// * `config` — generation configuration
///
/// # Errors
/// Only fatal problems are returned: undecodable CSV or a PDF that could
/// not be serialised. Photo problems end up in `warnings`.
pub async fn generate(
    csv: &[u8],
    variant: DocumentVariant,
    source_name: &str,
    config: &GenerationConfig,
) -> Result<GeneratedDocument, GenerateError> {
    let total_start = Instant::now();
    let artifact = artifact_name(variant, source_name);
    info!("Generating {} from '{}'", artifact, source_name);

    // ── Step 1: Decode and normalise ─────────────────────────────────────
    let records = load_records(csv, config)?;
    let total = records.len();
    info!("CSV has {} record(s)", total);
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(total);
    }

    // ── Step 2: Static assets ────────────────────────────────────────────
    let assets = Assets::load(config.assets_dir.as_deref()).await;

    // ── Step 3: Resolve photos ───────────────────────────────────────────
    let fetcher: Arc<dyn ImageFetcher> = match &config.fetcher {
        Some(f) => Arc::clone(f),
        None => Arc::new(HttpFetcher::new(config.fetch_timeout_secs)?),
    };
    let resolver = ImageResolver::new(fetcher, assets.placeholder.clone(), config);

    let resolve_start = Instant::now();
    let resolutions: Vec<Resolution> = stream::iter(records.iter().enumerate())
        .map(|(i, record)| {
            let resolver = &resolver;
            async move {
                let record_num = i + 1;
                let resolution = resolver.resolve(record_num, record.photo()).await;
                if let Some(ref cb) = config.progress_callback {
                    if let Some(ref w) = resolution.warning {
                        cb.on_image_fallback(record_num, total, &w.to_string());
                    }
                    cb.on_image_resolved(record_num, total);
                }
                resolution
            }
        })
        .buffered(config.concurrency)
        .collect()
        .await;
    let resolve_duration_ms = resolve_start.elapsed().as_millis() as u64;
    debug!("Resolved {} photo slot(s) in {}ms", resolutions.len(), resolve_duration_ms);

    let mut stats = GenerationStats {
        records: total,
        resolve_duration_ms,
        ..Default::default()
    };
    let mut images = Vec::with_capacity(total);
    let mut warnings = Vec::new();
    for resolution in resolutions {
        stats.count(resolution.image.outcome());
        images.push(resolution.image);
        warnings.extend(resolution.warning);
    }

    // ── Step 4: Draw and serialise ───────────────────────────────────────
    let stem = artifact_stem(source_name);
    let edition_date = config.resolved_edition_date();
    let brand_name = config.brand_name.clone();
    let footer_text = config.footer_text.clone();
    let footer_policy = config.footer_policy;
    let geometry = config.geometry;
    let logo = assets.logo.clone();
    let title = artifact.trim_end_matches(".pdf").to_string();

    let (composition, pdf) = tokio::task::spawn_blocking(move || {
        let ctx = ComposeContext {
            variant,
            stem: &stem,
            edition_date,
            logo,
            brand_name: &brand_name,
            footer_text: &footer_text,
            footer_policy,
            geometry,
            metrics: LayoutMetrics::default(),
        };
        let composition = compose(&ctx, &records, &images);
        let pdf = write_pdf(&composition.pages, &geometry, &title)?;
        Ok::<_, GenerateError>((composition, pdf))
    })
    .await
    .map_err(|e| GenerateError::Internal(format!("draw task failed: {e}")))??;

    // ── Step 5: Stats ────────────────────────────────────────────────────
    stats.pages = composition.pages.len();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Generated {}: {} record(s), {} page(s), {} warning(s), {}ms",
        artifact,
        stats.records,
        stats.pages,
        warnings.len(),
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(total, stats.pages);
    }

    Ok(GeneratedDocument {
        artifact_name: artifact,
        pdf,
        pages: composition.pages,
        placements: composition.placements,
        warnings,
        stats,
    })
}

/// Generate a document and write it into `output_dir`.
///
/// The file appears atomically: it is written to a temporary file in the
/// same directory and renamed into place. On any failure nothing is left
/// behind.
pub async fn generate_to_dir(
    csv: &[u8],
    variant: DocumentVariant,
    source_name: &str,
    output_dir: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationResult, GenerateError> {
    let dir = output_dir.as_ref().to_path_buf();
    let doc = generate(csv, variant, source_name, config).await?;

    let path = dir.join(&doc.artifact_name);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| GenerateError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    let write_path = path.clone();
    let bytes = doc.pdf;
    tokio::task::spawn_blocking(move || {
        let fail = |e: std::io::Error| GenerateError::OutputWriteFailed {
            path: write_path.clone(),
            source: e,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(fail)?;
        tmp.write_all(&bytes).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(&write_path).map_err(|e| fail(e.error))?;
        Ok::<_, GenerateError>(())
    })
    .await
    .map_err(|e| GenerateError::Internal(format!("write task failed: {e}")))??;

    info!("Wrote {}", path.display());

    Ok(GenerationResult {
        file_url: config.file_url(&doc.artifact_name),
        artifact_path: path,
        warnings: doc.warnings,
        stats: doc.stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    csv: &[u8],
    variant: DocumentVariant,
    source_name: &str,
    config: &GenerationConfig,
) -> Result<GeneratedDocument, GenerateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GenerateError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(csv, variant, source_name, config))
}

/// Compute pagination without fetching or drawing anything.
///
/// Needs no network access; useful to preview how many pages an upload
/// will produce.
pub fn plan(
    csv: &[u8],
    variant: DocumentVariant,
    source_name: &str,
    config: &GenerationConfig,
) -> Result<LayoutPlan, GenerateError> {
    let records = load_records(csv, config)?;
    let mut engine = LayoutEngine::new(
        config.geometry,
        LayoutMetrics::default(),
        variant.records_start_y(),
    );
    let placements: Vec<_> = records.iter().map(|_| engine.place_block()).collect();

    Ok(LayoutPlan {
        artifact_name: artifact_name(variant, source_name),
        variant,
        records: records.len(),
        pages: engine.page_count(),
        photos_referenced: records.iter().filter(|r| r.photo().is_some()).count(),
        placements,
    })
}
