//! # inventory-pdf
//!
//! Turn an inventory CSV export into a paginated A4 PDF: a pickup/delivery
//! form ("Bon d'enlèvement/livraison") or a production list ("Liste de …"),
//! one block per item with its reference photo.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CSV bytes
//!  │
//!  ├─ 1. Input      decode rows (header names the columns)
//!  ├─ 2. Normalize  trim, substitute "Non spécifié" for blanks
//!  ├─ 3. Images     fetch photos concurrently; WebP → PNG; placeholders
//!  ├─ 4. Layout     fixed-height blocks, page break before the footer band
//!  ├─ 5. Compose    header, variant furniture, records, footer
//!  └─ 6. PDF        serialise the page model (spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use inventory_pdf::{generate_to_dir, DocumentVariant, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let csv = std::fs::read("Mobilier Salle 2.csv")?;
//!     let config = GenerationConfig::builder().assets_dir("assets").build()?;
//!     let result = generate_to_dir(&csv, DocumentVariant::List, "Mobilier Salle 2.csv", "uploads", &config).await?;
//!     println!("{}", result.file_url); // /uploads/liste_mobilier.pdf
//!     for w in &result.warnings {
//!         eprintln!("{w}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `inventory-pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod labels;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod variant;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FooterPolicy, GenerationConfig, GenerationConfigBuilder};
pub use error::{GenerateError, ImageWarning};
pub use generate::{generate, generate_sync, generate_to_dir, plan};
pub use output::{GeneratedDocument, GenerationResult, GenerationStats, LayoutPlan};
pub use pipeline::canvas::PageGeometry;
pub use pipeline::fetch::{FetchError, FetchedImage, HttpFetcher, ImageFetcher};
pub use pipeline::normalize::{artifact_name, artifact_stem};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use variant::DocumentVariant;
