//! Pipeline stages for CSV-to-PDF generation.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ image ──▶ layout ──▶ compose ──▶ pdf
//! (csv)     (trim)        (fetch)   (cursor)   (canvas)   (bytes)
//! ```
//!
//! 1. [`input`]     — decode CSV bytes into raw rows
//! 2. [`normalize`] — canonical records and artifact naming
//! 3. [`image`]     — resolve each photo through a [`fetch::ImageFetcher`];
//!    the only stage with network I/O
//! 4. [`layout`]    — page cursor and page-break rule
//! 5. [`compose`]   — draw header, furniture, records and footer on a
//!    [`canvas::Canvas`], measuring text with [`metrics`]
//! 6. [`pdf`]       — serialise the page model; CPU-bound, runs in
//!    `spawn_blocking`
//!
//! [`assets`] loads the optional logo and placeholder images.

pub mod assets;
pub mod canvas;
pub mod compose;
pub mod fetch;
pub mod image;
pub mod input;
pub mod layout;
pub mod metrics;
pub mod normalize;
pub mod pdf;
