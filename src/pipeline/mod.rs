//! Pipeline stages for figure and caption extraction.
//!
//! Each submodule implements exactly one step. The stages only talk to the
//! PDF through the [`source`] traits, so the geometry and captioning logic
//! runs unchanged against pdfium or an in-memory test document.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ collect ──▶ group ──▶ render ──▶ caption ──▶ mapping
//! (path/URL) (boxes)   (rows)    (PNG)      (regex)     (JSON map)
//! ```
//!
//! 1. [`input`]  : canonicalise the user-supplied path or URL to a local file
//! 2. [`collect`]: read every embedded image's bounding box; unusable
//!    boxes become [`crate::error::SkipReason`]s instead of errors
//! 3. [`group`]  : chain boxes on the same row into figure groups
//! 4. [`render`] : rasterise each group's merged region to `image{N}.png`
//! 5. [`caption`]: look for a "Figure N:" caption below the region
//! 6. [`mapping`]: accumulate filename → caption and persist the map
//!
//! [`pdfium`] is the production [`source`] backend; [`encode`] holds the
//! PNG encoder and the atomic file writer shared by stages 4 and 6.

pub mod caption;
pub mod collect;
pub mod encode;
pub mod group;
pub mod input;
pub mod mapping;
pub mod pdfium;
pub mod render;
pub mod source;
