//! Sitesmith: generate a single-page static site from a prompt, customize
//! the markup, and export it as a multi-file project.
//!
//! The pure core lives in [`transform`] (customization pipeline),
//! [`preview`] (structural normalization and preview wiring) and
//! [`splitter`] (single file to static project). [`session`] tracks
//! per-session customization state, [`generate`] talks to the completion
//! API and [`archive`] packages exports.

pub mod archive;
pub mod config;
pub mod generate;
pub mod preview;
pub mod session;
pub mod splitter;
pub mod transform;
