//! Pipeline stages used by [`crate::convert::VisionConverter`].
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ postprocess
//! (%PDF)   (pdfium)   (base64)   (VLM)   (cleanup)
//! ```
//!
//! 1. [`input`]  — reject missing, unreadable or non-PDF files
//! 2. [`render`] — rasterise one batch of pages on the blocking pool
//! 3. [`encode`] — PNG or JPEG, base64-wrapped
//! 4. [`llm`]    — model call with retry/backoff; the only network stage
//! 5. [`postprocess`] — deterministic text clean-up

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
