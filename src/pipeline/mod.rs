//! Pipeline stages for turning word-processor documents into a dataset.
//!
//! Each stage reads one directory and writes another; nothing is passed in
//! memory between stages.
//!
//! ## Data Flow
//!
//! ```text
//! docxs/ ──▶ pdf ──▶ pdfs/ ──▶ render ──▶ images/<stem>/NN.png ──┐
//!   │                                                             ├─▶ manifest ──▶ dataset.jsonl
//!   └──▶ (split) ──▶ markdown ──▶ markdown/<stem>[/…].mmd ────────┘
//! ```
//!
//! 1. [`pdf`]     : office suite, one PDF per document
//! 2. [`markdown`]: pandoc, whole document or one file per page via [`split`]
//! 3. [`render`]  : pdfium; runs in `spawn_blocking` because pdfium is not
//!    async-safe
//! 4. [`manifest`]: positional zip of both trees into JSONL
//!
//! [`input`] lists stage inputs, [`tool`] runs external converters.

pub mod input;
pub mod manifest;
pub mod markdown;
pub mod pdf;
pub mod render;
pub mod split;
pub(crate) mod stage;
pub mod tool;
