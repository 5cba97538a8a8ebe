//! # Helpdown
//!
//! Converts a legacy help-center HTML export into a structured tree of
//! Markdown documents that a docs-site generator can consume. The export's
//! `index.html` is the single source of truth for structure: chapters
//! become directories, linked page templates become `.mdx` files with
//! synthesized front matter, and inline images are mirrored into the
//! site's static asset tree.
//!
//! # Architecture: One-Shot Conversion Pipeline
//!
//! ```text
//! index.html   →  nav       →  section/document manifest
//! templates/   →  dom       →  normalized content trees
//!              →  markdown  →  JSX-safe Markdown bodies
//!              →  convert   →  docs/ tree + _category_.json + asset mirror
//! ```
//!
//! Each stage is a pure function over its input where possible, so unit
//! tests exercise extraction, normalization, and rendering without
//! touching the filesystem; only the assembler does I/O.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`nav`] | Parses the navigation index into ordered sections and document references |
//! | [`dom`] | HTML parsing and in-place tree normalization (html5ever/rcdom) |
//! | [`markdown`] | HTML→Markdown conversion plus the JSX-safety escaping passes |
//! | [`text`] | Pure string utilities: whitespace cleanup, YAML escaping, summarizing |
//! | [`convert`] | Orchestration: full rebuild of the output tree and asset mirror |
//!
//! # Design Decisions
//!
//! ## Full Rebuild, Every Run
//!
//! The output tree is destroyed and regenerated on each run. The export is
//! small and conversion is fast, so incremental rebuilds would buy nothing
//! and cost the strongest property the converter has: the generated docs
//! are a pure function of the export. Stale files cannot survive, and two
//! runs over the same export are byte-identical.
//!
//! ## In-Place DOM Normalization
//!
//! The export's templates carry heavy presentation markup: styled spans,
//! per-line code elements padded with non-breaking spaces, bookmark and
//! list identifiers. Rather than fight that noise during conversion, the
//! [`dom`] stage mutates the parsed tree into clean semantic HTML first,
//! and the Markdown conversion stays generic.
//!
//! ## Escaping as Ordered Rewrite Rules
//!
//! The output is consumed by a JSX-aware Markdown processor, which
//! misreads `<VALUE>`, `<>`, `<=`, and bare `{braces}` as syntax. The
//! [`markdown`] stage applies a fixed sequence of small, independently
//! tested rewrite rules over a fence-state-aware line stream, so code
//! blocks and inline code are never mangled and new rules slot in without
//! regressions.
//!
//! ## Fail Fast, No Rollback
//!
//! A broken manifest or a missing template aborts the run with a non-zero
//! exit: a partial docs tree from a corrupt export is worse than no tree.
//! Files already written stay on disk; the next successful run starts
//! from a clean output directory regardless.

pub mod convert;
pub mod dom;
pub mod markdown;
pub mod nav;
pub mod text;

#[cfg(test)]
pub(crate) mod test_helpers;
