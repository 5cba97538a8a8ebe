//! Navigation-index extraction.
//!
//! The export ships a single `index.html` whose sidebar markup is the only
//! machine-readable table of contents: an element with id `apendArticles`
//! holds one `<li>` per chapter, and each chapter's links carry the target
//! template path inside an `onclick` handler. This module turns that markup
//! into an ordered section/document manifest for the assembler.
//!
//! ## Extraction rules
//!
//! - Chapter label: first `<strong purpose="chapter">` descendant,
//!   whitespace-cleaned; `Section N` when absent.
//! - Document reference: the `onclick` value must contain a quoted
//!   `./templates/<path>` token. Links without one are decorative
//!   (expand/collapse toggles, anchors) and are skipped silently.
//! - Document label: cleaned link text, falling back to the file stem.
//! - A chapter with no extractable references signals a broken export and
//!   aborts the run.
//!
//! Order is preserved exactly as encountered: document order in the index
//! is section/document order in the output tree.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::dom;
use crate::text::clean_text;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("Unable to locate navigation structure in source HTML.")]
    MissingNavigation,
    #[error("No documents found under navigation section \"{0}\".")]
    EmptySection(String),
    #[error(
        "Navigation section \"{section}\" mixes directories: expected \"{expected}\", found \"{found}\" in {path}"
    )]
    MixedSectionDirs {
        section: String,
        expected: String,
        found: String,
        path: String,
    },
}

/// One chapter of the navigation index.
#[derive(Debug, Clone)]
pub struct Section {
    /// Display label from the chapter-title marker (or `Section N`).
    pub label: String,
    /// Output directory name, derived from the documents' path segment.
    pub dir_name: String,
    /// 1-based position in the index.
    pub position: usize,
    /// Documents in index order. Never empty.
    pub docs: Vec<DocRef>,
}

/// One document link inside a section.
#[derive(Debug, Clone)]
pub struct DocRef {
    /// Path relative to the export's templates directory.
    pub relative_path: String,
    /// Sidebar label from the link text (or the file stem).
    pub nav_label: String,
    /// 1-based position within the section.
    pub position: usize,
}

/// Quoted template reference embedded in a link's `onclick` handler.
static TEMPLATE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""\./templates/([^"]+)""#).expect("hardcoded regex is valid"));

/// Extract the ordered section/document manifest from the index document.
pub fn extract_navigation(html: &str) -> Result<Vec<Section>, NavError> {
    let dom = dom::parse_html(html);
    let container =
        dom::find_by_id(&dom.document, "apendArticles").ok_or(NavError::MissingNavigation)?;
    let chapters = dom::child_elements(&container, "li");
    if chapters.is_empty() {
        return Err(NavError::MissingNavigation);
    }

    let mut sections = Vec::with_capacity(chapters.len());
    for (idx, chapter) in chapters.iter().enumerate() {
        sections.push(extract_section(chapter, idx + 1)?);
    }
    Ok(sections)
}

fn extract_section(chapter: &dom::Handle, position: usize) -> Result<Section, NavError> {
    let label = chapter_label(chapter, position);

    let mut docs = Vec::new();
    for link in dom::find_all(chapter, &["a"]) {
        let onclick = dom::get_attribute(&link, "onclick").unwrap_or_default();
        let Some(captures) = TEMPLATE_REF.captures(&onclick) else {
            continue;
        };
        let relative_path = captures[1].to_string();

        let mut nav_label = clean_text(&dom::text_content(&link));
        if nav_label.is_empty() {
            nav_label = file_stem(&relative_path);
        }

        docs.push(DocRef {
            relative_path,
            nav_label,
            position: docs.len() + 1,
        });
    }

    if docs.is_empty() {
        return Err(NavError::EmptySection(label));
    }

    let dir_name = doc_dir_name(&docs[0].relative_path);
    for doc in &docs {
        let found = doc_dir_name(&doc.relative_path);
        if found != dir_name {
            return Err(NavError::MixedSectionDirs {
                section: label,
                expected: dir_name,
                found,
                path: doc.relative_path.clone(),
            });
        }
    }

    Ok(Section {
        label,
        dir_name,
        position,
        docs,
    })
}

fn chapter_label(chapter: &dom::Handle, position: usize) -> String {
    for strong in dom::find_all(chapter, &["strong"]) {
        if dom::get_attribute(&strong, "purpose").as_deref() == Some("chapter") {
            let label = clean_text(&dom::text_content(&strong));
            if !label.is_empty() {
                return label;
            }
        }
    }
    format!("Section {position}")
}

/// First directory segment of a template path; `.` for bare filenames.
fn doc_dir_name(relative_path: &str) -> String {
    match relative_path.rsplit_once(['/', '\\']) {
        Some((dir, _)) => dir
            .split(['/', '\\'])
            .next()
            .unwrap_or(".")
            .to_string(),
        None => ".".to_string(),
    }
}

fn file_stem(relative_path: &str) -> String {
    Path::new(relative_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
