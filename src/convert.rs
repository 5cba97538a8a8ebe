//! Full-run orchestration: manifest → documents → asset mirror.
//!
//! One [`run`] call is one complete rebuild. The docs output directory is
//! resynchronized (deleted and recreated) before anything is written, so
//! the output tree is always a pure function of the source export — never
//! merged with prior output, never edited by hand.
//!
//! ## Output tree
//!
//! ```text
//! docs/
//! ├── guide/
//! │   ├── _category_.json        # {label, position, collapsed}
//! │   ├── intro.mdx              # front matter + markdown body
//! │   └── setup.mdx
//! └── reference/
//!     └── ...
//! static/img/
//! └── inline-images/             # mirrored verbatim from the export
//! ```
//!
//! ## Failure semantics
//!
//! Fail-fast, all-or-nothing per run: the first fatal error aborts the
//! remaining pipeline with no rollback of files already written. A re-run
//! starts from a clean output directory anyway.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use walkdir::WalkDir;

use crate::nav::{self, DocRef, NavError, Section};
use crate::text::yaml_escape;
use crate::{dom, markdown};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error("Missing source document: {0}")]
    MissingSource(PathBuf),
}

/// Source and destination locations for one run.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Root of the extracted export (holds `index.html`, `templates/`,
    /// `inline-images/`).
    pub export_root: PathBuf,
    /// Output directory for the generated Markdown tree.
    pub docs_dir: PathBuf,
    /// Static image directory; the mirror lands in `<here>/inline-images`.
    pub static_img_dir: PathBuf,
}

impl Layout {
    pub fn index_file(&self) -> PathBuf {
        self.export_root.join("index.html")
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.export_root.join("templates")
    }

    pub fn inline_images_dir(&self) -> PathBuf {
        self.export_root.join("inline-images")
    }
}

/// What a completed run produced, for CLI reporting.
#[derive(Debug)]
pub struct Summary {
    pub sections: usize,
    pub documents: usize,
    pub images_copied: usize,
}

/// Per-section metadata consumed by the docs-site sidebar.
#[derive(Debug, Serialize)]
struct CategoryMeta<'a> {
    label: &'a str,
    position: usize,
    collapsed: bool,
}

/// Convert the whole export: extract navigation, rebuild the docs tree,
/// mirror inline images.
pub fn run(layout: &Layout) -> Result<Summary, ConvertError> {
    let index_html = fs::read_to_string(layout.index_file())?;
    let sections = nav::extract_navigation(&index_html)?;

    resync_dir(&layout.docs_dir)?;

    let mut documents = 0;
    for section in &sections {
        let section_dir = layout.docs_dir.join(&section.dir_name);
        fs::create_dir_all(&section_dir)?;
        write_category(&section_dir, section)?;

        for doc in &section.docs {
            convert_document(layout, &section_dir, doc)?;
            documents += 1;
        }
        println!("{} ({} documents)", section.label, section.docs.len());
    }

    let images_copied = mirror_images(layout)?;

    Ok(Summary {
        sections: sections.len(),
        documents,
        images_copied,
    })
}

fn write_category(section_dir: &Path, section: &Section) -> Result<(), ConvertError> {
    let meta = CategoryMeta {
        label: &section.label,
        position: section.position,
        collapsed: true,
    };
    let json = serde_json::to_string_pretty(&meta)?;
    fs::write(section_dir.join("_category_.json"), format!("{json}\n"))?;
    Ok(())
}

fn convert_document(
    layout: &Layout,
    section_dir: &Path,
    doc: &DocRef,
) -> Result<(), ConvertError> {
    let source_path = layout.templates_dir().join(&doc.relative_path);
    if !source_path.is_file() {
        return Err(ConvertError::MissingSource(source_path));
    }

    let html = fs::read_to_string(&source_path)?;
    let parsed = dom::parse_html(&html);
    let root = dom::content_root(&parsed);

    // Title and description come from the untouched tree; normalization
    // removes the heading the title is read from.
    let title = dom::extract_title(&root).unwrap_or_else(|| doc.nav_label.clone());
    let description = dom::extract_description(&root);

    dom::normalize(&root);
    let body = markdown::render(&root)?;

    let slug = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| doc.relative_path.clone());

    let front_matter = front_matter(&title, doc, &description);
    fs::write(
        section_dir.join(format!("{slug}.mdx")),
        format!("{front_matter}{body}\n"),
    )?;
    Ok(())
}

fn front_matter(title: &str, doc: &DocRef, description: &str) -> String {
    let mut lines = vec!["---".to_string(), format!("title: {}", yaml_escape(title))];

    if !doc.nav_label.is_empty() && doc.nav_label != title {
        lines.push(format!("sidebar_label: {}", yaml_escape(&doc.nav_label)));
    }

    lines.push(format!("sidebar_position: {}", doc.position));

    if !description.is_empty() {
        lines.push(format!("description: {}", yaml_escape(description)));
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\n")
}

/// Delete and recreate a directory, tolerating an absent target.
fn resync_dir(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(path)
}

/// Mirror the export's inline images into the static asset tree.
///
/// Wholesale replacement: the previous mirror is deleted first. Returns the
/// number of files copied (0 when the export ships no images).
fn mirror_images(layout: &Layout) -> Result<usize, ConvertError> {
    fs::create_dir_all(&layout.static_img_dir)?;
    let target = layout.static_img_dir.join("inline-images");
    match fs::remove_dir_all(&target) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let source = layout.inline_images_dir();
    if !source.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(&source) {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(&source)
            .expect("walked path is under its root");
        let dest = target.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}
