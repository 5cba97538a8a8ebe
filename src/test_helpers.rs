//! Shared test utilities: a synthetic help-center export.
//!
//! Builds the minimal export layout the converter expects — `index.html`
//! navigation manifest, `templates/` tree, `inline-images/` — so tests can
//! run the full pipeline against a `TempDir` without shipping fixture
//! files.
//!
//! The default export has two sections:
//!
//! ```text
//! Getting Started          → guide/
//! ├── Introduction         → guide/intro.html
//! └── Setup                → guide/setup.html
//! Reference                → reference/
//! └── API Reference        → reference/api.html
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::convert::Layout;

const INDEX_HTML: &str = r##"<html><body>
<ul id="apendArticles">
  <li>
    <strong purpose="chapter">Getting Started</strong>
    <ul>
      <li><a onclick='loadPage("./templates/guide/intro.html")'>Introduction</a></li>
      <li><a onclick='loadPage("./templates/guide/setup.html")'>Setup</a></li>
      <li><a href="#top">back to top</a></li>
    </ul>
  </li>
  <li>
    <strong purpose="chapter">Reference</strong>
    <ul>
      <li><a onclick='loadPage("./templates/reference/api.html")'>API Reference</a></li>
    </ul>
  </li>
</ul>
</body></html>"##;

const INTRO_HTML: &str = r#"<html><head><style>.x{}</style></head><body>
<div class="toolbar">viewer chrome</div>
<div class="selectableSection" doc-id="101">
  <h1 style="font-size: 20px">Introduction to the SDK</h1>
  <p>Welcome to the SDK.</p>
  <p><span style="color: blue">It does many things.</span></p>
  <p><img src="../../inline-images/diagram.png"></p>
</div>
</body></html>"#;

const SETUP_HTML: &str = r#"<html><body>
<div class="selectableSection">
  <h1>Setup</h1>
  <p>Run the installer first.</p>
</div>
</body></html>"#;

const API_HTML: &str = r#"<html><body>
<div class="selectableSection">
  <p>Every call returns a status code.</p>
  <p>Pass a placeholder where needed.</p>
</div>
</body></html>"#;

/// Write the default synthetic export under `root`.
pub fn write_export(root: &Path) {
    write_file(root, "index.html", INDEX_HTML);
    write_file(root, "templates/guide/intro.html", INTRO_HTML);
    write_file(root, "templates/guide/setup.html", SETUP_HTML);
    write_file(root, "templates/reference/api.html", API_HTML);
    write_file(root, "inline-images/diagram.png", "png bytes");
}

/// Overwrite a single template in an already-written export.
pub fn write_template(root: &Path, relative_path: &str, html: &str) {
    write_file(root, &format!("templates/{relative_path}"), html);
}

/// Standard layout for an export rooted at `root`: output lands in
/// `root/docs` and `root/static/img`.
pub fn layout_for(root: &Path) -> Layout {
    Layout {
        export_root: root.to_path_buf(),
        docs_dir: root.join("docs"),
        static_img_dir: root.join("static/img"),
    }
}

/// Snapshot a directory tree as relative-path → bytes, for byte-identical
/// comparisons between runs.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut tree = BTreeMap::new();
    collect(root, root, &mut tree);
    tree
}

fn collect(root: &Path, dir: &Path, tree: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, tree);
        } else {
            let rel = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            tree.insert(rel, fs::read(&path).unwrap());
        }
    }
}

/// `fs::write` with parent-directory creation.
fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
}
