//! HTML tree parsing, querying, and in-place normalization.
//!
//! Built on `html5ever`'s reference DOM (`markup5ever_rcdom`): nodes are
//! `Rc`-shared with interior mutability, so the normalization steps can
//! rewrite the parsed tree in place before it is serialized for Markdown
//! conversion.
//!
//! ## Normalization
//!
//! [`normalize`] runs a fixed sequence of cleanup steps over a content
//! subtree (see its docs). The sequence is idempotent: running it twice on
//! the same tree yields the same result, which keeps re-runs of the
//! converter byte-stable.
//!
//! ## Content root
//!
//! Export templates wrap the page body in an element carrying the
//! `selectableSection` class; everything outside it is viewer chrome.
//! [`content_root`] selects that subtree, falling back to `<body>` and
//! finally the document itself.

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{SerializeOpts, TraversalScope, serialize};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{Attribute, LocalName, ParseOpts, QualName, namespace_url, ns, parse_document};
use markup5ever_rcdom::{Node, NodeData, SerializableHandle};
pub use markup5ever_rcdom::{Handle, RcDom};

use crate::text::clean_text;

/// Element names stripped wholesale during normalization (step 1).
const NOISE_ELEMENTS: &[&str] = &["style", "script", "link", "meta"];

/// Attributes stripped from every element during normalization (step 6).
const NOISE_ATTRS: &[&str] = &[
    "style",
    "class",
    "doc-id",
    "node-id",
    "data-bookmark-id",
    "data-bookmark-name",
    "data-list",
    "purpose",
];

/// Sentinel attribute marking void elements for the renderer's
/// self-closing rewrite.
pub const SELF_CLOSE_ATTR: &str = "data-self-close";

/// Export convention for inline image references inside templates.
const INLINE_IMAGE_PREFIX: &str = "../../inline-images/";

/// Parse an HTML document into a DOM tree.
pub fn parse_html(html: &str) -> RcDom {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes())
}

/// Serialize a node's children to an HTML string (innerHTML equivalent).
pub fn serialize_children(handle: &Handle) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    let serializable: SerializableHandle = handle.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut bytes, &serializable, opts)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Select the content subtree of a template document.
pub fn content_root(dom: &RcDom) -> Handle {
    find_with_class(&dom.document, "selectableSection")
        .or_else(|| find_first(&dom.document, &["body"]))
        .unwrap_or_else(|| dom.document.clone())
}

// ===========================================================================
// Tree queries
// ===========================================================================

/// True if the handle is an element with the given local name.
pub fn is_element(handle: &Handle, name: &str) -> bool {
    match handle.data {
        NodeData::Element { name: ref qname, .. } => qname.local.as_ref() == name,
        _ => false,
    }
}

/// All descendant elements (including `handle` itself) with one of `names`.
pub fn find_all(handle: &Handle, names: &[&str]) -> Vec<Handle> {
    let mut results = Vec::new();
    walk(handle, &mut |node| {
        if names.iter().any(|n| is_element(node, n)) {
            results.push(node.clone());
        }
    });
    results
}

/// First descendant element (document order) matching one of `names`.
pub fn find_first(handle: &Handle, names: &[&str]) -> Option<Handle> {
    if names.iter().any(|n| is_element(handle, n)) {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_first(child, names) {
            return Some(found);
        }
    }
    None
}

/// All descendant elements carrying the given attribute.
pub fn find_with_attribute(handle: &Handle, attr_name: &str) -> Vec<Handle> {
    let mut results = Vec::new();
    walk(handle, &mut |node| {
        if get_attribute(node, attr_name).is_some() {
            results.push(node.clone());
        }
    });
    results
}

/// First descendant element whose `id` equals `id`.
pub fn find_by_id(handle: &Handle, id: &str) -> Option<Handle> {
    if get_attribute(handle, "id").as_deref() == Some(id) {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_by_id(child, id) {
            return Some(found);
        }
    }
    None
}

/// First descendant element whose `class` list contains `class`.
pub fn find_with_class(handle: &Handle, class: &str) -> Option<Handle> {
    let matches = get_attribute(handle, "class")
        .map(|v| v.split_whitespace().any(|c| c == class))
        .unwrap_or(false);
    if matches {
        return Some(handle.clone());
    }
    for child in handle.children.borrow().iter() {
        if let Some(found) = find_with_class(child, class) {
            return Some(found);
        }
    }
    None
}

/// Direct child elements with the given local name.
pub fn child_elements(handle: &Handle, name: &str) -> Vec<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .filter(|c| is_element(c, name))
        .cloned()
        .collect()
}

fn walk(handle: &Handle, visit: &mut impl FnMut(&Handle)) {
    if let NodeData::Element { .. } = handle.data {
        visit(handle);
    }
    for child in handle.children.borrow().iter() {
        walk(child, visit);
    }
}

/// Concatenated text content of a node, tags ignored.
pub fn text_content(handle: &Handle) -> String {
    let mut text = String::new();
    collect_text(handle, &mut text);
    text
}

fn collect_text(handle: &Handle, text: &mut String) {
    match handle.data {
        NodeData::Text { ref contents } => text.push_str(&contents.borrow()),
        _ => {
            for child in handle.children.borrow().iter() {
                collect_text(child, text);
            }
        }
    }
}

// ===========================================================================
// Attributes
// ===========================================================================

/// Read an attribute value from an element.
pub fn get_attribute(handle: &Handle, attr_name: &str) -> Option<String> {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        for attr in attrs.borrow().iter() {
            if attr.name.local.as_ref() == attr_name {
                return Some(attr.value.to_string());
            }
        }
    }
    None
}

/// Set (or overwrite) an attribute on an element.
pub fn set_attribute(handle: &Handle, attr_name: &str, value: &str) {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        let mut attrs = attrs.borrow_mut();
        for attr in attrs.iter_mut() {
            if attr.name.local.as_ref() == attr_name {
                attr.value = value.into();
                return;
            }
        }
        attrs.push(Attribute {
            name: QualName::new(None, ns!(), attr_name.into()),
            value: value.into(),
        });
    }
}

fn remove_attributes(handle: &Handle, attr_names: &[&str]) {
    if let NodeData::Element { ref attrs, .. } = handle.data {
        attrs
            .borrow_mut()
            .retain(|attr| !attr_names.contains(&attr.name.local.as_ref()));
    }
}

// ===========================================================================
// Tree mutation
// ===========================================================================

fn parent_of(handle: &Handle) -> Option<Handle> {
    let weak = handle.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak);
    parent
}

/// Detach a node from its parent.
pub fn detach(handle: &Handle) {
    if let Some(parent) = parent_of(handle) {
        parent
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, handle));
    }
    handle.parent.set(None);
}

/// Replace a node with another node in its parent's child list.
fn replace_with(handle: &Handle, replacement: Handle) {
    let Some(parent) = parent_of(handle) else {
        return;
    };
    let mut children = parent.children.borrow_mut();
    if let Some(idx) = children.iter().position(|c| Rc::ptr_eq(c, handle)) {
        replacement.parent.set(Some(Rc::downgrade(&parent)));
        children[idx] = replacement;
        handle.parent.set(None);
    }
}

/// Replace a node with its own children (unwrap).
fn unwrap_node(handle: &Handle) {
    let Some(parent) = parent_of(handle) else {
        return;
    };
    let grandchildren: Vec<Handle> = handle.children.borrow_mut().drain(..).collect();
    let mut children = parent.children.borrow_mut();
    if let Some(idx) = children.iter().position(|c| Rc::ptr_eq(c, handle)) {
        for (offset, grandchild) in grandchildren.into_iter().enumerate() {
            grandchild.parent.set(Some(Rc::downgrade(&parent)));
            children.insert(idx + offset, grandchild);
        }
        let own_idx = children
            .iter()
            .position(|c| Rc::ptr_eq(c, handle))
            .expect("unwrapped node still present");
        children.remove(own_idx);
        handle.parent.set(None);
    }
}

fn new_element(name: &str) -> Handle {
    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(Vec::new()),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

fn new_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(text.into()),
    })
}

// ===========================================================================
// Normalization
// ===========================================================================

/// Normalize a content subtree in place.
///
/// Steps, in order:
/// 1. drop `style`/`script`/`link`/`meta` elements;
/// 2. drop the first `h1` (the title is re-synthesized as front matter);
/// 3. mark `col`/`br`/`hr` with [`SELF_CLOSE_ATTR`] so the renderer can
///    force self-closing serialization in raw-HTML fragments;
/// 4. merge `data-codeformat` line runs into a single `<pre><code>` block
///    replacing their common parent (must happen before step 6 strips the
///    marker attribute);
/// 5. unwrap `span` wrappers that contain no image;
/// 6. strip presentation and export-internal attributes everywhere;
/// 7. rewrite inline-image paths to the site's asset location and default
///    missing `alt` text;
/// 8. drop paragraphs that are empty after whitespace collapse and hold no
///    image.
pub fn normalize(root: &Handle) {
    for node in find_all(root, NOISE_ELEMENTS) {
        detach(&node);
    }

    if let Some(heading) = find_first(root, &["h1"]) {
        detach(&heading);
    }

    for node in find_all(root, &["col", "br", "hr"]) {
        set_attribute(&node, SELF_CLOSE_ATTR, "true");
    }

    merge_code_lines(root);

    for span in find_all(root, &["span"]) {
        if find_first(&span, &["img"]).is_none() {
            unwrap_node(&span);
        }
    }

    let mut all = Vec::new();
    walk(root, &mut |node| all.push(node.clone()));
    for node in all {
        remove_attributes(&node, NOISE_ATTRS);
    }

    for img in find_all(root, &["img"]) {
        let src = get_attribute(&img, "src").unwrap_or_default();
        if let Some(rest) = src.strip_prefix(INLINE_IMAGE_PREFIX) {
            set_attribute(&img, "src", &format!("/img/inline-images/{rest}"));
        }
        if get_attribute(&img, "alt").map(|a| a.is_empty()).unwrap_or(true) {
            set_attribute(&img, "alt", "Illustration");
        }
    }

    for p in find_all(root, &["p"]) {
        if clean_text(&text_content(&p)).is_empty() && find_first(&p, &["img"]).is_none() {
            detach(&p);
        }
    }
}

/// Collapse the export's per-line code markup into fenced-code material.
///
/// Templates render code samples as one element per line, each tagged with
/// `data-codeformat` and padded with non-breaking spaces. Every parent that
/// holds such lines is replaced by a `<pre><code>` block whose text is the
/// lines joined with newlines, NBSPs converted and trailing space trimmed.
fn merge_code_lines(root: &Handle) {
    let mut containers: Vec<Handle> = Vec::new();
    for line in find_with_attribute(root, "data-codeformat") {
        if let Some(parent) = parent_of(&line) {
            if !containers.iter().any(|c| Rc::ptr_eq(c, &parent)) {
                containers.push(parent);
            }
        }
    }

    for container in containers {
        let lines: Vec<String> = find_with_attribute(&container, "data-codeformat")
            .iter()
            .map(|n| {
                text_content(n)
                    .replace('\u{a0}', " ")
                    .trim_end()
                    .to_string()
            })
            .collect();

        let pre = new_element("pre");
        let code = new_element("code");
        append_child(&code, new_text(&lines.join("\n")));
        append_child(&pre, code);
        replace_with(&container, pre);
    }
}

// ===========================================================================
// Metadata extraction
// ===========================================================================

/// Page title: text of the first `h1`/`h2`/`h3`, if any.
///
/// Runs before [`normalize`], which removes the `h1` from the body.
pub fn extract_title(root: &Handle) -> Option<String> {
    find_first(root, &["h1", "h2", "h3"]).and_then(|h| {
        let title = clean_text(&text_content(&h));
        if title.is_empty() { None } else { Some(title) }
    })
}

/// Page description: the first non-empty paragraph, summarized.
pub fn extract_description(root: &Handle) -> String {
    for p in find_all(root, &["p"]) {
        let text = clean_text(&text_content(&p));
        if !text.is_empty() {
            return crate::text::summarize(&text);
        }
    }
    String::new()
}
