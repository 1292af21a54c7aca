//! The canonical UI node tree shared by both capture formats.
//!
//! A whole tree is produced atomically by one parser invocation from one
//! tree-source file and is immutable afterwards; the next capture
//! replaces it wholesale. Nodes own their children; there is no parent
//! back-reference - ancestry queries resolve against the root via
//! [`crate::inspect::locate_by_identity`].

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from decoding a tree-source file.
///
/// A parse failure yields no tree but is not fatal to the calling flow;
/// the caller decides whether to surface it to an operator.
#[derive(Error, Debug)]
pub enum TreeParseError {
    /// The tree-source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The XML document is structurally invalid.
    #[error("invalid XML document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The JSON document is structurally invalid.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document parsed but its root is not an object.
    #[error("JSON tree root is not an object")]
    NotAnObject,
}

/// Which wire format a tree-source file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeFormat {
    /// `uiautomator dump` output (`window_dump.xml`).
    UiAutomatorXml,
    /// AutoJs-produced JSON tree (`autojs_ui_tree.json`).
    AutojsJson,
}

/// A node's rectangle in screen pixels, derived from its bounds string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// The degenerate rectangle malformed bounds decode to.
    pub const ZERO: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Pixel area. Widened to avoid overflow on large screens.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Whether the point lies inside, inclusive on all four edges.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }

    /// The center point.
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

static BOUNDS_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+),(\d+)\]").expect("bounds regex"));

/// Decodes a `[x1,y1][x2,y2]` bounds string into a [`Rect`].
///
/// The grammar must match exactly two `[int,int]` groups; anything else
/// decodes to [`Rect::ZERO`]. Malformed bounds must not abort an
/// otherwise-usable tree, so this never errors.
pub fn parse_bounds(bounds: &str) -> Rect {
    let mut corners = [(0i64, 0i64); 2];
    let mut count = 0usize;

    for caps in BOUNDS_GROUP.captures_iter(bounds) {
        if count == 2 {
            return Rect::ZERO;
        }
        let x = caps[1].parse::<i64>();
        let y = caps[2].parse::<i64>();
        match (x, y) {
            (Ok(x), Ok(y)) => corners[count] = (x, y),
            // Digit runs too long for i64 (garbage input).
            _ => return Rect::ZERO,
        }
        count += 1;
    }

    if count != 2 {
        return Rect::ZERO;
    }

    let (x1, y1) = corners[0];
    let (x2, y2) = corners[1];
    let (w, h) = (x2 - x1, y2 - y1);
    if x1 > i32::MAX as i64 || y1 > i32::MAX as i64 || !(0..=i32::MAX as i64).contains(&w) || !(0..=i32::MAX as i64).contains(&h)
    {
        return Rect::ZERO;
    }

    Rect {
        x: x1 as i32,
        y: y1 as i32,
        width: w as i32,
        height: h as i32,
    }
}

/// One UI element from a captured accessibility/automation tree.
///
/// All flag fields keep their wire form as strings (`"true"`/`"false"`);
/// the dump is the source of truth and round-trips losslessly that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    /// Sibling-scoped index from the source document.
    pub index: i32,
    pub text: String,
    /// Possibly package-qualified, form `pkg:id/name`.
    pub resource_id: String,
    /// Dotted class name, e.g. `android.widget.TextView`.
    pub class_name: String,
    pub package: String,
    pub content_desc: String,
    pub checkable: String,
    pub checked: String,
    pub clickable: String,
    pub enabled: String,
    pub focusable: String,
    pub focused: String,
    pub scrollable: String,
    pub long_clickable: String,
    pub password: String,
    pub selected: String,
    /// Raw bounds string in the literal form `[x1,y1][x2,y2]`.
    pub bounds: String,
    /// Rectangle derived from `bounds`; zero when the string is malformed.
    pub rect: Rect,
    /// Ordered children, exclusively owned by this node.
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// The resource id reduced to its local name (text after the last
    /// `:id/`), or the full id when it is not package-qualified.
    pub fn local_id(&self) -> &str {
        match self.resource_id.rfind(":id/") {
            Some(pos) => &self.resource_id[pos + 4..],
            None => &self.resource_id,
        }
    }

    /// The class name without its package path.
    pub fn short_class(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.class_name)
    }

    /// One-line summary used by tree listings:
    /// `(index) ShortClass text="..."` with desc/id fallbacks.
    pub fn display_label(&self) -> String {
        let mut parts = Vec::new();
        if !self.class_name.is_empty() {
            parts.push(self.short_class().to_string());
        }
        if !self.text.is_empty() {
            parts.push(format!("text=\"{}\"", self.text));
        } else if !self.content_desc.is_empty() {
            parts.push(format!("desc=\"{}\"", self.content_desc));
        } else if !self.resource_id.is_empty() {
            parts.push(format!("id=\"{}\"", self.resource_id));
        }
        format!("({}) {}", self.index, parts.join(" "))
    }

    /// Center of the node's rectangle.
    pub fn center(&self) -> (i32, i32) {
        self.rect.center()
    }
}

/// Parses a tree-source file into a node tree.
///
/// The decoder is picked by the declared `format`, never by sniffing
/// the document.
///
/// # Errors
///
/// - [`TreeParseError::Read`] if the file cannot be read
/// - [`TreeParseError::Xml`] / [`TreeParseError::Json`] /
///   [`TreeParseError::NotAnObject`] if the document is structurally
///   invalid for its format
pub fn parse_tree_file(path: &Path, format: TreeFormat) -> Result<UiNode, TreeParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| TreeParseError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match format {
        TreeFormat::UiAutomatorXml => crate::uixml::parse_document(&content),
        TreeFormat::AutojsJson => crate::autojs::parse_document(&content),
    }
}

/// A blank node with every flag defaulted, for tests across the crate.
#[cfg(test)]
pub(crate) fn blank_node() -> UiNode {
    UiNode {
        index: 0,
        text: String::new(),
        resource_id: String::new(),
        class_name: String::new(),
        package: String::new(),
        content_desc: String::new(),
        checkable: "false".to_string(),
        checked: "false".to_string(),
        clickable: "false".to_string(),
        enabled: "false".to_string(),
        focusable: "false".to_string(),
        focused: "false".to_string(),
        scrollable: "false".to_string(),
        long_clickable: "false".to_string(),
        password: "false".to_string(),
        selected: "false".to_string(),
        bounds: "[0,0][0,0]".to_string(),
        rect: Rect::ZERO,
        children: Vec::new(),
    }
}
