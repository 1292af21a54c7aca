//! Decoder for `uiautomator dump` XML (`window_dump.xml`).
//!
//! Element attributes map 1:1 onto [`UiNode`] fields by fixed name;
//! element nesting order is preserved as child order. The document root
//! element itself (uiautomator's `<hierarchy>`) becomes the root node,
//! with every field defaulted.

use crate::node::{parse_bounds, TreeParseError, UiNode};

/// Parses a uiautomator XML document into a node tree.
///
/// # Errors
///
/// [`TreeParseError::Xml`] if the document is not well-formed.
pub fn parse_document(xml: &str) -> Result<UiNode, TreeParseError> {
    let doc = roxmltree::Document::parse(xml)?;
    Ok(decode_element(doc.root_element()))
}

fn decode_element(element: roxmltree::Node<'_, '_>) -> UiNode {
    let attr = |name: &str, default: &str| -> String {
        element.attribute(name).unwrap_or(default).to_string()
    };
    let flag = |name: &str| attr(name, "false");

    let bounds = attr("bounds", "[0,0][0,0]");
    let rect = parse_bounds(&bounds);

    UiNode {
        index: element
            .attribute("index")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        text: attr("text", ""),
        resource_id: attr("resource-id", ""),
        class_name: attr("class", ""),
        package: attr("package", ""),
        content_desc: attr("content-desc", ""),
        checkable: flag("checkable"),
        checked: flag("checked"),
        clickable: flag("clickable"),
        enabled: flag("enabled"),
        focusable: flag("focusable"),
        focused: flag("focused"),
        scrollable: flag("scrollable"),
        long_clickable: flag("long-clickable"),
        password: flag("password"),
        selected: flag("selected"),
        rect,
        bounds,
        children: element
            .children()
            .filter(|child| child.is_element())
            .map(decode_element)
            .collect(),
    }
}
