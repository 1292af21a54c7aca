//! AutoJs6 code generation from a selected node.
//!
//! Builds chained selector expressions, named existence-check
//! functions, and small action scripts. Every literal inserted into
//! generated code goes through [`escape_js`], so the output is
//! syntactically valid JavaScript regardless of what the source tree
//! contains.

use crate::node::UiNode;

/// Escapes a string for inclusion in a double-quoted JS literal:
/// backslash, double quote, and newline are escaped; carriage returns
/// are dropped.
pub fn escape_js(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
}

/// Which attribute classes a selector may draw on. A field is used only
/// when it is both requested here and non-empty on the node.
#[derive(Debug, Clone, Copy)]
pub struct SelectorFields {
    pub id: bool,
    pub text: bool,
    pub desc: bool,
    pub class_name: bool,
}

impl Default for SelectorFields {
    fn default() -> Self {
        Self {
            id: true,
            text: true,
            desc: true,
            class_name: true,
        }
    }
}

/// Composes a chained selector expression in fixed order: id, text,
/// desc, className. Resource ids are reduced to their local name.
pub fn build_selector(node: &UiNode, fields: SelectorFields) -> String {
    let mut expr = String::from("selector()");
    if fields.id && !node.resource_id.is_empty() {
        expr.push_str(&format!(".id(\"{}\")", escape_js(node.local_id())));
    }
    if fields.text && !node.text.is_empty() {
        expr.push_str(&format!(".text(\"{}\")", escape_js(&node.text)));
    }
    if fields.desc && !node.content_desc.is_empty() {
        expr.push_str(&format!(".desc(\"{}\")", escape_js(&node.content_desc)));
    }
    if fields.class_name && !node.class_name.is_empty() {
        expr.push_str(&format!(".className(\"{}\")", escape_js(&node.class_name)));
    }
    expr
}

/// Derives a sanitized `exists_<name>` identifier for a node.
///
/// The base is taken from, in priority order: local resource id, text,
/// content description, short class name, then a positional
/// `node_<index>` fallback. Non-alphanumeric characters become
/// underscores and leading/trailing underscores are trimmed; an
/// all-symbol base also falls back to `node_<index>`, so the result is
/// never empty.
pub fn function_name(node: &UiNode) -> String {
    let base = if !node.resource_id.is_empty() {
        node.local_id().to_string()
    } else if !node.text.is_empty() {
        node.text.clone()
    } else if !node.content_desc.is_empty() {
        node.content_desc.clone()
    } else if !node.class_name.is_empty() {
        node.short_class().to_string()
    } else {
        format!("node_{}", node.index)
    };

    let sanitized: String = base
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect();
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        format!("exists_node_{}", node.index)
    } else {
        format!("exists_{trimmed}")
    }
}

/// Wraps a selector existence check in a named function.
pub fn build_exists_function(node: &UiNode, fields: SelectorFields) -> String {
    let name = function_name(node);
    let selector = build_selector(node, fields);
    format!("function {name}() {{\n    return {selector}.exists();\n}}\n")
}

/// How generated code looks a node up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Block until one match (`findOne()`).
    FindOne,
    /// Block until at least one match, act on all (`untilFind()`).
    UntilFind,
    /// Wait for appearance (`waitFor()`).
    WaitFor,
    /// Pure existence check (`exists()`).
    Exists,
}

/// Actions appended after the lookup. Any combination is allowed.
#[derive(Debug, Clone, Default)]
pub struct Actions {
    pub click: bool,
    pub long_click: bool,
    /// Text payload for `setText`; `None` omits the action.
    pub set_text: Option<String>,
    pub scroll_forward: bool,
    pub scroll_backward: bool,
}

impl Actions {
    pub fn any(&self) -> bool {
        self.click
            || self.long_click
            || self.set_text.is_some()
            || self.scroll_forward
            || self.scroll_backward
    }
}

/// Builds an action script for a node.
///
/// - `Exists` with no actions emits a bare `<selector>.exists();`.
/// - No mode and no actions emits the selector expression as a
///   statement - a minimal, inspectable fragment.
/// - Otherwise the selector is bound to a variable and one statement is
///   emitted per requested action; under `UntilFind` every match is
///   acted on via `forEach`. A missing mode with actions, or `Exists`
///   combined with actions, falls back to `findOne()`.
pub fn build_action_script(
    node: &UiNode,
    mode: Option<LookupMode>,
    actions: &Actions,
    fields: SelectorFields,
) -> String {
    let selector = build_selector(node, fields);

    if mode == Some(LookupMode::Exists) && !actions.any() {
        return format!("{selector}.exists();");
    }

    let method = match mode {
        Some(LookupMode::FindOne) => Some("findOne()"),
        Some(LookupMode::UntilFind) => Some("untilFind()"),
        Some(LookupMode::WaitFor) => Some("waitFor()"),
        Some(LookupMode::Exists) => Some("findOne()"),
        None => None,
    };

    let method = match method {
        Some(m) => m,
        None if !actions.any() => return format!("{selector};"),
        None => "findOne()",
    };

    let multi = mode == Some(LookupMode::UntilFind);
    let var = if multi { "nodes" } else { "w" };
    let mut lines = vec![format!("let {var} = {selector}.{method};")];

    let mut push_action = |call: String| {
        if multi {
            lines.push(format!("{var}.forEach(w => w.{call});"));
        } else {
            lines.push(format!("{var}.{call};"));
        }
    };

    if actions.click {
        push_action("click()".to_string());
    }
    if actions.long_click {
        push_action("longClick()".to_string());
    }
    if let Some(text) = &actions.set_text {
        push_action(format!("setText(\"{}\")", escape_js(text)));
    }
    if actions.scroll_forward {
        push_action("scrollForward()".to_string());
    }
    if actions.scroll_backward {
        push_action("scrollBackward()".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::blank_node;

    fn button_node() -> crate::node::UiNode {
        let mut node = blank_node();
        node.resource_id = "com.example.app:id/btn_ok".to_string();
        node.text = "OK".to_string();
        node.content_desc = "confirm".to_string();
        node.class_name = "android.widget.Button".to_string();
        node
    }

    #[test]
    fn selector_chains_in_fixed_order() {
        let expr = build_selector(&button_node(), SelectorFields::default());
        assert_eq!(
            expr,
            "selector().id(\"btn_ok\").text(\"OK\").desc(\"confirm\")\
             .className(\"android.widget.Button\")"
        );
    }

    #[test]
    fn selector_skips_unrequested_and_empty_fields() {
        let mut node = button_node();
        node.content_desc.clear();
        let fields = SelectorFields {
            text: false,
            ..SelectorFields::default()
        };
        assert_eq!(
            build_selector(&node, fields),
            "selector().id(\"btn_ok\").className(\"android.widget.Button\")"
        );
    }

    #[test]
    fn selector_for_bare_node_is_empty_chain() {
        assert_eq!(
            build_selector(&blank_node(), SelectorFields::default()),
            "selector()"
        );
    }

    #[test]
    fn escaping_never_leaks_quotes_or_backslashes() {
        let mut node = blank_node();
        node.text = "say \"hi\"\\there\nnow\r".to_string();
        let expr = build_selector(&node, SelectorFields::default());
        assert_eq!(
            expr,
            "selector().text(\"say \\\"hi\\\"\\\\there\\nnow\")"
        );
        // No raw quote, backslash, or newline survives unescaped.
        let literal = &expr["selector().text(\"".len()..expr.len() - 2];
        assert!(!literal.contains('\n'));
        assert!(!literal.contains('\r'));
    }

    #[test]
    fn function_name_priority_and_sanitization() {
        let mut node = button_node();
        assert_eq!(function_name(&node), "exists_btn_ok");

        node.resource_id.clear();
        node.text = "Sign in!".to_string();
        assert_eq!(function_name(&node), "exists_Sign_in");

        node.text.clear();
        assert_eq!(function_name(&node), "exists_confirm");

        node.content_desc.clear();
        assert_eq!(function_name(&node), "exists_Button");
    }

    #[test]
    fn function_name_never_empty() {
        let mut node = blank_node();
        node.index = 4;
        assert_eq!(function_name(&node), "exists_node_4");

        // All-symbol text sanitizes to nothing and falls back too.
        node.text = "!!!".to_string();
        assert_eq!(function_name(&node), "exists_node_4");
    }

    #[test]
    fn exists_function_wraps_selector() {
        let code = build_exists_function(&button_node(), SelectorFields::default());
        assert!(code.starts_with("function exists_btn_ok() {"));
        assert!(code.contains("return selector().id(\"btn_ok\")"));
        assert!(code.trim_end().ends_with(".exists();\n}"));
    }

    #[test]
    fn exists_mode_without_actions_is_terminal_call() {
        let code = build_action_script(
            &button_node(),
            Some(LookupMode::Exists),
            &Actions::default(),
            SelectorFields::default(),
        );
        assert!(code.ends_with(".exists();"));
        assert!(!code.contains("let "));
    }

    #[test]
    fn no_mode_no_actions_is_bare_selector_statement() {
        let code = build_action_script(
            &button_node(),
            None,
            &Actions::default(),
            SelectorFields::default(),
        );
        assert!(code.starts_with("selector()"));
        assert!(code.ends_with(';'));
        assert!(!code.contains("findOne"));
    }

    #[test]
    fn actions_without_mode_fall_back_to_find_one() {
        let actions = Actions {
            click: true,
            ..Actions::default()
        };
        let code = build_action_script(&button_node(), None, &actions, SelectorFields::default());
        assert!(code.contains(".findOne();"));
        assert!(code.contains("w.click();"));
    }

    #[test]
    fn until_find_applies_each_action_to_every_match() {
        let actions = Actions {
            click: true,
            set_text: Some("hello".to_string()),
            ..Actions::default()
        };
        let code = build_action_script(
            &button_node(),
            Some(LookupMode::UntilFind),
            &actions,
            SelectorFields::default(),
        );
        assert!(code.contains("let nodes = "));
        assert!(code.contains(".untilFind();"));
        assert!(code.contains("nodes.forEach(w => w.click());"));
        assert!(code.contains("nodes.forEach(w => w.setText(\"hello\"));"));
    }

    #[test]
    fn wait_for_binds_single_variable() {
        let actions = Actions {
            long_click: true,
            scroll_forward: true,
            scroll_backward: true,
            ..Actions::default()
        };
        let code = build_action_script(
            &button_node(),
            Some(LookupMode::WaitFor),
            &actions,
            SelectorFields::default(),
        );
        let lines: Vec<&str> = code.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("let w = "));
        assert!(lines[0].ends_with(".waitFor();"));
        assert_eq!(lines[1], "w.longClick();");
        assert_eq!(lines[2], "w.scrollForward();");
        assert_eq!(lines[3], "w.scrollBackward();");
    }

    #[test]
    fn set_text_payload_is_escaped() {
        let actions = Actions {
            set_text: Some("line1\n\"quoted\"".to_string()),
            ..Actions::default()
        };
        let code = build_action_script(
            &button_node(),
            Some(LookupMode::FindOne),
            &actions,
            SelectorFields::default(),
        );
        assert!(code.contains("w.setText(\"line1\\n\\\"quoted\\\"\");"));
    }
}
