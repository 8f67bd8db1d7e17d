//! Code synthesizer.
//!
//! Renders a [`Comparisons`] tree into the text of a generated module: a
//! `Diff` record type, its constructor, and one `compare_<type>` function
//! whose body mirrors the tree. Indentation is an explicit depth counter,
//! rendered only at emission time.
//!
//! Two path-rendering modes exist. Outside loops the diff-record path is an
//! inline array literal of the non-marker tokens seen so far. Inside map
//! and slice loops the outer key or index is only known at runtime, so the
//! path is built by appending to a carried `prefix` value instead
//! (`use_prefix` mode).
//!
//! Accessor expressions join field tokens with `.`; the `[pointer]` marker
//! renders as `.as_ref().unwrap()`, which is only ever emitted inside the
//! both-`Some` arm of the pointer guard.

use crate::tree::{Comparisons, Entry};
use crate::walker::{is_marker, Features, MAP, POINTER, SLICE};
use std::fmt::{self, Write};

/// Renders the complete generated file: header comment, import of the
/// compared type, the `Diff` record and helpers, and the comparison
/// function. `invocation` is echoed into the header so readers can
/// reproduce the file.
pub fn render_module(
    invocation: &str,
    type_name: &str,
    root: &Comparisons,
    features: Features,
    include_methods: bool,
) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(
        out,
        "// Code generated by \"diffgen {invocation}\"; DO NOT EDIT."
    )?;
    writeln!(out)?;
    writeln!(out, "use super::{type_name};")?;
    writeln!(out)?;
    writeln!(out, "/// One structural difference between two compared values.")?;
    writeln!(out, "#[derive(Debug, Clone, PartialEq, Eq)]")?;
    writeln!(out, "pub struct Diff {{")?;
    writeln!(out, "    pub path: Vec<String>,")?;
    writeln!(out, "    pub a: String,")?;
    writeln!(out, "    pub b: String,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(
        out,
        "fn mk_diff(path: &[String], a: impl std::fmt::Debug, b: impl std::fmt::Debug) -> Diff {{"
    )?;
    writeln!(out, "    Diff {{")?;
    writeln!(out, "        path: path.to_vec(),")?;
    writeln!(out, "        a: format!(\"{{:?}}\", a),")?;
    writeln!(out, "        b: format!(\"{{:?}}\", b),")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    if features.nested_loops {
        writeln!(
            out,
            "fn join_path(prefix: &[String], tail: &[String]) -> Vec<String> {{"
        )?;
        writeln!(out, "    let mut path = prefix.to_vec();")?;
        writeln!(out, "    path.extend_from_slice(tail);")?;
        writeln!(out, "    path")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "pub fn compare_{fn_name}(a: &{type_name}, b: &{type_name}) -> Vec<Diff> {{",
        fn_name = snake_case(type_name)
    )?;
    writeln!(out, "    let mut diff = Vec::new();")?;
    write_node(&mut out, root, 1, false, include_methods)?;
    writeln!(out, "    diff")?;
    writeln!(out, "}}")?;

    Ok(out)
}

/// Converts a CamelCase type name to the snake_case function suffix.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Accessor expression for `root` ("a" or "b", possibly rebound loop
/// locals) through the node's path tokens.
fn accessor(root: &str, path: &[String]) -> String {
    let mut out = root.to_string();
    for token in path {
        if token == POINTER {
            out.push_str(".as_ref().unwrap()");
        } else {
            out.push('.');
            out.push_str(token);
        }
    }
    out
}

/// The quoted static segments of a record path: every non-marker token,
/// plus an optional trailing field or method name, each rendered as a
/// `"name".to_string()` expression, plus an optional runtime-computed tail
/// such as `k.to_string()`.
fn path_segments(path: &[String], field: Option<&str>, runtime_tail: Option<&str>) -> Vec<String> {
    let mut segments: Vec<String> = path
        .iter()
        .filter(|token| !is_marker(token))
        .map(|token| format!("\"{token}\".to_string()"))
        .collect();
    if let Some(field) = field {
        segments.push(format!("\"{field}\".to_string()"));
    }
    if let Some(tail) = runtime_tail {
        segments.push(tail.to_string());
    }
    segments
}

/// Record-path expression handed to `mk_diff`, in either rendering mode.
fn path_expr(
    path: &[String],
    field: Option<&str>,
    runtime_tail: Option<&str>,
    use_prefix: bool,
) -> String {
    let segments = path_segments(path, field, runtime_tail);
    if use_prefix {
        if segments.is_empty() {
            "&prefix".to_string()
        } else {
            format!("&join_path(&prefix, &[{}])", segments.join(", "))
        }
    } else {
        format!("&[{}]", segments.join(", "))
    }
}

/// Seed expression for the carried `prefix` binding inside a loop body.
fn prefix_seed(path: &[String], runtime_tail: &str, use_prefix: bool) -> String {
    let segments = path_segments(path, None, Some(runtime_tail));
    if use_prefix {
        format!("join_path(&prefix, &[{}])", segments.join(", "))
    } else {
        format!("vec![{}]", segments.join(", "))
    }
}

fn write_node(
    out: &mut String,
    node: &Comparisons,
    depth: usize,
    use_prefix: bool,
    include_methods: bool,
) -> fmt::Result {
    let a = accessor("a", node.path());
    let b = accessor("b", node.path());

    for (token, entry) in node.entries() {
        match (token, entry) {
            (t, entry) if t == POINTER => {
                write_pointer(out, node, entry, &a, &b, depth, use_prefix, include_methods)?
            }
            (t, Entry::Leaf) if t == MAP => write_map_leaf(out, node, &a, &b, depth, use_prefix)?,
            (t, Entry::Subtree(child)) if t == MAP => {
                write_map_nested(out, node, child, &a, &b, depth, use_prefix, include_methods)?
            }
            (t, Entry::Leaf) if t == SLICE => {
                write_slice_leaf(out, node, &a, &b, depth, use_prefix)?
            }
            (t, Entry::Subtree(child)) if t == SLICE => {
                write_slice_nested(out, node, child, &a, &b, depth, use_prefix, include_methods)?
            }
            (field, Entry::Leaf) => write_scalar(out, node, field, &a, &b, depth, use_prefix)?,
            (_, Entry::Subtree(child)) => {
                // Aggregate-by-value fields diff field by field, no guard.
                write_node(out, child, depth, use_prefix, include_methods)?
            }
        }
    }

    if include_methods && !node.methods().is_empty() {
        write_methods(out, node, &b, depth, use_prefix)?;
    }

    Ok(())
}

/// Three-way pointer branch: exactly one record when one side is `None`,
/// recursion (or a direct value check for leaf pointees) when both are
/// `Some`, nothing when both are `None`.
#[allow(clippy::too_many_arguments)]
fn write_pointer(
    out: &mut String,
    node: &Comparisons,
    entry: &Entry,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
    include_methods: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path = path_expr(node.path(), None, None, use_prefix);

    writeln!(out, "{p}if {a}.is_none() && {b}.is_some() {{")?;
    writeln!(out, "{p}    diff.push(mk_diff({path}, &{a}, &{b}));")?;
    writeln!(out, "{p}}} else if {a}.is_some() && {b}.is_none() {{")?;
    writeln!(out, "{p}    diff.push(mk_diff({path}, &{a}, &{b}));")?;
    writeln!(out, "{p}}} else if {a}.is_some() && {b}.is_some() {{")?;
    match entry {
        Entry::Subtree(child) => {
            write_node(out, child, depth + 1, use_prefix, include_methods)?;
        }
        Entry::Leaf => {
            // Leaf pointee: compare the two present values directly.
            writeln!(out, "{p}    if {a} != {b} {{")?;
            writeln!(out, "{p}        diff.push(mk_diff({path}, &{a}, &{b}));")?;
            writeln!(out, "{p}    }}")?;
        }
    }
    writeln!(out, "{p}}}")
}

/// Leaf-valued map: two key passes. The old-side pass reports keys that are
/// missing or different in the new map; the new-side pass reports keys the
/// old map never had. A key present and equal on both sides reports
/// nothing.
fn write_map_leaf(
    out: &mut String,
    node: &Comparisons,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path_key = path_expr(node.path(), None, Some("k.to_string()"), use_prefix);

    writeln!(out, "{p}for (k, va) in {a}.iter() {{")?;
    writeln!(out, "{p}    if {b}.get(k) != Some(va) {{")?;
    writeln!(
        out,
        "{p}        diff.push(mk_diff({path_key}, &{a}.get(k), &{b}.get(k)));"
    )?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}}")?;
    writeln!(out, "{p}for k in {b}.keys() {{")?;
    writeln!(out, "{p}    if !{a}.contains_key(k) {{")?;
    writeln!(
        out,
        "{p}        diff.push(mk_diff({path_key}, &{a}.get(k), &{b}.get(k)));"
    )?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}}")
}

/// Aggregate-valued map: the same two passes, but keys present on both
/// sides rebind `a`/`b` to the mapped values, seed the runtime `prefix`,
/// and recurse into the value subtree.
#[allow(clippy::too_many_arguments)]
fn write_map_nested(
    out: &mut String,
    node: &Comparisons,
    child: &Comparisons,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
    include_methods: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path_key = path_expr(node.path(), None, Some("k.to_string()"), use_prefix);
    let seed = prefix_seed(node.path(), "k.to_string()", use_prefix);

    writeln!(out, "{p}for (k, va) in {a}.iter() {{")?;
    writeln!(out, "{p}    if let Some(vb) = {b}.get(k) {{")?;
    writeln!(out, "{p}        let a = va;")?;
    writeln!(out, "{p}        let b = vb;")?;
    writeln!(out, "{p}        let prefix = {seed};")?;
    write_node(out, child, depth + 2, true, include_methods)?;
    writeln!(out, "{p}    }} else {{")?;
    writeln!(
        out,
        "{p}        diff.push(mk_diff({path_key}, &{a}.get(k), &{b}.get(k)));"
    )?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}}")?;
    writeln!(out, "{p}for k in {b}.keys() {{")?;
    writeln!(out, "{p}    if !{a}.contains_key(k) {{")?;
    writeln!(
        out,
        "{p}        diff.push(mk_diff({path_key}, &{a}.get(k), &{b}.get(k)));"
    )?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}}")
}

/// Leaf-valued slice: a length mismatch reports one whole-sequence record;
/// equal lengths report one record per differing index.
fn write_slice_leaf(
    out: &mut String,
    node: &Comparisons,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path = path_expr(node.path(), None, None, use_prefix);
    let path_idx = path_expr(node.path(), None, Some("i.to_string()"), use_prefix);

    writeln!(out, "{p}if {a}.len() == {b}.len() {{")?;
    writeln!(out, "{p}    for i in 0..{a}.len() {{")?;
    writeln!(out, "{p}        if {a}[i] != {b}[i] {{")?;
    writeln!(
        out,
        "{p}            diff.push(mk_diff({path_idx}, &{a}[i], &{b}[i]));"
    )?;
    writeln!(out, "{p}        }}")?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}} else {{")?;
    writeln!(out, "{p}    diff.push(mk_diff({path}, &{a}, &{b}));")?;
    writeln!(out, "{p}}}")
}

/// Aggregate-valued slice: same length policy, with per-index rebinding and
/// recursion into the element subtree.
#[allow(clippy::too_many_arguments)]
fn write_slice_nested(
    out: &mut String,
    node: &Comparisons,
    child: &Comparisons,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
    include_methods: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path = path_expr(node.path(), None, None, use_prefix);
    let seed = prefix_seed(node.path(), "i.to_string()", use_prefix);

    writeln!(out, "{p}if {a}.len() == {b}.len() {{")?;
    writeln!(out, "{p}    for i in 0..{a}.len() {{")?;
    writeln!(out, "{p}        let a = &{a}[i];")?;
    writeln!(out, "{p}        let b = &{b}[i];")?;
    writeln!(out, "{p}        let prefix = {seed};")?;
    write_node(out, child, depth + 2, true, include_methods)?;
    writeln!(out, "{p}    }}")?;
    writeln!(out, "{p}}} else {{")?;
    writeln!(out, "{p}    diff.push(mk_diff({path}, &{a}, &{b}));")?;
    writeln!(out, "{p}}}")
}

fn write_scalar(
    out: &mut String,
    node: &Comparisons,
    field: &str,
    a: &str,
    b: &str,
    depth: usize,
    use_prefix: bool,
) -> fmt::Result {
    let p = indent(depth);
    let path = path_expr(node.path(), Some(field), None, use_prefix);

    writeln!(out, "{p}if {a}.{field} != {b}.{field} {{")?;
    writeln!(
        out,
        "{p}    diff.push(mk_diff({path}, &{a}.{field}, &{b}.{field}));"
    )?;
    writeln!(out, "{p}}}")
}

/// Methods have no prior-state counterpart, so each is reported as an
/// unconditional addition whenever the new side is reachable.
fn write_methods(
    out: &mut String,
    node: &Comparisons,
    b: &str,
    depth: usize,
    use_prefix: bool,
) -> fmt::Result {
    let p = indent(depth);

    writeln!(out, "{p}if {b}.is_some() {{")?;
    for method in node.methods() {
        let path = path_expr(node.path(), Some(method), None, use_prefix);
        writeln!(
            out,
            "{p}    diff.push(mk_diff({path}, &None::<()>, &{b}.as_ref().unwrap().{method}()));"
        )?;
    }
    writeln!(out, "{p}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tree_of(paths: &[&[&str]]) -> Comparisons {
        let mut root = Comparisons::new();
        for path in paths {
            let owned: Vec<String> = path.iter().map(|t| t.to_string()).collect();
            root.add(&owned);
        }
        root
    }

    fn render_body(root: &Comparisons, include_methods: bool) -> String {
        let mut out = String::new();
        write_node(&mut out, root, 0, false, include_methods).unwrap();
        out
    }

    #[test]
    fn snake_case_handles_camel_case_names() {
        assert_eq!(snake_case("Order"), "order");
        assert_eq!(snake_case("OrderItem"), "order_item");
        assert_eq!(snake_case("Account2Fa"), "account2_fa");
    }

    #[test]
    fn accessor_rewrites_pointer_markers_as_unwraps() {
        let path = vec![
            "shipping".to_string(),
            "[pointer]".to_string(),
            "city".to_string(),
        ];
        assert_eq!(accessor("a", &path), "a.shipping.as_ref().unwrap().city");
        assert_eq!(accessor("b", &[]), "b");
    }

    #[test]
    fn scalar_fields_emit_in_insertion_order() {
        let root = tree_of(&[&["id"], &["total"]]);
        let body = render_body(&root, false);

        let expected = indoc::indoc! {r#"
                if a.id != b.id {
                    diff.push(mk_diff(&["id".to_string()], &a.id, &b.id));
                }
                if a.total != b.total {
                    diff.push(mk_diff(&["total".to_string()], &a.total, &b.total));
                }
        "#};
        assert_eq!(body, expected);
    }

    #[test]
    fn pointer_emits_three_way_branch_with_nested_recursion() {
        let root = tree_of(&[&["shipping", "[pointer]", "city"]]);
        let body = render_body(&root, false);

        assert!(body.contains("if a.shipping.is_none() && b.shipping.is_some() {"));
        assert!(body.contains("} else if a.shipping.is_some() && b.shipping.is_none() {"));
        assert!(body.contains("} else if a.shipping.is_some() && b.shipping.is_some() {"));
        assert!(body
            .contains("if a.shipping.as_ref().unwrap().city != b.shipping.as_ref().unwrap().city"));
        // The record path never contains structural markers.
        assert!(!body.contains("[pointer]"));
    }

    #[test]
    fn leaf_pointer_compares_present_values_directly() {
        let root = tree_of(&[&["discount", "[pointer]"]]);
        let body = render_body(&root, false);

        assert!(body.contains("} else if a.discount.is_some() && b.discount.is_some() {"));
        assert!(body.contains("    if a.discount != b.discount {"));
    }

    #[test]
    fn leaf_slice_emits_length_check_and_index_loop() {
        let root = tree_of(&[&["tags", "[slice]"]]);
        let body = render_body(&root, false);

        let expected = indoc::indoc! {r#"
                if a.tags.len() == b.tags.len() {
                    for i in 0..a.tags.len() {
                        if a.tags[i] != b.tags[i] {
                            diff.push(mk_diff(&["tags".to_string(), i.to_string()], &a.tags[i], &b.tags[i]));
                        }
                    }
                } else {
                    diff.push(mk_diff(&["tags".to_string()], &a.tags, &b.tags));
                }
        "#};
        assert_eq!(body, expected);
    }

    #[test]
    fn leaf_map_emits_two_key_passes() {
        let root = tree_of(&[&["meta", "[map]"]]);
        let body = render_body(&root, false);

        assert!(body.contains("for (k, va) in a.meta.iter() {"));
        assert!(body.contains("if b.meta.get(k) != Some(va) {"));
        assert!(body.contains("for k in b.meta.keys() {"));
        assert!(body.contains("if !a.meta.contains_key(k) {"));
        assert!(body.contains("\"meta\".to_string(), k.to_string()"));
    }

    #[test]
    fn nested_slice_rebinds_and_carries_prefix() {
        let root = tree_of(&[&["lines", "[slice]", "qty"]]);
        let body = render_body(&root, false);

        assert!(body.contains("let a = &a.lines[i];"));
        assert!(body.contains("let b = &b.lines[i];"));
        assert!(body.contains("let prefix = vec![\"lines\".to_string(), i.to_string()];"));
        assert!(body.contains("mk_diff(&join_path(&prefix, &[\"qty\".to_string()]), &a.qty, &b.qty)"));
    }

    #[test]
    fn nested_map_recurses_for_shared_keys_and_reports_the_rest() {
        let root = tree_of(&[&["attrs", "[map]", "name"]]);
        let body = render_body(&root, false);

        assert!(body.contains("if let Some(vb) = b.attrs.get(k) {"));
        assert!(body.contains("let prefix = vec![\"attrs\".to_string(), k.to_string()];"));
        assert!(body.contains("mk_diff(&join_path(&prefix, &[\"name\".to_string()]), &a.name, &b.name)"));
        assert!(body.contains("for k in b.attrs.keys() {"));
    }

    #[test]
    fn aggregate_by_value_recurses_without_a_guard() {
        let root = tree_of(&[&["addr", "city"]]);
        let body = render_body(&root, false);

        let expected = indoc::indoc! {r#"
                if a.addr.city != b.addr.city {
                    diff.push(mk_diff(&["addr".to_string(), "city".to_string()], &a.addr.city, &b.addr.city));
                }
        "#};
        assert_eq!(body, expected);
    }

    #[test]
    fn methods_emit_guarded_additions_only_when_enabled() {
        let root = tree_of(&[
            &["shipping", "[pointer]", "city"],
            &["shipping", "[method]", "zip"],
        ]);

        let without = render_body(&root, false);
        assert!(!without.contains("zip()"));

        let with = render_body(&root, true);
        assert!(with.contains("if b.shipping.is_some() {"));
        assert!(with.contains(
            "mk_diff(&[\"shipping\".to_string(), \"zip\".to_string()], &None::<()>, &b.shipping.as_ref().unwrap().zip())"
        ));
    }

    #[test]
    fn render_module_wraps_function_and_gates_join_path() {
        let root = tree_of(&[&["id"]]);
        let out = render_module("--type Order .", "Order", &root, Features::default(), false)
            .unwrap();

        assert!(out.starts_with("// Code generated by \"diffgen --type Order .\"; DO NOT EDIT."));
        assert!(out.contains("use super::Order;"));
        assert!(out.contains("pub struct Diff {"));
        assert!(out.contains("pub fn compare_order(a: &Order, b: &Order) -> Vec<Diff> {"));
        assert!(!out.contains("fn join_path"));

        let nested = Features {
            nested_loops: true,
            ..Features::default()
        };
        let out = render_module("--type Order .", "Order", &root, nested, false).unwrap();
        assert!(out.contains("fn join_path(prefix: &[String], tail: &[String]) -> Vec<String> {"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let paths: &[&[&str]] = &[
            &["id"],
            &["shipping", "[pointer]", "city"],
            &["tags", "[slice]"],
            &["meta", "[map]"],
            &["lines", "[slice]", "qty"],
        ];
        let first = render_module(
            "--type Order .",
            "Order",
            &tree_of(paths),
            Features {
                uses_map: true,
                uses_slice: true,
                nested_loops: true,
                has_methods: false,
            },
            false,
        )
        .unwrap();
        let second = render_module(
            "--type Order .",
            "Order",
            &tree_of(paths),
            Features {
                uses_map: true,
                uses_slice: true,
                nested_loops: true,
                has_methods: false,
            },
            false,
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn generated_module_parses_as_rust() {
        let root = tree_of(&[
            &["id"],
            &["shipping", "[pointer]", "city"],
            &["discount", "[pointer]"],
            &["tags", "[slice]"],
            &["meta", "[map]"],
            &["lines", "[slice]", "qty"],
            &["attrs", "[map]", "name"],
        ]);
        let out = render_module(
            "--type Order .",
            "Order",
            &root,
            Features {
                uses_map: true,
                uses_slice: true,
                nested_loops: true,
                has_methods: false,
            },
            false,
        )
        .unwrap();

        syn::parse_file(&out).expect("generated module should be valid Rust");
    }
}
