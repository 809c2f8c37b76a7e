//! Text rendering of a step tree.

use std::fmt::Write as _;

use crate::traversal::Traversal;

const INDENT: usize = 2;

pub(crate) fn write_traversal(traversal: &Traversal, out: &mut String, depth: usize) {
    let pad = " ".repeat(depth * INDENT);
    if traversal.is_empty() {
        writeln!(out, "{pad}identity()").unwrap();
        return;
    }
    for step in traversal.steps() {
        write!(out, "{pad}{step}").unwrap();
        for label in &step.labels {
            write!(out, " @{label}").unwrap();
        }
        out.push('\n');
        for (role, child) in step.children_with_roles() {
            writeln!(out, "{pad}{}{role}:", " ".repeat(INDENT)).unwrap();
            write_traversal(child, out, depth + 2);
        }
    }
}
