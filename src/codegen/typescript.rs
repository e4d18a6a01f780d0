//! TypeScript Declaration Emitter
//!
//! Renders a `.d.ts` in the style of json-schema-to-typescript: the root is an
//! exported interface (or type alias for non-object roots) and nested objects
//! are written inline.

use super::names::is_ts_identifier;
use super::{FieldShape, ScalarKind, TypeShape};

const INDENT: &str = "  ";

/// Emit a declaration file for `shape` rooted at `name`
pub fn emit(shape: &TypeShape, name: &str) -> String {
    match shape {
        TypeShape::Object { fields, open } => {
            format!("export interface {} {}\n", name, render_object(fields, *open, 0))
        }
        other => format!("export type {} = {};\n", name, render(other, 0)),
    }
}

fn render(shape: &TypeShape, depth: usize) -> String {
    match shape {
        TypeShape::Scalar(kind) => scalar(*kind).to_string(),
        TypeShape::Any => "unknown".to_string(),
        TypeShape::Array(inner) => {
            let rendered = render(inner, depth);
            if is_multi_member_union(inner) {
                format!("({})[]", rendered)
            } else {
                format!("{}[]", rendered)
            }
        }
        TypeShape::Object { fields, open } => render_object(fields, *open, depth),
        TypeShape::Union(variants) => {
            let mut members: Vec<String> = Vec::new();
            for v in variants {
                let r = render(v, depth);
                if !members.contains(&r) {
                    members.push(r);
                }
            }
            members.join(" | ")
        }
    }
}

fn render_object(fields: &[FieldShape], open: bool, depth: usize) -> String {
    if fields.is_empty() && !open {
        return "{}".to_string();
    }
    let pad = INDENT.repeat(depth + 1);
    let mut out = String::from("{\n");
    for field in fields {
        let key = if is_ts_identifier(&field.json_name) {
            field.json_name.clone()
        } else {
            format!("{:?}", field.json_name)
        };
        let optional = if field.required { "" } else { "?" };
        out.push_str(&format!(
            "{}{}{}: {};\n",
            pad,
            key,
            optional,
            render(&field.shape, depth + 1)
        ));
    }
    if open {
        out.push_str(&format!("{}[k: string]: unknown;\n", pad));
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
    out
}

fn scalar(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "string",
        ScalarKind::Integer | ScalarKind::Number => "number",
        ScalarKind::Boolean => "boolean",
        ScalarKind::Null => "null",
    }
}

fn is_multi_member_union(shape: &TypeShape) -> bool {
    match shape {
        TypeShape::Union(variants) => {
            let mut seen: Vec<String> = Vec::new();
            for v in variants {
                let r = render(v, 0);
                if !seen.contains(&r) {
                    seen.push(r);
                }
            }
            seen.len() > 1
        }
        _ => false,
    }
}
