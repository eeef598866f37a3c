//! TypeScript text emission via the Emit trait, and the printer entry point.
//!
//! Each IR type implements `Emit`. Nested object types are emitted over several lines
//! with two-space indentation so the output reads well even without a formatter.

use std::path::Path;

use tracing::debug;

use crate::format::{Formatter, PostProcessingError};
use crate::naming::{escape_ts_string, quote_if_needed};
use crate::types::{Declaration, DeclarationKind, Doc, IndexSignature, TsLiteral, TsMember, TsPrimitive, TsProp, TsType};

/// First lines of every generated file.
pub const BANNER: &str = "/**\n * This file was auto-generated by oats.\n * Do not make direct changes to the file.\n */\n";

/// Trait for emitting TypeScript code from IR nodes.
pub trait Emit {
    /// Convert the node to its TypeScript string representation.
    fn emit(&self) -> String;
}

impl Emit for TsPrimitive {
    fn emit(&self) -> String {
        match self {
            TsPrimitive::String => "string",
            TsPrimitive::Number => "number",
            TsPrimitive::Boolean => "boolean",
            TsPrimitive::Never => "never",
            TsPrimitive::Undefined => "undefined",
        }
        .to_string()
    }
}

impl Emit for TsLiteral {
    fn emit(&self) -> String {
        match self {
            TsLiteral::String(s) => format!("\"{}\"", escape_ts_string(s)),
            TsLiteral::Number(n) => n.to_string(),
            TsLiteral::Int(i) => i.to_string(),
            TsLiteral::Bool(b) => b.to_string(),
            TsLiteral::Null => "null".to_string(),
        }
    }
}

impl Emit for TsType {
    fn emit(&self) -> String {
        self.emit_indented(0)
    }
}

impl TsType {
    /// Emit with nested object members indented one level deeper than `indent`.
    pub fn emit_indented(&self, indent: usize) -> String {
        match self {
            TsType::Primitive(p) => p.emit(),
            TsType::Literal(lit) => lit.emit(),
            TsType::Ref(name) => name.clone(),
            TsType::Unknown(None) => "unknown".to_string(),
            TsType::Unknown(Some(note)) => format!("unknown /* {} */", note.replace("*/", "*\\/")),
            TsType::Array(inner) => {
                let inner_str = inner.emit_indented(indent);
                // Wrap complex types in parentheses
                if matches!(**inner, TsType::Union(_) | TsType::Intersection(_)) {
                    format!("({inner_str})[]")
                } else {
                    format!("{inner_str}[]")
                }
            }
            TsType::Union(types) => types
                .iter()
                .map(|t| t.emit_indented(indent))
                .collect::<Vec<_>>()
                .join(" | "),
            TsType::Intersection(types) => types
                .iter()
                .map(|t| {
                    let s = t.emit_indented(indent);
                    if matches!(t, TsType::Union(_)) {
                        format!("({s})")
                    } else {
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(" & "),
            TsType::Object(members) => {
                if members.is_empty() {
                    return "{}".to_string();
                }
                let mut output = "{\n".to_string();
                for member in members {
                    output.push_str(&member.emit_indented(indent + 1));
                }
                output.push_str(&"  ".repeat(indent));
                output.push('}');
                output
            }
        }
    }
}

impl TsMember {
    /// Emit one member line (with its JSDoc) at `indent`.
    pub fn emit_indented(&self, indent: usize) -> String {
        match self {
            TsMember::Property(prop) => prop.emit_indented(indent),
            TsMember::Index(index) => index.emit_indented(indent),
        }
    }
}

impl TsProp {
    /// Emit the property line, preceded by its JSDoc, at `indent`.
    pub fn emit_indented(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let readonly = if self.readonly { "readonly " } else { "" };
        let opt = if self.optional { "?" } else { "" };
        format!(
            "{}{prefix}{readonly}{}{opt}: {};\n",
            emit_doc(self.doc.as_ref(), indent),
            quote_if_needed(&self.name),
            self.ty.emit_indented(indent),
        )
    }
}

impl IndexSignature {
    /// Emit `[key: K]: V;` at `indent`.
    pub fn emit_indented(&self, indent: usize) -> String {
        format!(
            "{}[key: {}]: {};\n",
            "  ".repeat(indent),
            self.key.emit_indented(indent),
            self.value.emit_indented(indent),
        )
    }
}

impl Emit for Doc {
    fn emit(&self) -> String {
        emit_doc(Some(self), 0)
    }
}

/// JSDoc block for `doc`, or nothing when there is no documentation.
fn emit_doc(doc: Option<&Doc>, indent: usize) -> String {
    let Some(doc) = doc.filter(|doc| !doc.is_empty()) else {
        return String::new();
    };
    let prefix = "  ".repeat(indent);
    let mut lines: Vec<String> = doc.summary.iter().map(|line| escape_comment(line)).collect();
    lines.extend(doc.tags.iter().map(|(tag, value)| {
        if value.is_empty() {
            format!("@{tag}")
        } else {
            format!("@{tag} {}", escape_comment(value))
        }
    }));

    if let [line] = lines.as_slice() {
        return format!("{prefix}/** {line} */\n");
    }
    let mut output = format!("{prefix}/**\n");
    for line in &lines {
        if line.is_empty() {
            output.push_str(&format!("{prefix} *\n"));
        } else {
            output.push_str(&format!("{prefix} * {line}\n"));
        }
    }
    output.push_str(&format!("{prefix} */\n"));
    output
}

fn escape_comment(text: &str) -> String {
    text.replace("*/", "*\\/")
}

impl Emit for Declaration {
    fn emit(&self) -> String {
        let mut output = emit_doc(self.doc.as_ref(), 0);
        match &self.ty {
            TsType::Object(members) => {
                output.push_str(&format!("export interface {} {{\n", self.name));
                for member in members {
                    output.push_str(&member.emit_indented(1));
                }
                output.push_str("}\n");
            }
            ty => output.push_str(&format!("export type {} = {};\n", self.name, ty.emit())),
        }
        output
    }
}

/// Printer settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions<'p> {
    /// Omit API-operation wrapper declarations.
    pub raw_schema: bool,
    /// Style configuration forwarded to the formatter; `None` lets it search.
    pub style_config: Option<&'p Path>,
}

/// Render `declarations` into one buffer and pass it through `formatter`.
///
/// On formatter failure the error carries the complete unformatted text.
pub fn print(
    declarations: &[Declaration],
    options: &PrintOptions<'_>,
    formatter: &dyn Formatter,
) -> Result<String, PostProcessingError> {
    let mut text = String::from(BANNER);
    let mut printed = 0;
    for declaration in declarations {
        if options.raw_schema && declaration.kind == DeclarationKind::ApiWrapper {
            continue;
        }
        text.push('\n');
        text.push_str(&declaration.emit());
        printed += 1;
    }
    debug!(declarations = printed, bytes = text.len(), formatter = ?formatter, "Printed declarations.");

    match formatter.format(&text, options.style_config) {
        Ok(formatted) => Ok(formatted),
        Err(source) => Err(PostProcessingError {
            source,
            unformatted: text,
        }),
    }
}
