//! Read-only views over raw schema nodes and their shape classification.
//!
//! A node is classified once into a [`Shape`] by an explicit, precedence-ordered match.
//! The builder then dispatches on the shape instead of probing keywords ad hoc.

use serde_json::{Map, Value};

use crate::types::Doc;

/// Keywords that describe structure the compiler cannot express in TypeScript.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if",
    "then",
    "else",
    "patternProperties",
    "dependentSchemas",
    "dependencies",
    "propertyNames",
    "contains",
    "$dynamicRef",
    "$recursiveRef",
    "unevaluatedProperties",
];

/// A borrowed schema node.
#[derive(Debug, Clone)]
pub struct SchemaNode<'a> {
    value: &'a Value,
}

/// Primitive `type` keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// `string`
    String,
    /// `number`
    Number,
    /// `integer`
    Integer,
    /// `boolean`
    Boolean,
    /// `null`
    Null,
}

/// Composition keywords present on a node.
#[derive(Debug, Clone, Copy, Default)]
pub struct Composition<'a> {
    /// `allOf` members.
    pub all_of: Option<&'a [Value]>,
    /// `oneOf` members.
    pub one_of: Option<&'a [Value]>,
    /// `anyOf` members.
    pub any_of: Option<&'a [Value]>,
    /// `not` schema.
    pub not: Option<&'a Value>,
}

impl Composition<'_> {
    /// No composition keyword is present.
    pub fn is_empty(&self) -> bool {
        self.all_of.is_none() && self.one_of.is_none() && self.any_of.is_none() && self.not.is_none()
    }
}

/// Object keywords.
#[derive(Debug, Clone, Copy)]
pub struct ObjectShape<'a> {
    /// `properties`, in document order.
    pub properties: Option<&'a Map<String, Value>>,
    /// `required` names; empty when absent.
    pub required: &'a [Value],
    /// `additionalProperties`.
    pub additional: Additional<'a>,
}

/// `additionalProperties` forms.
#[derive(Debug, Clone, Copy)]
pub enum Additional<'a> {
    /// Keyword absent.
    Absent,
    /// `false`: no extra keys.
    Forbidden,
    /// `true` or `{}`: extra keys of any type.
    Any,
    /// A schema for the extra values.
    Schema(&'a Value),
}

/// Array item forms.
#[derive(Debug, Clone, Copy)]
pub enum Items<'a> {
    /// No `items` keyword.
    Absent,
    /// One schema for every element.
    Single(&'a Value),
    /// A positional `items` list.
    Tuple(&'a [Value]),
}

/// Structural base of a node, independent of composition.
#[derive(Debug, Clone)]
pub enum Base<'a> {
    /// `type: object`, or object keywords without a `type`.
    Object(ObjectShape<'a>),
    /// `type: array`, or `items` without a `type`.
    Array(Items<'a>),
    /// A scalar `type`.
    Primitive(PrimitiveKind),
    /// A `type` list (OpenAPI 3.1), one base per entry.
    Multiple(Vec<Base<'a>>),
}

/// The classification of one node, in builder precedence order.
#[derive(Debug, Clone)]
pub enum Shape<'a> {
    /// `true` schema, `{}` or a node with annotations only.
    Any,
    /// `false` schema: nothing validates.
    Nothing,
    /// `$ref` edge.
    Reference(&'a str),
    /// `enum` list.
    Enumeration(&'a [Value]),
    /// `enum` together with a composition keyword.
    EnumerationWithComposition,
    /// `const` value.
    Constant(&'a Value),
    /// Composition keywords, optionally combined with a structural base.
    Composite {
        /// The composition keywords.
        composition: Composition<'a>,
        /// Structural keywords written next to them.
        base: Option<Base<'a>>,
    },
    /// A structural base alone.
    Structural(Base<'a>),
    /// Something the compiler does not understand; the string says what.
    Unsupported(String),
}

impl<'a> SchemaNode<'a> {
    /// View `value` as a schema.
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// The underlying document node.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    fn map(&self) -> Option<&'a Map<String, Value>> {
        self.value.as_object()
    }

    /// A keyword's value; `None` for missing keys and non-object nodes.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map().and_then(|m| m.get(key))
    }

    fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(Value::as_str)
    }

    fn get_array(&self, key: &str) -> Option<&'a [Value]> {
        self.get(key).and_then(Value::as_array).map(Vec::as_slice)
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The `$ref` string, if present.
    pub fn reference(&self) -> Option<&'a str> {
        self.get_str("$ref")
    }

    /// `nullable: true` (OpenAPI 3.0) or `x-nullable: true` (Swagger 2).
    pub fn is_nullable(&self) -> bool {
        self.flag("nullable") || self.flag("x-nullable")
    }

    /// `readOnly: true`.
    pub fn is_read_only(&self) -> bool {
        self.flag("readOnly")
    }

    /// `discriminator` as (property name, mapping) when present.
    pub fn discriminator(&self) -> Option<(&'a str, Option<&'a Map<String, Value>>)> {
        let disc = self.get("discriminator")?;
        // Swagger 2 uses a bare property name string.
        if let Some(name) = disc.as_str() {
            return Some((name, None));
        }
        let name = disc.get("propertyName").and_then(Value::as_str)?;
        Some((name, disc.get("mapping").and_then(Value::as_object)))
    }

    fn composition(&self) -> Composition<'a> {
        Composition {
            all_of: self.get_array("allOf"),
            one_of: self.get_array("oneOf"),
            any_of: self.get_array("anyOf"),
            not: self.get("not"),
        }
    }

    fn object_shape(&self) -> ObjectShape<'a> {
        let additional = match self.get("additionalProperties") {
            None => Additional::Absent,
            Some(Value::Bool(false)) => Additional::Forbidden,
            Some(Value::Bool(true)) => Additional::Any,
            Some(Value::Object(m)) if m.is_empty() => Additional::Any,
            Some(schema) => Additional::Schema(schema),
        };
        ObjectShape {
            properties: self.get("properties").and_then(Value::as_object),
            required: self.get_array("required").unwrap_or(&[]),
            additional,
        }
    }

    fn items(&self) -> Items<'a> {
        match self.get("items") {
            None => Items::Absent,
            Some(Value::Array(items)) => Items::Tuple(items),
            Some(item) => Items::Single(item),
        }
    }

    /// Structural base from `type`, or inferred from object/array keywords.
    ///
    /// `Err` carries the name of a `type` the compiler does not know.
    fn base(&self) -> Result<Option<Base<'a>>, String> {
        match self.get("type") {
            Some(Value::String(name)) => self.base_for(name).map(Some),
            Some(Value::Array(names)) => {
                let mut bases = Vec::with_capacity(names.len());
                for name in names {
                    let name = name.as_str().ok_or_else(|| name.to_string())?;
                    bases.push(self.base_for(name)?);
                }
                Ok(match bases.len() {
                    0 => None,
                    1 => bases.pop(),
                    _ => Some(Base::Multiple(bases)),
                })
            }
            Some(other) => Err(other.to_string()),
            None => {
                if self.get("properties").is_some() || self.get("additionalProperties").is_some() {
                    Ok(Some(Base::Object(self.object_shape())))
                } else if self.get("items").is_some() {
                    Ok(Some(Base::Array(self.items())))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn base_for(&self, name: &str) -> Result<Base<'a>, String> {
        Ok(match name {
            "object" => Base::Object(self.object_shape()),
            "array" => Base::Array(self.items()),
            "string" => Base::Primitive(PrimitiveKind::String),
            "number" => Base::Primitive(PrimitiveKind::Number),
            "integer" => Base::Primitive(PrimitiveKind::Integer),
            "boolean" => Base::Primitive(PrimitiveKind::Boolean),
            "null" => Base::Primitive(PrimitiveKind::Null),
            other => return Err(other.to_string()),
        })
    }

    /// Classify this node. Checked in order: boolean schemas, `$ref`, `enum`, `const`,
    /// composition, structural base, unsupported keywords, annotations only.
    pub fn shape(&self) -> Shape<'a> {
        let Some(map) = self.map() else {
            return match self.value {
                Value::Bool(true) => Shape::Any,
                Value::Bool(false) => Shape::Nothing,
                other => Shape::Unsupported(format!("schema must be an object, found `{other}`")),
            };
        };

        if let Some(reference) = self.reference() {
            return Shape::Reference(reference);
        }

        let composition = self.composition();

        if let Some(values) = self.get_array("enum") {
            if !composition.is_empty() {
                return Shape::EnumerationWithComposition;
            }
            return Shape::Enumeration(values);
        }

        if let Some(value) = map.get("const") {
            return Shape::Constant(value);
        }

        let base = match self.base() {
            Ok(base) => base,
            Err(name) => return Shape::Unsupported(format!("unknown type `{name}`")),
        };

        if !composition.is_empty() {
            return Shape::Composite { composition, base };
        }

        if let Some(base) = base {
            return Shape::Structural(base);
        }

        let unsupported: Vec<&str> = UNSUPPORTED_KEYWORDS
            .iter()
            .copied()
            .filter(|keyword| map.contains_key(*keyword))
            .collect();
        if !unsupported.is_empty() {
            return Shape::Unsupported(format!(
                "unsupported keyword(s): {}",
                unsupported.join(", ")
            ));
        }

        Shape::Any
    }

    /// JSDoc for this node: title/description plus annotation keywords.
    pub fn doc(&self) -> Option<Doc> {
        let map = self.map()?;
        let mut doc = Doc::default();

        if let Some(title) = self.get_str("title") {
            doc.summary.push(title.to_string());
        }
        if let Some(description) = self.get_str("description") {
            doc.summary
                .extend(description.lines().map(|line| line.trim_end().to_string()));
        }
        if self.flag("deprecated") {
            doc.tags.push(("deprecated".into(), String::new()));
        }
        for (keyword, tag) in [
            ("format", "format"),
            ("default", "default"),
            ("example", "example"),
            ("pattern", "pattern"),
            ("minimum", "minimum"),
            ("maximum", "maximum"),
            ("exclusiveMinimum", "exclusiveMinimum"),
            ("exclusiveMaximum", "exclusiveMaximum"),
            ("minLength", "minLength"),
            ("maxLength", "maxLength"),
            ("minItems", "minItems"),
            ("maxItems", "maxItems"),
        ] {
            if let Some(value) = map.get(keyword) {
                let rendered = match value {
                    Value::String(s) if keyword == "format" || keyword == "pattern" => s.clone(),
                    other => other.to_string(),
                };
                doc.tags.push((tag.into(), rendered));
            }
        }

        (!doc.is_empty()).then_some(doc)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shape_of(value: &Value) -> Shape<'_> {
        SchemaNode::new(value).shape()
    }

    #[test]
    fn test_ref_takes_precedence() {
        let node = json!({ "$ref": "#/definitions/Pet", "type": "string" });
        assert!(matches!(shape_of(&node), Shape::Reference("#/definitions/Pet")));
    }

    #[test]
    fn test_enum_before_type() {
        let node = json!({ "type": "integer", "enum": [1, 2, 3] });
        assert!(matches!(shape_of(&node), Shape::Enumeration(values) if values.len() == 3));
    }

    #[test]
    fn test_enum_with_composition_is_flagged() {
        let node = json!({ "enum": ["a"], "oneOf": [{ "type": "string" }] });
        assert!(matches!(shape_of(&node), Shape::EnumerationWithComposition));
    }

    #[test]
    fn test_composition_keeps_base() {
        let node = json!({
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "allOf": [{ "$ref": "#/definitions/Base" }]
        });
        match shape_of(&node) {
            Shape::Composite {
                composition,
                base: Some(Base::Object(object)),
            } => {
                assert_eq!(composition.all_of.map(<[Value]>::len), Some(1));
                assert!(object.properties.is_some());
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_object_inferred_from_keywords() {
        let node = json!({ "additionalProperties": false });
        assert!(matches!(
            shape_of(&node),
            Shape::Structural(Base::Object(ObjectShape {
                additional: Additional::Forbidden,
                ..
            }))
        ));
    }

    #[test]
    fn test_type_list() {
        let node = json!({ "type": ["string", "null"] });
        assert!(matches!(
            shape_of(&node),
            Shape::Structural(Base::Multiple(bases)) if bases.len() == 2
        ));
    }

    #[test]
    fn test_unknown_type_is_unsupported() {
        let node = json!({ "type": "file" });
        assert!(matches!(shape_of(&node), Shape::Unsupported(reason) if reason.contains("file")));
    }

    #[test]
    fn test_unsupported_keywords() {
        let node = json!({ "if": { "type": "string" }, "then": { "minLength": 1 } });
        assert!(matches!(shape_of(&node), Shape::Unsupported(reason) if reason.contains("if, then")));
    }

    #[test]
    fn test_annotation_only_is_any() {
        assert!(matches!(shape_of(&json!({ "description": "anything" })), Shape::Any));
        assert!(matches!(shape_of(&json!(true)), Shape::Any));
        assert!(matches!(shape_of(&json!(false)), Shape::Nothing));
    }

    #[test]
    fn test_nullable_flags() {
        assert!(SchemaNode::new(&json!({ "nullable": true })).is_nullable());
        assert!(SchemaNode::new(&json!({ "x-nullable": true })).is_nullable());
        assert!(!SchemaNode::new(&json!({ "nullable": false })).is_nullable());
    }

    #[test]
    fn test_doc_collects_metadata() {
        let node = json!({
            "description": "The pet name.\nMust be unique.",
            "format": "uuid",
            "deprecated": true,
            "maxLength": 36
        });
        let doc = SchemaNode::new(&node).doc().unwrap_or_default();
        assert_eq!(doc.summary, ["The pet name.", "Must be unique."]);
        assert_eq!(
            doc.tags,
            [
                ("deprecated".to_string(), String::new()),
                ("format".to_string(), "uuid".to_string()),
                ("maxLength".to_string(), "36".to_string()),
            ]
        );
    }
}
