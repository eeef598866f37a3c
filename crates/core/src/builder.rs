//! Schema node → TypeScript type expression.
//!
//! The builder recurses through a node's shape, following `$ref` edges through the
//! [`PointerIndex`]. References to declarations become named references; references
//! that re-enter the current resolution path promote their target to a declaration.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::{CompileError, Warning, WarningKind};
use crate::naming::NameTable;
use crate::pointer::Pointer;
use crate::resolver::PointerIndex;
use crate::schema::{Additional, Base, Composition, Items, ObjectShape, PrimitiveKind, SchemaNode, Shape};
use crate::types::{IndexSignature, TsLiteral, TsMember, TsPrimitive, TsProp, TsType};

type BuildResult = Result<TsType, CompileError>;

/// Converts schema nodes of one document into [`TsType`] trees.
#[derive(Debug)]
pub struct TypeBuilder<'i, 'a> {
    index: &'i PointerIndex<'a>,
    /// Declaration names; a pointer with a name is a declaration.
    pub(crate) names: NameTable,
    /// Pointers promoted to declarations, because a cycle reached them or because a
    /// compound type would otherwise be inlined more than once.
    pub(crate) promoted: Vec<Pointer>,
    pub(crate) warnings: Vec<Warning>,
    /// Types already built for `$ref` targets that are not declarations.
    built: HashMap<Pointer, TsType>,
}

impl<'i, 'a> TypeBuilder<'i, 'a> {
    /// A builder over `index` whose declarations are already named in `names`.
    pub fn new(index: &'i PointerIndex<'a>, names: NameTable) -> Self {
        Self {
            index,
            names,
            promoted: Vec::new(),
            warnings: Vec::new(),
            built: HashMap::new(),
        }
    }

    /// The pointer index references are resolved against.
    pub fn index(&self) -> &'i PointerIndex<'a> {
        self.index
    }

    /// Build the type for the declaration rooted at `at`.
    pub fn build_root(&mut self, node: &'a Value, at: &Pointer) -> BuildResult {
        let mut path = vec![at.clone()];
        self.build(node, at, &mut path)
    }

    /// Build the type of `node`, located at `at`, while `path` holds the pointers
    /// currently being expanded through `$ref` edges.
    pub fn build(&mut self, node: &'a Value, at: &Pointer, path: &mut Vec<Pointer>) -> BuildResult {
        let schema = SchemaNode::new(node);
        let shape = schema.shape();
        trace!(at = %at, "Building type.");

        let mut choice_has_null = false;
        let ty = match shape {
            Shape::Any => TsType::unknown(),
            Shape::Nothing => TsType::Primitive(TsPrimitive::Never),
            Shape::Reference(reference) => self.build_ref(reference, at, path)?,
            Shape::Enumeration(values) => self.build_enum(values, at),
            Shape::EnumerationWithComposition => self.ambiguous(
                at,
                "`enum` combined with a composition keyword has no agreed meaning",
            ),
            Shape::Constant(value) => self.literal(value, at),
            Shape::Composite { composition, base } => {
                let (ty, has_null) =
                    self.build_composite(&schema, &composition, base.as_ref(), at, path)?;
                choice_has_null = has_null;
                ty
            }
            Shape::Structural(base) => self.build_base(&base, at, path)?,
            Shape::Unsupported(reason) => self.unsupported(at, reason),
        };

        if !schema.is_nullable() {
            return Ok(ty);
        }
        if choice_has_null {
            return Ok(self.ambiguous(
                at,
                "`nullable` combined with a `oneOf`/`anyOf` that already allows null",
            ));
        }
        Ok(TsType::union(vec![ty, TsType::null()]))
    }

    /// Follow a `$ref` edge written at `at`.
    pub fn build_ref(&mut self, reference: &str, at: &Pointer, path: &mut Vec<Pointer>) -> BuildResult {
        let index = self.index;
        let resolved = index.resolve(reference, at, path)?;

        if let Some(name) = self.names.get(resolved.pointer) {
            return Ok(TsType::Ref(name.to_string()));
        }
        if resolved.is_cycle {
            return Ok(TsType::Ref(self.promote(resolved.pointer, "cycle")));
        }
        if let Some(ty) = self.built.get(resolved.pointer) {
            if ty.is_simple() {
                return Ok(ty.clone());
            }
            return Ok(TsType::Ref(self.promote(resolved.pointer, "reuse")));
        }

        path.push(resolved.pointer.clone());
        let ty = self.build(resolved.node, resolved.pointer, path);
        path.pop();
        let ty = ty?;
        self.built.insert(resolved.pointer.clone(), ty.clone());
        Ok(ty)
    }

    /// Make `pointer` a declaration of its own and return its name.
    fn promote(&mut self, pointer: &Pointer, reason: &'static str) -> String {
        let name = self.names.assign(pointer, pointer.last().unwrap_or("Schema"));
        debug!(pointer = %pointer, name = %name, reason, "Promoted reference target to a declaration.");
        self.promoted.push(pointer.clone());
        name
    }

    fn build_each(
        &mut self,
        nodes: &'a [Value],
        at: &Pointer,
        path: &mut Vec<Pointer>,
    ) -> Result<Vec<TsType>, CompileError> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| self.build(node, &at.child(i.to_string()), path))
            .collect()
    }

    fn build_enum(&mut self, values: &'a [Value], at: &Pointer) -> TsType {
        let members = values.iter().map(|value| self.literal(value, at)).collect();
        TsType::union(members)
    }

    fn literal(&mut self, value: &Value, at: &Pointer) -> TsType {
        match value {
            Value::Null => TsType::null(),
            Value::Bool(b) => TsType::Literal(TsLiteral::Bool(*b)),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => TsType::Literal(TsLiteral::Int(i)),
                (None, Some(f)) => TsType::Literal(TsLiteral::Number(f)),
                (None, None) => TsType::Primitive(TsPrimitive::Number),
            },
            Value::String(s) => TsType::Literal(TsLiteral::String(s.clone())),
            Value::Array(_) | Value::Object(_) => {
                self.unsupported(at, "non-scalar literal values have no TypeScript literal form")
            }
        }
    }

    fn build_composite(
        &mut self,
        schema: &SchemaNode<'a>,
        composition: &Composition<'a>,
        base: Option<&Base<'a>>,
        at: &Pointer,
        path: &mut Vec<Pointer>,
    ) -> Result<(TsType, bool), CompileError> {
        let mut parts = Vec::new();
        if let Some(base) = base {
            parts.push(self.build_base(base, at, path)?);
        }
        if let Some(all_of) = composition.all_of {
            let members = self.build_each(all_of, &at.child("allOf"), path)?;
            parts.push(TsType::intersection(members));
        }

        let mut has_null = false;
        for (keyword, members) in [("oneOf", composition.one_of), ("anyOf", composition.any_of)] {
            let Some(members) = members else { continue };
            let choice = self.build_choice(schema, members, &at.child(keyword), path)?;
            has_null |= choice.includes_null();
            parts.push(choice);
        }

        if composition.not.is_some() {
            parts.push(self.unsupported(at, "`not` has no TypeScript equivalent"));
        }

        Ok((TsType::intersection(parts), has_null))
    }

    /// `oneOf`/`anyOf` members, tagged with their discriminator value when one is declared.
    fn build_choice(
        &mut self,
        schema: &SchemaNode<'a>,
        members: &'a [Value],
        at: &Pointer,
        path: &mut Vec<Pointer>,
    ) -> BuildResult {
        let Some((property, mapping)) = schema.discriminator() else {
            return Ok(TsType::union(self.build_each(members, at, path)?));
        };

        let mut types = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let ty = self.build(member, &at.child(i.to_string()), path)?;
            let tag = SchemaNode::new(member)
                .reference()
                .and_then(|reference| discriminator_value(reference, mapping));
            match tag {
                Some(tag) => {
                    let tag_prop = TsProp::new(property, TsType::Literal(TsLiteral::String(tag)), false);
                    types.push(TsType::Intersection(vec![
                        TsType::Object(vec![TsMember::Property(tag_prop)]),
                        ty,
                    ]));
                }
                None => types.push(ty),
            }
        }
        Ok(TsType::union(types))
    }

    fn build_base(&mut self, base: &Base<'a>, at: &Pointer, path: &mut Vec<Pointer>) -> BuildResult {
        match base {
            Base::Primitive(kind) => Ok(match kind {
                PrimitiveKind::String => TsType::Primitive(TsPrimitive::String),
                PrimitiveKind::Number | PrimitiveKind::Integer => TsType::Primitive(TsPrimitive::Number),
                PrimitiveKind::Boolean => TsType::Primitive(TsPrimitive::Boolean),
                PrimitiveKind::Null => TsType::null(),
            }),
            Base::Array(items) => {
                let item = match items {
                    Items::Absent => TsType::unknown(),
                    Items::Single(node) => self.build(*node, &at.child("items"), path)?,
                    Items::Tuple(nodes) => TsType::union(self.build_each(*nodes, &at.child("items"), path)?),
                };
                Ok(TsType::Array(Box::new(item)))
            }
            Base::Object(object) => self.build_object(object, at, path),
            Base::Multiple(bases) => {
                let mut types = Vec::with_capacity(bases.len());
                for base in bases {
                    types.push(self.build_base(base, at, path)?);
                }
                Ok(TsType::union(types))
            }
        }
    }

    fn build_object(&mut self, object: &ObjectShape<'a>, at: &Pointer, path: &mut Vec<Pointer>) -> BuildResult {
        let required: HashSet<&str> = object.required.iter().filter_map(Value::as_str).collect();
        let mut members = Vec::new();
        let mut property_types = Vec::new();
        let mut any_optional = false;

        if let Some(properties) = object.properties {
            let properties_at = at.child("properties");
            for (name, node) in properties {
                let ty = self.build(node, &properties_at.child(name.as_str()), path)?;
                let schema = SchemaNode::new(node);
                let optional = !required.contains(name.as_str());
                any_optional |= optional;
                property_types.push(ty.clone());

                let mut prop = TsProp::new(name.as_str(), ty, optional);
                prop.readonly = schema.is_read_only();
                prop.doc = schema.doc();
                members.push(TsMember::Property(prop));
            }
        }

        let additional = match object.additional {
            Additional::Absent | Additional::Forbidden => None,
            Additional::Any => Some(TsType::unknown()),
            Additional::Schema(node) => Some(self.build(node, &at.child("additionalProperties"), path)?),
        };
        if let Some(value) = additional {
            members.push(TsMember::Index(IndexSignature {
                key: TsType::Primitive(TsPrimitive::String),
                value: widen_index_value(value, property_types, any_optional),
            }));
        }

        Ok(TsType::Object(members))
    }

    fn unsupported(&mut self, at: &Pointer, reason: impl Into<String>) -> TsType {
        let reason = reason.into();
        self.warn(WarningKind::UnsupportedShape, at, &reason);
        TsType::Unknown(Some(reason))
    }

    fn ambiguous(&mut self, at: &Pointer, reason: &str) -> TsType {
        self.warn(WarningKind::AmbiguousShape, at, reason);
        TsType::Unknown(Some(reason.to_string()))
    }

    pub(crate) fn warn(&mut self, kind: WarningKind, at: &Pointer, message: &str) {
        warn!(pointer = %at, kind = %kind, "{message}");
        self.warnings.push(Warning::at(kind, at, message));
    }
}

/// An index signature must admit every named property's type.
fn widen_index_value(value: TsType, property_types: Vec<TsType>, any_optional: bool) -> TsType {
    if property_types.is_empty() || matches!(value, TsType::Unknown(_)) {
        return value;
    }
    let mut types = vec![value];
    types.extend(property_types);
    if any_optional {
        types.push(TsType::Primitive(TsPrimitive::Undefined));
    }
    TsType::union(types)
}

/// The tag value for a `$ref` member: an explicit mapping entry, else the schema name.
fn discriminator_value(reference: &str, mapping: Option<&Map<String, Value>>) -> Option<String> {
    let schema_name = Pointer::parse_ref(reference)?.last()?.to_string();
    let Some(mapping) = mapping else {
        return Some(schema_name);
    };
    mapping
        .iter()
        .find(|(_, target)| {
            target
                .as_str()
                .is_some_and(|target| target == reference || target == schema_name)
        })
        .map(|(value, _)| value.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string() -> TsType {
        TsType::Primitive(TsPrimitive::String)
    }

    fn number() -> TsType {
        TsType::Primitive(TsPrimitive::Number)
    }

    /// Build `#/definitions/<name>` with every definition registered as a declaration.
    fn build_definition(doc: &Value, name: &str) -> (TsType, Vec<Warning>) {
        let index = PointerIndex::build(doc);
        let mut names = NameTable::default();
        if let Some(definitions) = doc.get("definitions").and_then(Value::as_object) {
            for key in definitions.keys() {
                names.assign(&Pointer::from_segments(["definitions", key.as_str()]), key);
            }
        }
        let mut builder = TypeBuilder::new(&index, names);
        let at = Pointer::from_segments(["definitions", name]);
        let node = index.get(&at).unwrap();
        let ty = builder.build_root(node, &at).unwrap();
        (ty, builder.warnings)
    }

    fn prop(ty: &TsType, name: &str) -> TsProp {
        let TsType::Object(members) = ty else {
            panic!("expected object, found {ty:?}");
        };
        members
            .iter()
            .find_map(|member| match member {
                TsMember::Property(prop) if prop.name == name => Some(prop.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_required_and_optional_properties() {
        let doc = json!({ "definitions": { "Pet": {
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": { "type": "integer", "readOnly": true },
                "name": { "type": "string" }
            }
        }}});
        let (ty, warnings) = build_definition(&doc, "Pet");
        let id = prop(&ty, "id");
        assert!(!id.optional);
        assert!(id.readonly);
        assert_eq!(id.ty, number());
        assert!(prop(&ty, "name").optional);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_nullable_and_enum() {
        let doc = json!({ "definitions": {
            "Name": { "type": "string", "nullable": true },
            "Level": { "type": "integer", "enum": [1, 2, 3] },
            "Legacy": { "type": "string", "x-nullable": true }
        }});
        assert_eq!(build_definition(&doc, "Name").0, TsType::Union(vec![string(), TsType::null()]));
        assert_eq!(
            build_definition(&doc, "Level").0,
            TsType::Union(vec![
                TsType::Literal(TsLiteral::Int(1)),
                TsType::Literal(TsLiteral::Int(2)),
                TsType::Literal(TsLiteral::Int(3)),
            ])
        );
        assert!(build_definition(&doc, "Legacy").0.includes_null());
    }

    #[test]
    fn test_reference_to_declaration_is_named() {
        let doc = json!({ "definitions": {
            "Pet": { "type": "object", "properties": { "owner": { "$ref": "#/definitions/Owner" } } },
            "Owner": { "type": "string" }
        }});
        let (ty, _) = build_definition(&doc, "Pet");
        assert_eq!(prop(&ty, "owner").ty, TsType::Ref("Owner".into()));
    }

    #[test]
    fn test_reference_to_inline_node_is_expanded() {
        let doc = json!({ "definitions": {
            "Pet": { "type": "object", "properties": {
                "tag": { "type": "string" },
                "alias": { "$ref": "#/definitions/Pet/properties/tag" }
            }}
        }});
        let (ty, _) = build_definition(&doc, "Pet");
        assert_eq!(prop(&ty, "alias").ty, string());
    }

    #[test]
    fn test_cycle_through_inline_nodes_promotes_target() {
        let doc = json!({ "definitions": {
            "Tree": { "type": "object", "properties": {
                "node": { "type": "object", "properties": {
                    "children": { "type": "array", "items": { "$ref": "#/definitions/Tree/properties/node" } }
                }},
                "root": { "$ref": "#/definitions/Tree/properties/node" }
            }}
        }});
        let index = PointerIndex::build(&doc);
        let mut names = NameTable::default();
        let at = Pointer::from_segments(["definitions", "Tree"]);
        names.assign(&at, "Tree");
        let mut builder = TypeBuilder::new(&index, names);
        let ty = builder.build_root(index.get(&at).unwrap(), &at).unwrap();

        let node = Pointer::from_segments(["definitions", "Tree", "properties", "node"]);
        assert_eq!(builder.promoted, [node.clone()]);
        assert_eq!(builder.names.get(&node), Some("Node"));

        let mut refs = Vec::new();
        ty.for_each_ref(&mut |name| refs.push(name.to_string()));
        assert!(refs.contains(&"Node".to_string()));
    }

    #[test]
    fn test_reused_inline_target_is_promoted_once() {
        let doc = json!({ "definitions": {
            "Pair": { "type": "object", "properties": {
                "left": { "$ref": "#/definitions/Pair/properties/shared" },
                "right": { "$ref": "#/definitions/Pair/properties/shared" },
                "label": { "$ref": "#/definitions/Pair/properties/name" },
                "title": { "$ref": "#/definitions/Pair/properties/name" },
                "shared": { "type": "object", "properties": { "id": { "type": "string" } } },
                "name": { "type": "string" }
            }}
        }});
        let index = PointerIndex::build(&doc);
        let mut names = NameTable::default();
        let at = Pointer::from_segments(["definitions", "Pair"]);
        names.assign(&at, "Pair");
        let mut builder = TypeBuilder::new(&index, names);
        let ty = builder.build_root(index.get(&at).unwrap(), &at).unwrap();

        // The first use is inlined; later uses name the promoted declaration.
        assert!(matches!(prop(&ty, "left").ty, TsType::Object(_)));
        assert_eq!(prop(&ty, "right").ty, TsType::Ref("Shared".into()));
        // Simple types are repeated instead of promoted.
        assert_eq!(prop(&ty, "label").ty, string());
        assert_eq!(prop(&ty, "title").ty, string());
        assert_eq!(
            builder.promoted,
            [Pointer::from_segments(["definitions", "Pair", "properties", "shared"])]
        );
    }

    #[test]
    fn test_unresolved_reference_is_fatal() {
        let doc = json!({ "definitions": { "Pet": { "$ref": "#/definitions/Missing" } } });
        let index = PointerIndex::build(&doc);
        let mut builder = TypeBuilder::new(&index, NameTable::default());
        let at = Pointer::from_segments(["definitions", "Pet"]);
        let err = builder.build_root(index.get(&at).unwrap(), &at).unwrap_err();
        assert_eq!(err.pointer(), Some(&at));
    }

    #[test]
    fn test_composition() {
        let doc = json!({ "definitions": {
            "Base": { "type": "object", "properties": { "id": { "type": "string" } } },
            "Both": { "allOf": [{ "$ref": "#/definitions/Base" }, { "type": "object", "properties": { "x": { "type": "number" } } }] },
            "Either": { "oneOf": [{ "type": "string" }, { "type": "number" }] }
        }});
        let (both, _) = build_definition(&doc, "Both");
        assert!(matches!(&both, TsType::Intersection(parts) if parts[0] == TsType::Ref("Base".into())));
        assert_eq!(build_definition(&doc, "Either").0, TsType::Union(vec![string(), number()]));
    }

    #[test]
    fn test_discriminator_tags_members() {
        let doc = json!({ "definitions": {
            "Pet": {
                "oneOf": [{ "$ref": "#/definitions/Dog" }, { "$ref": "#/definitions/Cat" }],
                "discriminator": { "propertyName": "kind", "mapping": { "dog": "#/definitions/Dog" } }
            },
            "Dog": { "type": "object" },
            "Cat": { "type": "object" }
        }});
        let (ty, _) = build_definition(&doc, "Pet");
        let TsType::Union(members) = ty else { panic!("expected union") };
        let TsType::Intersection(parts) = &members[0] else { panic!("expected tagged member") };
        assert_eq!(prop(&parts[0], "kind").ty, TsType::Literal(TsLiteral::String("dog".into())));
        assert_eq!(members[1], TsType::Ref("Cat".into()));
    }

    #[test]
    fn test_additional_properties_widen_index_signature() {
        let doc = json!({ "definitions": {
            "Counts": {
                "type": "object",
                "properties": { "total": { "type": "string" } },
                "additionalProperties": { "type": "number" }
            },
            "Closed": { "type": "object", "additionalProperties": false },
            "Open": { "type": "object", "additionalProperties": true }
        }});
        let (counts, _) = build_definition(&doc, "Counts");
        let TsType::Object(members) = counts else { panic!("expected object") };
        assert_eq!(
            members[1],
            TsMember::Index(IndexSignature {
                key: string(),
                value: TsType::Union(vec![number(), string(), TsType::Primitive(TsPrimitive::Undefined)]),
            })
        );
        assert_eq!(build_definition(&doc, "Closed").0, TsType::Object(vec![]));
        assert!(matches!(
            build_definition(&doc, "Open").0,
            TsType::Object(members) if matches!(&members[0], TsMember::Index(index) if index.value == TsType::unknown())
        ));
    }

    #[test]
    fn test_unsupported_shapes_degrade_with_warnings() {
        let doc = json!({ "definitions": {
            "NotString": { "not": { "type": "string" } },
            "Conditional": { "if": { "type": "string" }, "then": { "minLength": 1 } },
            "Both": { "enum": ["a"], "anyOf": [{ "type": "string" }] },
            "DoubleNull": { "nullable": true, "anyOf": [{ "type": "string" }, { "type": "null" }] }
        }});
        for (name, kind) in [
            ("NotString", WarningKind::UnsupportedShape),
            ("Conditional", WarningKind::UnsupportedShape),
            ("Both", WarningKind::AmbiguousShape),
            ("DoubleNull", WarningKind::AmbiguousShape),
        ] {
            let (ty, warnings) = build_definition(&doc, name);
            assert!(matches!(ty, TsType::Unknown(Some(_))), "{name}: {ty:?}");
            assert_eq!(warnings.len(), 1, "{name}");
            assert_eq!(warnings[0].kind, kind);
        }
    }

    #[test]
    fn test_tuple_and_type_lists() {
        let doc = json!({ "definitions": {
            "Pair": { "type": "array", "items": [{ "type": "string" }, { "type": "number" }] },
            "MaybeName": { "type": ["string", "null"] },
            "Anything": true,
            "Nothing": false
        }});
        assert_eq!(
            build_definition(&doc, "Pair").0,
            TsType::Array(Box::new(TsType::Union(vec![string(), number()])))
        );
        assert_eq!(build_definition(&doc, "MaybeName").0, TsType::Union(vec![string(), TsType::null()]));
        assert_eq!(build_definition(&doc, "Anything").0, TsType::unknown());
        assert_eq!(build_definition(&doc, "Nothing").0, TsType::Primitive(TsPrimitive::Never));
    }

    #[test]
    fn test_discriminator_value_lookup() {
        let mapping = json!({ "good": "#/components/schemas/GoodBoy", "cat": "Cat" });
        let mapping = mapping.as_object();
        assert_eq!(
            discriminator_value("#/components/schemas/GoodBoy", mapping).as_deref(),
            Some("good")
        );
        assert_eq!(discriminator_value("#/components/schemas/Cat", mapping).as_deref(), Some("cat"));
        assert_eq!(discriminator_value("#/components/schemas/Fish", mapping), None);
        assert_eq!(discriminator_value("#/components/schemas/Fish", None).as_deref(), Some("Fish"));
    }
}
