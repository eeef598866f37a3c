//! Declaration assembly.
//!
//! Decides which pointers become exported types, names them, builds their bodies
//! through the [`TypeBuilder`] and orders the result by document traversal order.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::builder::TypeBuilder;
use crate::error::{CompileError, Warning, WarningKind};
use crate::naming::{NameTable, to_pascal_case};
use crate::pointer::Pointer;
use crate::resolver::PointerIndex;
use crate::schema::SchemaNode;
use crate::types::{Declaration, DeclarationKind, Doc, TsMember, TsPrimitive, TsProp, TsType};

/// Name of the declaration tying paths and methods to operation declarations.
pub const API_WRAPPER_NAME: &str = "paths";

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// Parameter groups, in output order.
const PARAMETER_LOCATIONS: &[&str] = &["path", "query", "header", "cookie", "formData"];

/// Document dialect, decided once per compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Swagger 2.0: `definitions`, `responses`, `parameters`.
    Swagger2,
    /// OpenAPI 3.x: `components/*`.
    OpenApi3,
}

impl SchemaVersion {
    /// Read the `swagger` / `openapi` field of an API document.
    pub fn detect(document: &Value) -> Result<Self, CompileError> {
        let unrecognized = |reason: String| CompileError::UnrecognizedDocument {
            at: Pointer::root(),
            reason,
        };
        let Some(root) = document.as_object() else {
            return Err(unrecognized("the document root must be an object".into()));
        };

        if let Some(field) = root.get("swagger") {
            return match version_text(field) {
                Some(text) if text.starts_with("2.") || text == "2" => Ok(Self::Swagger2),
                _ => Err(unrecognized(format!("unsupported swagger version {field}"))),
            };
        }
        if let Some(field) = root.get("openapi") {
            return match version_text(field) {
                Some(text) if text.starts_with("3.") || text == "3" => Ok(Self::OpenApi3),
                _ => Err(unrecognized(format!("unsupported openapi version {field}"))),
            };
        }
        Err(unrecognized(
            "no `openapi` or `swagger` field; compile it as a raw schema with an explicit version"
                .into(),
        ))
    }

    /// The dialect for an explicit raw-schema version number.
    pub fn from_number(version: u8) -> Result<Self, CompileError> {
        match version {
            2 => Ok(Self::Swagger2),
            3 => Ok(Self::OpenApi3),
            version => Err(CompileError::UnsupportedVersion { version }),
        }
    }

    /// Where this dialect keeps named schemas. In a raw schema document the top-level
    /// keys play that role, so `$ref`s under this prefix resolve against the root.
    pub fn schemas_prefix(self) -> Pointer {
        match self {
            Self::Swagger2 => Pointer::from_segments(["definitions"]),
            Self::OpenApi3 => Pointer::from_segments(["components", "schemas"]),
        }
    }
}

fn version_text(field: &Value) -> Option<String> {
    match field {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Declarations of one document plus the warnings raised while building them.
#[derive(Debug)]
pub struct Assembly {
    /// Declarations in output order.
    pub declarations: Vec<Declaration>,
    /// Recoverable problems, in the order they were found.
    pub warnings: Vec<Warning>,
}

/// How a non-schema object (response, request body, parameter) yields its type.
#[derive(Debug, Clone, Copy)]
enum ObjectKind {
    Response,
    RequestBody,
    Parameter,
}

#[derive(Debug)]
enum Candidate<'a> {
    Component {
        pointer: Pointer,
        node: &'a Value,
        kind: DeclarationKind,
        name: String,
    },
    Operation(Box<OperationPlan<'a>>),
}

#[derive(Debug)]
struct OperationPlan<'a> {
    path: String,
    method: &'static str,
    doc: Option<Doc>,
    parameters: Vec<ParameterPlan<'a>>,
    /// Pointer and name of the `<Op>Parameters` declaration, when there are parameters.
    parameters_decl: Option<(Pointer, String)>,
    body: Option<BodyPlan<'a>>,
    responses: Vec<ResponsePlan<'a>>,
}

impl OperationPlan<'_> {
    fn parameters_required(&self) -> bool {
        self.parameters.iter().any(|parameter| parameter.required)
    }
}

#[derive(Debug)]
struct ParameterPlan<'a> {
    name: String,
    location: String,
    required: bool,
    /// Where the parameter (or its `$ref`) is written.
    at: Pointer,
    node: &'a Value,
    doc: Option<Doc>,
}

#[derive(Debug)]
struct BodyPlan<'a> {
    at: Pointer,
    node: &'a Value,
    kind: ObjectKind,
    required: bool,
    doc: Option<Doc>,
    pointer: Pointer,
    name: String,
}

#[derive(Debug)]
struct ResponsePlan<'a> {
    status: String,
    at: Pointer,
    node: &'a Value,
    doc: Option<Doc>,
    name: String,
}

/// Collect, name and build every declaration of an indexed document.
///
/// In raw schema mode only the named schemas are declared; otherwise operations and
/// the `paths` wrapper are added.
pub fn assemble(
    index: &PointerIndex<'_>,
    version: SchemaVersion,
    raw_schema: bool,
) -> Result<Assembly, CompileError> {
    // Declaration names are PascalCase, so none can clash with the lowercase wrapper name.
    let mut names = NameTable::default();

    let mut candidates = Vec::new();
    for (pointer, node) in index.iter() {
        if let Some(kind) = component_kind(pointer, version, raw_schema) {
            let name = names.assign(pointer, pointer.last().unwrap_or_default());
            candidates.push(Candidate::Component {
                pointer: pointer.clone(),
                node,
                kind,
                name,
            });
        } else if !raw_schema && let Some(method) = operation_method(pointer) {
            let plan = plan_operation(index, &mut names, version, pointer, node, method)?;
            candidates.push(Candidate::Operation(Box::new(plan)));
        }
    }
    debug!(candidates = candidates.len(), "Selected declaration candidates.");

    let mut assembler = Assembler {
        builder: TypeBuilder::new(index, names),
        version,
    };
    let mut declarations = Vec::new();
    for candidate in &candidates {
        match candidate {
            Candidate::Component {
                pointer,
                node,
                kind,
                name,
            } => {
                let ty = assembler.component(*kind, pointer, *node)?;
                trace!(name = %name, pointer = %pointer, "Built declaration.");
                declarations.push(Declaration {
                    name: name.clone(),
                    pointer: pointer.clone(),
                    kind: *kind,
                    ty,
                    doc: SchemaNode::new(*node).doc(),
                });
            }
            Candidate::Operation(plan) => assembler.operation(plan, &mut declarations)?,
        }
    }

    assembler.build_promoted(&mut declarations)?;

    if !raw_schema {
        let operations: Vec<&OperationPlan<'_>> = candidates
            .iter()
            .filter_map(|candidate| match candidate {
                Candidate::Operation(plan) => Some(plan.as_ref()),
                Candidate::Component { .. } => None,
            })
            .collect();
        declarations.push(api_wrapper(&operations));
    }

    verify_closure(&declarations)?;
    debug!(declarations = declarations.len(), "Assembled declarations.");

    Ok(Assembly {
        declarations,
        warnings: assembler.builder.warnings,
    })
}

/// Every named reference must match a declaration.
pub fn verify_closure(declarations: &[Declaration]) -> Result<(), CompileError> {
    let declared: HashSet<&str> = declarations.iter().map(|decl| decl.name.as_str()).collect();
    for declaration in declarations {
        let mut dangling = None;
        declaration.ty.for_each_ref(&mut |name| {
            if dangling.is_none() && !declared.contains(name) {
                dangling = Some(name.to_string());
            }
        });
        if let Some(name) = dangling {
            return Err(CompileError::DanglingReference {
                name,
                at: declaration.pointer.clone(),
            });
        }
    }
    Ok(())
}

fn component_kind(pointer: &Pointer, version: SchemaVersion, raw_schema: bool) -> Option<DeclarationKind> {
    if raw_schema {
        return (pointer.depth() == 1).then_some(DeclarationKind::Schema);
    }
    match (version, pointer.segments()) {
        (SchemaVersion::OpenApi3, [root, section, _]) if root == "components" => {
            match section.as_str() {
                "schemas" => Some(DeclarationKind::Schema),
                "responses" => Some(DeclarationKind::Response),
                "requestBodies" => Some(DeclarationKind::RequestBody),
                "parameters" => Some(DeclarationKind::Parameter),
                _ => None,
            }
        }
        (SchemaVersion::Swagger2, [section, _]) => match section.as_str() {
            "definitions" => Some(DeclarationKind::Schema),
            "responses" => Some(DeclarationKind::Response),
            "parameters" => Some(DeclarationKind::Parameter),
            _ => None,
        },
        _ => None,
    }
}

fn operation_method(pointer: &Pointer) -> Option<&'static str> {
    match pointer.segments() {
        [root, _, method] if root == "paths" => HTTP_METHODS
            .iter()
            .copied()
            .find(|candidate| *candidate == method.as_str()),
        _ => None,
    }
}

/// Follow `$ref` chains on a non-schema object to the object itself.
fn deref<'a>(index: &PointerIndex<'a>, at: &Pointer, node: &'a Value) -> Result<&'a Value, CompileError> {
    let mut at = at.clone();
    let mut node = node;
    let mut seen = Vec::new();
    while let Some(reference) = SchemaNode::new(node).reference() {
        seen.push(at.clone());
        let resolved = index.resolve(reference, &at, &seen)?;
        if resolved.is_cycle {
            return Err(CompileError::UnresolvedReference {
                reference: reference.to_string(),
                at,
            });
        }
        at = resolved.pointer.clone();
        node = resolved.node;
    }
    Ok(node)
}

fn plan_operation<'a>(
    index: &PointerIndex<'a>,
    names: &mut NameTable,
    version: SchemaVersion,
    pointer: &Pointer,
    node: &'a Value,
    method: &'static str,
) -> Result<OperationPlan<'a>, CompileError> {
    let path = pointer.get(1).unwrap_or_default().to_string();
    let op_name = match node.get("operationId").and_then(Value::as_str) {
        Some(id) => to_pascal_case(id),
        None => to_pascal_case(&format!("{method} {path}")),
    };

    // Path-level parameters first; operation-level ones override by (name, in).
    let mut parameters: Vec<ParameterPlan<'a>> = Vec::new();
    let mut body = None;
    let lists = [
        pointer.parent().map(|item| item.child("parameters")),
        Some(pointer.child("parameters")),
    ];
    for list_at in lists.into_iter().flatten() {
        let Some(list) = index.get(&list_at).and_then(Value::as_array) else {
            continue;
        };
        for (i, written) in list.iter().enumerate() {
            let at = list_at.child(i.to_string());
            let resolved = deref(index, &at, written)?;
            let location = resolved.get("in").and_then(Value::as_str).unwrap_or_default();
            let required = resolved.get("required").and_then(Value::as_bool).unwrap_or(false);
            let doc = SchemaNode::new(resolved).doc();

            if location == "body" {
                body = Some((at, written, ObjectKind::Parameter, required, doc));
                continue;
            }
            let name = resolved.get("name").and_then(Value::as_str).unwrap_or_default();
            parameters.retain(|parameter| !(parameter.name == name && parameter.location == location));
            parameters.push(ParameterPlan {
                name: name.to_string(),
                location: location.to_string(),
                required,
                at,
                node: written,
                doc,
            });
        }
    }

    if version == SchemaVersion::OpenApi3
        && let Some(written) = node.get("requestBody")
    {
        let at = pointer.child("requestBody");
        let resolved = deref(index, &at, written)?;
        let required = resolved.get("required").and_then(Value::as_bool).unwrap_or(false);
        let doc = SchemaNode::new(resolved).doc();
        body = Some((at, written, ObjectKind::RequestBody, required, doc));
    }

    let parameters_decl = (!parameters.is_empty()).then(|| {
        let at = pointer.child("parameters");
        let name = names.assign(&at, &format!("{op_name} Parameters"));
        (at, name)
    });

    let body = body.map(|(at, written, kind, required, doc)| {
        let decl_pointer = pointer.child("requestBody");
        let name = names.assign(&decl_pointer, &format!("{op_name} RequestBody"));
        BodyPlan {
            at,
            node: written,
            kind,
            required,
            doc,
            pointer: decl_pointer,
            name,
        }
    });

    let mut responses = Vec::new();
    if let Some(map) = node.get("responses").and_then(Value::as_object) {
        let responses_at = pointer.child("responses");
        for (status, written) in map {
            if status.starts_with("x-") {
                continue;
            }
            let at = responses_at.child(status.as_str());
            let resolved = deref(index, &at, written)?;
            let name = names.assign(&at, &format!("{op_name} {status} Response"));
            responses.push(ResponsePlan {
                status: status.clone(),
                at,
                node: written,
                doc: SchemaNode::new(resolved).doc(),
                name,
            });
        }
    }

    trace!(operation = %op_name, method, path = %path, "Planned operation.");
    Ok(OperationPlan {
        path,
        method,
        doc: operation_doc(node),
        parameters,
        parameters_decl,
        body,
        responses,
    })
}

fn operation_doc(node: &Value) -> Option<Doc> {
    let mut doc = Doc::default();
    for key in ["summary", "description"] {
        if let Some(text) = node.get(key).and_then(Value::as_str) {
            doc.summary.extend(text.lines().map(|line| line.trim_end().to_string()));
        }
    }
    if node.get("deprecated").and_then(Value::as_bool) == Some(true) {
        doc.tags.push(("deprecated".into(), String::new()));
    }
    (!doc.is_empty()).then_some(doc)
}

#[derive(Debug)]
struct Assembler<'i, 'a> {
    builder: TypeBuilder<'i, 'a>,
    version: SchemaVersion,
}

impl<'a> Assembler<'_, 'a> {
    fn component(&mut self, kind: DeclarationKind, pointer: &Pointer, node: &'a Value) -> Result<TsType, CompileError> {
        match kind {
            DeclarationKind::Response => self.object_type(pointer, node, ObjectKind::Response),
            DeclarationKind::RequestBody => self.object_type(pointer, node, ObjectKind::RequestBody),
            DeclarationKind::Parameter => self.object_type(pointer, node, ObjectKind::Parameter),
            _ => self.builder.build_root(node, pointer),
        }
    }

    fn operation(&mut self, plan: &OperationPlan<'a>, out: &mut Vec<Declaration>) -> Result<(), CompileError> {
        if let Some((pointer, name)) = &plan.parameters_decl {
            let ty = self.parameters_type(plan)?;
            out.push(Declaration {
                name: name.clone(),
                pointer: pointer.clone(),
                kind: DeclarationKind::OperationParameters,
                ty,
                doc: None,
            });
        }

        if let Some(body) = &plan.body {
            let ty = self.object_type(&body.at, body.node, body.kind)?;
            out.push(Declaration {
                name: body.name.clone(),
                pointer: body.pointer.clone(),
                kind: DeclarationKind::OperationRequestBody,
                ty,
                doc: body.doc.clone(),
            });
        }

        for response in &plan.responses {
            let ty = self.object_type(&response.at, response.node, ObjectKind::Response)?;
            out.push(Declaration {
                name: response.name.clone(),
                pointer: response.at.clone(),
                kind: DeclarationKind::OperationResponse,
                ty,
                doc: response.doc.clone(),
            });
        }
        Ok(())
    }

    /// `{ path: {..}; query?: {..}; ... }`; a group is optional unless a member is required.
    fn parameters_type(&mut self, plan: &OperationPlan<'a>) -> Result<TsType, CompileError> {
        let mut groups: IndexMap<&str, (Vec<TsMember>, bool)> = PARAMETER_LOCATIONS
            .iter()
            .map(|location| (*location, (Vec::new(), false)))
            .collect();

        for parameter in &plan.parameters {
            if !groups.contains_key(parameter.location.as_str()) {
                self.builder.warn(
                    WarningKind::UnsupportedShape,
                    &parameter.at,
                    &format!("unknown parameter location `{}`", parameter.location),
                );
                continue;
            }
            let ty = self.object_type(&parameter.at, parameter.node, ObjectKind::Parameter)?;
            if let Some((members, required)) = groups.get_mut(parameter.location.as_str()) {
                *required |= parameter.required;
                let mut prop = TsProp::new(parameter.name.as_str(), ty, !parameter.required);
                prop.doc = parameter.doc.clone();
                members.push(TsMember::Property(prop));
            }
        }

        let members = groups
            .into_iter()
            .filter(|(_, (members, _))| !members.is_empty())
            .map(|(location, (members, required))| {
                TsMember::Property(TsProp::new(location, TsType::Object(members), !required))
            })
            .collect();
        Ok(TsType::Object(members))
    }

    /// Type of a response, request body or parameter written at `at`, following `$ref`s.
    /// A reference to a declared object becomes a named reference.
    fn object_type(&mut self, at: &Pointer, node: &'a Value, kind: ObjectKind) -> Result<TsType, CompileError> {
        let index = self.builder.index();
        let mut at = at.clone();
        let mut node = node;
        let mut seen = Vec::new();

        while let Some(reference) = SchemaNode::new(node).reference() {
            seen.push(at.clone());
            let resolved = index.resolve(reference, &at, &seen)?;
            if let Some(name) = self.builder.names.get(resolved.pointer) {
                return Ok(TsType::Ref(name.to_string()));
            }
            if resolved.is_cycle {
                return Err(CompileError::UnresolvedReference {
                    reference: reference.to_string(),
                    at,
                });
            }
            at = resolved.pointer.clone();
            node = resolved.node;
        }

        match kind {
            ObjectKind::Response => match self.version {
                SchemaVersion::OpenApi3 => self
                    .content_type(&at, node)
                    .unwrap_or(Ok(TsType::Primitive(TsPrimitive::Never))),
                SchemaVersion::Swagger2 => match node.get("schema") {
                    Some(schema) => self.builder.build_root(schema, &at.child("schema")),
                    None => Ok(TsType::Primitive(TsPrimitive::Never)),
                },
            },
            ObjectKind::RequestBody => self.content_type(&at, node).unwrap_or_else(|| Ok(TsType::unknown())),
            ObjectKind::Parameter => {
                if let Some(schema) = node.get("schema") {
                    return self.builder.build_root(schema, &at.child("schema"));
                }
                if let Some(ty) = self.content_type(&at, node) {
                    return ty;
                }
                match self.version {
                    // Swagger 2 non-body parameters carry their schema keywords inline.
                    SchemaVersion::Swagger2 => self.builder.build_root(node, &at),
                    SchemaVersion::OpenApi3 => Ok(TsType::unknown()),
                }
            }
        }
    }

    /// Schema type of the preferred media type in a `content` map.
    fn content_type(&mut self, at: &Pointer, node: &'a Value) -> Option<Result<TsType, CompileError>> {
        let content = node.get("content").and_then(Value::as_object)?;
        let (media_type, media) = select_media_type(content)?;
        let media_at = at.child("content").child(media_type);
        Some(match media.get("schema") {
            Some(schema) => self.builder.build_root(schema, &media_at.child("schema")),
            None => Ok(TsType::unknown()),
        })
    }

    /// Build declarations for cycle targets until no new ones appear.
    fn build_promoted(&mut self, out: &mut Vec<Declaration>) -> Result<(), CompileError> {
        let index = self.builder.index();
        let mut next = 0;
        while let Some(pointer) = self.builder.promoted.get(next).cloned() {
            next += 1;
            let (Some(node), Some(name)) = (index.get(&pointer), self.builder.names.get(&pointer)) else {
                continue;
            };
            let name = name.to_string();
            let ty = self.builder.build_root(node, &pointer)?;
            trace!(name = %name, pointer = %pointer, "Built promoted declaration.");
            out.push(Declaration {
                name,
                pointer,
                kind: DeclarationKind::Promoted,
                ty,
                doc: SchemaNode::new(node).doc(),
            });
        }
        if next > 0 {
            debug!(promoted = next, "Built promoted declarations.");
        }
        Ok(())
    }
}

/// `application/json`, then any `+json` type, then the first entry.
fn select_media_type(content: &Map<String, Value>) -> Option<(&str, &Value)> {
    let essence = |media_type: &str| media_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    content
        .iter()
        .find(|(media_type, _)| essence(media_type) == "application/json")
        .or_else(|| content.iter().find(|(media_type, _)| essence(media_type).ends_with("+json")))
        .or_else(|| content.iter().next())
        .map(|(media_type, media)| (media_type.as_str(), media))
}

fn api_wrapper(operations: &[&OperationPlan<'_>]) -> Declaration {
    let mut paths: IndexMap<&str, Vec<TsMember>> = IndexMap::new();
    for plan in operations {
        let mut members = Vec::new();
        if let Some((_, name)) = &plan.parameters_decl {
            members.push(TsMember::Property(TsProp::new(
                "parameters",
                TsType::Ref(name.clone()),
                !plan.parameters_required(),
            )));
        }
        if let Some(body) = &plan.body {
            members.push(TsMember::Property(TsProp::new(
                "requestBody",
                TsType::Ref(body.name.clone()),
                !body.required,
            )));
        }
        let responses = plan
            .responses
            .iter()
            .map(|response| {
                TsMember::Property(TsProp::new(
                    response.status.as_str(),
                    TsType::Ref(response.name.clone()),
                    false,
                ))
            })
            .collect();
        members.push(TsMember::Property(TsProp::new("responses", TsType::Object(responses), false)));

        let mut method = TsProp::new(plan.method, TsType::Object(members), false);
        method.doc = plan.doc.clone();
        paths.entry(plan.path.as_str()).or_default().push(TsMember::Property(method));
    }

    let ty = TsType::Object(
        paths
            .into_iter()
            .map(|(path, methods)| TsMember::Property(TsProp::new(path, TsType::Object(methods), false)))
            .collect(),
    );
    Declaration {
        name: API_WRAPPER_NAME.to_string(),
        pointer: Pointer::root().child("paths"),
        kind: DeclarationKind::ApiWrapper,
        ty,
        doc: None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assemble_doc(doc: &Value, raw_schema: bool) -> Assembly {
        let version = SchemaVersion::detect(doc).unwrap();
        let index = PointerIndex::build(doc);
        assemble(&index, version, raw_schema).unwrap()
    }

    fn names(assembly: &Assembly) -> Vec<&str> {
        assembly.declarations.iter().map(|decl| decl.name.as_str()).collect()
    }

    fn declaration<'d>(assembly: &'d Assembly, name: &str) -> &'d Declaration {
        assembly
            .declarations
            .iter()
            .find(|decl| decl.name == name)
            .unwrap()
    }

    fn member<'t>(ty: &'t TsType, name: &str) -> &'t TsProp {
        let TsType::Object(members) = ty else {
            panic!("expected object, found {ty:?}");
        };
        members
            .iter()
            .find_map(|member| match member {
                TsMember::Property(prop) if prop.name == name => Some(prop),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(SchemaVersion::detect(&json!({ "swagger": "2.0" })).unwrap(), SchemaVersion::Swagger2);
        assert_eq!(SchemaVersion::detect(&json!({ "openapi": "3.1.0" })).unwrap(), SchemaVersion::OpenApi3);
        assert_eq!(SchemaVersion::detect(&json!({ "swagger": 2.0 })).unwrap(), SchemaVersion::Swagger2);
        assert!(matches!(
            SchemaVersion::detect(&json!({ "openapi": "4.0" })),
            Err(CompileError::UnrecognizedDocument { .. })
        ));
        assert!(matches!(
            SchemaVersion::detect(&json!({ "Pet": { "type": "object" } })),
            Err(CompileError::UnrecognizedDocument { .. })
        ));
        assert_eq!(
            SchemaVersion::from_number(4),
            Err(CompileError::UnsupportedVersion { version: 4 })
        );
    }

    #[test]
    fn test_components_in_document_order() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {
                "schemas": {
                    "Zebra": { "type": "string" },
                    "Apple": { "type": "number" }
                },
                "responses": {
                    "NotFound": { "description": "Missing" }
                },
                "parameters": {
                    "limit": { "name": "limit", "in": "query", "schema": { "type": "integer" } }
                }
            }
        });
        let assembly = assemble_doc(&doc, false);
        assert_eq!(names(&assembly), ["Zebra", "Apple", "NotFound", "Limit", "paths"]);
        assert_eq!(declaration(&assembly, "NotFound").ty, TsType::Primitive(TsPrimitive::Never));
        assert_eq!(declaration(&assembly, "Limit").ty, TsType::Primitive(TsPrimitive::Number));
    }

    #[test]
    fn test_raw_schema_declares_top_level_keys() {
        let raw = json!({
            "Pet": { "type": "object", "properties": { "tag": { "$ref": "#/definitions/Tag" } } },
            "Tag": { "type": "string" }
        });
        let index = PointerIndex::build(&raw).with_root_alias(SchemaVersion::Swagger2.schemas_prefix());
        let assembly = assemble(&index, SchemaVersion::Swagger2, true).unwrap();
        assert_eq!(names(&assembly), ["Pet", "Tag"]);
        assert_eq!(assembly.declarations[0].pointer.to_string(), "#/Pet");
        assert_eq!(member(&assembly.declarations[0].ty, "tag").ty, TsType::Ref("Tag".into()));
    }

    #[test]
    fn test_operation_declarations() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        { "name": "petId", "in": "path", "required": true, "schema": { "type": "string" } },
                        { "name": "verbose", "in": "query", "schema": { "type": "boolean" } }
                    ],
                    "put": {
                        "operationId": "updatePet",
                        "parameters": [
                            { "name": "verbose", "in": "query", "schema": { "type": "string" } },
                            { "$ref": "#/components/parameters/Trace" }
                        ],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "text/plain": { "schema": { "type": "string" } },
                                "application/merge-patch+json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                            }
                        },
                        "responses": {
                            "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
                            "204": { "description": "No content" }
                        }
                    },
                    "delete": { "responses": { "default": { "description": "Error" } } }
                }
            },
            "components": {
                "schemas": { "Pet": { "type": "object" } },
                "parameters": { "Trace": { "name": "X-Trace", "in": "header", "schema": { "type": "string" } } }
            }
        });
        let assembly = assemble_doc(&doc, false);
        assert_eq!(
            names(&assembly),
            [
                "UpdatePetParameters",
                "UpdatePetRequestBody",
                "UpdatePet200Response",
                "UpdatePet204Response",
                "DeletePetsPetIdParameters",
                "DeletePetsPetIdDefaultResponse",
                "Pet",
                "Trace",
                "paths"
            ]
        );

        let parameters = &declaration(&assembly, "UpdatePetParameters").ty;
        let path = member(parameters, "path");
        assert!(!path.optional);
        let query = member(parameters, "query");
        assert!(query.optional);
        assert_eq!(member(&query.ty, "verbose").ty, TsType::Primitive(TsPrimitive::String));
        assert_eq!(member(&member(parameters, "header").ty, "X-Trace").ty, TsType::Ref("Trace".into()));

        assert_eq!(declaration(&assembly, "UpdatePetRequestBody").ty, TsType::Ref("Pet".into()));
        assert_eq!(declaration(&assembly, "UpdatePet200Response").ty, TsType::Ref("Pet".into()));
        assert_eq!(
            declaration(&assembly, "UpdatePet204Response").ty,
            TsType::Primitive(TsPrimitive::Never)
        );

        let wrapper = &declaration(&assembly, "paths").ty;
        let put = member(&member(wrapper, "/pets/{petId}").ty, "put");
        assert!(!member(&put.ty, "parameters").optional);
        assert!(!member(&put.ty, "requestBody").optional);
        assert_eq!(
            member(&member(&put.ty, "responses").ty, "204").ty,
            TsType::Ref("UpdatePet204Response".into())
        );
    }

    #[test]
    fn test_swagger2_body_and_responses() {
        let doc = json!({
            "swagger": "2.0",
            "paths": {
                "/pets": {
                    "post": {
                        "parameters": [
                            { "name": "pet", "in": "body", "schema": { "$ref": "#/definitions/Pet" } },
                            { "name": "limit", "in": "query", "type": "integer", "format": "int32" }
                        ],
                        "responses": {
                            "201": { "description": "Created", "schema": { "$ref": "#/definitions/Pet" } },
                            "404": { "$ref": "#/responses/NotFound" }
                        }
                    }
                }
            },
            "definitions": { "Pet": { "type": "object" } },
            "responses": { "NotFound": { "description": "Not found" } }
        });
        let assembly = assemble_doc(&doc, false);
        assert_eq!(declaration(&assembly, "PostPetsRequestBody").ty, TsType::Ref("Pet".into()));
        assert_eq!(declaration(&assembly, "PostPets201Response").ty, TsType::Ref("Pet".into()));
        assert_eq!(declaration(&assembly, "PostPets404Response").ty, TsType::Ref("NotFound".into()));
        assert_eq!(declaration(&assembly, "NotFound").ty, TsType::Primitive(TsPrimitive::Never));

        let query = member(&declaration(&assembly, "PostPetsParameters").ty, "query");
        let limit = member(&query.ty, "limit");
        assert_eq!(limit.ty, TsType::Primitive(TsPrimitive::Number));
        assert!(limit.optional);
        let wrapper = &declaration(&assembly, "paths").ty;
        let post = member(&member(wrapper, "/pets").ty, "post");
        assert!(member(&post.ty, "requestBody").optional);
    }

    #[test]
    fn test_name_collisions_are_disambiguated() {
        let doc = json!({
            "swagger": "2.0",
            "definitions": { "pet": { "type": "string" } },
            "parameters": { "Pet": { "name": "pet", "in": "query", "type": "string" } }
        });
        let assembly = assemble_doc(&doc, false);
        assert_eq!(names(&assembly), ["Pet", "Pet_ParametersPet", "paths"]);
    }

    #[test]
    fn test_verify_closure_reports_dangling_reference() {
        let pointer = Pointer::from_segments(["definitions", "Pet"]);
        let declarations = vec![Declaration {
            name: "Pet".into(),
            pointer: pointer.clone(),
            kind: DeclarationKind::Schema,
            ty: TsType::Array(Box::new(TsType::Ref("Ghost".into()))),
            doc: None,
        }];
        assert_eq!(
            verify_closure(&declarations),
            Err(CompileError::DanglingReference {
                name: "Ghost".into(),
                at: pointer,
            })
        );
    }

    #[test]
    fn test_media_type_preference() {
        let content = json!({
            "text/plain": {},
            "application/problem+json": { "n": 1 },
            "application/json; charset=utf-8": { "n": 2 }
        });
        let content = content.as_object().unwrap();
        assert_eq!(select_media_type(content).unwrap().0, "application/json; charset=utf-8");

        let content = json!({ "text/plain": {}, "application/problem+json": {} });
        assert_eq!(
            select_media_type(content.as_object().unwrap()).unwrap().0,
            "application/problem+json"
        );
    }
}
