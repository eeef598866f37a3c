//! TypeScript type IR produced by the builder and consumed by the printer.
//!
//! - TsType: type expressions (primitives, literals, arrays, objects, unions, ...)
//! - TsMember: object members (properties and index signatures)
//! - Declaration: one named, exported type

use crate::pointer::Pointer;

/// TypeScript type representation
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// Primitive types: string, number, boolean, never, undefined
    Primitive(TsPrimitive),
    /// Literal type: "foo", 42, true, null
    Literal(TsLiteral),
    /// Array type: T[]
    Array(Box<TsType>),
    /// Object type: { foo: string; bar?: number; [key: string]: unknown }
    Object(Vec<TsMember>),
    /// Union type: A | B | C
    Union(Vec<TsType>),
    /// Intersection type: A & B & C
    Intersection(Vec<TsType>),
    /// Reference to a declaration by name
    Ref(String),
    /// Fallback for shapes with no TypeScript equivalent, with an optional explanation
    Unknown(Option<String>),
}

/// TypeScript primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsPrimitive {
    /// `string`
    String,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `never`
    Never,
    /// `undefined`
    Undefined,
}

/// TypeScript literal values
#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    /// A string literal, printed escaped and double-quoted.
    String(String),
    /// A non-integral number.
    Number(f64),
    /// An integral number.
    Int(i64),
    /// `true` / `false`
    Bool(bool),
    /// `null`
    Null,
}

/// Member of an object type
#[derive(Debug, Clone, PartialEq)]
pub enum TsMember {
    /// A named property.
    Property(TsProp),
    /// An index signature for extra keys.
    Index(IndexSignature),
}

/// Object property definition
#[derive(Debug, Clone, PartialEq)]
pub struct TsProp {
    /// Key as written in the document; quoted on output when needed.
    pub name: String,
    /// Value type.
    pub ty: TsType,
    /// Printed with `?`.
    pub optional: bool,
    /// Printed with `readonly`.
    pub readonly: bool,
    /// JSDoc for the property.
    pub doc: Option<Doc>,
}

/// Index signature: `[key: string]: T`
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSignature {
    /// Key type, `string` in practice.
    pub key: TsType,
    /// Type of every extra value.
    pub value: TsType,
}

/// Documentation attached to a declaration or property, printed as JSDoc.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doc {
    /// Free-form lines (title, description).
    pub summary: Vec<String>,
    /// `@tag value` pairs in the order they were found.
    pub tags: Vec<(String, String)>,
}

impl Doc {
    /// Nothing to print.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.tags.is_empty()
    }
}

/// Why a declaration exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A reusable schema (`components/schemas`, `definitions`, raw schema entry)
    Schema,
    /// A reusable response (`components/responses`, Swagger 2 `responses`)
    Response,
    /// A reusable request body (`components/requestBodies`)
    RequestBody,
    /// A reusable parameter (`components/parameters`, Swagger 2 `parameters`)
    Parameter,
    /// Merged parameters of one operation
    OperationParameters,
    /// Request body of one operation
    OperationRequestBody,
    /// Response of one operation for one status
    OperationResponse,
    /// A `$ref` target reached through a cycle or reused as a compound type
    Promoted,
    /// The `paths` wrapper tying operations to their declarations
    ApiWrapper,
}

/// One exported type.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Exported identifier, unique within the output.
    pub name: String,
    /// Document location the declaration was built from.
    pub pointer: Pointer,
    /// Why the declaration exists.
    pub kind: DeclarationKind,
    /// Declared type.
    pub ty: TsType,
    /// JSDoc printed above the declaration.
    pub doc: Option<Doc>,
}

impl TsType {
    /// `unknown` without a note.
    pub fn unknown() -> Self {
        Self::Unknown(None)
    }

    /// The `null` literal.
    pub fn null() -> Self {
        Self::Literal(TsLiteral::Null)
    }

    /// Whether this is (or is a union containing) the `null` literal.
    pub fn includes_null(&self) -> bool {
        match self {
            Self::Literal(TsLiteral::Null) => true,
            Self::Union(types) => types.iter().any(Self::includes_null),
            _ => false,
        }
    }

    /// Build a union, flattening nested unions and collapsing single members.
    pub fn union(types: Vec<Self>) -> Self {
        let mut flat: Vec<Self> = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                Self::Union(inner) => {
                    for member in inner {
                        if !flat.contains(&member) {
                            flat.push(member);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Self::Primitive(TsPrimitive::Never),
            1 => flat.remove(0),
            _ => Self::Union(flat),
        }
    }

    /// Build an intersection, flattening nested intersections and collapsing single members.
    pub fn intersection(types: Vec<Self>) -> Self {
        let mut flat: Vec<Self> = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                Self::Intersection(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::unknown(),
            1 => flat.remove(0),
            _ => Self::Intersection(flat),
        }
    }

    /// Whether the type is small enough to repeat inline: no object, union or
    /// intersection anywhere inside it.
    pub fn is_simple(&self) -> bool {
        match self {
            Self::Primitive(_) | Self::Literal(_) | Self::Ref(_) | Self::Unknown(_) => true,
            Self::Array(inner) => inner.is_simple(),
            Self::Object(_) | Self::Union(_) | Self::Intersection(_) => false,
        }
    }

    /// Visit every declaration name referenced by this type.
    pub fn for_each_ref<'s>(&'s self, f: &mut impl FnMut(&'s str)) {
        match self {
            Self::Ref(name) => f(name),
            Self::Array(inner) => inner.for_each_ref(f),
            Self::Union(types) | Self::Intersection(types) => {
                for ty in types {
                    ty.for_each_ref(f);
                }
            }
            Self::Object(members) => {
                for member in members {
                    match member {
                        TsMember::Property(prop) => prop.ty.for_each_ref(f),
                        TsMember::Index(index) => {
                            index.key.for_each_ref(f);
                            index.value.for_each_ref(f);
                        }
                    }
                }
            }
            Self::Primitive(_) | Self::Literal(_) | Self::Unknown(_) => {}
        }
    }
}

impl TsProp {
    /// A property that is neither readonly nor documented.
    pub fn new(name: impl Into<String>, ty: TsType, optional: bool) -> Self {
        Self {
            name: name.into(),
            ty,
            optional,
            readonly: false,
            doc: None,
        }
    }
}
