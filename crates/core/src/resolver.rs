//! Pointer index over a document and `$ref` resolution with cycle detection.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::CompileError;
use crate::pointer::Pointer;

/// Every addressable node of a document, keyed by pointer, in pre-order traversal order.
#[derive(Debug)]
pub struct PointerIndex<'a> {
    nodes: IndexMap<Pointer, &'a Value>,
    /// Prefix that also addresses the root, so `#/definitions/Pet` can reach `#/Pet`.
    root_alias: Option<Pointer>,
}

/// The outcome of following a `$ref` edge.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRef<'p, 'a> {
    /// Where the reference points.
    pub pointer: &'p Pointer,
    /// The target node.
    pub node: &'a Value,
    /// The target is already on the current resolution path.
    pub is_cycle: bool,
}

impl<'a> PointerIndex<'a> {
    /// Index every object member and array element reachable from `document`.
    pub fn build(document: &'a Value) -> Self {
        let mut nodes = IndexMap::new();
        let mut stack = vec![(Pointer::root(), document)];

        // Explicit stack; children are pushed in reverse so they pop in document order.
        while let Some((pointer, node)) = stack.pop() {
            match node {
                Value::Object(map) => {
                    for (key, child) in map.iter().rev() {
                        stack.push((pointer.child(key.as_str()), child));
                    }
                }
                Value::Array(items) => {
                    for (i, child) in items.iter().enumerate().rev() {
                        stack.push((pointer.child(i.to_string()), child));
                    }
                }
                _ => {}
            }
            nodes.insert(pointer, node);
        }

        debug!(nodes = nodes.len(), "Built pointer index.");
        Self {
            nodes,
            root_alias: None,
        }
    }

    /// Let references under `prefix` resolve relative to the root when the prefix itself
    /// is not part of the document. Pointers reported afterwards are always real ones.
    #[must_use]
    pub fn with_root_alias(mut self, prefix: Pointer) -> Self {
        self.root_alias = Some(prefix);
        self
    }

    fn lookup(&self, target: &Pointer) -> Option<(&Pointer, &'a Value)> {
        if let Some((pointer, &node)) = self.nodes.get_key_value(target) {
            return Some((pointer, node));
        }
        let prefix = self.root_alias.as_ref()?;
        let rest = target.segments().strip_prefix(prefix.segments())?;
        let (pointer, &node) = self.nodes.get_key_value(&Pointer::from_segments(rest.iter().cloned()))?;
        Some((pointer, node))
    }

    /// Look up a node by pointer.
    pub fn get(&self, pointer: &Pointer) -> Option<&'a Value> {
        self.nodes.get(pointer).copied()
    }

    /// Follow `reference` (written at `at`) given the pointers already being expanded.
    pub fn resolve<'s>(
        &'s self,
        reference: &str,
        at: &Pointer,
        current_path: &[Pointer],
    ) -> Result<ResolvedRef<'s, 'a>, CompileError> {
        let unresolved = || CompileError::UnresolvedReference {
            reference: reference.to_string(),
            at: at.clone(),
        };

        let target = Pointer::parse_ref(reference).ok_or_else(unresolved)?;
        let (pointer, node) = self.lookup(&target).ok_or_else(unresolved)?;

        Ok(ResolvedRef {
            pointer,
            node,
            is_cycle: current_path.contains(pointer),
        })
    }

    /// All indexed pointers with their nodes, in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pointer, &'a Value)> + '_ {
        self.nodes.iter().map(|(pointer, node)| (pointer, *node))
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the index is empty (never true: the root is always indexed).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
