//! Folds the flat, DFS-ordered schema-element list into a tree of named
//! nodes, and renders that tree as an ASCII outline.

use super::metadata::{
    enum_name, SchemaElement, CONVERTED_TYPE_NAMES, DATA_TYPE_NAMES, REPETITION_TYPE_NAMES,
};
use super::ParquetError;
use crate::format::{Arg, Format, FormatCursor, OutBuf};
use crate::mem::arena::{Arena, Text};

/// Deepest nesting the fold accepts; matches the fixed frame stack of the
/// schema walker.
pub const SCHEMA_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    pub name: Option<Text>,
    pub children: Vec<SchemaNode>,
    pub repetition_type: Option<i32>,
    pub data_type: Option<i32>,
    pub type_length: Option<i32>,
    pub converted_type: Option<i32>,
}

impl SchemaNode {
    fn from_element(element: &SchemaElement) -> Self {
        Self {
            name: element.name,
            children: Vec::new(),
            repetition_type: element.repetition_type,
            data_type: element.data_type,
            type_length: element.type_length,
            converted_type: element.converted_type,
        }
    }
}

/// Builds the schema tree. Each element contributes exactly one node; an
/// element with `num_children > 0` opens a frame that its descendants
/// fill. Counts that do not add up are invalid.
pub fn materialize(schemas: &[SchemaElement]) -> Result<SchemaNode, ParquetError> {
    let mut stack: Vec<(SchemaNode, u32)> = Vec::new();
    let mut root: Option<SchemaNode> = None;

    for element in schemas {
        let node = SchemaNode::from_element(element);
        let expected = element.num_children.unwrap_or(0) as u32;

        if expected > 0 {
            if stack.len() >= SCHEMA_MAX_DEPTH {
                return Err(ParquetError::InvalidValue);
            }

            stack.push((node, expected));
            continue;
        }

        // a completed subtree bubbles up until a frame still wants more
        let mut done = node;

        loop {
            match stack.last_mut() {
                Some((parent, remaining)) => {
                    parent.children.push(done);
                    *remaining -= 1;

                    if *remaining > 0 {
                        break;
                    }

                    match stack.pop() {
                        Some((parent, _)) => done = parent,
                        None => return Err(ParquetError::InvalidValue),
                    }
                }
                None => {
                    if root.is_some() {
                        return Err(ParquetError::InvalidValue);
                    }

                    root = Some(done);
                    break;
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(ParquetError::InvalidValue);
    }

    root.ok_or(ParquetError::InvalidValue)
}

const LINE_TEMPLATES: [&str; 4] = [
    "%e%e%s\n",
    "%e%e%s, %s\n",
    "%e%e%s, %s, %s\n",
    "%e%e%s, %s, %s, %s\n",
];

const BRANCH_BAR: &str = " |   ";
const BRANCH_TICK: &str = " |-- ";

/// Resumable ASCII-tree writer over a materialized schema. One line per
/// node: `name[, CONVERTED][, DATA][, REPETITION]`.
pub struct SchemaWriter<'a> {
    arena: &'a Arena,
    root: &'a SchemaNode,
    started: bool,
    stack: Vec<(&'a [SchemaNode], usize)>,
    resume: Option<FormatCursor>,
}

impl<'a> SchemaWriter<'a> {
    pub fn new(arena: &'a Arena, root: &'a SchemaNode) -> Self {
        Self {
            arena,
            root,
            started: false,
            stack: Vec::new(),
            resume: None,
        }
    }

    /// Emits lines until the tree or the buffer is exhausted. Returns
    /// true when the whole tree has been written; false means the caller
    /// should drain the buffer and call again.
    pub fn write(&mut self, out: &mut OutBuf) -> bool {
        loop {
            if !self.started {
                if !self.emit(self.root, 0, out) {
                    return false;
                }

                self.started = true;

                if !self.root.children.is_empty() {
                    self.stack.push((&self.root.children, 0));
                }

                continue;
            }

            let depth = self.stack.len();

            let next = match self.stack.last_mut() {
                None => return true,
                Some((nodes, index)) => {
                    let nodes: &'a [SchemaNode] = *nodes;

                    if *index >= nodes.len() {
                        None
                    } else {
                        let node = &nodes[*index];
                        *index += 1;
                        Some(node)
                    }
                }
            };

            let node = match next {
                Some(node) => node,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            if !self.emit(node, depth, out) {
                // retry the same node on the next call
                if let Some((_, index)) = self.stack.last_mut() {
                    *index -= 1;
                }

                return false;
            }

            if !node.children.is_empty() {
                self.stack.push((&node.children, 0));
            }
        }
    }

    fn emit(&mut self, node: &'a SchemaNode, depth: usize, out: &mut OutBuf) -> bool {
        let name = node.name.map(|name| self.arena.text(name)).unwrap_or("");

        let mut args = [Arg::Uint(0); 8];
        args[0] = Arg::Text(BRANCH_BAR);
        args[1] = Arg::Uint(depth.saturating_sub(1) as u64);
        args[2] = Arg::Text(BRANCH_TICK);
        args[3] = Arg::Uint(depth.min(1) as u64);
        args[4] = Arg::Text(name);

        let mut extras = 0;

        for name in [
            node.converted_type
                .and_then(|value| enum_name(CONVERTED_TYPE_NAMES, value)),
            node.data_type
                .and_then(|value| enum_name(DATA_TYPE_NAMES, value)),
            node.repetition_type
                .and_then(|value| enum_name(REPETITION_TYPE_NAMES, value)),
        ]
        .into_iter()
        .flatten()
        {
            args[5 + extras] = Arg::Text(name);
            extras += 1;
        }

        let cursor = self.resume.take().unwrap_or_default();
        let mut format = Format::resume(LINE_TEMPLATES[extras], &args, cursor);

        match format.write(out) {
            Ok(()) => true,
            Err(_) => {
                self.resume = Some(format.cursor());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::pool::BlockPool;

    fn arena() -> Arena {
        Arena::new(BlockPool::new(), 4096, 8 * 4096)
    }

    fn element(
        arena: &mut Arena,
        name: &str,
        num_children: Option<i32>,
        data_type: Option<i32>,
        repetition_type: Option<i32>,
    ) -> SchemaElement {
        SchemaElement {
            data_type,
            type_length: None,
            repetition_type,
            name: Some(arena.intern(name.as_bytes()).unwrap()),
            num_children,
            converted_type: None,
        }
    }

    #[test]
    fn materializes_two_element_schema() {
        let mut arena = arena();
        let schemas = [
            element(&mut arena, "root", Some(1), None, None),
            element(&mut arena, "leaf", None, Some(1), Some(1)),
        ];

        let root = materialize(&schemas).unwrap();

        assert_eq!(arena.text(root.name.unwrap()), "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(arena.text(root.children[0].name.unwrap()), "leaf");
        assert_eq!(root.children[0].data_type, Some(1));
    }

    #[test]
    fn materializes_nested_groups() {
        let mut arena = arena();
        let schemas = [
            element(&mut arena, "table", Some(2), None, None),
            element(&mut arena, "group", Some(2), None, Some(0)),
            element(&mut arena, "a", None, Some(1), Some(0)),
            element(&mut arena, "b", None, Some(2), Some(1)),
            element(&mut arena, "c", None, Some(6), Some(1)),
        ];

        let root = materialize(&schemas).unwrap();

        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].children.len(), 2);
        assert_eq!(arena.text(root.children[0].children[1].name.unwrap()), "b");
        assert_eq!(arena.text(root.children[1].name.unwrap()), "c");
    }

    #[test]
    fn rejects_empty_schema_list() {
        assert_eq!(materialize(&[]).unwrap_err(), ParquetError::InvalidValue);
    }

    #[test]
    fn rejects_missing_children() {
        let mut arena = arena();
        let schemas = [
            element(&mut arena, "root", Some(2), None, None),
            element(&mut arena, "only", None, Some(1), Some(1)),
        ];

        // the frame still expects one more child
        assert_eq!(
            materialize(&schemas).unwrap_err(),
            ParquetError::InvalidValue
        );
    }

    #[test]
    fn rejects_extra_elements() {
        let mut arena = arena();
        let schemas = [
            element(&mut arena, "root", Some(1), None, None),
            element(&mut arena, "leaf", None, Some(1), Some(1)),
            element(&mut arena, "orphan", None, Some(1), Some(1)),
        ];

        assert_eq!(
            materialize(&schemas).unwrap_err(),
            ParquetError::InvalidValue
        );
    }

    #[test]
    fn writes_schema_outline() {
        let mut arena = arena();
        let table = arena.intern(b"table").unwrap();
        let field = arena.intern(b"field").unwrap();

        let root = SchemaNode {
            name: Some(table),
            children: vec![SchemaNode {
                name: Some(field),
                children: Vec::new(),
                repetition_type: Some(1),
                data_type: Some(1),
                type_length: None,
                converted_type: Some(6),
            }],
            repetition_type: Some(0),
            data_type: None,
            type_length: None,
            converted_type: None,
        };

        let mut writer = SchemaWriter::new(&arena, &root);
        let mut out = OutBuf::with_capacity(4096);

        assert!(writer.write(&mut out));
        assert_eq!(
            std::str::from_utf8(out.as_slice()).unwrap(),
            "table, REQUIRED\n |-- field, DATE, INT32, OPTIONAL\n"
        );
    }

    #[test]
    fn writer_resumes_after_full_buffer() {
        let mut arena = arena();
        let table = arena.intern(b"table").unwrap();
        let field = arena.intern(b"long_field_name").unwrap();

        let root = SchemaNode {
            name: Some(table),
            children: vec![SchemaNode {
                name: Some(field),
                children: Vec::new(),
                repetition_type: Some(0),
                data_type: Some(2),
                type_length: None,
                converted_type: None,
            }],
            repetition_type: None,
            data_type: None,
            type_length: None,
            converted_type: None,
        };

        let mut writer = SchemaWriter::new(&arena, &root);
        let mut out = OutBuf::with_capacity(12);
        let mut rendered = String::new();

        for _ in 0..16 {
            let done = writer.write(&mut out);
            rendered.push_str(std::str::from_utf8(out.as_slice()).unwrap());
            out.clear();

            if done {
                break;
            }
        }

        assert_eq!(rendered, "table\n |-- long_field_name, INT64, REQUIRED\n");
    }
}
