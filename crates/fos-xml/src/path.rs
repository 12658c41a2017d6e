//! Node position: depth and location path
//!
//! Paths use the same shape libxml2 prints for a node: one step per
//! ancestor, a `[n]` position only when same-named siblings exist, and
//! `text()`, `comment()`, `processing-instruction('t')` and `@name` steps
//! for non-element nodes. A tree without a document still gets an absolute
//! path rooted at its top node.

use fos_xmltree::{NodeData, NodeId, NodeKind};

use crate::store::Tree;
use crate::{Node, StructuralError, XmlResult};

impl Node {
    /// Number of ancestors; the top of a tree has depth 0
    ///
    /// An attribute sits one level below its element.
    pub fn depth(&self) -> XmlResult<usize> {
        self.peek(|tree, record| {
            let mut depth = 0;
            let mut cursor = record.parent;
            while let Some(id) = cursor {
                depth += 1;
                cursor = tree.record(id)?.parent;
            }
            Ok(depth)
        })
    }

    /// Location path of the node, e.g. `/catalog/book[2]/@lang`
    pub fn path(&self) -> XmlResult<String> {
        self.peek(|tree, record| {
            if record.kind() == NodeKind::Dtd {
                return Err(StructuralError::UnsupportedKind { kind: NodeKind::Dtd }.into());
            }
            let mut steps = Vec::new();
            let mut cursor = Some(self.handle());
            while let Some(id) = cursor {
                let record = tree.record(id)?;
                if let Some(step) = step(tree, id)? {
                    steps.push(step);
                }
                cursor = record.parent;
            }
            if steps.is_empty() {
                return Ok("/".to_string());
            }
            let mut path = String::new();
            for step in steps.iter().rev() {
                path.push('/');
                path.push_str(step);
            }
            Ok(path)
        })
    }
}

/// One path step for `id`; documents contribute none
fn step(tree: &Tree, id: NodeId) -> XmlResult<Option<String>> {
    let record = tree.record(id)?;
    let base = match &record.data {
        NodeData::Document { .. } => return Ok(None),
        NodeData::Attribute { name, .. } => return Ok(Some(format!("@{name}"))),
        NodeData::Element { name } => name.clone(),
        NodeData::Text(_) | NodeData::CData(_) => "text()".to_string(),
        NodeData::Comment(_) => "comment()".to_string(),
        NodeData::ProcessingInstruction { target, .. } => format!("processing-instruction('{target}')"),
        NodeData::Dtd { .. } => return Err(StructuralError::UnsupportedKind { kind: NodeKind::Dtd }.into()),
    };

    let same = |other: NodeId| -> XmlResult<bool> { Ok(same_step(&record.data, &tree.record(other)?.data)) };
    let mut before = 0;
    let mut cursor = record.prev_sibling;
    while let Some(sibling) = cursor {
        if same(sibling)? {
            before += 1;
        }
        cursor = tree.record(sibling)?.prev_sibling;
    }
    let mut after = false;
    let mut cursor = record.next_sibling;
    while let Some(sibling) = cursor {
        if same(sibling)? {
            after = true;
            break;
        }
        cursor = tree.record(sibling)?.next_sibling;
    }

    if before == 0 && !after {
        Ok(Some(base))
    } else {
        Ok(Some(format!("{base}[{}]", before + 1)))
    }
}

/// Whether two siblings share a path step and so need positions
fn same_step(a: &NodeData, b: &NodeData) -> bool {
    match (a, b) {
        (NodeData::Element { name: x }, NodeData::Element { name: y }) => x == y,
        (NodeData::Text(_) | NodeData::CData(_), NodeData::Text(_) | NodeData::CData(_)) => true,
        (NodeData::Comment(_), NodeData::Comment(_)) => true,
        (
            NodeData::ProcessingInstruction { target: x, .. },
            NodeData::ProcessingInstruction { target: y, .. },
        ) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, Store};

    #[test]
    fn test_depth() {
        let doc = Document::new();
        let root = doc.create_element("root");
        doc.set_root(&root).unwrap();
        let child = root.add_element("child", Some("text")).unwrap();
        child.set_attribute("id", "1").unwrap();
        let attr = child.attributes().unwrap().next().unwrap();
        let text = child.first_child().unwrap().unwrap();

        assert_eq!(doc.node().depth().unwrap(), 0);
        assert_eq!(root.depth().unwrap(), 1);
        assert_eq!(child.depth().unwrap(), 2);
        assert_eq!(text.depth().unwrap(), 3);
        assert_eq!(attr.depth().unwrap(), 3);

        child.unlink().unwrap();
        assert_eq!(child.depth().unwrap(), 0);
        assert_eq!(text.depth().unwrap(), 1);
    }

    #[test]
    fn test_path_positions() {
        let doc = Document::new();
        let catalog = doc.create_element("catalog");
        doc.set_root(&catalog).unwrap();
        let first = catalog.add_element("book", None).unwrap();
        let note = catalog.add_element("note", None).unwrap();
        let second = catalog.add_element("book", Some("Dune")).unwrap();
        second.set_attribute("lang", "en").unwrap();
        let lang = second.attributes().unwrap().next().unwrap();
        let text = second.first_child().unwrap().unwrap();

        assert_eq!(doc.node().path().unwrap(), "/");
        assert_eq!(catalog.path().unwrap(), "/catalog");
        assert_eq!(first.path().unwrap(), "/catalog/book[1]");
        assert_eq!(note.path().unwrap(), "/catalog/note");
        assert_eq!(second.path().unwrap(), "/catalog/book[2]");
        assert_eq!(lang.path().unwrap(), "/catalog/book[2]/@lang");
        assert_eq!(text.path().unwrap(), "/catalog/book[2]/text()");
    }

    #[test]
    fn test_path_of_other_kinds() {
        let store = Store::new();
        let root = store.element("root");
        root.link(&store.comment("a")).unwrap();
        root.link(&store.text("t")).unwrap();
        root.link(&store.comment("b")).unwrap();
        let pi = store.processing_instruction("go", "");
        root.link(&pi).unwrap();
        let comments: Vec<_> = root.children().unwrap().filter(|n| n.is_comment()).collect();

        // No document above: the path starts at the top node
        assert_eq!(root.path().unwrap(), "/root");
        assert_eq!(comments[0].path().unwrap(), "/root/comment()[1]");
        assert_eq!(comments[1].path().unwrap(), "/root/comment()[2]");
        assert_eq!(pi.path().unwrap(), "/root/processing-instruction('go')");
        assert!(store.dtd("d", None, None).path().is_err());
    }
}
