//! Integration tests for fos-xmltree
//!
//! Larger link / free sequences and slot recycling.

use fos_xmltree::{NodeData, NodeId, NodeKind, TreeError, XmlTree};

fn element(tree: &mut XmlTree<u32>, name: &str) -> NodeId {
    tree.create(NodeData::Element { name: name.to_string() })
}

fn names(tree: &XmlTree<u32>, ids: impl IntoIterator<Item = NodeId>) -> Vec<String> {
    ids.into_iter()
        .map(|id| tree.record(id).unwrap().data.name().unwrap_or("?").to_string())
        .collect()
}

// ============================================================================
// BUILDING AND MOVING
// ============================================================================

#[test]
fn test_build_document_shape() {
    let mut tree: XmlTree<u32> = XmlTree::new();
    let doc = tree.create(NodeData::Document {
        version: Some("1.0".into()),
        encoding: None,
    });
    let dtd = tree.create(NodeData::Dtd {
        name: "html".into(),
        system_id: None,
        public_id: None,
    });
    let html = element(&mut tree, "html");
    let body = element(&mut tree, "body");
    let text = tree.create(NodeData::Text("hello".into()));

    tree.append_child(doc, html).unwrap();
    tree.insert_before(html, dtd).unwrap();
    tree.append_child(html, body).unwrap();
    tree.append_child(body, text).unwrap();

    assert_eq!(tree.kind(doc).unwrap(), NodeKind::Document);
    assert_eq!(tree.record(doc).unwrap().first_child, Some(dtd));
    assert_eq!(tree.top(text).unwrap(), doc);
    let kinds: Vec<_> = tree.descendants(doc).map(|id| tree.kind(id).unwrap()).collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Document, NodeKind::Dtd, NodeKind::Element, NodeKind::Element, NodeKind::Text]
    );
}

#[test]
fn test_move_subtree_between_parents() {
    let mut tree: XmlTree<u32> = XmlTree::new();
    let left = element(&mut tree, "left");
    let right = element(&mut tree, "right");
    let moved = element(&mut tree, "moved");
    let inner = element(&mut tree, "inner");
    tree.append_child(left, moved).unwrap();
    tree.append_child(moved, inner).unwrap();

    assert_eq!(tree.append_child(right, moved), Err(TreeError::StillLinked(moved)));

    tree.detach(moved).unwrap();
    tree.append_child(right, moved).unwrap();

    assert_eq!(tree.record(left).unwrap().first_child, None);
    assert_eq!(tree.top(inner).unwrap(), right);
    assert_eq!(names(&tree, tree.subtree(right)), vec!["right", "moved", "inner"]);
}

// ============================================================================
// FREEING AND RECYCLING
// ============================================================================

#[test]
fn test_free_subtree_releases_everything_below() {
    let mut tree: XmlTree<u32> = XmlTree::new();
    let root = element(&mut tree, "root");
    let mut all = vec![root];
    for i in 0..10 {
        let child = element(&mut tree, &format!("c{i}"));
        let attr = tree.create(NodeData::Attribute {
            name: "n".into(),
            value: i.to_string(),
        });
        tree.append_child(root, child).unwrap();
        tree.append_attribute(child, attr).unwrap();
        all.extend([child, attr]);
    }
    let bystander = element(&mut tree, "bystander");

    assert_eq!(tree.free_subtree(root).unwrap(), 21);
    assert_eq!(tree.live_count(), 1);
    assert!(all.iter().all(|&id| !tree.contains(id)));
    assert!(tree.contains(bystander));
}

#[test]
fn test_recycled_slots_get_new_generations() {
    let mut tree: XmlTree<u32> = XmlTree::with_capacity(4);
    let first = element(&mut tree, "first");
    tree.free_subtree(first).unwrap();

    let second = element(&mut tree, "second");
    assert_eq!(second.index(), first.index());
    assert_ne!(second.generation(), first.generation());
    assert_eq!(tree.get(first).map(|r| r.kind()), None);
    assert_eq!(tree.record(first).err(), Some(TreeError::NotFound(first)));
    assert_eq!(tree.slot_count(), 1);
}

#[test]
fn test_private_slot_travels_with_record() {
    let mut tree: XmlTree<u32> = XmlTree::new();
    let a = element(&mut tree, "a");
    let b = element(&mut tree, "b");
    *tree.private_mut(a).unwrap() = 7;
    tree.append_child(b, a).unwrap();

    assert_eq!(tree.private(a), Some(&7));
    assert_eq!(tree.private(b), Some(&0));

    tree.detach(a).unwrap();
    tree.free_subtree(a).unwrap();
    assert_eq!(tree.private(a), None);

    let c = element(&mut tree, "c");
    assert_eq!(tree.private(c), Some(&0));
}
