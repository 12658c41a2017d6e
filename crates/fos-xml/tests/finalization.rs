//! Reclamation tests for fos-xml
//!
//! Dropping proxies in any order, on any thread, must free each engine
//! record exactly once and never leave a reachable handle to freed storage.

use std::thread;

use fos_xml::{Document, Node, SlotState, Store, XmlError};

// ============================================================================
// SUBTREE RECLAMATION
// ============================================================================

#[test]
fn test_dropping_root_frees_tree() {
    let store = Store::new();
    let root = store.element("root");
    for i in 0..5 {
        let child = root.add_element(&format!("c{i}"), Some("text")).unwrap();
        child.set_attribute("n", &i.to_string()).unwrap();
    }
    // root + 5 * (element, text, attribute)
    assert_eq!(store.live_records(), 16);

    drop(root);
    assert_eq!(store.live_records(), 0);
    assert_eq!(store.pending_finalizers(), 0);
}

#[test]
fn test_child_keeps_root_alive() {
    let store = Store::new();
    let root = store.element("root");
    let root_handle = root.handle();
    let child = root.add_element("child", None).unwrap();

    drop(root);
    assert_eq!(store.live_records(), 2);
    assert_eq!(store.slot_state(root_handle), SlotState::Live);

    let parent = child.parent().unwrap().unwrap();
    assert_eq!(parent.handle(), root_handle);
    assert_eq!(child.owner(), parent);
    drop(parent);

    drop(child);
    assert_eq!(store.live_records(), 0);
    assert_eq!(store.slot_state(root_handle), SlotState::Detached);
}

#[test]
fn test_drop_order_does_not_matter() {
    let store = Store::new();

    let root = store.element("root");
    let a = root.add_element("a", None).unwrap();
    let b = a.add_element("b", None).unwrap();
    drop(b);
    drop(a);
    drop(root);
    assert_eq!(store.live_records(), 0);

    let root = store.element("root");
    let a = root.add_element("a", None).unwrap();
    let b = a.add_element("b", None).unwrap();
    drop(root);
    drop(a);
    assert_eq!(store.live_records(), 3);
    drop(b);
    assert_eq!(store.live_records(), 0);
}

#[test]
fn test_freed_descendants_resolve_to_detached() {
    let store = Store::new();
    let root = store.element("root");
    let handles: Vec<_> = {
        let a = root.add_element("a", Some("deep")).unwrap();
        let b = a.add_element("b", None).unwrap();
        let text = a.first_child().unwrap().unwrap();
        vec![a.handle(), b.handle(), text.handle()]
    };

    drop(root);

    for handle in handles {
        assert_eq!(store.slot_state(handle), SlotState::Detached);
        assert_eq!(store.resolve(handle), Err(XmlError::Detached));
    }
}

#[test]
fn test_unmaterialized_records_are_freed() {
    let store = Store::new();
    let element = store.element("p");
    element.set_content("never visited").unwrap();
    let text = store
        .read(|tree| tree.get(element.handle()).and_then(|r| r.first_child))
        .unwrap();
    assert_eq!(store.slot_state(text), SlotState::Empty);

    drop(element);
    assert_eq!(store.slot_state(text), SlotState::Detached);
    assert_eq!(store.live_records(), 0);
}

#[test]
fn test_recycled_slot_is_not_aliased() {
    let store = Store::new();
    let old = store.element("old");
    let stale = old.handle();
    drop(old);

    let fresh = store.element("fresh");
    assert_eq!(fresh.handle().index(), stale.index());
    assert_ne!(fresh.handle(), stale);
    assert_eq!(store.resolve(stale), Err(XmlError::Detached));
    assert_eq!(fresh.name().unwrap().as_deref(), Some("fresh"));
}

// ============================================================================
// LINK / UNLINK SCENARIOS
// ============================================================================

#[test]
fn test_unlinked_child_is_freed_on_drop() {
    let store = Store::new();
    let root = store.element("R");
    let c1 = store.element("C1");
    c1.add_element("inner", None).unwrap();

    root.link(&c1).unwrap();
    assert_eq!(c1.owner(), root);

    c1.unlink().unwrap();
    assert!(c1.is_self_owning());
    assert!(root.is_self_owning());
    assert!(!root.has_children().unwrap());

    let handle = c1.handle();
    drop(c1);

    assert_eq!(store.slot_state(handle), SlotState::Detached);
    assert_eq!(store.resolve(handle), Err(XmlError::Detached));
    assert_eq!(store.live_records(), 1);
    assert!(root.is_attached());
}

#[test]
fn test_linked_root_no_longer_frees() {
    let store = Store::new();
    let a = store.element("a");
    let b = store.element("b");
    b.add_element("b1", None).unwrap();

    a.link(&b).unwrap();
    drop(b);
    assert_eq!(store.live_records(), 3);
    assert_eq!(a.count_children().unwrap(), 1);

    drop(a);
    assert_eq!(store.live_records(), 0);
}

#[test]
fn test_old_root_released_by_move() {
    let store = Store::new();
    let left = store.element("left");
    let moved = left.add_element("moved", None).unwrap();
    let right = store.element("right");

    // `moved` was the last thing keeping `left` alive
    drop(left);
    assert_eq!(store.live_records(), 3);

    right.link(&moved).unwrap();
    assert_eq!(store.live_records(), 2);
    assert_eq!(moved.owner(), right);
}

#[test]
fn test_document_tree_freed_with_document() {
    let store = Store::new();
    let doc = store.document();
    let root = doc.create_element("root");
    doc.set_root(&root).unwrap();
    doc.set_dtd(&doc.create_dtd("root", None, None)).unwrap();
    root.add_element("child", Some("x")).unwrap();

    drop(doc);
    assert_eq!(store.live_records(), 5);

    let doc = root.document().unwrap().unwrap();
    assert_eq!(doc.dtd().unwrap().unwrap().name().unwrap().as_deref(), Some("root"));
    drop(doc);

    drop(root);
    assert_eq!(store.live_records(), 0);
}

#[test]
fn test_set_content_frees_released_children() {
    let store = Store::new();
    let element = store.element("e");
    element.add_element("a", Some("1")).unwrap();
    element.add_element("b", Some("2")).unwrap();
    assert_eq!(store.live_records(), 5);

    element.set_content("flat").unwrap();
    assert_eq!(store.live_records(), 2);
    assert_eq!(store.pending_finalizers(), 0);
}

// ============================================================================
// CONCURRENT DROPS
// ============================================================================

#[test]
fn test_drops_from_many_threads() {
    let store = Store::new();
    let root = store.element("root");
    let mut nodes: Vec<Node> = Vec::new();
    for i in 0..64 {
        let child = root.add_element(&format!("c{i}"), None).unwrap();
        nodes.push(child.add_element("leaf", Some("x")).unwrap());
        nodes.push(child);
    }
    nodes.push(root);
    assert_eq!(store.live_records(), 1 + 64 * 3);

    let chunks: Vec<Vec<Node>> = nodes.chunks(16).map(<[Node]>::to_vec).collect();
    drop(nodes);

    let workers: Vec<_> = chunks
        .into_iter()
        .map(|chunk| thread::spawn(move || drop(chunk)))
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.live_records(), 0);
    assert_eq!(store.pending_finalizers(), 0);
}

#[test]
fn test_mutation_while_other_threads_drop() {
    let store = Store::new();
    let target = store.element("target");

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            let target = target.clone();
            thread::spawn(move || {
                for i in 0..32 {
                    let node = store.element(&format!("t{t}n{i}"));
                    target.link(&node).unwrap();
                    node.unlink().unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(target.count_children().unwrap(), 0);
    assert_eq!(store.live_records(), 1);
    assert_eq!(store.pending_finalizers(), 0);
}

#[test]
fn test_child_lists_while_other_threads_unlink() {
    let store = Store::new();
    let root = store.element("root");
    root.add_element("fixed", None).unwrap();

    let writer = {
        let root = root.clone();
        thread::spawn(move || {
            for _ in 0..2000 {
                let child = root.add_element("x", None).unwrap();
                child.unlink().unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let root = root.clone();
            thread::spawn(move || {
                for _ in 0..2000 {
                    let children: Vec<_> = root.children().unwrap().collect();
                    assert!(!children.is_empty());
                    for child in children {
                        assert!(child.is_attached());
                        assert!(child.owner() == root || child.is_self_owning());
                    }
                    assert!(root.elements().unwrap().len() >= 1);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(root.count_children().unwrap(), 1);
    assert_eq!(store.live_records(), 2);
    assert_eq!(store.pending_finalizers(), 0);
}

#[test]
fn test_documents_in_separate_stores_are_independent() {
    let a = Document::new();
    let b = Document::new();
    a.set_root(&a.create_element("a")).unwrap();
    b.set_root(&b.create_element("b")).unwrap();

    let store_b = b.store().clone();
    drop(b);
    assert_eq!(store_b.live_records(), 0);
    assert_eq!(a.store().live_records(), 2);
}
