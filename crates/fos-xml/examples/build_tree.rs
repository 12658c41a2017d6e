//! Example: build, restructure and release an XML tree
//!
//! Run with `RUST_LOG=fos_xml=debug` to watch links, sweeps and frees.

use fos_xml::{Document, Node, SlotState};

fn print_tree(node: &Node, depth: usize) -> anyhow::Result<()> {
    let label = match node.name()? {
        Some(name) => name,
        None => format!("{:?}", node.content()?),
    };
    println!("{}{} [{}]", "  ".repeat(depth), label, node.kind()?);
    for child in node.children()? {
        print_tree(&child, depth + 1)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let doc = Document::new();
    doc.set_dtd(&doc.create_dtd("catalog", Some("catalog.dtd"), None))?;

    let catalog = doc.create_element("catalog");
    doc.set_root(&catalog)?;
    for title in ["Dune", "Hyperion", "Solaris"] {
        let book = catalog.add_element("book", None)?;
        book.set_attribute("lang", "en")?;
        book.add_element("title", Some(title))?;
    }
    print_tree(doc.node(), 0)?;

    // Take the second book out; it keeps its own subtree alive
    let hyperion = catalog.elements()?.nth(1).ok_or_else(|| anyhow::anyhow!("missing book"))?;
    println!("second book at {} (depth {})", hyperion.path()?, hyperion.depth()?);
    hyperion.unlink()?;
    println!("unlinked book owns itself: {}", hyperion.is_self_owning());

    // Swap in a new root; the old one comes back detached
    let archive = doc.create_element("archive");
    if let Some(old) = doc.set_root(&archive)? {
        archive.link(&old)?;
    }
    archive.link(&hyperion)?;
    print_tree(doc.node(), 0)?;

    let store = doc.store().clone();
    let handle = hyperion.handle();
    println!("live records: {}", store.live_records());

    drop(hyperion);
    drop(archive);
    drop(catalog);
    drop(doc);

    println!("live records after drop: {}", store.live_records());
    assert_eq!(store.slot_state(handle), SlotState::Detached);
    Ok(())
}
