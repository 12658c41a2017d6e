//! Namespaces
//!
//! Namespaces are declared with `xmlns` and `xmlns:prefix` attributes and
//! referenced through `prefix:local` names. Resolution walks from a node up
//! through its element ancestors, so a moved subtree picks up the bindings
//! of its new position. An empty `xmlns=""` undeclares the default
//! namespace.

use fos_xmltree::{NodeData, NodeId};

use crate::store::Tree;
use crate::{Node, XmlResult};

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declarations themselves
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

impl Node {
    /// Namespace URI of the node's name
    ///
    /// Elements without a prefix take the default namespace; attributes
    /// without a prefix have none. Other node kinds have no namespace.
    pub fn namespace(&self) -> XmlResult<Option<String>> {
        self.peek(|tree, record| {
            let (name, attribute) = match &record.data {
                NodeData::Element { name } => (name.as_str(), false),
                NodeData::Attribute { name, .. } => (name.as_str(), true),
                _ => return Ok(None),
            };
            if attribute && name == "xmlns" {
                return Ok(Some(XMLNS_NAMESPACE.to_string()));
            }
            match split_prefix(name) {
                Some("xml") => Ok(Some(XML_NAMESPACE.to_string())),
                Some("xmlns") => Ok(Some(XMLNS_NAMESPACE.to_string())),
                Some(prefix) => lookup(tree, self.handle(), prefix),
                None if attribute => Ok(None),
                None => lookup(tree, self.handle(), ""),
            }
        })
    }

    pub fn has_namespace(&self) -> XmlResult<bool> {
        Ok(self.namespace()?.is_some())
    }

    /// Namespaces in scope at this node as `(prefix, uri)` pairs
    ///
    /// The nearest declaration of each prefix wins and comes first; the
    /// default namespace has an empty prefix.
    pub fn namespaces(&self) -> XmlResult<Vec<(String, String)>> {
        self.peek(|tree, _| {
            let mut scope: Vec<(String, String)> = Vec::new();
            let mut shadowed: Vec<String> = Vec::new();
            visit_declarations(tree, self.handle(), |prefix, uri| {
                if shadowed.iter().any(|p| p == prefix) {
                    return false;
                }
                shadowed.push(prefix.to_string());
                if !uri.is_empty() {
                    scope.push((prefix.to_string(), uri.to_string()));
                }
                false
            })?;
            Ok(scope)
        })
    }
}

/// Prefix of a qualified name, if it has one
fn split_prefix(name: &str) -> Option<&str> {
    name.split_once(':').map(|(prefix, _)| prefix)
}

/// Prefix declared by an attribute name; `""` for the default namespace
fn declared_prefix(name: &str) -> Option<&str> {
    match name {
        "xmlns" => Some(""),
        _ => name.strip_prefix("xmlns:"),
    }
}

/// URI bound to `prefix` at `start`; an empty binding means none
fn lookup(tree: &Tree, start: NodeId, prefix: &str) -> XmlResult<Option<String>> {
    let mut found = None;
    visit_declarations(tree, start, |declared, uri| {
        if declared != prefix {
            return false;
        }
        found = Some(uri.to_string());
        true
    })?;
    Ok(found.filter(|uri| !uri.is_empty()))
}

/// Call `visit(prefix, uri)` for declarations from `start` upwards
///
/// Elements are visited nearest first, declarations in attribute order.
/// Stops early when `visit` returns `true`.
fn visit_declarations(
    tree: &Tree,
    start: NodeId,
    mut visit: impl FnMut(&str, &str) -> bool,
) -> XmlResult<()> {
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        let record = tree.record(id)?;
        let mut attr = record.first_attr;
        while let Some(attr_id) = attr {
            let attr_record = tree.record(attr_id)?;
            if let NodeData::Attribute { name, value } = &attr_record.data {
                if let Some(prefix) = declared_prefix(name) {
                    if visit(prefix, value) {
                        return Ok(());
                    }
                }
            }
            attr = attr_record.next_sibling;
        }
        cursor = record.parent;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn test_prefix_parsing() {
        assert_eq!(split_prefix("svg:rect"), Some("svg"));
        assert_eq!(split_prefix("rect"), None);
        assert_eq!(declared_prefix("xmlns"), Some(""));
        assert_eq!(declared_prefix("xmlns:svg"), Some("svg"));
        assert_eq!(declared_prefix("xmlnsx"), None);
    }

    #[test]
    fn test_default_namespace() {
        let store = Store::new();
        let parent = store.element("parent");
        parent.set_attribute("xmlns", "http://www.foobar.org").unwrap();
        let child = parent.add_element("child", None).unwrap();
        child.set_attribute("id", "1").unwrap();
        let id = child.attributes().unwrap().next().unwrap();

        assert_eq!(parent.namespace().unwrap().as_deref(), Some("http://www.foobar.org"));
        assert_eq!(child.namespace().unwrap().as_deref(), Some("http://www.foobar.org"));
        assert!(child.has_namespace().unwrap());
        assert_eq!(id.namespace().unwrap(), None);

        let text = store.text("t");
        child.link(&text).unwrap();
        assert_eq!(text.namespace().unwrap(), None);
    }

    #[test]
    fn test_prefixed_names() {
        let store = Store::new();
        let root = store.element("root");
        root.set_attribute("xmlns:svg", "http://www.w3.org/2000/svg").unwrap();
        let rect = root.add_element("svg:rect", None).unwrap();
        rect.set_attribute("svg:width", "10").unwrap();
        rect.set_attribute("xml:lang", "en").unwrap();
        let attrs: Vec<_> = rect.attributes().unwrap().collect();

        assert_eq!(root.namespace().unwrap(), None);
        assert_eq!(rect.namespace().unwrap().as_deref(), Some("http://www.w3.org/2000/svg"));
        assert_eq!(attrs[0].namespace().unwrap().as_deref(), Some("http://www.w3.org/2000/svg"));
        assert_eq!(attrs[1].namespace().unwrap().as_deref(), Some(XML_NAMESPACE));

        let undeclared = root.add_element("math:mi", None).unwrap();
        assert!(!undeclared.has_namespace().unwrap());
    }

    #[test]
    fn test_namespaces_in_scope() {
        let store = Store::new();
        let outer = store.element("outer");
        outer.set_attribute("xmlns", "urn:outer").unwrap();
        outer.set_attribute("xmlns:a", "urn:a").unwrap();
        let inner = outer.add_element("inner", None).unwrap();
        inner.set_attribute("xmlns:a", "urn:a2").unwrap();
        inner.set_attribute("xmlns:b", "urn:b").unwrap();

        assert_eq!(
            inner.namespaces().unwrap(),
            vec![
                ("a".to_string(), "urn:a2".to_string()),
                ("b".to_string(), "urn:b".to_string()),
                ("".to_string(), "urn:outer".to_string()),
            ]
        );

        // Undeclaring the default namespace hides the outer one
        inner.set_attribute("xmlns", "").unwrap();
        assert_eq!(inner.namespace().unwrap(), None);
        assert_eq!(inner.namespaces().unwrap().len(), 2);

        // Moving a subtree changes the bindings it sees
        inner.unlink().unwrap();
        assert_eq!(
            inner.namespaces().unwrap(),
            vec![
                ("a".to_string(), "urn:a2".to_string()),
                ("b".to_string(), "urn:b".to_string()),
            ]
        );
    }
}
