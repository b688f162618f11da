//! Mutable in-memory tree of an OME-XML document.
//!
//! Elements live in an arena owned by [`Document`] and are addressed by
//! [`ElementId`] handles. Removing a subtree detaches it from its parent; the
//! arena slot stays allocated but is no longer reachable from the root, so
//! handles held by callers never dangle.
//!
//! Element lookups compare local names: `ome:Image` and `Image` both match
//! `"Image"`.

use std::borrow::Cow;

// =============================================================================
// Node Types
// =============================================================================

/// Handle to an element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// A single `name="value"` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// One child of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(ElementId),
    /// Unescaped character data
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Content>,
    parent: Option<ElementId>,
}

impl Element {
    fn new(name: impl Into<String>, parent: Option<ElementId>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// Strip a namespace prefix from a qualified name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

// =============================================================================
// Document
// =============================================================================

/// An OME-XML document: a single root element plus any comments before it.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    root: ElementId,
    prolog: Vec<String>,
}

impl Document {
    /// Create a document holding only an empty root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            elements: vec![Element::new(root_name, None)],
            root: ElementId(0),
            prolog: Vec::new(),
        }
    }

    /// The root element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Comments that precede the root element.
    pub fn prolog_comments(&self) -> &[String] {
        &self.prolog
    }

    pub(crate) fn push_prolog_comment(&mut self, comment: String) {
        self.prolog.push(comment);
    }

    /// Qualified tag name of an element.
    pub fn name(&self, el: ElementId) -> &str {
        &self.elements[el.0].name
    }

    /// Parent element, `None` for the root and for detached elements.
    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.elements[el.0].parent
    }

    /// All children in document order, including text and comments.
    pub fn contents(&self, el: ElementId) -> &[Content] {
        &self.elements[el.0].children
    }

    /// Child elements in document order.
    pub fn children(&self, el: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.contents(el).iter().filter_map(|c| match c {
            Content::Element(id) => Some(*id),
            _ => None,
        })
    }

    /// Attributes in stored order.
    pub fn attributes(&self, el: ElementId) -> &[Attribute] {
        &self.elements[el.0].attributes
    }

    /// Value of an attribute, matched case-sensitively.
    pub fn attribute(&self, el: ElementId, name: &str) -> Option<&str> {
        self.attributes(el)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute<'v>(
        &mut self,
        el: ElementId,
        name: &str,
        value: impl Into<Cow<'v, str>>,
    ) {
        let value = value.into().into_owned();
        let attributes = &mut self.elements[el.0].attributes;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Append a new child element and return its handle.
    pub fn append_element(&mut self, parent: ElementId, name: impl Into<String>) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Element::new(name, Some(parent)));
        self.elements[parent.0].children.push(Content::Element(id));
        id
    }

    /// Append a non-element child (text, CDATA or comment).
    ///
    /// `Content::Element` values are ignored; use [`Document::append_element`].
    pub fn append_content(&mut self, parent: ElementId, content: Content) {
        if !matches!(content, Content::Element(_)) {
            self.elements[parent.0].children.push(content);
        }
    }

    /// Detach an element and everything below it from its parent.
    ///
    /// No-op for the root and for elements that are already detached.
    pub fn remove_subtree(&mut self, el: ElementId) {
        let Some(parent) = self.elements[el.0].parent.take() else {
            return;
        };
        self.elements[parent.0]
            .children
            .retain(|c| *c != Content::Element(el));
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Elements below `from` (excluding it) with the given local name, in
    /// document order.
    pub fn descendants_named(&self, from: ElementId, name: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.children(from).collect();
        stack.reverse();

        while let Some(id) = stack.pop() {
            if local_name(self.name(id)) == name {
                found.push(id);
            }
            let start = stack.len();
            stack.extend(self.children(id));
            stack[start..].reverse();
        }

        found
    }

    /// Attached elements with the given local name, in document order,
    /// including the root.
    pub fn elements_named(&self, name: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        if local_name(self.name(self.root)) == name {
            found.push(self.root);
        }
        found.extend(self.descendants_named(self.root, name));
        found
    }

    /// `Image` elements in document order. The first is the primary image.
    pub fn images(&self) -> Vec<ElementId> {
        self.elements_named("Image")
    }

    /// The `Pixels` element of an image.
    ///
    /// OME requires exactly one per image; `None` only for documents that
    /// break that rule.
    pub fn pixels_of(&self, image: ElementId) -> Option<ElementId> {
        self.descendants_named(image, "Pixels").into_iter().next()
    }

    /// `Channel` elements of a `Pixels` element, in order.
    pub fn channels_of(&self, pixels: ElementId) -> Vec<ElementId> {
        self.descendants_named(pixels, "Channel")
    }
}
