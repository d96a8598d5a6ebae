//! path-addressable element tree and its xml serialization
//!
//! A [Document] is created from a skeleton for a job kind, mutated by attribute hooks and then
//! serialized with [Document::to_xml]. It is never kept around after that.
//!
//! Elements are addressed with a minimal [Path] syntax:
//! - `/project/properties` starts at the root element, which must be named `project`
//! - `//scm/localBranch` starts at the first `scm` element anywhere (document order)
//!
//! Every further step selects the first child with that name.
use indexmap::IndexMap;
use std::fmt::{Display, Write};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Element holding a single text/boolean/numeric value
    pub fn leaf(tag: impl Into<String>, value: impl Display) -> Self {
        Self::new(tag).with_text(value)
    }

    pub fn with_text(mut self, value: impl Display) -> Self {
        self.text = Some(value.to_string());
        self
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append `child` only when `value` is given
    pub fn child_if<T>(self, value: Option<T>, child: impl FnOnce(T) -> Element) -> Self {
        match value {
            Some(value) => self.child(child(value)),
            None => self,
        }
    }

    pub fn first_child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }

    fn write_xml(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.tag);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {key}=\"{}\"", escape(value, true));
        }

        let text = self.text.as_deref().filter(|text| !text.is_empty());
        match (text, self.children.is_empty()) {
            (None, true) => out.push_str("/>\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape(text, false), self.tag);
            }
            (text, false) => {
                out.push('>');
                if let Some(text) = text {
                    out.push_str(&escape(text, false));
                }
                out.push('\n');
                for child in &self.children {
                    child.write_xml(out, depth + 1);
                }
                let _ = writeln!(out, "{indent}</{}>", self.tag);
            }
        }
    }
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("path `{0}` must start with `/` or `//`")]
    Relative(String),
    #[error("path `{0}` contains an empty step")]
    EmptyStep(String),
    #[error("no element at `{0}`")]
    NotFound(Path),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// `/a` - the root element must be `a`
    Root,
    /// `//a` - the first `a` in document order
    Anywhere,
}

/// Parsed element path, see the [module documentation](self)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    anchor: Anchor,
    steps: Vec<String>,
}

impl Path {
    /// Path to the parent and the name of the last step
    fn split_last(&self) -> Option<(Path, &str)> {
        let (last, parent) = self.steps.split_last()?;
        let parent = Path {
            anchor: self.anchor,
            steps: parent.to_vec(),
        };
        Some((parent, last))
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let (anchor, rest) = if let Some(rest) = s.strip_prefix("//") {
            (Anchor::Anywhere, rest)
        } else if let Some(rest) = s.strip_prefix('/') {
            (Anchor::Root, rest)
        } else {
            return Err(PathError::Relative(s.to_string()));
        };

        let steps: Vec<String> = rest.split('/').map(str::to_string).collect();
        if steps.iter().any(String::is_empty) {
            return Err(PathError::EmptyStep(s.to_string()));
        }

        Ok(Path { anchor, steps })
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.anchor {
            Anchor::Root => f.write_str("/")?,
            Anchor::Anywhere => f.write_str("//")?,
        }
        f.write_str(&self.steps.join("/"))
    }
}

fn first_in_order<'a>(element: &'a Element, tag: &str) -> Option<&'a Element> {
    if element.tag == tag {
        return Some(element);
    }
    element
        .children
        .iter()
        .find_map(|child| first_in_order(child, tag))
}

fn first_in_order_mut<'a>(element: &'a mut Element, tag: &str) -> Option<&'a mut Element> {
    if element.tag == tag {
        return Some(element);
    }
    element
        .children
        .iter_mut()
        .find_map(|child| first_in_order_mut(child, tag))
}

fn first_parent_of_mut<'a>(element: &'a mut Element, tag: &str) -> Option<&'a mut Element> {
    if element.first_child(tag).is_some() {
        return Some(element);
    }
    element
        .children
        .iter_mut()
        .find_map(|child| first_parent_of_mut(child, tag))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn find(&self, path: &Path) -> Option<&Element> {
        let (first, rest) = path.steps.split_first()?;
        let mut element = match path.anchor {
            Anchor::Root => Some(&self.root).filter(|root| &root.tag == first)?,
            Anchor::Anywhere => first_in_order(&self.root, first)?,
        };

        for step in rest {
            element = element.first_child(step)?;
        }
        Some(element)
    }

    pub fn find_mut(&mut self, path: &Path) -> Option<&mut Element> {
        let (first, rest) = path.steps.split_first()?;
        let mut element = match path.anchor {
            Anchor::Root if &self.root.tag == first => &mut self.root,
            Anchor::Root => return None,
            Anchor::Anywhere => first_in_order_mut(&mut self.root, first)?,
        };

        for step in rest {
            element = element.children.iter_mut().find(|child| &child.tag == step)?;
        }
        Some(element)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// Remove all elements named by the last step of `path` from their parent
    ///
    /// Returns the number of removed elements, removing a missing element is a no-op.
    /// The root element itself is never removed.
    pub fn remove(&mut self, path: &Path) -> usize {
        let Some((parent_path, tag)) = path.split_last() else {
            return 0;
        };

        let parent = if parent_path.steps.is_empty() {
            match path.anchor {
                Anchor::Root => None,
                Anchor::Anywhere => first_parent_of_mut(&mut self.root, tag),
            }
        } else {
            self.find_mut(&parent_path)
        };

        let Some(parent) = parent else {
            return 0;
        };

        let before = parent.children.len();
        parent.children.retain(|child| child.tag != tag);
        let removed = before - parent.children.len();
        tracing::trace!(%path, removed, "remove");
        removed
    }

    /// Append `child` as last child of the element at `parent`
    pub fn append_child(&mut self, parent: &Path, child: Element) -> Result<(), PathError> {
        let element = self
            .find_mut(parent)
            .ok_or_else(|| PathError::NotFound(parent.clone()))?;
        tracing::trace!(%parent, tag = %child.tag, "append");
        element.children.push(child);
        Ok(())
    }

    /// Replace the text of the element at `path`
    pub fn set_text(&mut self, path: &Path, value: impl Display) -> Result<(), PathError> {
        let element = self
            .find_mut(path)
            .ok_or_else(|| PathError::NotFound(path.clone()))?;
        element.text = Some(value.to_string());
        Ok(())
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.root.write_xml(&mut out, 0);
        out
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    fn document() -> Document {
        Document::new(
            Element::new("project")
                .child(Element::leaf("description", "old"))
                .child(
                    Element::new("scm")
                        .attr("class", "hudson.plugins.git.GitSCM")
                        .child(Element::leaf("localBranch", "main"))
                        .child(Element::leaf("localBranch", "dup")),
                )
                .child(Element::new("properties")),
        )
    }

    #[test]
    fn parse_paths() {
        assert_eq!(path("//scm/localBranch").to_string(), "//scm/localBranch");
        assert_eq!(path("/project").to_string(), "/project");
        assert_eq!("".parse::<Path>(), Err(PathError::Empty));
        assert!(matches!("scm".parse::<Path>(), Err(PathError::Relative(_))));
        assert!(matches!("//a//b".parse::<Path>(), Err(PathError::EmptyStep(_))));
    }

    #[test]
    fn find_by_root_and_descendant() {
        let doc = document();
        assert_eq!(doc.find(&path("/project/description")).unwrap().text.as_deref(), Some("old"));
        assert_eq!(
            doc.find(&path("//localBranch")).unwrap().text.as_deref(),
            Some("main")
        );
        assert!(doc.find(&path("/other")).is_none());
        assert!(doc.find(&path("//scm/missing")).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut doc = document();
        assert_eq!(doc.remove(&path("//scm/localBranch")), 2);
        assert_eq!(doc.remove(&path("//scm/localBranch")), 0);
        assert_eq!(doc.remove(&path("//nothing/here")), 0);
        assert_eq!(doc.remove(&path("/project")), 0);
    }

    #[test]
    fn remove_then_append_equals_fresh() {
        let mut doc = Document::new(
            Element::new("project")
                .child(Element::new("properties"))
                .child(Element::leaf("description", "default")),
        );
        doc.remove(&path("//project/description"));
        doc.append_child(&path("//project"), Element::leaf("description", "mine"))
            .unwrap();

        let fresh = Document::new(
            Element::new("project")
                .child(Element::new("properties"))
                .child(Element::leaf("description", "mine")),
        );
        assert_eq!(doc.to_xml(), fresh.to_xml());
    }

    #[test]
    fn append_and_set_text_require_target() {
        let mut doc = document();
        let err = doc
            .append_child(&path("//builders"), Element::new("x"))
            .unwrap_err();
        assert_eq!(err, PathError::NotFound(path("//builders")));

        doc.set_text(&path("/project/description"), 42).unwrap();
        assert_eq!(doc.find(&path("//description")).unwrap().text.as_deref(), Some("42"));
    }

    #[test]
    fn serializes_xml() {
        let mut doc = document();
        doc.set_text(&path("//description"), "a < b & \"c\"").unwrap();
        doc.remove(&path("//scm/localBranch"));

        assert_eq!(
            doc.to_xml(),
            r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <description>a &lt; b &amp; "c"</description>
  <scm class="hudson.plugins.git.GitSCM"/>
  <properties/>
</project>
"#
        );
    }
}
