//! attribute registry
//!
//! An attribute is a named transformation of a job [Document]. Each [AttributeDescriptor]
//! pairs an optional `before` hook with a required `xml` hook, and they only run together
//! through [AttributeDescriptor::apply]:
//!
//! 1. `before` removes elements the attribute is about to provide, so defaults of the
//!    skeleton (or a previous application) are not duplicated
//! 2. `xml` returns an [Injection] which is placed at the descriptor's `xml_path`
//!
//! The registry also tracks which capabilities (server plugins) are installed, so attributes
//! configuring a missing plugin can be reported before their jobs are built.
use crate::document::{Document, Element, Path};
use crate::error::Error;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Capability id of attributes that configure features every server has
pub const BUILTIN: &str = "builtin";

pub type BeforeHook = Arc<dyn Fn(&mut Document, &Value) -> Result<(), Error> + Send + Sync>;
pub type XmlHook = Arc<dyn Fn(&Value) -> Result<Injection, Error> + Send + Sync>;

/// Output of an `xml` hook
#[derive(Debug, Clone, PartialEq)]
pub enum Injection {
    /// Appended to the element at `xml_path`, in order
    Elements(Vec<Element>),
    /// Replaces the text of the element at `xml_path`
    Text(String),
    /// Leave the document as it is
    Nothing,
}

impl From<Element> for Injection {
    fn from(value: Element) -> Self {
        Injection::Elements(vec![value])
    }
}

#[derive(Clone)]
pub struct AttributeDescriptor {
    pub name: String,
    pub capability_id: String,
    pub description: String,
    pub display_name: String,
    pub announced: bool,
    pub xml_path: Path,
    before: Option<BeforeHook>,
    xml: XmlHook,
}

impl AttributeDescriptor {
    pub fn new(
        name: impl Into<String>,
        xml_path: Path,
        xml: impl Fn(&Value) -> Result<Injection, Error> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            capability_id: BUILTIN.to_string(),
            description: String::new(),
            announced: true,
            xml_path,
            before: None,
            xml: Arc::new(xml),
        }
    }

    pub fn capability(mut self, capability_id: impl Into<String>) -> Self {
        self.capability_id = capability_id.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn announced(mut self, announced: bool) -> Self {
        self.announced = announced;
        self
    }

    pub fn before(
        mut self,
        before: impl Fn(&mut Document, &Value) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Self {
        self.before = Some(Arc::new(before));
        self
    }

    pub fn has_before(&self) -> bool {
        self.before.is_some()
    }

    /// Run both phases against `document`
    ///
    /// Any failure leaves the document in an unspecified state, it must not be published.
    pub fn apply(&self, document: &mut Document, params: &Value) -> Result<(), Error> {
        if let Some(before) = &self.before {
            before(document, params)?;
        }

        match (self.xml)(params)? {
            Injection::Elements(elements) => {
                for element in elements {
                    document.append_child(&self.xml_path, element)?;
                }
            }
            Injection::Text(text) => document.set_text(&self.xml_path, text)?,
            Injection::Nothing => {}
        }

        Ok(())
    }
}

impl std::fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("capability_id", &self.capability_id)
            .field("display_name", &self.display_name)
            .field("announced", &self.announced)
            .field("xml_path", &self.xml_path.to_string())
            .field("before", &self.before.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Default, Debug)]
pub struct AttributeRegistry {
    attributes: IndexMap<String, AttributeDescriptor>,
    /// Installed capability id -> version, `None` until known
    capabilities: Option<IndexMap<String, String>>,
}

impl AttributeRegistry {
    /// Registry holding the attributes of [crate::attributes::register_builtin]
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        crate::attributes::register_builtin(&mut registry);
        registry
    }

    /// Store a descriptor, replacing (and returning) one registered under the same name
    pub fn register(&mut self, descriptor: AttributeDescriptor) -> Option<AttributeDescriptor> {
        tracing::trace!(name = %descriptor.name, "register attribute");
        self.attributes.insert(descriptor.name.clone(), descriptor)
    }

    pub fn lookup(&self, name: &str) -> Result<&AttributeDescriptor, Error> {
        self.attributes
            .get(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Forget every descriptor and all capability versions
    pub fn clear_all(&mut self) {
        self.attributes.clear();
        self.capabilities = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    /// Descriptors advertised to users
    pub fn announced(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.iter().filter(|descriptor| descriptor.announced)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn set_installed_capabilities(&mut self, capabilities: IndexMap<String, String>) {
        tracing::debug!(count = capabilities.len(), "installed capabilities");
        self.capabilities = Some(capabilities);
    }

    pub fn clear_versions(&mut self) {
        self.capabilities = None;
    }

    pub fn installed_version(&self, capability_id: &str) -> Option<&str> {
        self.capabilities
            .as_ref()?
            .get(capability_id)
            .map(String::as_str)
    }

    /// Check that the plugin an attribute configures is installed
    ///
    /// Builtin attributes always pass, as does everything while the installed capabilities are
    /// unknown.
    pub fn check_capability(&self, descriptor: &AttributeDescriptor) -> Result<(), Error> {
        if descriptor.capability_id == BUILTIN {
            return Ok(());
        }

        let Some(capabilities) = &self.capabilities else {
            return Ok(());
        };

        match capabilities.get(&descriptor.capability_id) {
            Some(version) => {
                tracing::trace!(attribute = %descriptor.name, capability = %descriptor.capability_id, %version, "capability installed");
                Ok(())
            }
            None => Err(Error::MissingCapability {
                attribute: descriptor.name.clone(),
                capability: descriptor.capability_id.clone(),
            }),
        }
    }
}
