//! Tag -> constructor table used when materializing elements.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use js::NodeKey;
use once_cell::sync::Lazy;

use crate::error::DomError;
use crate::node::{ElementData, NativeHandle};

/// The root element's tag. It is created with the tree, never by the factory.
pub const ROOT_BODY_TAG: &str = "body";

/// Tags every factory built with [`ElementFactory::with_builtin_types`] knows.
pub const BUILTIN_TAGS: &[&str] = &[
    "a", "audio", "br", "button", "canvas", "div", "h1", "h2", "h3", "h4", "h5", "h6", "iframe",
    "img", "input", "label", "li", "object", "ol", "p", "pre", "select", "span", "strong",
    "textarea", "ul", "video",
];

/// What a constructor receives.
#[derive(Debug, Clone, Copy)]
pub struct ElementInit<'tag> {
    pub handle: NodeKey,
    /// Lowercase tag.
    pub tag: &'tag str,
    pub native: Option<NativeHandle>,
}

/// Builds the initial state of an element.
pub type ElementConstructor = dyn Fn(&ElementInit<'_>) -> ElementData + Send + Sync;

/// Registration table shared by every context of the process.
///
/// Registration is expected during warm-up only; lookups take a read lock.
pub struct ElementFactory {
    constructors: RwLock<HashMap<String, Arc<ElementConstructor>>>,
}

static GLOBAL_FACTORY: Lazy<Arc<ElementFactory>> =
    Lazy::new(|| Arc::new(ElementFactory::with_builtin_types()));

impl ElementFactory {
    /// An empty table: every tag falls back to an unknown element.
    pub fn new() -> Self {
        Self { constructors: RwLock::new(HashMap::new()) }
    }

    /// A table holding the builtin tags.
    pub fn with_builtin_types() -> Self {
        let factory = Self::new();
        factory.ensure_builtin_types();
        factory
    }

    /// The process-wide factory.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_FACTORY)
    }

    /// Register `constructor` for `tag` (case-insensitive).
    ///
    /// # Errors
    /// `DuplicateTypeDefinition` when the tag already has a constructor;
    /// `Argument` for an empty tag or the root body tag.
    pub fn define_type<C>(&self, tag: &str, constructor: C) -> Result<(), DomError>
    where
        C: Fn(&ElementInit<'_>) -> ElementData + Send + Sync + 'static,
    {
        let tag = tag.to_ascii_lowercase();
        if tag.is_empty() || tag == ROOT_BODY_TAG {
            return Err(DomError::Argument(format!("'{tag}' cannot be defined as an element type")));
        }
        let mut constructors = self.constructors.write().unwrap_or_else(PoisonError::into_inner);
        if constructors.contains_key(&tag) {
            return Err(DomError::DuplicateTypeDefinition(tag));
        }
        constructors.insert(tag, Arc::new(constructor));
        Ok(())
    }

    /// Define the builtin tags that are still missing. Safe to call from
    /// several contexts during start-up.
    pub fn ensure_builtin_types(&self) {
        let builtin: Arc<ElementConstructor> = Arc::new(builtin_constructor);
        let mut constructors = self.constructors.write().unwrap_or_else(PoisonError::into_inner);
        for tag in BUILTIN_TAGS {
            constructors.entry((*tag).to_owned()).or_insert_with(|| Arc::clone(&builtin));
        }
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&tag.to_ascii_lowercase())
    }

    /// Construct the element state for `tag`.
    ///
    /// Returns `None` for the root body tag. Unknown tags produce a generic
    /// element flagged `unknown`.
    pub fn create_for(&self, handle: NodeKey, tag: &str, native: Option<NativeHandle>) -> Option<ElementData> {
        let tag = tag.to_ascii_lowercase();
        if tag == ROOT_BODY_TAG {
            return None;
        }
        let constructor = self
            .constructors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tag)
            .cloned();
        let init = ElementInit { handle, tag: &tag, native };
        let data = match constructor {
            Some(constructor) => constructor(&init),
            None => {
                log::warn!("unknown element type '{tag}' for {handle}, creating a generic element");
                ElementData { unknown: true, ..builtin_constructor(&init) }
            }
        };
        Some(data)
    }
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_constructor(init: &ElementInit<'_>) -> ElementData {
    let mut data = ElementData::new(init.tag);
    data.native = init.native;
    if init.tag == "input" {
        data.properties.insert(String::from("type"), js::JSValue::from("text"));
    }
    data
}
