//! Map configuration.

use std::sync::Arc;

use crate::eval::{Calculator, ExpressionEngine};
use crate::layout::{GenericLayout, Layout, NexusLayout};

/// Attribute holding an instrument-local dataset name.
pub const LOCAL_NAME_ATTR: &str = "local_name";

/// Attribute holding the class tag of a group.
pub const CLASS_ATTR: &str = "NX_class";

/// Configuration of an [`HdfMap`](crate::HdfMap).
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Emit `log::debug!` records while populating and evaluating.
    pub debug: bool,
    /// Attribute whose text overrides the structural name of a dataset.
    pub local_name_attr: String,
    /// Attribute whose text is the class tag of a group.
    pub class_attr: String,
    /// Name or address of the image dataset, overriding detection.
    pub default_image: Option<String>,
    /// Population and image detection strategy.
    pub layout: Arc<dyn Layout>,
    /// Evaluator for expressions and templates.
    pub engine: Arc<dyn ExpressionEngine>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            debug: false,
            local_name_attr: LOCAL_NAME_ATTR.to_string(),
            class_attr: CLASS_ATTR.to_string(),
            default_image: None,
            layout: Arc::new(GenericLayout),
            engine: Arc::new(Calculator),
        }
    }
}

impl MapConfig {
    /// Configuration for NeXus files, populating from the default entry.
    #[must_use]
    pub fn nexus() -> Self {
        Self::default().with_layout(NexusLayout::default())
    }

    /// Enable or disable debug logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the local name attribute.
    #[must_use]
    pub fn with_local_name_attr(mut self, attr: impl Into<String>) -> Self {
        self.local_name_attr = attr.into();
        self
    }

    /// Set the class tag attribute.
    #[must_use]
    pub fn with_class_attr(mut self, attr: impl Into<String>) -> Self {
        self.class_attr = attr.into();
        self
    }

    /// Set the default image name or address.
    #[must_use]
    pub fn with_default_image(mut self, name_or_address: impl Into<String>) -> Self {
        self.default_image = Some(name_or_address.into());
        self
    }

    /// Set the layout strategy.
    #[must_use]
    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Arc::new(layout);
        self
    }

    /// Set the expression engine.
    #[must_use]
    pub fn with_engine(mut self, engine: impl ExpressionEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert!(!config.debug);
        assert_eq!(config.local_name_attr, "local_name");
        assert_eq!(config.class_attr, "NX_class");
        assert!(config.default_image.is_none());
        assert_eq!(config.layout.name(), "generic");
    }

    #[test]
    fn test_builder_pattern() {
        let config = MapConfig::nexus()
            .with_debug(true)
            .with_default_image("pil3_100k")
            .with_class_attr("class");
        assert!(config.debug);
        assert_eq!(config.default_image.as_deref(), Some("pil3_100k"));
        assert_eq!(config.class_attr, "class");
        assert_eq!(config.layout.name(), "nexus");
    }
}
