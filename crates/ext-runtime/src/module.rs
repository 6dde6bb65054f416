//! The extension declaration boundary.

use ext_model::ExtensionDescriptor;

use crate::component::ComponentDef;
use crate::error::BoxError;
use crate::layer::Layer;

/// What an extension contributes to the runtime.
pub trait ExtensionModule: Send + Sync {
    /// Identity, parent and contributed classes.
    fn descriptor(&self) -> ExtensionDescriptor;

    /// Component registrations for the declared classes.
    fn components(&self) -> Vec<ComponentDef>;

    /// Called once, when the module's isolation layer exists and before its
    /// container is built. An error fails this extension.
    fn on_layer_ready(&self, _layer: &Layer) -> Result<(), BoxError> {
        Ok(())
    }
}

type LayerHook = Box<dyn Fn(&Layer) -> Result<(), BoxError> + Send + Sync>;

/// A module assembled from a descriptor and component list.
pub struct DeclaredModule {
    descriptor: ExtensionDescriptor,
    components: Vec<ComponentDef>,
    hook: Option<LayerHook>,
}

impl DeclaredModule {
    pub fn new(descriptor: ExtensionDescriptor) -> Self {
        Self {
            descriptor,
            components: Vec::new(),
            hook: None,
        }
    }

    pub fn component(mut self, component: ComponentDef) -> Self {
        self.components.push(component);
        self
    }

    pub fn components(mut self, components: impl IntoIterator<Item = ComponentDef>) -> Self {
        self.components.extend(components);
        self
    }

    pub fn with_layer_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Layer) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }
}

impl ExtensionModule for DeclaredModule {
    fn descriptor(&self) -> ExtensionDescriptor {
        self.descriptor.clone()
    }

    fn components(&self) -> Vec<ComponentDef> {
        self.components.clone()
    }

    fn on_layer_ready(&self, layer: &Layer) -> Result<(), BoxError> {
        match &self.hook {
            Some(hook) => hook(layer),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DeclaredModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclaredModule")
            .field("descriptor", &self.descriptor)
            .field("components", &self.components)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
