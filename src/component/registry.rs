//! Type-name dispatch for component implementations.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::builtin::{ChatInput, ChatOutput, LanguageModel, Prompt, TextConcat};
use super::Component;

/// Registry mapping component type names to implementations.
///
/// Populated once at process start; the executor resolves every vertex's
/// `component_type` through it. External component libraries plug in by
/// registering their implementations alongside (or instead of) the
/// built-ins.
///
/// # Examples
///
/// ```
/// use loomflow::component::ComponentRegistry;
///
/// let registry = ComponentRegistry::with_builtins();
/// assert!(registry.get("ChatInput").is_some());
/// assert!(registry.get("NoSuchComponent").is_none());
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    components: FxHashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in chat components.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .register("ChatInput", ChatInput)
            .register("Prompt", Prompt)
            .register("LanguageModel", LanguageModel::default())
            .register("ChatOutput", ChatOutput)
            .register("TextConcat", TextConcat)
    }

    /// Register an implementation under a type name. Re-registering a name
    /// replaces the previous implementation.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, component: impl Component + 'static) -> Self {
        self.components.insert(name.into(), Arc::new(component));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.components.get(name).cloned()
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
