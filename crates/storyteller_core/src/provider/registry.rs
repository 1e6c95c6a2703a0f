//! In-process provider registry with active selection.

use crate::model::document::Intents;
use crate::provider::spi::{
    ContinuationProvider, ProviderError, ProviderResult, RewriteProvider, SuggestionProvider,
};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const REGISTRY_PROVIDER_ID: &str = "registry";

/// Registration/selection errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRegistryError {
    InvalidProviderId(String),
    DuplicateProviderId(String),
    ProviderNotFound(String),
}

impl Display for ProviderRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderId(value) => write!(f, "provider id is invalid: {value}"),
            Self::DuplicateProviderId(value) => {
                write!(f, "provider id already registered: {value}")
            }
            Self::ProviderNotFound(value) => write!(f, "provider not found: {value}"),
        }
    }
}

impl Error for ProviderRegistryError {}

/// Registry of suggestion providers; delegates calls to the active one.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn SuggestionProvider>>,
    active_provider_id: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding one provider, already selected.
    pub fn with_active(
        provider: Arc<dyn SuggestionProvider>,
    ) -> Result<Self, ProviderRegistryError> {
        let mut registry = Self::new();
        let id = provider.provider_id().trim().to_string();
        registry.register(provider)?;
        registry.select_active(&id)?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        provider: Arc<dyn SuggestionProvider>,
    ) -> Result<(), ProviderRegistryError> {
        let provider_id = provider.provider_id().trim().to_string();
        if !is_valid_provider_id(&provider_id) {
            return Err(ProviderRegistryError::InvalidProviderId(provider_id));
        }
        if self.providers.contains_key(provider_id.as_str()) {
            return Err(ProviderRegistryError::DuplicateProviderId(provider_id));
        }
        self.providers.insert(provider_id, provider);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Sorted provider ids.
    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn select_active(&mut self, provider_id: &str) -> Result<(), ProviderRegistryError> {
        let normalized = provider_id.trim();
        if !self.providers.contains_key(normalized) {
            return Err(ProviderRegistryError::ProviderNotFound(
                normalized.to_string(),
            ));
        }
        debug!("event=provider_select module=provider status=ok provider_id={normalized}");
        self.active_provider_id = Some(normalized.to_string());
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active_provider_id = None;
    }

    pub fn active_provider_id(&self) -> Option<&str> {
        self.active_provider_id.as_deref()
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn SuggestionProvider>> {
        self.providers.get(provider_id.trim()).cloned()
    }

    pub fn active_provider(&self) -> Option<Arc<dyn SuggestionProvider>> {
        self.get(self.active_provider_id()?)
    }

    fn require_active(&self) -> ProviderResult<Arc<dyn SuggestionProvider>> {
        self.active_provider().ok_or_else(|| {
            ProviderError::new(
                REGISTRY_PROVIDER_ID,
                "provider_not_selected",
                "No active suggestion provider selected.",
            )
        })
    }
}

impl ContinuationProvider for ProviderRegistry {
    fn generate(&self, context: &str, intents: &Intents) -> ProviderResult<String> {
        self.require_active()?.generate(context, intents)
    }
}

impl RewriteProvider for ProviderRegistry {
    fn rewrite(&self, selected: &str, instruction: &str) -> ProviderResult<String> {
        self.require_active()?.rewrite(selected, instruction)
    }
}

fn is_valid_provider_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{ProviderRegistry, ProviderRegistryError};
    use crate::model::document::Intents;
    use crate::provider::spi::{
        ContinuationProvider, ProviderResult, RewriteProvider, SuggestionProvider,
    };
    use std::sync::Arc;

    struct EchoProvider {
        provider_id: String,
    }

    impl EchoProvider {
        fn new(provider_id: &str) -> Self {
            Self {
                provider_id: provider_id.to_string(),
            }
        }
    }

    impl ContinuationProvider for EchoProvider {
        fn generate(&self, _context: &str, _intents: &Intents) -> ProviderResult<String> {
            Ok(format!("{} continues.", self.provider_id))
        }
    }

    impl RewriteProvider for EchoProvider {
        fn rewrite(&self, selected: &str, instruction: &str) -> ProviderResult<String> {
            Ok(format!("{selected} ({instruction})"))
        }
    }

    impl SuggestionProvider for EchoProvider {
        fn provider_id(&self) -> &str {
            &self.provider_id
        }
    }

    #[test]
    fn registers_and_selects_provider() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(EchoProvider::new("local_echo")))
            .expect("provider should register");
        assert_eq!(registry.len(), 1);
        assert!(registry.active_provider_id().is_none());

        registry
            .select_active("  local_echo ")
            .expect("trimmed id should be selectable");
        assert_eq!(registry.active_provider_id(), Some("local_echo"));
    }

    #[test]
    fn rejects_invalid_or_duplicate_provider_id() {
        let mut registry = ProviderRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(EchoProvider::new("Local Echo"))),
            Err(ProviderRegistryError::InvalidProviderId(_))
        ));
        registry
            .register(Arc::new(EchoProvider::new("echo")))
            .expect("first provider should register");
        assert!(matches!(
            registry.register(Arc::new(EchoProvider::new("echo"))),
            Err(ProviderRegistryError::DuplicateProviderId(_))
        ));
    }

    #[test]
    fn calls_without_active_provider_fail_with_stable_code() {
        let registry = ProviderRegistry::new();
        let err = registry
            .rewrite("text", "shorter")
            .expect_err("rewrite without provider should fail");
        assert_eq!(err.code, "provider_not_selected");
    }

    #[test]
    fn delegates_to_active_provider_and_follows_reselection() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoProvider::new("first"))).unwrap();
        registry.register(Arc::new(EchoProvider::new("second"))).unwrap();
        assert_eq!(registry.provider_ids(), vec!["first", "second"]);

        registry.select_active("first").unwrap();
        let sentence = registry.generate("", &Intents::default()).unwrap();
        assert_eq!(sentence, "first continues.");

        registry.select_active("second").unwrap();
        assert_eq!(registry.rewrite("a", "b").unwrap(), "a (b)");

        registry.clear_active();
        assert!(registry.generate("", &Intents::default()).is_err());
    }

    #[test]
    fn with_active_selects_the_only_provider() {
        let registry = ProviderRegistry::with_active(Arc::new(EchoProvider::new("solo"))).unwrap();
        assert_eq!(registry.active_provider_id(), Some("solo"));
    }
}
