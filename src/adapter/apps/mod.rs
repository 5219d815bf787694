//! Built-in Applications
//!
//! エントリポイント参照で解決できる組み込みアプリケーション

pub mod chatbot_gateway;

pub use chatbot_gateway::ChatbotGateway;

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::entrypoint::EntrypointRef;
use crate::domain::repositories::application::{Application, ApplicationRegistry};

/// In-process registry of application objects
#[derive(Default)]
pub struct BuiltinRegistry {
    apps: HashMap<EntrypointRef, Arc<dyn Application>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the chatbot gateway under `Flask_Server:app`
    pub fn with_defaults(upstream_url: Option<String>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            EntrypointRef::default(),
            Arc::new(ChatbotGateway::new(upstream_url)?),
        );
        Ok(registry)
    }

    pub fn register(&mut self, entrypoint: EntrypointRef, app: Arc<dyn Application>) {
        self.apps.insert(entrypoint, app);
    }
}

impl ApplicationRegistry for BuiltinRegistry {
    fn resolve(&self, entrypoint: &EntrypointRef) -> Option<Arc<dyn Application>> {
        self.apps.get(entrypoint).cloned()
    }

    fn entrypoints(&self) -> Vec<EntrypointRef> {
        let mut entrypoints: Vec<EntrypointRef> = self.apps.keys().cloned().collect();
        entrypoints.sort_by_key(|e| e.to_string());
        entrypoints
    }
}
