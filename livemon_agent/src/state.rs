//! Shared agent state handed to every request handler.

use crate::registry::SessionRegistry;

#[derive(Clone, Default)]
pub struct AppState {
    // Who is connected and what each of them wants
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }
}
