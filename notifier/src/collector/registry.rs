//! Registry of resolvers, validators and authorized callers per notification type.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{CustomAttributes, SharedResolver};
use crate::context::RequestContext;
use crate::types::NotificationType;
use crate::{Error, Result};

/// Checks the caller supplied custom attributes before a task is queued.
pub type PayloadValidator =
    Arc<dyn Fn(&RequestContext, &CustomAttributes) -> Result<()> + Send + Sync>;

#[derive(Default, Clone)]
struct Entry {
    resolver: Option<SharedResolver>,
    validator: Option<PayloadValidator>,
    notifiers: Vec<String>,
}

/// Maps notification types to their resolver.
///
/// Cheap to share behind an `Arc`; lookups take a read lock so registration
/// can happen while requests are served.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<NotificationType, Entry>>,
}

impl Registry {
    /// Empty registry. Every type is unrestricted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the authorized callers of each type.
    pub fn with_default_notifiers() -> Self {
        let registry = Self::new();
        for kind in NotificationType::ALL {
            let notifiers = kind.default_notifiers();
            if !notifiers.is_empty() {
                registry.set_notifiers(
                    kind,
                    notifiers.iter().map(|n| n.to_string()).collect(),
                );
            }
        }
        registry
    }

    /// Register a resolver. A second registration for the same type replaces
    /// the first one.
    pub fn register(
        &self,
        kind: NotificationType,
        resolver: SharedResolver,
        validator: Option<PayloadValidator>,
    ) {
        let mut entries = self.entries.write();
        let entry = entries.entry(kind).or_default();
        entry.resolver = Some(resolver);
        entry.validator = validator;
    }

    pub fn get(&self, kind: NotificationType) -> Option<SharedResolver> {
        self.entries.read().get(&kind).and_then(|e| e.resolver.clone())
    }

    pub fn validator(&self, kind: NotificationType) -> Option<PayloadValidator> {
        self.entries
            .read()
            .get(&kind)
            .and_then(|e| e.validator.clone())
    }

    /// Service accounts allowed to trigger `kind`. Empty means anyone.
    pub fn notifiers(&self, kind: NotificationType) -> Vec<String> {
        self.entries
            .read()
            .get(&kind)
            .map(|e| e.notifiers.clone())
            .unwrap_or_default()
    }

    pub fn set_notifiers(&self, kind: NotificationType, notifiers: Vec<String>) {
        self.entries.write().entry(kind).or_default().notifiers = notifiers;
    }

    /// Registered types, in declaration order.
    pub fn registered(&self) -> Vec<NotificationType> {
        let entries = self.entries.read();
        NotificationType::ALL
            .into_iter()
            .filter(|k| entries.get(k).is_some_and(|e| e.resolver.is_some()))
            .collect()
    }
}

/// Email update notifications link back to a verification page.
pub fn validate_user_email_update(_ctx: &RequestContext, custom: &CustomAttributes) -> Result<()> {
    if custom.contains_key("verifyURL") {
        Ok(())
    } else {
        Err(Error::bad_parameter(
            "data.attributes.custom.verifyURL",
            "missing",
        ))
    }
}
