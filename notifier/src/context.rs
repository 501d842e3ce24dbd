//! Per-request context handed to resolvers and senders.

use uuid::Uuid;

/// The authenticated caller that triggered a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    /// User id taken from the token subject, when it is a UUID.
    pub id: Option<Uuid>,
    /// Email claim of the token.
    pub email: Option<String>,
    /// Service account name, set for service-to-service tokens.
    pub service_account: Option<String>,
}

/// Context carried alongside every notification task.
///
/// Holds the inbound request id (forwarded to upstream services) and the
/// actor derived from the caller's token.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: Option<String>,
    actor: Option<Actor>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn actor_id(&self) -> Option<Uuid> {
        self.actor.as_ref().and_then(|a| a.id)
    }

    pub fn actor_email(&self) -> Option<&str> {
        self.actor
            .as_ref()
            .and_then(|a| a.email.as_deref())
            .filter(|e| !e.is_empty())
    }

    /// Whether the caller is one of the given service accounts.
    pub fn is_service_account(&self, names: &[String]) -> bool {
        self.actor
            .as_ref()
            .and_then(|a| a.service_account.as_deref())
            .is_some_and(|sa| names.iter().any(|n| n == sa))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_has_no_actor() {
        let ctx = RequestContext::new();
        assert!(ctx.actor_id().is_none());
        assert!(ctx.actor_email().is_none());
        assert!(!ctx.is_service_account(&["fabric8-auth".to_string()]));
    }

    #[test]
    fn test_empty_email_claim_is_ignored() {
        let ctx = RequestContext::new().with_actor(Actor {
            email: Some(String::new()),
            ..Default::default()
        });
        assert!(ctx.actor_email().is_none());
    }

    #[test]
    fn test_service_account_match() {
        let ctx = RequestContext::new()
            .with_request_id("req-1")
            .with_actor(Actor {
                service_account: Some("fabric8-auth".to_string()),
                ..Default::default()
            });
        assert_eq!(ctx.request_id(), Some("req-1"));
        assert!(ctx.is_service_account(&["fabric8-auth".to_string()]));
        assert!(!ctx.is_service_account(&["fabric8-gemini-server".to_string()]));
    }
}
