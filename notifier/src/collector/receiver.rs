//! Receivers and identity resolution.

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::gateway::models::UserAttributes;
use crate::gateway::{EntityGateway, User};

/// A person that will receive a notification email.
///
/// The email is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receiver {
    pub full_name: String,
    pub email: String,
}

impl Receiver {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
        }
    }

    /// Build a receiver from user attributes if the email may be used.
    fn from_attributes(attrs: &UserAttributes, allow_unverified: bool) -> Option<Self> {
        if !email_visible(attrs, allow_unverified) {
            return None;
        }
        let email = attrs.email.clone()?;
        Some(Self::new(attrs.full_name.clone().unwrap_or_default(), email))
    }
}

/// Remove duplicate ids, keeping the first occurrence of each.
pub fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Whether the user's email can be addressed.
///
/// The email must be present and either verified or explicitly allowed
/// while unverified.
pub fn email_visible(attrs: &UserAttributes, allow_unverified: bool) -> bool {
    let has_email = attrs.email.as_deref().is_some_and(|e| !e.is_empty());
    has_email && (allow_unverified || attrs.email_verified == Some(true))
}

/// Turn candidate user ids into receivers.
///
/// Collaborators act as a cache: a candidate found there is evaluated on the
/// embedded attributes without a remote lookup. Lookup failures drop the
/// candidate.
pub async fn resolve_all_users(
    gateway: &dyn EntityGateway,
    ctx: &RequestContext,
    ids: &[Uuid],
    collaborators: &[User],
    allow_unverified: bool,
) -> Vec<Receiver> {
    let mut receivers = Vec::with_capacity(ids.len());
    for id in ids {
        let key = id.to_string();
        if let Some(user) = collaborators.iter().find(|u| u.id == key) {
            receivers.extend(Receiver::from_attributes(&user.attributes, allow_unverified));
            continue;
        }

        match gateway.get_user(ctx, *id).await {
            Ok(user) => {
                receivers.extend(Receiver::from_attributes(&user.attributes, allow_unverified));
            }
            Err(e) => {
                warn!(user_id = %id, error = %e, "unable to lookup user");
            }
        }
    }
    receivers
}

/// Drop every receiver addressed to `actor_email`.
pub fn remove_actor(receivers: Vec<Receiver>, actor_email: Option<&str>) -> Vec<Receiver> {
    match actor_email {
        Some(email) => receivers.into_iter().filter(|r| r.email != email).collect(),
        None => receivers,
    }
}
