//! Work item and comment resolvers.
//!
//! Both walk the same neighbourhood of a work item: creator, assignees,
//! comment authors, the owning space with its owner and collaborators.
//! Only the anchor entity is required; everything else is best effort.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::receiver::{remove_actor, resolve_all_users, unique_ids};
use super::{ReceiverResolver, Resolved, TemplateVars, parse_id};
use crate::context::RequestContext;
use crate::gateway::{EntityGateway, User, WorkItem};
use crate::{Error, Result};

/// Accumulates candidates, vars and non-fatal errors while walking a work item.
struct Traversal<'a> {
    gateway: &'a dyn EntityGateway,
    ctx: &'a RequestContext,
    candidates: Vec<Uuid>,
    vars: TemplateVars,
    errors: Vec<Error>,
}

impl<'a> Traversal<'a> {
    fn new(gateway: &'a dyn EntityGateway, ctx: &'a RequestContext) -> Self {
        Self {
            gateway,
            ctx,
            candidates: Vec::new(),
            vars: TemplateVars::new(),
            errors: Vec::new(),
        }
    }

    /// Keep the value or record the error.
    fn keep<T>(&mut self, result: Result<T>) -> Option<T> {
        result.map_err(|e| self.errors.push(e)).ok()
    }

    fn missing(&mut self, resource: &str, relation: &str) {
        self.errors
            .push(Error::missing_relationship(resource, relation));
    }

    async fn user(&mut self, id: Uuid) -> Option<User> {
        let result = self.gateway.get_user(self.ctx, id).await;
        self.keep(result)
    }

    async fn work_item(&mut self, work_item_id: Uuid, work_item: WorkItem) -> Option<Uuid> {
        match work_item.creator_id() {
            Some(creator) => {
                self.candidates.push(creator);
                self.vars.work_item_owner = self.user(creator).await;
            }
            None => self.missing("workitem", "creator"),
        }
        self.candidates.extend(work_item.assignee_ids());

        match work_item.area_id() {
            Some(area) => {
                let result = self.gateway.get_area(self.ctx, area).await;
                self.vars.work_item_area = self.keep(result);
            }
            None => self.missing("workitem", "area"),
        }

        let result = self.gateway.get_comments(self.ctx, work_item_id).await;
        if let Some(comments) = self.keep(result) {
            self.candidates
                .extend(comments.iter().filter_map(|c| c.creator_id()));
        }

        let space_id = work_item.space_id();
        match space_id {
            Some(space_id) => self.space(space_id).await,
            None => self.missing("workitem", "space"),
        }

        match work_item.type_id() {
            Some(type_id) => {
                let result = self.gateway.get_work_item_type(self.ctx, type_id).await;
                self.vars.work_item_type = self.keep(result);
            }
            None => self.missing("workitem", "baseType"),
        }

        self.vars.work_item = Some(work_item);
        space_id
    }

    async fn space(&mut self, space_id: Uuid) {
        let result = self.gateway.get_space(self.ctx, space_id).await;
        let Some(space) = self.keep(result) else {
            return;
        };
        match space.owner_id() {
            Some(owner) => {
                self.candidates.push(owner);
                self.vars.space_owner = self.user(owner).await;
            }
            None => self.missing("space", "owned-by"),
        }
        self.vars.space = Some(space);
    }

    async fn collaborators(&mut self, space_id: Option<Uuid>) -> Vec<User> {
        let Some(space_id) = space_id else {
            return Vec::new();
        };
        let result = self
            .gateway
            .get_space_collaborators(self.ctx, space_id)
            .await;
        let collaborators = self.keep(result).unwrap_or_default();
        self.candidates.extend(
            collaborators
                .iter()
                .filter_map(|u| Uuid::parse_str(&u.id).ok()),
        );
        collaborators
    }

    /// Walk the work item and produce the final receiver list.
    async fn finish(mut self, work_item_id: Uuid, work_item: WorkItem) -> Resolved {
        let space_id = self.work_item(work_item_id, work_item).await;

        if let Some(actor_id) = self.ctx.actor_id() {
            self.vars.actor = self.user(actor_id).await;
        }
        let collaborators = self.collaborators(space_id).await;

        let mut ids = unique_ids(&self.candidates);
        if let Some(actor_id) = self.ctx.actor_id() {
            ids.retain(|id| *id != actor_id);
        }

        let receivers =
            resolve_all_users(self.gateway, self.ctx, &ids, &collaborators, false).await;

        let actor_email = self
            .ctx
            .actor_email()
            .or_else(|| {
                self.vars
                    .actor
                    .as_ref()
                    .and_then(|a| a.attributes.email.as_deref())
            })
            .map(str::to_string);
        let receivers = remove_actor(receivers, actor_email.as_deref());

        debug!(
            candidates = ids.len(),
            receivers = receivers.len(),
            errors = self.errors.len(),
            "resolved work item receivers"
        );

        Resolved {
            receivers,
            vars: self.vars,
            errors: self.errors,
        }
    }
}

/// Resolves everyone involved in a work item.
pub struct WorkItemResolver {
    gateway: Arc<dyn EntityGateway>,
}

impl WorkItemResolver {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ReceiverResolver for WorkItemResolver {
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved> {
        let work_item_id = parse_id("workitem", id)?;
        let work_item = self.gateway.get_work_item(ctx, work_item_id).await?;

        Ok(Traversal::new(self.gateway.as_ref(), ctx)
            .finish(work_item_id, work_item)
            .await)
    }
}

/// Resolves the participants of a comment's parent work item.
pub struct CommentResolver {
    gateway: Arc<dyn EntityGateway>,
}

impl CommentResolver {
    pub fn new(gateway: Arc<dyn EntityGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ReceiverResolver for CommentResolver {
    async fn resolve(&self, ctx: &RequestContext, id: &str) -> Result<Resolved> {
        let comment_id = parse_id("comment", id)?;
        let comment = self.gateway.get_comment(ctx, comment_id).await?;

        let mut traversal = Traversal::new(self.gateway.as_ref(), ctx);
        match comment.creator_id() {
            Some(creator) => {
                traversal.candidates.push(creator);
                traversal.vars.comment_owner = traversal.user(creator).await;
            }
            None => traversal.missing("comment", "creator"),
        }

        let work_item_id = comment
            .parent_id()
            .ok_or_else(|| Error::missing_relationship("comment", "parent"))?;
        let work_item = self.gateway.get_work_item(ctx, work_item_id).await?;
        traversal.vars.comment = Some(comment);

        Ok(traversal.finish(work_item_id, work_item).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Receiver;
    use crate::context::Actor;
    use crate::test_utils::{FakeGateway, comment, space, user, work_item};

    struct Fixture {
        gateway: Arc<FakeGateway>,
        work_item_id: Uuid,
        creator: Uuid,
        assignee: Uuid,
        owner: Uuid,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(FakeGateway::new());
        let work_item_id = Uuid::new_v4();
        let space_id = Uuid::new_v4();
        let creator = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let owner = Uuid::new_v4();

        gateway.add_work_item(work_item(work_item_id, creator, &[assignee], space_id));
        gateway.add_space(space(space_id, owner));
        gateway.add_user(user(creator, "Creator", Some("creator@example.com"), Some(true)));
        gateway.add_user(user(assignee, "Assignee", Some("assignee@example.com"), Some(true)));
        gateway.add_user(user(owner, "Owner", Some("owner@example.com"), Some(true)));

        Fixture {
            gateway,
            work_item_id,
            creator,
            assignee,
            owner,
        }
    }

    fn emails(resolved: &Resolved) -> Vec<&str> {
        resolved.receivers.iter().map(|r| r.email.as_str()).collect()
    }

    #[tokio::test]
    async fn test_work_item_candidates_in_first_seen_order() {
        let f = fixture();
        let resolver = WorkItemResolver::new(f.gateway.clone());

        let resolved = resolver
            .resolve(&RequestContext::new(), &f.work_item_id.to_string())
            .await
            .unwrap();

        assert_eq!(
            emails(&resolved),
            vec!["creator@example.com", "assignee@example.com", "owner@example.com"]
        );
        assert!(resolved.vars.work_item.is_some());
        assert!(resolved.vars.space.is_some());
        assert_eq!(
            resolved.vars.space_owner.as_ref().map(|u| u.id.clone()),
            Some(f.owner.to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_id_is_fatal() {
        let f = fixture();
        let resolver = WorkItemResolver::new(f.gateway.clone());
        let err = resolver
            .resolve(&RequestContext::new(), "13131")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
        assert_eq!(f.gateway.work_item_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_work_item_is_fatal() {
        let f = fixture();
        let resolver = WorkItemResolver::new(f.gateway.clone());
        let result = resolver
            .resolve(&RequestContext::new(), &Uuid::new_v4().to_string())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_secondary_failures_are_partial() {
        let f = fixture();
        f.gateway.fail_spaces();
        let resolver = WorkItemResolver::new(f.gateway.clone());

        let resolved = resolver
            .resolve(&RequestContext::new(), &f.work_item_id.to_string())
            .await
            .unwrap();

        assert!(resolved.is_partial());
        assert!(resolved.errors.iter().any(|e| matches!(
            e,
            Error::UpstreamStatus { resource, .. } if resource == "space"
        )));
        assert!(resolved.vars.space.is_none());
        assert!(resolved.vars.work_item.is_some());
        assert_eq!(
            emails(&resolved),
            vec!["creator@example.com", "assignee@example.com"]
        );
    }

    #[tokio::test]
    async fn test_actor_excluded() {
        let f = fixture();
        let resolver = WorkItemResolver::new(f.gateway.clone());
        let ctx = RequestContext::new().with_actor(Actor {
            id: Some(f.assignee),
            email: Some("assignee@example.com".to_string()),
            service_account: None,
        });

        let resolved = resolver
            .resolve(&ctx, &f.work_item_id.to_string())
            .await
            .unwrap();

        assert_eq!(
            emails(&resolved),
            vec!["creator@example.com", "owner@example.com"]
        );
        assert_eq!(
            resolved.vars.actor.as_ref().map(|u| u.id.clone()),
            Some(f.assignee.to_string())
        );
    }

    #[tokio::test]
    async fn test_actor_excluded_by_email_only() {
        let f = fixture();
        let resolver = WorkItemResolver::new(f.gateway.clone());
        let ctx = RequestContext::new().with_actor(Actor {
            id: None,
            email: Some("creator@example.com".to_string()),
            service_account: None,
        });

        let resolved = resolver
            .resolve(&ctx, &f.work_item_id.to_string())
            .await
            .unwrap();

        assert_eq!(
            emails(&resolved),
            vec!["assignee@example.com", "owner@example.com"]
        );
    }

    #[tokio::test]
    async fn test_unverified_emails_dropped() {
        let f = fixture();
        f.gateway
            .add_user(user(f.assignee, "Assignee", Some("assignee@example.com"), Some(false)));
        let resolver = WorkItemResolver::new(f.gateway.clone());

        let resolved = resolver
            .resolve(&RequestContext::new(), &f.work_item_id.to_string())
            .await
            .unwrap();

        assert!(!emails(&resolved).contains(&"assignee@example.com"));
    }

    #[tokio::test]
    async fn test_collaborators_added_and_used_as_cache() {
        let f = fixture();
        let collaborator = Uuid::new_v4();
        let space_id = f
            .gateway
            .work_item(f.work_item_id)
            .and_then(|w| w.space_id())
            .unwrap();
        f.gateway.set_collaborators(
            space_id,
            vec![
                user(collaborator, "Col", Some("col@example.com"), Some(true)),
                user(f.creator, "Creator", Some("creator@example.com"), Some(true)),
            ],
        );
        let resolver = WorkItemResolver::new(f.gateway.clone());

        let resolved = resolver
            .resolve(&RequestContext::new(), &f.work_item_id.to_string())
            .await
            .unwrap();

        assert_eq!(
            resolved.receivers.last(),
            Some(&Receiver::new("Col", "col@example.com"))
        );
        assert_eq!(resolved.receivers.len(), 4);
    }

    #[tokio::test]
    async fn test_comment_creator_comes_first() {
        let f = fixture();
        let comment_id = Uuid::new_v4();
        let author = Uuid::new_v4();
        f.gateway
            .add_user(user(author, "Author", Some("author@example.com"), Some(true)));
        f.gateway
            .add_comment(comment(comment_id, author, f.work_item_id));
        let resolver = CommentResolver::new(f.gateway.clone());

        let resolved = resolver
            .resolve(&RequestContext::new(), &comment_id.to_string())
            .await
            .unwrap();

        assert_eq!(
            emails(&resolved),
            vec![
                "author@example.com",
                "creator@example.com",
                "assignee@example.com",
                "owner@example.com"
            ]
        );
        assert!(resolved.vars.comment.is_some());
        assert!(resolved.vars.comment_owner.is_some());
    }

    #[tokio::test]
    async fn test_comment_with_missing_parent_is_fatal() {
        let f = fixture();
        let comment_id = Uuid::new_v4();
        f.gateway
            .add_comment(comment(comment_id, f.creator, Uuid::new_v4()));
        let resolver = CommentResolver::new(f.gateway.clone());

        assert!(
            resolver
                .resolve(&RequestContext::new(), &comment_id.to_string())
                .await
                .is_err()
        );
    }
}
