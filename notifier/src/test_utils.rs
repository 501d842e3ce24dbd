//! In-memory fakes shared by unit and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::Claims;
use crate::collector::{Receiver, TemplateVars};
use crate::context::RequestContext;
use crate::delivery::{DeliveryObserver, DeliveryOutcome, Sender};
use crate::gateway::models::{
    CodebaseAttributes, CodebaseRelationships, CommentRelationships, ResourceRef,
    SpaceAttributes, SpaceRelationships, ToMany, ToOne, UserAttributes, WorkItemRelationships,
};
use crate::gateway::{Area, Codebase, Comment, EntityGateway, Space, User, WorkItem, WorkItemType};
use crate::template::{RenderableTemplate, Rendered};
use crate::types::NotificationType;
use crate::{Error, Result};

/// Relationship pointing at `id`.
pub fn relation(id: Uuid, kind: &str) -> Option<ToOne> {
    Some(ToOne {
        data: Some(ResourceRef {
            id: id.to_string(),
            kind: kind.to_string(),
        }),
    })
}

pub fn user(id: Uuid, full_name: &str, email: Option<&str>, verified: Option<bool>) -> User {
    User {
        id: id.to_string(),
        attributes: UserAttributes {
            full_name: Some(full_name.to_string()),
            email: email.map(str::to_string),
            email_verified: verified,
            ..Default::default()
        },
    }
}

/// Work item with a creator, assignees and a space; no area or type.
pub fn work_item(id: Uuid, creator: Uuid, assignees: &[Uuid], space: Uuid) -> WorkItem {
    let mut attributes = Map::new();
    attributes.insert("system.title".into(), Value::from("Fix login redirect"));
    attributes.insert("system.number".into(), Value::from(42));
    WorkItem {
        id: id.to_string(),
        attributes,
        relationships: WorkItemRelationships {
            creator: relation(creator, "identities"),
            assignees: Some(ToMany {
                data: Some(
                    assignees
                        .iter()
                        .map(|a| ResourceRef {
                            id: a.to_string(),
                            kind: "identities".to_string(),
                        })
                        .collect(),
                ),
            }),
            space: relation(space, "spaces"),
            ..Default::default()
        },
        links: Map::new(),
    }
}

pub fn comment(id: Uuid, creator: Uuid, parent: Uuid) -> Comment {
    let mut attributes = Map::new();
    attributes.insert("body".into(), Value::from("Looks good to me"));
    Comment {
        id: id.to_string(),
        attributes,
        relationships: CommentRelationships {
            creator: relation(creator, "identities"),
            parent: relation(parent, "workitems"),
        },
    }
}

pub fn space(id: Uuid, owner: Uuid) -> Space {
    Space {
        id: id.to_string(),
        attributes: SpaceAttributes {
            name: Some("openshiftio".to_string()),
            description: None,
        },
        relationships: SpaceRelationships {
            owned_by: relation(owner, "identities"),
        },
    }
}

pub fn area(id: Uuid, name: &str) -> Area {
    let mut attributes = Map::new();
    attributes.insert("name".into(), Value::from(name));
    Area {
        id: id.to_string(),
        attributes,
    }
}

pub fn codebase(space: Uuid, cve_scan: bool) -> Codebase {
    Codebase {
        id: Uuid::new_v4().to_string(),
        attributes: CodebaseAttributes {
            url: None,
            cve_scan: Some(cve_scan),
        },
        relationships: CodebaseRelationships {
            space: relation(space, "spaces"),
        },
    }
}

/// Gateway answering from in-memory maps. Unknown ids answer not found.
#[derive(Default)]
pub struct FakeGateway {
    work_items: Mutex<HashMap<Uuid, WorkItem>>,
    comments: Mutex<HashMap<Uuid, Comment>>,
    areas: Mutex<HashMap<Uuid, Area>>,
    spaces: Mutex<HashMap<Uuid, Space>>,
    types: Mutex<HashMap<Uuid, WorkItemType>>,
    users: Mutex<HashMap<Uuid, User>>,
    collaborators: Mutex<HashMap<Uuid, Vec<User>>>,
    codebases: Mutex<HashMap<String, Vec<Codebase>>>,
    fail_spaces: AtomicBool,
    work_item_calls: AtomicUsize,
    user_calls: AtomicUsize,
}

fn lookup<T: Clone>(map: &Mutex<HashMap<Uuid, T>>, id: Uuid, resource: &str) -> Result<T> {
    map.lock()
        .get(&id)
        .cloned()
        .ok_or_else(|| Error::not_found(resource, id.to_string()))
}

fn parse(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap_or_default()
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_work_item(&self, work_item: WorkItem) {
        self.work_items.lock().insert(parse(&work_item.id), work_item);
    }

    pub fn work_item(&self, id: Uuid) -> Option<WorkItem> {
        self.work_items.lock().get(&id).cloned()
    }

    pub fn add_comment(&self, comment: Comment) {
        self.comments.lock().insert(parse(&comment.id), comment);
    }

    pub fn add_area(&self, area: Area) {
        self.areas.lock().insert(parse(&area.id), area);
    }

    pub fn add_space(&self, space: Space) {
        self.spaces.lock().insert(parse(&space.id), space);
    }

    pub fn add_work_item_type(&self, work_item_type: WorkItemType) {
        self.types
            .lock()
            .insert(parse(&work_item_type.id), work_item_type);
    }

    /// Add or replace a user.
    pub fn add_user(&self, user: User) {
        self.users.lock().insert(parse(&user.id), user);
    }

    pub fn set_collaborators(&self, space_id: Uuid, users: Vec<User>) {
        self.collaborators.lock().insert(space_id, users);
    }

    pub fn set_codebases(&self, url: &str, codebases: Vec<Codebase>) {
        self.codebases.lock().insert(url.to_string(), codebases);
    }

    /// Make every space lookup answer 500.
    pub fn fail_spaces(&self) {
        self.fail_spaces.store(true, Ordering::SeqCst);
    }

    pub fn work_item_calls(&self) -> usize {
        self.work_item_calls.load(Ordering::SeqCst)
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityGateway for FakeGateway {
    async fn get_work_item(&self, _ctx: &RequestContext, id: Uuid) -> Result<WorkItem> {
        self.work_item_calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.work_items, id, "workitem")
    }

    async fn get_comment(&self, _ctx: &RequestContext, id: Uuid) -> Result<Comment> {
        lookup(&self.comments, id, "comment")
    }

    async fn get_comments(&self, _ctx: &RequestContext, work_item_id: Uuid) -> Result<Vec<Comment>> {
        Ok(self
            .comments
            .lock()
            .values()
            .filter(|c| c.parent_id() == Some(work_item_id))
            .cloned()
            .collect())
    }

    async fn get_area(&self, _ctx: &RequestContext, id: Uuid) -> Result<Area> {
        lookup(&self.areas, id, "area")
    }

    async fn get_space(&self, _ctx: &RequestContext, id: Uuid) -> Result<Space> {
        if self.fail_spaces.load(Ordering::SeqCst) {
            return Err(Error::upstream_status("space", 500));
        }
        lookup(&self.spaces, id, "space")
    }

    async fn get_space_collaborators(
        &self,
        _ctx: &RequestContext,
        space_id: Uuid,
    ) -> Result<Vec<User>> {
        Ok(self
            .collaborators
            .lock()
            .get(&space_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_work_item_type(&self, _ctx: &RequestContext, id: Uuid) -> Result<WorkItemType> {
        lookup(&self.types, id, "workitemtype")
    }

    async fn get_user(&self, _ctx: &RequestContext, id: Uuid) -> Result<User> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.users, id, "user")
    }

    async fn get_codebases(
        &self,
        _ctx: &RequestContext,
        repository_url: &str,
    ) -> Result<Vec<Codebase>> {
        Ok(self
            .codebases
            .lock()
            .get(repository_url)
            .cloned()
            .unwrap_or_default())
    }
}

/// An email handed to [`RecordingSender`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub subject: String,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub receivers: Vec<Receiver>,
}

/// Sender that keeps every email in memory.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(
        &self,
        _ctx: &RequestContext,
        subject: &str,
        body: &str,
        headers: &HashMap<String, String>,
        receivers: &[Receiver],
    ) {
        self.sent.lock().push(SentEmail {
            subject: subject.to_string(),
            body: body.to_string(),
            headers: headers.clone(),
            receivers: receivers.to_vec(),
        });
    }
}

/// Template that renders the custom attributes as the body.
#[derive(Default)]
pub struct StaticTemplate {
    fail: bool,
}

impl StaticTemplate {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl RenderableTemplate for StaticTemplate {
    fn render(&self, vars: &TemplateVars) -> Result<Rendered> {
        if self.fail {
            return Err(Error::template("broken template"));
        }
        Ok(Rendered {
            subject: "test subject".to_string(),
            body: Value::Object(vars.custom.clone()).to_string(),
            headers: HashMap::new(),
        })
    }
}

/// Observer that keeps every outcome in memory.
#[derive(Default)]
pub struct RecordingObserver {
    outcomes: Mutex<Vec<(NotificationType, String, DeliveryOutcome)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<DeliveryOutcome> {
        self.outcomes.lock().iter().map(|(_, _, o)| o.clone()).collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.outcomes.lock().iter().map(|(_, id, _)| id.clone()).collect()
    }
}

impl DeliveryObserver for RecordingObserver {
    fn on_outcome(&self, kind: NotificationType, id: &str, outcome: &DeliveryOutcome) {
        self.outcomes
            .lock()
            .push((kind, id.to_string(), outcome.clone()));
    }
}

/// HS256 token valid for an hour.
pub fn sign_token(
    secret: &str,
    sub: Option<&str>,
    email: Option<&str>,
    service_account: Option<&str>,
) -> String {
    let claims = Claims {
        sub: sub.map(str::to_string),
        email: email.map(str::to_string),
        service_accountname: service_account.map(str::to_string),
        exp: chrono::Utc::now().timestamp() as u64 + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap_or_default()
}
