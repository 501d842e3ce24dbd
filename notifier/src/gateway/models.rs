//! JSON:API resources returned by the work item tracker and auth services.
//!
//! Only the fields the resolvers and templates read are typed. Free-form
//! attribute bags (work item fields, area and type attributes) stay as JSON
//! maps so templates can reach any field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Top-level JSON:API document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// Resource identifier object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// To-one relationship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToOne {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

impl ToOne {
    pub fn id(&self) -> Option<&str> {
        self.data.as_ref().map(|r| r.id.as_str())
    }

    /// The related id, if present and a valid UUID.
    pub fn uuid(&self) -> Option<Uuid> {
        self.id().and_then(|id| Uuid::parse_str(id).ok())
    }
}

/// To-many relationship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToMany {
    #[serde(default)]
    pub data: Option<Vec<ResourceRef>>,
}

impl ToMany {
    /// Related ids that parse as UUIDs, in document order.
    pub fn uuids(&self) -> Vec<Uuid> {
        self.data
            .iter()
            .flatten()
            .filter_map(|r| Uuid::parse_str(&r.id).ok())
            .collect()
    }
}

fn rel_uuid(rel: &Option<ToOne>) -> Option<Uuid> {
    rel.as_ref().and_then(ToOne::uuid)
}

/// An identity from the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub attributes: UserAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAttributes {
    #[serde(rename = "fullName", default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: Option<bool>,
    #[serde(rename = "emailPrivate", default)]
    pub email_private: Option<bool>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: WorkItemRelationships,
    #[serde(default)]
    pub links: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkItemRelationships {
    #[serde(default)]
    pub creator: Option<ToOne>,
    #[serde(default)]
    pub assignees: Option<ToMany>,
    #[serde(default)]
    pub area: Option<ToOne>,
    #[serde(default)]
    pub space: Option<ToOne>,
    #[serde(rename = "baseType", default)]
    pub base_type: Option<ToOne>,
}

impl WorkItem {
    pub fn creator_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.creator)
    }

    pub fn assignee_ids(&self) -> Vec<Uuid> {
        self.relationships
            .assignees
            .as_ref()
            .map(ToMany::uuids)
            .unwrap_or_default()
    }

    pub fn area_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.area)
    }

    pub fn space_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.space)
    }

    pub fn type_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.base_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: CommentRelationships,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRelationships {
    #[serde(default, alias = "created-by")]
    pub creator: Option<ToOne>,
    #[serde(default)]
    pub parent: Option<ToOne>,
}

impl Comment {
    pub fn creator_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.creator)
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.parent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItemType {
    pub id: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    #[serde(default)]
    pub attributes: SpaceAttributes,
    #[serde(default)]
    pub relationships: SpaceRelationships,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceRelationships {
    #[serde(rename = "owned-by", default)]
    pub owned_by: Option<ToOne>,
}

impl Space {
    pub fn owner_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.owned_by)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Codebase {
    pub id: String,
    #[serde(default)]
    pub attributes: CodebaseAttributes,
    #[serde(default)]
    pub relationships: CodebaseRelationships,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodebaseAttributes {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "cve-scan", default)]
    pub cve_scan: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodebaseRelationships {
    #[serde(default)]
    pub space: Option<ToOne>,
}

impl Codebase {
    pub fn is_cve_scanned(&self) -> bool {
        self.attributes.cve_scan == Some(true)
    }

    pub fn space_id(&self) -> Option<Uuid> {
        rel_uuid(&self.relationships.space)
    }
}

/// Token returned by the auth service token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_work_item_document() {
        let json = r#"{
            "data": {
                "id": "8bccc228-bba7-43ad-b077-15fbb9148f7f",
                "type": "workitems",
                "attributes": {"system.title": "Fix login", "system.number": 42},
                "relationships": {
                    "creator": {"data": {"id": "2e0698d8-753e-4cef-bb7c-f027634824a2", "type": "identities"}},
                    "assignees": {"data": [
                        {"id": "not-a-uuid", "type": "identities"},
                        {"id": "0e07f7f0-3aa2-4c35-a8c0-6e9bd0e6b2a9", "type": "identities"}
                    ]},
                    "space": {"data": {"id": "e0c7cd9c-5e8a-4b7c-8e51-2b0a8b7a1c11", "type": "spaces"}},
                    "baseType": {"data": {"id": "26787039-b68f-4e28-8814-c2f93be1ef4e", "type": "workitemtypes"}}
                }
            }
        }"#;
        let doc: Document<WorkItem> = serde_json::from_str(json).unwrap();
        let wi = doc.data;
        assert!(wi.creator_id().is_some());
        assert_eq!(wi.assignee_ids().len(), 1);
        assert!(wi.area_id().is_none());
        assert!(wi.space_id().is_some());
        assert!(wi.type_id().is_some());
        assert_eq!(wi.attributes["system.title"], "Fix login");
    }

    #[test]
    fn test_decode_user_attributes() {
        let json = r#"{"data": {"id": "u1", "type": "identities", "attributes": {
            "fullName": "Jane Doe", "email": "jane@example.com", "emailVerified": true,
            "imageURL": "https://img"
        }}}"#;
        let doc: Document<User> = serde_json::from_str(json).unwrap();
        assert_eq!(doc.data.attributes.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(doc.data.attributes.email_verified, Some(true));
        assert!(doc.data.attributes.email_private.is_none());
    }

    #[test]
    fn test_decode_comment_with_legacy_creator_key() {
        let json = r#"{"id": "c1", "attributes": {"body": "hi"}, "relationships": {
            "created-by": {"data": {"id": "2e0698d8-753e-4cef-bb7c-f027634824a2", "type": "identities"}},
            "parent": {"data": {"id": "8bccc228-bba7-43ad-b077-15fbb9148f7f", "type": "workitems"}}
        }}"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert!(comment.creator_id().is_some());
        assert!(comment.parent_id().is_some());
    }

    #[test]
    fn test_codebase_scan_flag() {
        let json = r#"[
            {"id": "a", "attributes": {"cve-scan": true}},
            {"id": "b", "attributes": {"cve-scan": false}},
            {"id": "c", "attributes": {}}
        ]"#;
        let codebases: Vec<Codebase> = serde_json::from_str(json).unwrap();
        let scanned: Vec<_> = codebases.iter().filter(|c| c.is_cve_scanned()).collect();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].id, "a");
    }
}
