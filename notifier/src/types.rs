//! Notification types.
//!
//! Defines the closed set of event families a notification can be triggered for,
//! their stable string keys and the service accounts allowed to trigger them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// Static metadata about a supported notification type.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NotificationTypeInfo {
    /// Stable key used on the wire and for template lookup.
    pub key: &'static str,
    /// Human-friendly label.
    pub label: &'static str,
    /// Service accounts allowed to trigger this type. Empty means any caller.
    pub notifiers: &'static [&'static str],
}

const GEMINI_SERVER: &str = "fabric8-gemini-server";
const AUTH_SERVICE: &str = "fabric8-auth";

const NOTIFICATION_TYPES: &[NotificationTypeInfo] = &[
    NotificationTypeInfo {
        key: "workitem.create",
        label: "Work Item Created",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "workitem.update",
        label: "Work Item Updated",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "comment.create",
        label: "Comment Created",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "comment.update",
        label: "Comment Updated",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "user.email.update",
        label: "User Email Updated",
        notifiers: &[AUTH_SERVICE],
    },
    NotificationTypeInfo {
        key: "user.deactivation",
        label: "User Deactivation",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "invitation.team.noorg",
        label: "Team Invitation",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "invitation.space.noorg",
        label: "Space Invitation",
        notifiers: &[],
    },
    NotificationTypeInfo {
        key: "analytics.notify.cve",
        label: "Security Scan (CVE)",
        notifiers: &[GEMINI_SERVER],
    },
    NotificationTypeInfo {
        key: "analytics.notify.version",
        label: "Dependency Version Update",
        notifiers: &[GEMINI_SERVER],
    },
];

/// Returns metadata for every known notification type.
pub fn notification_types() -> &'static [NotificationTypeInfo] {
    NOTIFICATION_TYPES
}

/// Metadata for a key, if it is in the table.
pub fn type_info(key: &str) -> Option<&'static NotificationTypeInfo> {
    NOTIFICATION_TYPES.iter().find(|info| info.key == key)
}

/// Event family a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationType {
    WorkItemCreate,
    WorkItemUpdate,
    CommentCreate,
    CommentUpdate,
    UserEmailUpdate,
    UserDeactivation,
    InvitationTeamNoorg,
    InvitationSpaceNoorg,
    AnalyticsNotifyCve,
    AnalyticsNotifyVersion,
}

impl NotificationType {
    /// All notification types, in table order.
    pub const ALL: [NotificationType; 10] = [
        Self::WorkItemCreate,
        Self::WorkItemUpdate,
        Self::CommentCreate,
        Self::CommentUpdate,
        Self::UserEmailUpdate,
        Self::UserDeactivation,
        Self::InvitationTeamNoorg,
        Self::InvitationSpaceNoorg,
        Self::AnalyticsNotifyCve,
        Self::AnalyticsNotifyVersion,
    ];

    /// Stable string key, e.g. `workitem.create`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkItemCreate => "workitem.create",
            Self::WorkItemUpdate => "workitem.update",
            Self::CommentCreate => "comment.create",
            Self::CommentUpdate => "comment.update",
            Self::UserEmailUpdate => "user.email.update",
            Self::UserDeactivation => "user.deactivation",
            Self::InvitationTeamNoorg => "invitation.team.noorg",
            Self::InvitationSpaceNoorg => "invitation.space.noorg",
            Self::AnalyticsNotifyCve => "analytics.notify.cve",
            Self::AnalyticsNotifyVersion => "analytics.notify.version",
        }
    }

    pub fn info(&self) -> Option<&'static NotificationTypeInfo> {
        type_info(self.as_str())
    }

    /// Human-friendly label. Falls back to the key.
    pub fn label(&self) -> &'static str {
        self.info().map_or(self.as_str(), |info| info.label)
    }

    /// Service accounts allowed to trigger this type out of the box.
    pub fn default_notifiers(&self) -> &'static [&'static str] {
        self.info().map(|info| info.notifiers).unwrap_or_default()
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::bad_parameter("data.attributes.type", s))
    }
}

impl Serialize for NotificationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NotificationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip_through_from_str() {
        for kind in NotificationType::ALL {
            assert_eq!(kind.as_str().parse::<NotificationType>().unwrap(), kind);
        }
    }

    #[test]
    fn test_table_matches_enum() {
        assert_eq!(notification_types().len(), NotificationType::ALL.len());
        assert_eq!(NotificationType::CommentUpdate.as_str(), "comment.update");
        assert_eq!(
            NotificationType::AnalyticsNotifyVersion.to_string(),
            "analytics.notify.version"
        );
    }

    #[test]
    fn test_every_type_has_matching_metadata() {
        for kind in NotificationType::ALL {
            let info = kind.info().unwrap();
            assert_eq!(info.key, kind.as_str());
        }
        assert_eq!(NotificationType::UserEmailUpdate.label(), "User Email Updated");
        assert_eq!(
            NotificationType::AnalyticsNotifyCve.label(),
            "Security Scan (CVE)"
        );
        assert!(type_info("workitem.delete").is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = "unknown.create".parse::<NotificationType>().unwrap_err();
        assert!(matches!(err, Error::BadParameter { .. }));
    }

    #[test]
    fn test_default_notifiers() {
        assert!(NotificationType::WorkItemCreate.default_notifiers().is_empty());
        assert_eq!(
            NotificationType::UserEmailUpdate.default_notifiers(),
            &["fabric8-auth"]
        );
        assert_eq!(
            NotificationType::AnalyticsNotifyCve.default_notifiers(),
            &["fabric8-gemini-server"]
        );
    }

    #[test]
    fn test_serde_uses_keys() {
        let json = serde_json::to_string(&NotificationType::WorkItemUpdate).unwrap();
        assert_eq!(json, "\"workitem.update\"");
        let parsed: NotificationType = serde_json::from_str("\"comment.create\"").unwrap();
        assert_eq!(parsed, NotificationType::CommentCreate);
    }
}
