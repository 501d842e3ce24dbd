//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("non 200 status code for GET {resource}, returned {status}")]
    UpstreamStatus { resource: String, status: u16 },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("unable to lookup {entity_type} based on id {id}")]
    InvalidId { entity_type: String, id: String },

    #[error("{resource} has no {relation} relationship")]
    MissingRelationship { resource: String, relation: String },

    #[error("Bad parameter {parameter}: {value}")]
    BadParameter { parameter: String, value: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("delivery engine is shut down")]
    ShutDown,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn invalid_id(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::InvalidId {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn missing_relationship(resource: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::MissingRelationship {
            resource: resource.into(),
            relation: relation.into(),
        }
    }

    pub fn bad_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::BadParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn upstream_status(resource: impl Into<String>, status: u16) -> Self {
        Self::UpstreamStatus {
            resource: resource.into(),
            status,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}
