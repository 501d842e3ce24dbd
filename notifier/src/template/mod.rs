//! Email templates.
//!
//! Each notification type has a subject, an HTML body and optionally a set of
//! extra mail headers, all written as Handlebars templates and compiled into
//! the binary. Bodies are HTML-escaped; subjects and headers are plain text.

mod helpers;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use handlebars::Handlebars;
use serde_json::Value;

use crate::collector::TemplateVars;
use crate::types::NotificationType;
use crate::{Error, Result};

/// Output of a template render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
    pub headers: HashMap<String, String>,
}

/// Something that can turn template variables into an email.
pub trait RenderableTemplate: Send + Sync {
    fn render(&self, vars: &TemplateVars) -> Result<Rendered>;
}

/// Looks up the template for a notification type.
pub trait TemplateRegistry: Send + Sync {
    fn get(&self, kind: NotificationType) -> Option<Arc<dyn RenderableTemplate>>;
}

struct TemplateFiles {
    kind: NotificationType,
    subject: &'static str,
    body: &'static str,
    headers: Option<&'static str>,
}

macro_rules! template_files {
    ($kind:expr, $dir:literal, headers) => {
        TemplateFiles {
            kind: $kind,
            subject: include_str!(concat!("../../templates/", $dir, "/subject.txt")),
            body: include_str!(concat!("../../templates/", $dir, "/body.html")),
            headers: Some(include_str!(concat!(
                "../../templates/",
                $dir,
                "/headers.txt"
            ))),
        }
    };
    ($kind:expr, $dir:literal) => {
        TemplateFiles {
            kind: $kind,
            subject: include_str!(concat!("../../templates/", $dir, "/subject.txt")),
            body: include_str!(concat!("../../templates/", $dir, "/body.html")),
            headers: None,
        }
    };
}

fn embedded_files() -> [TemplateFiles; 6] {
    [
        template_files!(NotificationType::WorkItemCreate, "workitem.create", headers),
        template_files!(NotificationType::WorkItemUpdate, "workitem.update", headers),
        template_files!(NotificationType::CommentCreate, "comment.create", headers),
        template_files!(NotificationType::CommentUpdate, "comment.update", headers),
        template_files!(NotificationType::UserEmailUpdate, "user.email.update"),
        template_files!(NotificationType::AnalyticsNotifyCve, "analytics.notify.cve"),
    ]
}

fn subject_name(kind: NotificationType) -> String {
    format!("{kind}/subject")
}

fn body_name(kind: NotificationType) -> String {
    format!("{kind}/body")
}

fn headers_name(kind: NotificationType) -> String {
    format!("{kind}/headers")
}

struct Engines {
    html: Handlebars<'static>,
    text: Handlebars<'static>,
    with_headers: HashSet<NotificationType>,
}

impl Engines {
    fn render(&self, kind: NotificationType, vars: &Value) -> Result<Rendered> {
        let body = self
            .html
            .render(&body_name(kind), vars)
            .map_err(|e| Error::template(format!("{kind} body: {e}")))?;
        let subject = self
            .text
            .render(&subject_name(kind), vars)
            .map_err(|e| Error::template(format!("{kind} subject: {e}")))?;

        let headers = if self.with_headers.contains(&kind) {
            let raw = self
                .text
                .render(&headers_name(kind), vars)
                .map_err(|e| Error::template(format!("{kind} headers: {e}")))?;
            parse_headers(&raw)
        } else {
            HashMap::new()
        };

        Ok(Rendered {
            subject: subject.trim().to_string(),
            body,
            headers,
        })
    }
}

/// Parse `Name: value` lines, skipping headers that rendered empty.
fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Template bound to a notification type.
struct CompiledTemplate {
    kind: NotificationType,
    engines: Arc<Engines>,
}

impl RenderableTemplate for CompiledTemplate {
    fn render(&self, vars: &TemplateVars) -> Result<Rendered> {
        self.engines.render(self.kind, &vars.to_value()?)
    }
}

/// Templates compiled into the binary.
pub struct EmbeddedTemplates {
    engines: Arc<Engines>,
    kinds: HashSet<NotificationType>,
}

impl EmbeddedTemplates {
    /// Compile every embedded template. Fails on the first syntax error.
    pub fn load() -> Result<Self> {
        let mut html = Handlebars::new();
        let mut text = Handlebars::new();
        text.register_escape_fn(handlebars::no_escape);
        helpers::register(&mut html);
        helpers::register(&mut text);

        let mut kinds = HashSet::new();
        let mut with_headers = HashSet::new();
        for files in embedded_files() {
            let kind = files.kind;
            html.register_template_string(&body_name(kind), files.body)
                .map_err(|e| Error::template(format!("{kind} body: {e}")))?;
            text.register_template_string(&subject_name(kind), files.subject)
                .map_err(|e| Error::template(format!("{kind} subject: {e}")))?;
            if let Some(headers) = files.headers {
                text.register_template_string(&headers_name(kind), headers)
                    .map_err(|e| Error::template(format!("{kind} headers: {e}")))?;
                with_headers.insert(kind);
            }
            kinds.insert(kind);
        }

        Ok(Self {
            engines: Arc::new(Engines {
                html,
                text,
                with_headers,
            }),
            kinds,
        })
    }

    /// Types that have a template.
    pub fn kinds(&self) -> impl Iterator<Item = NotificationType> + '_ {
        NotificationType::ALL
            .into_iter()
            .filter(|k| self.kinds.contains(k))
    }
}

impl TemplateRegistry for EmbeddedTemplates {
    fn get(&self, kind: NotificationType) -> Option<Arc<dyn RenderableTemplate>> {
        if !self.kinds.contains(&kind) {
            return None;
        }
        Some(Arc::new(CompiledTemplate {
            kind,
            engines: self.engines.clone(),
        }))
    }
}
