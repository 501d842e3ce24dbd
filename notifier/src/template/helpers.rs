//! Helpers available to every template.

use chrono::DateTime;
use handlebars::{Handlebars, handlebars_helper};
use serde_json::Value;

const DATE_FORMAT: &str = "%d %B %Y";

fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format an RFC 3339 timestamp as `02 January 2006`.
pub(crate) fn format_date(value: &Value) -> String {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Append a size parameter to an avatar URL.
pub(crate) fn size_image(url: &Value, size: u64) -> String {
    let url = as_text(url);
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}s={size}")
}

handlebars_helper!(lower: |v: Json| as_text(v).to_lowercase());
handlebars_helper!(date: |v: Json| format_date(v));
handlebars_helper!(size_image_helper: |url: Json, size: u64| size_image(url, size));

pub(crate) fn register(engine: &mut Handlebars<'static>) {
    engine.register_helper("lower", Box::new(lower));
    engine.register_helper("date", Box::new(date));
    engine.register_helper("sizeImage", Box::new(size_image_helper));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(&json!("2017-06-01T10:20:30Z")), "01 June 2017");
        assert_eq!(format_date(&json!("2017-12-24T23:00:00+02:00")), "24 December 2017");
        assert_eq!(format_date(&json!("yesterday")), "Unknown");
        assert_eq!(format_date(&Value::Null), "Unknown");
        assert_eq!(format_date(&json!(1496312430)), "Unknown");
    }

    #[test]
    fn test_size_image() {
        assert_eq!(
            size_image(&json!("https://gravatar.com/avatar/abc"), 40),
            "https://gravatar.com/avatar/abc?s=40"
        );
        assert_eq!(
            size_image(&json!("https://gravatar.com/avatar/abc?d=mm"), 40),
            "https://gravatar.com/avatar/abc?d=mm&s=40"
        );
    }

    #[test]
    fn test_helpers_in_templates() {
        let mut engine = Handlebars::new();
        register(&mut engine);
        let out = engine
            .render_template(
                "{{lower name}}|{{lower missing}}|{{date when}}",
                &json!({"name": "Scenario", "when": "2017-06-01T10:20:30Z"}),
            )
            .unwrap();
        assert_eq!(out, "scenario||01 June 2017");
    }
}
