use chrono::SecondsFormat;
use minijinja::{context, Environment};
use serde::Serialize;

use crate::entities::submission::{KnownField, NormalizedSubmission, ProcessedSubmission};
use crate::errors::EmailError;

const SUBJECT_MAX_CHARS: usize = 200;

/// Normalized keys that describe the request rather than the form.
const HIDDEN_FIELDS: [&str; 3] = ["timestamp", "ip", "useragent"];

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Form Submission</title>
  <style>
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #f4f4f4; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
    .field { margin-bottom: 15px; }
    .label { font-weight: bold; color: #555; }
    .value { margin-top: 5px; padding: 10px; background: #f9f9f9; border-radius: 3px; }
    .meta { margin-top: 30px; padding: 15px; background: #e9e9e9; border-radius: 5px; font-size: 0.9em; }
  </style>
</head>
<body>
  <div class="container">
    <div class="header">
      <h2>New Form Submission</h2>
      <p>Received at {{ received_at }}</p>
    </div>
    <div class="content">
{%- for field in fields %}
      <div class="field">
        <div class="label">{{ field.label }}</div>
        <div class="value">{{ field.value }}</div>
      </div>
{%- endfor %}
    </div>
    <div class="meta">
      <div class="meta-item"><strong>IP Address:</strong> {{ ip }}</div>
      <div class="meta-item"><strong>Timestamp:</strong> {{ timestamp }}</div>
{%- if user_agent %}
      <div class="meta-item"><strong>User Agent:</strong> {{ user_agent }}</div>
{%- endif %}
    </div>
  </div>
</body>
</html>
"#;

const TEXT_TEMPLATE: &str = r#"New Form Submission
===================

Received at: {{ received_at }}
{% for field in fields %}
{{ field.label }}: {{ field.value }}
{%- endfor %}

---
IP Address: {{ ip }}
Timestamp: {{ timestamp }}
{%- if user_agent %}
User Agent: {{ user_agent }}
{%- endif %}
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Serialize)]
struct FieldRow {
    label: String,
    value: String,
}

/// Compiled notification templates. The `.html` template is auto-escaped.
pub struct EmailTemplates {
    env: Environment<'static>,
}

impl EmailTemplates {
    pub fn new() -> Result<Self, EmailError> {
        let mut env = Environment::new();
        env.add_template("submission.html", HTML_TEMPLATE)?;
        env.add_template("submission.txt", TEXT_TEMPLATE)?;
        Ok(EmailTemplates { env })
    }

    pub fn render(&self, submission: &ProcessedSubmission) -> Result<EmailTemplate, EmailError> {
        let fields: Vec<FieldRow> = submission
            .normalized
            .iter()
            .filter(|(key, _)| !HIDDEN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| FieldRow {
                label: capitalize(key),
                value: value.to_string(),
            })
            .collect();

        let ctx = context! {
            fields => &fields,
            ip => &submission.ip,
            timestamp => submission.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            received_at => submission.timestamp.format("%B %-d, %Y at %H:%M:%S UTC").to_string(),
            user_agent => &submission.user_agent,
        };

        Ok(EmailTemplate {
            subject: subject_for(&submission.normalized),
            html_body: self.env.get_template("submission.html")?.render(&ctx)?,
            text_body: self.env.get_template("submission.txt")?.render(&ctx)?,
        })
    }
}

/// Explicit subject first, then the sender's name, then a generic line.
pub fn subject_for(normalized: &NormalizedSubmission) -> String {
    let subject = match (
        normalized.known_text(KnownField::Subject),
        normalized.known_text(KnownField::Name),
    ) {
        (Some(subject), _) => subject.to_string(),
        (None, Some(name)) => format!("Form submission from {}", name),
        (None, None) => "New form submission".to_string(),
    };

    subject.chars().take(SUBJECT_MAX_CHARS).collect()
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::submission::FieldValue;
    use chrono::{DateTime, Utc};

    fn submission(fields: &[(&str, &str)], user_agent: Option<&str>) -> ProcessedSubmission {
        ProcessedSubmission {
            normalized: fields
                .iter()
                .map(|(k, v)| (*k, FieldValue::from(*v)))
                .collect(),
            hash: "abc123def456".into(),
            timestamp: DateTime::parse_from_rfc3339("2023-10-01T12:00:00.000Z")
                .unwrap()
                .with_timezone(&Utc),
            ip: "192.168.1.1".into(),
            user_agent: user_agent.map(str::to_string),
        }
    }

    fn contact() -> Vec<(&'static str, &'static str)> {
        vec![
            ("name", "John Doe"),
            ("email", "john@example.com"),
            ("message", "Hello, this is a test message."),
            ("phone", "+1-555-123-4567"),
        ]
    }

    #[test]
    fn renders_fields_and_metadata() {
        let templates = EmailTemplates::new().unwrap();
        let email = templates
            .render(&submission(&contact(), Some("Mozilla (Test Browser)")))
            .unwrap();

        assert_eq!(email.subject, "Form submission from John Doe");
        for body in [&email.html_body, &email.text_body] {
            assert!(body.contains("John Doe"));
            assert!(body.contains("john@example.com"));
            assert!(body.contains("Hello, this is a test message."));
            assert!(body.contains("192.168.1.1"));
            assert!(body.contains("2023-10-01T12:00:00.000Z"));
            assert!(body.contains("User Agent"));
        }
        assert!(email.text_body.contains("Name: John Doe"));
        assert!(email.text_body.contains("Received at: October 1, 2023 at 12:00:00 UTC"));
    }

    #[test]
    fn subject_falls_back_to_generic_line() {
        let templates = EmailTemplates::new().unwrap();
        let email = templates
            .render(&submission(&[("email", "jane@example.com"), ("message", "Test message")], None))
            .unwrap();

        assert_eq!(email.subject, "New form submission");
    }

    #[test]
    fn explicit_subject_wins() {
        let mut fields = contact();
        fields.push(("subject", "Custom Subject Line"));

        let email = EmailTemplates::new()
            .unwrap()
            .render(&submission(&fields, None))
            .unwrap();

        assert_eq!(email.subject, "Custom Subject Line");
    }

    #[test]
    fn subject_is_truncated() {
        let long = "s".repeat(250);
        let normalized: NormalizedSubmission = [("subject", FieldValue::from(long.as_str()))]
            .into_iter()
            .collect();

        assert_eq!(subject_for(&normalized).chars().count(), 200);
    }

    #[test]
    fn html_body_escapes_form_data() {
        let email = EmailTemplates::new()
            .unwrap()
            .render(&submission(
                &[
                    ("name", "John <script>alert(\"xss\")</script>"),
                    ("message", "Hello & welcome to our site!"),
                ],
                None,
            ))
            .unwrap();

        assert!(email.html_body.contains("John &lt;script&gt;alert(&quot;xss&quot;)"));
        assert!(email.html_body.contains("Hello &amp; welcome to our site!"));
        assert!(!email.html_body.contains("<script>"));
        assert!(email.text_body.contains("Hello & welcome to our site!"));
    }

    #[test]
    fn user_agent_section_is_optional() {
        let email = EmailTemplates::new()
            .unwrap()
            .render(&submission(&contact(), None))
            .unwrap();

        assert!(!email.html_body.contains("User Agent"));
        assert!(!email.text_body.contains("User Agent"));
    }

    #[test]
    fn request_metadata_keys_are_not_listed_as_fields() {
        let email = EmailTemplates::new()
            .unwrap()
            .render(&submission(&[("message", "Hi"), ("ip", "6.6.6.6")], None))
            .unwrap();

        assert!(!email.text_body.contains("6.6.6.6"));
        assert_eq!(capitalize("message"), "Message");
        assert_eq!(capitalize(""), "");
    }
}
