//! Parsing and structural validation of inbound webhook envelopes.
//!
//! Known fields are checked strictly; every other field is carried along in
//! the `extra` maps so the provider can add fields without breaking us.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::events::{EventKind, Payload, WebhookEvent};

/// A known field had the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {constraint}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `payload.links.deployment`.
    pub path: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            constraint: constraint.into(),
        }
    }

    /// Pick the first failing field (in path order) out of a validator report.
    fn from_report(prefix: &str, errors: &ValidationErrors) -> Self {
        let mut flat = Vec::new();
        flatten_report(prefix, errors, &mut flat);
        flat.sort_by(|a, b| a.path.cmp(&b.path));
        flat.into_iter()
            .next()
            .unwrap_or_else(|| Self::new(prefix, "invalid"))
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    /// The body is not JSON at all.
    #[error("Malformed JSON body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid webhook payload: {0}")]
    Invalid(#[from] ValidationError),
}

/// Parse a raw request body into a validated [`WebhookEvent`].
pub fn parse_webhook(raw: &[u8]) -> Result<WebhookEvent, SchemaError> {
    let value: Value = serde_json::from_slice(raw)?;
    Ok(validate_webhook(value)?)
}

/// Validate an already parsed JSON value against the envelope shape.
pub fn validate_webhook(value: Value) -> Result<WebhookEvent, ValidationError> {
    let Value::Object(mut envelope) = value else {
        return Err(ValidationError::new("$", "expected an object"));
    };

    let id = take_string(&mut envelope, "id", "id")?;
    if id.is_empty() {
        return Err(ValidationError::new("id", "must not be empty"));
    }
    let kind = EventKind::from(take_string(&mut envelope, "type", "type")?.as_str());
    let created_at = take_timestamp(&mut envelope, "createdAt")?;
    let region = take_optional::<String>(&mut envelope, "region", "region")?;
    let project_id = take_optional::<String>(&mut envelope, "projectId", "projectId")?;
    let team_id = take_optional::<String>(&mut envelope, "teamId", "teamId")?;

    let payload = match envelope.remove("payload") {
        Some(Value::Object(map)) => parse_payload(map)?,
        Some(_) => return Err(ValidationError::new("payload", "expected an object")),
        None => return Err(ValidationError::new("payload", "is required")),
    };

    Ok(WebhookEvent {
        id,
        kind,
        created_at,
        region,
        project_id,
        team_id,
        payload,
        extra: envelope,
    })
}

fn parse_payload(mut map: Map<String, Value>) -> Result<Payload, ValidationError> {
    let payload = Payload {
        user: take_section(&mut map, "user")?,
        team: take_section(&mut map, "team")?,
        deployment: take_section(&mut map, "deployment")?,
        links: take_section(&mut map, "links")?,
        project: take_section(&mut map, "project")?,
        domain: take_section(&mut map, "domain")?,
        configuration: take_section(&mut map, "configuration")?,
        projects: take_optional(&mut map, "projects", "payload.projects")?,
        resource: take_section(&mut map, "resource")?,
        invoice: take_section(&mut map, "invoice")?,
        name: take_optional(&mut map, "name", "payload.name")?,
        plan: take_optional(&mut map, "plan", "payload.plan")?,
        target: take_optional(&mut map, "target", "payload.target")?,
        url: take_optional(&mut map, "url", "payload.url")?,
        regions: take_optional(&mut map, "regions", "payload.regions")?,
        alias: take_optional(&mut map, "alias", "payload.alias")?.unwrap_or_default(),
        extra: Map::new(),
    };

    Ok(Payload { extra: map, ..payload })
}

/// Deserialize and validate one known payload section.
fn take_section<T>(map: &mut Map<String, Value>, key: &str) -> Result<Option<T>, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let path = format!("payload.{key}");
    let section: Option<T> = take_optional(map, key, &path)?;
    if let Some(section) = &section {
        section
            .validate()
            .map_err(|errors| ValidationError::from_report(&path, &errors))?;
    }
    Ok(section)
}

fn take_optional<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<T>, ValidationError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ValidationError::new(path, e.to_string())),
    }
}

fn take_string(
    map: &mut Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, ValidationError> {
    match map.remove(key) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ValidationError::new(path, "expected a string")),
        None => Err(ValidationError::new(path, "is required")),
    }
}

fn take_timestamp(map: &mut Map<String, Value>, key: &str) -> Result<i64, ValidationError> {
    match map.remove(key) {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|ms| ms as i64))
            .ok_or_else(|| ValidationError::new(key, "expected a number")),
        Some(_) => Err(ValidationError::new(key, "expected a number")),
        None => Err(ValidationError::new(key, "is required")),
    }
}

fn flatten_report(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationError>) {
    for (field, kind) in errors.errors() {
        let path = format!("{prefix}.{field}");
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let constraint = failure
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| failure.code.to_string());
                    out.push(ValidationError::new(path.clone(), constraint));
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten_report(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_report(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment_envelope() -> Value {
        json!({
            "id": "evt_123",
            "type": "deployment.succeeded",
            "createdAt": 1_700_000_000_000_i64,
            "region": "iad1",
            "payload": {
                "deployment": {
                    "id": "dpl_abc",
                    "name": "web",
                    "url": "web-abc.vercel.app",
                    "meta": {
                        "githubCommitRef": "main",
                        "githubCommitSha": "0123456789abcdef",
                        "githubCommitMessage": null
                    },
                    "target": "production"
                },
                "links": {
                    "deployment": "https://vercel.com/acme/web/dpl_abc",
                    "project": "https://vercel.com/acme/web"
                },
                "project": { "id": "prj_1" }
            }
        })
    }

    #[test]
    fn test_valid_envelope_parses() {
        let event = validate_webhook(deployment_envelope()).expect("valid envelope");

        assert_eq!(event.id, "evt_123");
        assert_eq!(event.kind, EventKind::DeploymentSucceeded);
        assert_eq!(event.created_at, 1_700_000_000_000);
        assert_eq!(event.region.as_deref(), Some("iad1"));

        let deployment = event.payload.deployment.expect("deployment section");
        assert_eq!(deployment.id, "dpl_abc");
        assert_eq!(deployment.meta_value("githubCommitRef"), Some("main"));
        assert_eq!(deployment.meta_value("githubCommitMessage"), None);
        assert!(event.payload.alias.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let mut value = deployment_envelope();
        value["futureTopLevel"] = json!(true);
        value["payload"]["newSection"] = json!({ "a": 1 });
        value["payload"]["deployment"]["buildMachine"] = json!("enhanced");
        value["payload"]["links"]["logs"] = json!("https://vercel.com/logs");

        let event = validate_webhook(value).expect("extra fields must not fail validation");

        assert_eq!(event.extra.get("futureTopLevel"), Some(&json!(true)));
        assert_eq!(event.payload.extra.get("newSection"), Some(&json!({ "a": 1 })));
        let deployment = event.payload.deployment.expect("deployment");
        assert_eq!(deployment.extra.get("buildMachine"), Some(&json!("enhanced")));
        let links = event.payload.links.expect("links");
        assert_eq!(links.extra.get("logs"), Some(&json!("https://vercel.com/logs")));
    }

    #[test]
    fn test_unknown_event_type_is_accepted() {
        let value = json!({
            "id": "evt_9",
            "type": "firewall.attack-detected",
            "createdAt": 1,
            "payload": {}
        });

        let event = validate_webhook(value).expect("unknown kinds are not rejected");
        assert_eq!(event.kind, EventKind::Other("firewall.attack-detected".to_string()));
    }

    #[test]
    fn test_missing_id_reports_path() {
        let mut value = deployment_envelope();
        value.as_object_mut().unwrap().remove("id");

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err, ValidationError::new("id", "is required"));
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let mut value = deployment_envelope();
        value["id"] = json!("");

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "id");
    }

    #[test]
    fn test_wrong_created_at_type() {
        let mut value = deployment_envelope();
        value["createdAt"] = json!("yesterday");

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err, ValidationError::new("createdAt", "expected a number"));
    }

    #[test]
    fn test_payload_must_be_object() {
        let mut value = deployment_envelope();
        value["payload"] = json!([1, 2, 3]);

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "payload");
    }

    #[test]
    fn test_malformed_links_url_reports_field_path() {
        let mut value = deployment_envelope();
        value["payload"]["links"]["deployment"] = json!("not a url");

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "payload.links.deployment");
        assert_eq!(err.constraint, "must be a valid URL");
    }

    #[test]
    fn test_inspector_url_is_not_checked_as_url() {
        let mut value = deployment_envelope();
        value["payload"]["deployment"]["inspectorUrl"] = json!("vercel.com/acme/app/abc");

        let event = validate_webhook(value).expect("deployment is valid");
        let deployment = event.payload.deployment.expect("deployment");
        assert_eq!(deployment.inspector_url.as_deref(), Some("vercel.com/acme/app/abc"));
    }

    #[test]
    fn test_empty_deployment_id_is_rejected() {
        let mut value = deployment_envelope();
        value["payload"]["deployment"]["id"] = json!("");

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "payload.deployment.id");
    }

    #[test]
    fn test_wrong_section_shape_reports_section_path() {
        let mut value = deployment_envelope();
        value["payload"]["deployment"]["name"] = json!(42);

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "payload.deployment");
    }

    #[test]
    fn test_nested_integration_id_is_validated() {
        let value = json!({
            "id": "evt_1",
            "type": "integration-resource.project-connected",
            "createdAt": 1,
            "payload": {
                "resource": {
                    "id": "res_1",
                    "name": "db",
                    "type": "postgres",
                    "integration": { "id": "", "name": "Neon" }
                }
            }
        });

        let err = validate_webhook(value).unwrap_err();
        assert_eq!(err.path, "payload.resource.integration.id");
    }

    #[test]
    fn test_parse_webhook_distinguishes_malformed_json() {
        let err = parse_webhook(b"{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));

        let err = parse_webhook(br#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Invalid(_)));
    }
}
