use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// A webhook envelope as posted by Vercel.
///
/// Only the fields below are interpreted; anything else the provider sends
/// is kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: EventKind,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
    pub region: Option<String>,
    pub project_id: Option<String>,
    pub team_id: Option<String>,
    pub payload: Payload,
    pub extra: Map<String, Value>,
}

impl WebhookEvent {
    /// First dot-delimited segment of the type, e.g. `deployment`.
    pub fn namespace(&self) -> &str {
        self.kind.namespace()
    }

    /// Second dot-delimited segment of the type, e.g. `error`.
    pub fn state(&self) -> &str {
        self.kind.state()
    }
}

/// Event kinds documented by Vercel. Anything else lands in [`EventKind::Other`]
/// so new provider events are still delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    DeploymentCreated,
    DeploymentSucceeded,
    DeploymentReady,
    DeploymentPromoted,
    DeploymentCanceled,
    DeploymentError,
    DeploymentCheckRerequested,
    DeploymentIntegrationActionStart,
    DeploymentIntegrationActionCancel,
    DeploymentIntegrationActionCleanup,
    DomainCreated,
    IntegrationConfigurationPermissionUpgraded,
    IntegrationConfigurationRemoved,
    IntegrationConfigurationScopeChangeConfirmed,
    IntegrationResourceProjectConnected,
    IntegrationResourceProjectDisconnected,
    MarketplaceInvoiceCreated,
    MarketplaceInvoiceNotPaid,
    MarketplaceInvoicePaid,
    MarketplaceInvoiceRefunded,
    ProjectCreated,
    ProjectRemoved,
    Other(String),
}

impl EventKind {
    pub const KNOWN: [EventKind; 22] = [
        EventKind::DeploymentCreated,
        EventKind::DeploymentSucceeded,
        EventKind::DeploymentReady,
        EventKind::DeploymentPromoted,
        EventKind::DeploymentCanceled,
        EventKind::DeploymentError,
        EventKind::DeploymentCheckRerequested,
        EventKind::DeploymentIntegrationActionStart,
        EventKind::DeploymentIntegrationActionCancel,
        EventKind::DeploymentIntegrationActionCleanup,
        EventKind::DomainCreated,
        EventKind::IntegrationConfigurationPermissionUpgraded,
        EventKind::IntegrationConfigurationRemoved,
        EventKind::IntegrationConfigurationScopeChangeConfirmed,
        EventKind::IntegrationResourceProjectConnected,
        EventKind::IntegrationResourceProjectDisconnected,
        EventKind::MarketplaceInvoiceCreated,
        EventKind::MarketplaceInvoiceNotPaid,
        EventKind::MarketplaceInvoicePaid,
        EventKind::MarketplaceInvoiceRefunded,
        EventKind::ProjectCreated,
        EventKind::ProjectRemoved,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::DeploymentCreated => "deployment.created",
            EventKind::DeploymentSucceeded => "deployment.succeeded",
            EventKind::DeploymentReady => "deployment.ready",
            EventKind::DeploymentPromoted => "deployment.promoted",
            EventKind::DeploymentCanceled => "deployment.canceled",
            EventKind::DeploymentError => "deployment.error",
            EventKind::DeploymentCheckRerequested => "deployment.check-rerequested",
            EventKind::DeploymentIntegrationActionStart => "deployment.integration.action.start",
            EventKind::DeploymentIntegrationActionCancel => "deployment.integration.action.cancel",
            EventKind::DeploymentIntegrationActionCleanup => {
                "deployment.integration.action.cleanup"
            }
            EventKind::DomainCreated => "domain.created",
            EventKind::IntegrationConfigurationPermissionUpgraded => {
                "integration-configuration.permission-upgraded"
            }
            EventKind::IntegrationConfigurationRemoved => "integration-configuration.removed",
            EventKind::IntegrationConfigurationScopeChangeConfirmed => {
                "integration-configuration.scope-change-confirmed"
            }
            EventKind::IntegrationResourceProjectConnected => {
                "integration-resource.project-connected"
            }
            EventKind::IntegrationResourceProjectDisconnected => {
                "integration-resource.project-disconnected"
            }
            EventKind::MarketplaceInvoiceCreated => "marketplace.invoice.created",
            EventKind::MarketplaceInvoiceNotPaid => "marketplace.invoice.notpaid",
            EventKind::MarketplaceInvoicePaid => "marketplace.invoice.paid",
            EventKind::MarketplaceInvoiceRefunded => "marketplace.invoice.refunded",
            EventKind::ProjectCreated => "project.created",
            EventKind::ProjectRemoved => "project.removed",
            EventKind::Other(raw) => raw,
        }
    }

    /// Get event namespace (e.g., "deployment.error" -> "deployment")
    pub fn namespace(&self) -> &str {
        let raw = self.as_str();
        raw.split('.').next().unwrap_or(raw)
    }

    /// Get the state segment (e.g., "deployment.error" -> "error").
    /// Empty when the type has no second segment.
    pub fn state(&self) -> &str {
        self.as_str().split('.').nth(1).unwrap_or_default()
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

impl From<&str> for EventKind {
    fn from(raw: &str) -> Self {
        EventKind::KNOWN
            .iter()
            .find(|kind| kind.as_str() == raw)
            .cloned()
            .unwrap_or_else(|| EventKind::Other(raw.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The event-specific part of the envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub user: Option<Account>,
    pub team: Option<Account>,
    pub deployment: Option<Deployment>,
    pub links: Option<Links>,
    pub project: Option<Project>,
    pub domain: Option<Domain>,
    pub configuration: Option<Configuration>,
    pub projects: Option<ProjectChanges>,
    pub resource: Option<IntegrationResource>,
    pub invoice: Option<MarketplaceInvoice>,
    pub name: Option<String>,
    pub plan: Option<String>,
    pub target: Option<String>,
    pub url: Option<String>,
    pub regions: Option<Vec<String>>,
    pub alias: Vec<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    pub name: String,
    pub url: String,
    pub meta: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub inspector_url: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deployment {
    /// Look up a metadata value, treating explicit nulls as absent.
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|value| value.as_deref())
    }

    /// Environment label: the deployment target, then `meta.target`.
    pub fn environment(&self) -> Option<&str> {
        self.target
            .as_deref()
            .or_else(|| self.meta_value("target"))
            .filter(|target| !target.is_empty())
    }

    pub fn git_source(&self) -> Option<GitSource<'_>> {
        Some(GitSource {
            branch: self.meta_value("githubCommitRef")?,
            sha: self.meta_value("githubCommitSha")?,
            org: self.meta_value("githubCommitOrg").unwrap_or_default(),
            repo: self.meta_value("githubCommitRepo").unwrap_or_default(),
        })
    }
}

/// Source-control coordinates carried in deployment metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitSource<'a> {
    pub branch: &'a str,
    pub sha: &'a str,
    pub org: &'a str,
    pub repo: &'a str,
}

impl GitSource<'_> {
    pub fn short_sha(&self) -> &str {
        match self.sha.char_indices().nth(7) {
            Some((idx, _)) => &self.sha[..idx],
            None => self.sha,
        }
    }

    pub fn commit_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/commit/{}",
            self.org, self.repo, self.sha
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Links {
    #[validate(url(message = "must be a valid URL"))]
    pub deployment: String,
    #[serde(default)]
    #[validate(url(message = "must be a valid URL"))]
    pub project: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Project {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `payload.user` and `payload.team` share the project shape.
pub type Account = Project;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Domain {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub delegated: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[serde(default)]
    pub projects: Option<Vec<String>>,
    #[serde(default)]
    pub project_selection: Option<ProjectSelection>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSelection {
    All,
    Selected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectChanges {
    #[serde(default)]
    pub added: Option<Vec<String>>,
    #[serde(default)]
    pub removed: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct IntegrationResource {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[validate(nested)]
    pub integration: Integration,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Integration {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MarketplaceInvoice {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
