//! Turns a validated webhook event into a Discord embed.
//!
//! Builders are plain functions looked up by the event namespace (the part of
//! the type before the first dot). A builder that is missing the payload
//! section it needs falls back to the generic message instead of failing, so
//! every event produces exactly one message.
//!
//! Nothing here reads the clock: the embed timestamp is the event's own
//! `createdAt`, which keeps the output a pure function of the input.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use super::palette::{Style, emojis, style_for};
use crate::domain::events::{Deployment, EventKind, Links, WebhookEvent};
use crate::domain::message::{BotIdentity, EmbedField, OutboundMessage};

/// Longest build error excerpt put in a description.
pub const MAX_BUILD_ERROR_CHARS: usize = 500;
/// Discord caps field values at 1024 characters.
pub const MAX_COMMIT_MESSAGE_CHARS: usize = 1000;
pub const TRUNCATION_MARKER: &str = "...";
pub const DEFAULT_ENVIRONMENT: &str = "production";

const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

type BuildFn = fn(&WebhookEvent, &BotIdentity) -> OutboundMessage;

const BUILDERS: [(&str, BuildFn); 3] = [
    ("deployment", deployment_message),
    ("domain", domain_message),
    ("project", project_message),
];

/// Builds outbound messages under a fixed bot identity.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    identity: BotIdentity,
}

impl MessageBuilder {
    pub fn new(identity: BotIdentity) -> Self {
        Self { identity }
    }

    pub fn build(&self, event: &WebhookEvent) -> OutboundMessage {
        let build = BUILDERS
            .iter()
            .find(|(namespace, _)| *namespace == event.namespace())
            .map(|(_, build)| *build)
            .unwrap_or(generic_message);

        build(event, &self.identity)
    }
}

/// Skeleton shared by every builder: styled title, timestamp and bot identity.
fn base_message(event: &WebhookEvent, identity: &BotIdentity, title: &str) -> OutboundMessage {
    let Style { color, emoji } = style_for(&event.kind);

    OutboundMessage {
        title: format!("{emoji} {title}").trim_end().to_string(),
        description: String::new(),
        color,
        url: None,
        fields: Vec::new(),
        timestamp: format_timestamp(event.created_at),
        footer_text: None,
        bot_username: identity.username.clone(),
        bot_avatar_url: identity.avatar_url.clone(),
    }
}

pub fn deployment_message(event: &WebhookEvent, identity: &BotIdentity) -> OutboundMessage {
    let (Some(deployment), Some(links)) = (&event.payload.deployment, &event.payload.links) else {
        return generic_message(event, identity);
    };

    let environment = deployment.environment().unwrap_or(DEFAULT_ENVIRONMENT);
    let mut message = base_message(event, identity, &format!("Deployment {}", event.state()));
    message.url = Some(links.deployment.clone());

    let mut description = format!("**{}** deployed to **{}**", deployment.name, environment);
    if event.kind == EventKind::DeploymentError {
        if let Some(build_error) = deployment.meta_value("buildError") {
            let excerpt = truncate(build_error, MAX_BUILD_ERROR_CHARS);
            description.push_str(&format!("\n\n**Build Error:**\n```\n{excerpt}\n```"));
        }
    }
    message.description = description;
    message.fields = deployment_fields(&event.kind, deployment, links, environment);
    message.footer_text = Some(format!("Deployment {}", deployment.id));

    message
}

fn deployment_fields(
    kind: &EventKind,
    deployment: &Deployment,
    links: &Links,
    environment: &str,
) -> Vec<EmbedField> {
    let mut fields = Vec::new();

    if let Some(project_url) = &links.project {
        fields.push(EmbedField::inline(
            format!("{} Project", emojis::PROJECT),
            format!("[{}]({project_url})", deployment.name),
        ));
    }

    if let Some(source) = deployment.git_source() {
        fields.push(EmbedField::inline(
            format!("{} Branch", emojis::BRANCH),
            format!("`{}`", source.branch),
        ));
        fields.push(EmbedField::inline(
            format!("{} Commit", emojis::COMMIT),
            format!("[`{}`]({})", source.short_sha(), source.commit_url()),
        ));
        fields.push(EmbedField::inline(
            format!("{} Environment", emojis::ENV),
            environment,
        ));
    }

    if let Some(commit_message) = deployment.meta_value("githubCommitMessage") {
        fields.push(EmbedField::block(
            format!("{} Commit Message", emojis::MESSAGE),
            format!(
                "```\n{}\n```",
                truncate(commit_message, MAX_COMMIT_MESSAGE_CHARS)
            ),
        ));
    }

    let label = if is_live(kind) {
        "Preview URL"
    } else {
        "Deployment URL"
    };
    fields.push(EmbedField::block(
        format!("{} {label}", emojis::URL),
        format!("[{}]({})", hostname(&links.deployment), links.deployment),
    ));

    fields
}

pub fn domain_message(event: &WebhookEvent, identity: &BotIdentity) -> OutboundMessage {
    let Some(domain) = &event.payload.domain else {
        return generic_message(event, identity);
    };

    let mut message = base_message(event, identity, &format!("Domain {}", event.state()));
    message.description = format!("**Domain**: {}", domain.name);
    message
}

pub fn project_message(event: &WebhookEvent, identity: &BotIdentity) -> OutboundMessage {
    let Some(project) = &event.payload.project else {
        return generic_message(event, identity);
    };

    let mut message = base_message(event, identity, &format!("Project {}", event.state()));
    message.description = format!("**Project**: {}", project.id);
    message
}

pub fn generic_message(event: &WebhookEvent, identity: &BotIdentity) -> OutboundMessage {
    let timestamp = format_timestamp(event.created_at);

    let mut message = base_message(event, identity, &format_event_name(event.kind.as_str()));
    message.description = format!("Webhook event received at {timestamp}");
    message.footer_text = Some(format!("Event ID: {}", event.id));
    message
}

/// `integration-resource.project-connected` → `Integration resource • Project connected`
pub fn format_event_name(event_type: &str) -> String {
    event_type
        .split('.')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    format!("{}{}", first.to_uppercase(), chars.as_str().replace('-', " "))
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" • ")
}

/// Cut `text` to at most `max_chars` characters, appending the marker when shortened.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}

fn is_live(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::DeploymentSucceeded | EventKind::DeploymentReady
    )
}

fn hostname(link: &str) -> String {
    Url::parse(link)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| link.to_string())
}

fn format_timestamp(created_at_ms: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(created_at_ms) * 1_000_000)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}
