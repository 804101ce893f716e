use serde::{Deserialize, Serialize};

/// Display name and avatar the bot posts under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub username: String,
    pub avatar_url: String,
}

/// A chat notification ready to be delivered. Built fresh for every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub title: String,
    pub description: String,
    /// 24-bit RGB.
    pub color: u32,
    pub url: Option<String>,
    pub fields: Vec<EmbedField>,
    /// RFC 3339.
    pub timestamp: String,
    pub footer_text: Option<String>,
    pub bot_username: String,
    pub bot_avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }

    pub fn block(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

/// Discord execute-webhook request body.
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    pub username: &'a str,
    pub avatar_url: &'a str,
    pub embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
pub struct Embed<'a> {
    pub title: &'a str,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    pub color: u32,
    #[serde(skip_serializing_if = "<[EmbedField]>::is_empty")]
    pub fields: &'a [EmbedField],
    pub timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter<'a>>,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooter<'a> {
    pub text: &'a str,
}

impl OutboundMessage {
    pub fn to_webhook_body(&self) -> WebhookBody<'_> {
        WebhookBody {
            username: &self.bot_username,
            avatar_url: &self.bot_avatar_url,
            embeds: [Embed {
                title: &self.title,
                description: &self.description,
                url: self.url.as_deref(),
                color: self.color,
                fields: &self.fields,
                timestamp: &self.timestamp,
                footer: self.footer_text.as_deref().map(|text| EmbedFooter { text }),
            }],
        }
    }
}
