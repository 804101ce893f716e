//! Emoji and colour per event type.

use crate::domain::events::EventKind;

pub mod colors {
    pub const PROMOTED: u32 = 0xd998e3;
    pub const SUCCESS: u32 = 0x2ecc71;
    pub const ERROR: u32 = 0xe74c3c;
    pub const CANCELED: u32 = 0x95a5a6;
    pub const INFO: u32 = 0x3498db;
    pub const PENDING: u32 = 0xf1c40f;
    pub const WARNING: u32 = 0xff9800;
    pub const REFUNDED: u32 = 0x607d8b;
    pub const PAID: u32 = 0x4caf50;
    pub const CONNECTED: u32 = 0x2196f3;
    pub const DISCONNECTED: u32 = 0xf44336;
    pub const CREATED: u32 = 0x8bc34a;
    pub const REMOVED: u32 = 0xff5722;
    pub const UPGRADED: u32 = 0x9c27b0;
    pub const CONFIRMED: u32 = 0x00bcd4;
}

pub mod emojis {
    pub const PROMOTED: &str = "🔗";
    pub const SUCCESS: &str = "✅";
    pub const ERROR: &str = "❌";
    pub const CANCELED: &str = "🚫";
    pub const PENDING: &str = "⏳";
    pub const BRANCH: &str = "🌿";
    pub const COMMIT: &str = "📝";
    pub const PROJECT: &str = "📦";
    pub const DEPLOY: &str = "🚀";
    pub const REFRESH: &str = "🔄";
    pub const CLEANUP: &str = "🧹";
    pub const DOMAIN: &str = "🌐";
    pub const UPGRADE: &str = "🔼";
    pub const DISCONNECT: &str = "🔌";
    pub const CONFIRM: &str = "✅";
    pub const CONNECT: &str = "🔗";
    pub const UNLOCK: &str = "🔓";
    pub const INVOICE: &str = "📝";
    pub const WARNING: &str = "⚠️";
    pub const PAYMENT: &str = "💵";
    pub const MONEY: &str = "💸";
    pub const NEW: &str = "🆕";
    pub const TRASH: &str = "🗑️";
    pub const ENV: &str = "🔗";
    pub const URL: &str = "🌐";
    pub const MESSAGE: &str = "💬";
}

/// Colour and emoji used to decorate one event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: u32,
    pub emoji: &'static str,
}

impl Style {
    const fn new(color: u32, emoji: &'static str) -> Self {
        Self { color, emoji }
    }
}

/// Used for any type without its own entry.
pub const DEFAULT_STYLE: Style = Style::new(colors::INFO, emojis::DEPLOY);

/// Style for the exact event type; unknown types get [`DEFAULT_STYLE`].
pub fn style_for(kind: &EventKind) -> Style {
    match kind {
        EventKind::DeploymentCreated => Style::new(colors::PENDING, emojis::PENDING),
        EventKind::DeploymentSucceeded | EventKind::DeploymentReady => {
            Style::new(colors::SUCCESS, emojis::SUCCESS)
        }
        EventKind::DeploymentPromoted => Style::new(colors::PROMOTED, emojis::PROMOTED),
        EventKind::DeploymentError => Style::new(colors::ERROR, emojis::ERROR),
        EventKind::DeploymentCanceled => Style::new(colors::CANCELED, emojis::CANCELED),
        EventKind::DeploymentCheckRerequested => Style::new(colors::INFO, emojis::REFRESH),
        EventKind::DeploymentIntegrationActionStart => {
            Style::new(colors::PENDING, emojis::PENDING)
        }
        EventKind::DeploymentIntegrationActionCancel => {
            Style::new(colors::CANCELED, emojis::CANCELED)
        }
        EventKind::DeploymentIntegrationActionCleanup => Style::new(colors::INFO, emojis::CLEANUP),
        EventKind::DomainCreated => Style::new(colors::SUCCESS, emojis::DOMAIN),
        EventKind::IntegrationConfigurationPermissionUpgraded => {
            Style::new(colors::UPGRADED, emojis::UPGRADE)
        }
        EventKind::IntegrationConfigurationRemoved => Style::new(colors::ERROR, emojis::DISCONNECT),
        EventKind::IntegrationConfigurationScopeChangeConfirmed => {
            Style::new(colors::CONFIRMED, emojis::CONFIRM)
        }
        EventKind::IntegrationResourceProjectConnected => {
            Style::new(colors::CONNECTED, emojis::CONNECT)
        }
        EventKind::IntegrationResourceProjectDisconnected => {
            Style::new(colors::DISCONNECTED, emojis::UNLOCK)
        }
        EventKind::MarketplaceInvoiceCreated => Style::new(colors::INFO, emojis::INVOICE),
        EventKind::MarketplaceInvoiceNotPaid => Style::new(colors::WARNING, emojis::WARNING),
        EventKind::MarketplaceInvoicePaid => Style::new(colors::PAID, emojis::PAYMENT),
        EventKind::MarketplaceInvoiceRefunded => Style::new(colors::REFUNDED, emojis::MONEY),
        EventKind::ProjectCreated => Style::new(colors::CREATED, emojis::NEW),
        EventKind::ProjectRemoved => Style::new(colors::REMOVED, emojis::TRASH),
        EventKind::Other(_) => DEFAULT_STYLE,
    }
}
