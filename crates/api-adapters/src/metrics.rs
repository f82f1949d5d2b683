//! Prometheus counters for forum activity, exposed at `/metrics`.

use std::fmt;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Domain events worth counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForumEvent {
    UserSignedUp,
    UserLoggedIn,
    LoginFailed,
    PostCreated,
    PostEdited,
    PostDeleted,
    ReplyCreated,
    ReplyDeleted,
    EssenceToggled,
    TopToggled,
    ThemeCreated,
    ThemeUpdated,
    ThemeDeleted,
    ThemeSwitched,
}

impl ForumEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSignedUp => "user_signed_up",
            Self::UserLoggedIn => "user_logged_in",
            Self::LoginFailed => "login_failed",
            Self::PostCreated => "post_created",
            Self::PostEdited => "post_edited",
            Self::PostDeleted => "post_deleted",
            Self::ReplyCreated => "reply_created",
            Self::ReplyDeleted => "reply_deleted",
            Self::EssenceToggled => "essence_toggled",
            Self::TopToggled => "top_toggled",
            Self::ThemeCreated => "theme_created",
            Self::ThemeUpdated => "theme_updated",
            Self::ThemeDeleted => "theme_deleted",
            Self::ThemeSwitched => "theme_switched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct EventLabels {
    event: String,
}

pub struct Metrics {
    registry: Registry,
    events: Family<EventLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("forum");
        let events = Family::<EventLabels, Counter>::default();
        registry.register("events", "Forum events by kind", events.clone());
        Self { registry, events }
    }

    pub fn record(&self, event: ForumEvent) {
        self.events
            .get_or_create(&EventLabels { event: event.as_str().to_string() })
            .inc();
    }

    pub fn count(&self, event: ForumEvent) -> u64 {
        self.events
            .get_or_create(&EventLabels { event: event.as_str().to_string() })
            .get()
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}
