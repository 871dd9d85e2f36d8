use chrono::{
    DateTime,
    Local,
};
use std::time::{
    Duration,
    Instant,
};

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(6);
const MAX_VISIBLE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationPosition {
    TopRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationIcon {
    Bell,
}

impl NotificationIcon {
    pub fn glyph(self) -> &'static str {
        match self {
            NotificationIcon::Bell => "🔔",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub position: NotificationPosition,
    pub icon: NotificationIcon,
    pub raised_at: DateTime<Local>,
}

impl Notification {
    pub fn transaction_complete() -> Self {
        Self {
            kind: NotificationKind::Info,
            title: String::from("Transaction Notification"),
            message: String::from("Transaction Complete!"),
            position: NotificationPosition::TopRight,
            icon: NotificationIcon::Bell,
            raised_at: Local::now(),
        }
    }
}

/// Toasts currently on screen, newest last.
#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    active: Vec<(Notification, Instant)>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            active: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, notification: Notification) {
        self.dispatch_at(notification, Instant::now());
    }

    fn dispatch_at(&mut self, notification: Notification, now: Instant) {
        tracing::info!(title = %notification.title, message = %notification.message, "notification");
        self.active.push((notification, now + self.ttl));
        if self.active.len() > MAX_VISIBLE {
            let overflow = self.active.len() - MAX_VISIBLE;
            self.active.drain(0..overflow);
        }
    }

    /// Drops expired toasts. Returns true when something was removed.
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.active.len();
        self.active.retain(|(_, expires_at)| *expires_at > now);
        before != self.active.len()
    }

    pub fn dismiss_latest(&mut self) -> bool {
        self.active.pop().is_some()
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.active.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
