//! Work items: tasks and appointments with a due time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::notify::NotificationId;

// ---------------------------------------------------------------------------
// Work Item
// ---------------------------------------------------------------------------

/// A task or appointment the sweeps operate on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,

    pub kind: ItemKind,

    /// User who receives the reminder.
    pub assignee_id: Uuid,

    /// Short label used in reminder text.
    pub title: String,

    /// Absolute due instant.
    pub due_at: DateTime<Utc>,

    /// IANA zone name. `None` means UTC.
    pub timezone: Option<String>,

    pub status: Status,

    pub reminder: Option<Reminder>,

    /// Appointments only: when the patient arrived.
    pub checked_in_at: Option<DateTime<Utc>>,

    pub recurrence: Option<Recurrence>,

    /// First occurrence of the series this item belongs to.
    pub series_id: Option<ItemId>,

    /// Next occurrence, once materialized.
    pub successor_id: Option<ItemId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// A pending item with no reminder or recurrence.
    pub fn new(
        kind: ItemKind,
        assignee_id: Uuid,
        title: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            kind,
            assignee_id,
            title: title.into(),
            due_at,
            timezone: None,
            status: Status::Pending,
            reminder: None,
            checked_in_at: None,
            recurrence: None,
            series_id: None,
            successor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    pub fn remind(mut self, offset_minutes: i32) -> Self {
        self.reminder = Some(Reminder::new(offset_minutes));
        self
    }

    pub fn recurring(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Has a reminder already gone out for this item?
    pub fn reminder_dispatched(&self) -> bool {
        self.reminder
            .as_ref()
            .is_some_and(|r| r.dispatched_notification_id.is_some())
    }

    /// Series this item belongs to (itself when it is the first occurrence).
    pub fn series(&self) -> ItemId {
        self.series_id.unwrap_or(self.id)
    }
}

/// Newtype for work item IDs. Ordered, so candidate queries can page by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Appointment,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemKind::Task => "task",
            ItemKind::Appointment => "appointment",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(ItemKind::Task),
            "appointment" => Ok(ItemKind::Appointment),
            other => Err(Error::Other(format!("unknown item kind: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    /// Appointment passed its grace window without a check-in. Terminal.
    NoShow,
}

impl Status {
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Cancelled | Status::NoShow)
    }

    /// Statuses that still get reminders.
    pub fn is_open(self) -> bool {
        matches!(self, Status::Pending | Status::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
            Status::NoShow => "no_show",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "in_progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            "cancelled" => Ok(Status::Cancelled),
            "no_show" => Ok(Status::NoShow),
            other => Err(Error::Other(format!("unknown status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reminder
// ---------------------------------------------------------------------------

/// Reminder configuration and dispatch marker.
///
/// `dispatched_notification_id` is set once by the reminder sweep's claim
/// and never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,
    /// Minutes before `due_at` the reminder fires.
    pub offset_minutes: i32,
    pub dispatched_notification_id: Option<NotificationId>,
}

impl Reminder {
    pub fn new(offset_minutes: i32) -> Self {
        Self {
            enabled: true,
            offset_minutes,
            dispatched_notification_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recurrence
// ---------------------------------------------------------------------------

/// Repeat rule. Steps are taken on the local wall clock of the item's zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
    /// Every `interval` days / weeks / months. At least 1.
    pub interval: u32,
    /// Last instant an occurrence may fall on.
    pub until: Option<DateTime<Utc>>,
}

impl Recurrence {
    pub fn every(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval: interval.max(1),
            until: None,
        }
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(Error::Other(format!("unknown frequency: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Materialized occurrence
// ---------------------------------------------------------------------------

/// The next occurrence of a recurring item, built by the recurrence sweep.
#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub id: ItemId,
    pub due_at: DateTime<Utc>,
}

impl NewOccurrence {
    /// Build the stored item for this occurrence from its predecessor.
    pub fn into_item(self, parent: &WorkItem, now: DateTime<Utc>) -> WorkItem {
        WorkItem {
            id: self.id,
            kind: parent.kind,
            assignee_id: parent.assignee_id,
            title: parent.title.clone(),
            due_at: self.due_at,
            timezone: parent.timezone.clone(),
            status: Status::Pending,
            reminder: parent.reminder.as_ref().map(|r| Reminder {
                enabled: r.enabled,
                offset_minutes: r.offset_minutes,
                dispatched_notification_id: None,
            }),
            checked_in_at: None,
            recurrence: parent.recurrence.clone(),
            series_id: Some(parent.series()),
            successor_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}
