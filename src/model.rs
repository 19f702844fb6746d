//! Core data model.
//!
//! Work items (tasks and appointments) are what the sweeps read and mark.
//! Job specs and ticks describe the periodic schedule. Tickets are the
//! records handed to the external export codec.

pub mod item;
pub mod job;
pub mod ticket;

pub use item::{
    Frequency, ItemId, ItemKind, NewOccurrence, Recurrence, Reminder, Status, WorkItem,
};
pub use job::{JobTick, RecurringJobSpec, Schedule};
pub use ticket::{Attachment, Ticket};
