//! Integration tests for the export codec.

use chrono::Utc;
use uuid::Uuid;
use vetsweep::codec::*;
use vetsweep::model::{Attachment, Ticket};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_forward_table() {
    let cases = [
        ("Open", ExternalStatus::Requested),
        ("Assigned", ExternalStatus::Requested),
        ("In Progress", ExternalStatus::InProgress),
        ("Escalated", ExternalStatus::InProgress),
        ("Reopened", ExternalStatus::InProgress),
        ("On Hold", ExternalStatus::OnHold),
        ("Resolved", ExternalStatus::Completed),
        ("Closed", ExternalStatus::Completed),
        ("Cancelled", ExternalStatus::Cancelled),
        ("Rejected", ExternalStatus::Rejected),
    ];
    for (internal, expected) in cases {
        assert_eq!(status_to_external(Some(internal)), expected, "{internal}");
    }
}

#[test]
fn status_forward_is_lenient_about_spelling() {
    assert_eq!(status_to_external(Some("in_progress")), ExternalStatus::InProgress);
    assert_eq!(status_to_external(Some("ON-HOLD")), ExternalStatus::OnHold);
    assert_eq!(status_to_external(Some("  closed ")), ExternalStatus::Completed);
    assert_eq!(status_to_external(Some("canceled")), ExternalStatus::Cancelled);
}

#[test]
fn status_forward_defaults_missing_and_unknown() {
    assert_eq!(status_to_external(None), ExternalStatus::Requested);
    assert_eq!(status_to_external(Some("")), ExternalStatus::Requested);
    assert_eq!(status_to_external(Some("awaiting lab results")), ExternalStatus::Requested);
}

#[test]
fn status_reverse_table() {
    let cases = [
        ("requested", TicketStatus::Open),
        ("in-progress", TicketStatus::InProgress),
        ("on-hold", TicketStatus::OnHold),
        ("completed", TicketStatus::Resolved),
        ("cancelled", TicketStatus::Cancelled),
        ("rejected", TicketStatus::Rejected),
    ];
    for (external, expected) in cases {
        assert_eq!(status_from_external(Some(external)), expected, "{external}");
    }
    assert_eq!(status_from_external(None), TicketStatus::Open);
    assert_eq!(status_from_external(Some("draft")), TicketStatus::Open);
}

#[test]
fn status_round_trip_only_holds_for_representatives() {
    // Closed collapses into completed and comes back as Resolved.
    let external = status_to_external(Some("Closed"));
    assert_eq!(status_from_external(Some(external.as_str())), TicketStatus::Resolved);

    let external = status_to_external(Some("Escalated"));
    assert_eq!(status_from_external(Some(external.as_str())), TicketStatus::InProgress);

    for representative in [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::OnHold,
        TicketStatus::Resolved,
        TicketStatus::Cancelled,
        TicketStatus::Rejected,
    ] {
        let external = status_to_external(Some(representative.as_str()));
        assert_eq!(status_from_external(Some(external.as_str())), representative);
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[test]
fn priority_forward_table() {
    assert_eq!(priority_to_external(Some("Low")), ExternalPriority::Routine);
    assert_eq!(priority_to_external(Some("Medium")), ExternalPriority::Routine);
    assert_eq!(priority_to_external(Some("High")), ExternalPriority::Urgent);
    assert_eq!(priority_to_external(Some("Urgent")), ExternalPriority::Asap);
    assert_eq!(priority_to_external(Some("Critical")), ExternalPriority::Stat);
    assert_eq!(priority_to_external(None), ExternalPriority::Routine);
    assert_eq!(priority_to_external(Some("whenever")), ExternalPriority::Routine);
}

#[test]
fn priority_reverse_table() {
    assert_eq!(priority_from_external(Some("routine")), TicketPriority::Medium);
    assert_eq!(priority_from_external(Some("urgent")), TicketPriority::High);
    assert_eq!(priority_from_external(Some("asap")), TicketPriority::Urgent);
    assert_eq!(priority_from_external(Some("stat")), TicketPriority::Critical);
    assert_eq!(priority_from_external(None), TicketPriority::Medium);
    assert_eq!(priority_from_external(Some("eventually")), TicketPriority::Medium);
}

#[test]
fn low_priority_does_not_survive_round_trip() {
    let external = priority_to_external(Some("Low"));
    assert_eq!(priority_from_external(Some(external.as_str())), TicketPriority::Medium);
}

// ---------------------------------------------------------------------------
// Export record
// ---------------------------------------------------------------------------

#[test]
fn export_record_uses_external_vocabulary() {
    let ticket = Ticket {
        id: Uuid::new_v4(),
        category: Some("Equipment".to_string()),
        description: "Autoclave door seal leaking".to_string(),
        requester: Some("front desk".to_string()),
        status: Some("Escalated".to_string()),
        priority: Some("Critical".to_string()),
        notes: vec!["vendor called".to_string()],
        attachments: vec![Attachment {
            name: "seal.jpg".to_string(),
            url: "https://files.example/seal.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
        }],
        created_at: Utc::now(),
    };

    let record = ExportRecord::from_ticket(&ticket);
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["status"], "in-progress");
    assert_eq!(json["priority"], "stat");
    assert_eq!(json["description"], "Autoclave door seal leaking");
    assert_eq!(json["attachments"][0]["name"], "seal.jpg");
    assert!(json.get("authoredOn").is_some());
}

#[test]
fn export_record_tolerates_missing_fields() {
    let ticket = Ticket {
        id: Uuid::new_v4(),
        category: None,
        description: String::new(),
        requester: None,
        status: None,
        priority: None,
        notes: Vec::new(),
        attachments: Vec::new(),
        created_at: Utc::now(),
    };

    let record = ExportRecord::from_ticket(&ticket);
    assert_eq!(record.status, ExternalStatus::Requested);
    assert_eq!(record.priority, ExternalPriority::Routine);
}
