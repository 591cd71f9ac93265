//! OCSF (Open Cybersecurity Schema Framework) structured event logging.
//!
//! Token validation outcomes and session-state access decisions are audit
//! events. They are emitted via `tracing::info!` on the `ocsf` target as
//! structured JSON. Never panics; serialization errors are dropped.

use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

// OCSF event class UIDs
pub const CLASS_AUTHENTICATION: u32 = 3001;

// Activity IDs
pub const ACTIVITY_AUTH_TICKET: u32 = 3; // Local claim check
pub const ACTIVITY_SERVICE_TICKET: u32 = 4; // Introspection
pub const ACTIVITY_OTHER: u32 = 99; // Access decisions

// Status IDs
pub const STATUS_SUCCESS: u32 = 1;
pub const STATUS_FAILURE: u32 = 2;

// Severity IDs
pub const SEVERITY_INFORMATIONAL: u32 = 1;
pub const SEVERITY_LOW: u32 = 2;
pub const SEVERITY_MEDIUM: u32 = 3;
pub const SEVERITY_HIGH: u32 = 4;

const AUTH_PROTOCOL_OAUTH2: u32 = 10;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn severity_name(id: u32) -> &'static str {
    match id {
        SEVERITY_INFORMATIONAL => "Informational",
        SEVERITY_LOW => "Low",
        SEVERITY_MEDIUM => "Medium",
        SEVERITY_HIGH => "High",
        5 => "Critical",
        _ => "Unknown",
    }
}

fn status_name(id: u32) -> &'static str {
    match id {
        STATUS_SUCCESS => "Success",
        _ => "Failure",
    }
}

fn product() -> serde_json::Value {
    json!({
        "name": "session-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "vendor_name": "Session Bridge"
    })
}

/// Emit an OCSF event as structured JSON via tracing. Never panics.
fn emit(event: &serde_json::Value) {
    if let Ok(json) = serde_json::to_string(event) {
        tracing::info!(target: "ocsf", "{}", json);
    }
}

fn with_actor(event: &mut serde_json::Value, subject: Option<&str>) {
    if let Some(subject) = subject {
        event["actor"] = json!({
            "user": {
                "uid": subject,
                "type_id": 1,
                "type": "User"
            }
        });
    }
}

/// Build an OCSF Authentication (3001) event.
pub fn authentication(
    activity_id: u32,
    activity_name: &str,
    status_id: u32,
    severity_id: u32,
    subject: Option<&str>,
    message: &str,
) -> serde_json::Value {
    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity_id,
        "activity_name": activity_name,
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": status_name(status_id),
        "time": now_millis(),
        "metadata": { "product": product() },
        "auth_protocol_id": AUTH_PROTOCOL_OAUTH2,
        "auth_protocol": "OAuth 2.0 Bearer",
        "message": message,
    });
    with_actor(&mut event, subject);
    event
}

/// Emit an OCSF Authentication (3001) event.
pub fn authentication_event(
    activity_id: u32,
    activity_name: &str,
    status_id: u32,
    severity_id: u32,
    subject: Option<&str>,
    message: &str,
) {
    emit(&authentication(
        activity_id,
        activity_name,
        status_id,
        severity_id,
        subject,
        message,
    ));
}

/// Build an OCSF access decision event (class 3001, activity 99/Other).
pub fn access_decision(action: &str, resource: &str, permitted: bool, reason: &str) -> serde_json::Value {
    let (status_id, severity_id, decision) = if permitted {
        (STATUS_SUCCESS, SEVERITY_INFORMATIONAL, "permit")
    } else {
        (STATUS_FAILURE, SEVERITY_MEDIUM, "deny")
    };

    json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": ACTIVITY_OTHER,
        "activity_name": "Other",
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": status_name(status_id),
        "time": now_millis(),
        "metadata": {
            "product": product(),
            "authorization": {
                "action": action,
                "resource": resource,
                "decision": decision,
                "reason": reason,
            }
        },
        "message": format!("Session state access: {} for {} {}", decision, action, resource),
    })
}

/// Emit an OCSF access decision event.
pub fn access_decision_event(action: &str, resource: &str, permitted: bool, reason: &str) {
    emit(&access_decision(action, resource, permitted, reason));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_event_shape() {
        let event = authentication(
            ACTIVITY_SERVICE_TICKET,
            "Service Ticket",
            STATUS_FAILURE,
            SEVERITY_MEDIUM,
            Some("user-1"),
            "Token introspection failed",
        );
        assert_eq!(event["class_uid"], 3001);
        assert_eq!(event["activity_id"], 4);
        assert_eq!(event["status"], "Failure");
        assert_eq!(event["severity"], "Medium");
        assert_eq!(event["actor"]["user"]["uid"], "user-1");
        assert_eq!(event["metadata"]["product"]["name"], "session-bridge");
    }

    #[test]
    fn test_authentication_event_without_subject() {
        let event = authentication(
            ACTIVITY_AUTH_TICKET,
            "Authentication Ticket",
            STATUS_SUCCESS,
            SEVERITY_INFORMATIONAL,
            None,
            "ok",
        );
        assert!(event.get("actor").is_none());
        assert_eq!(event["status"], "Success");
    }

    #[test]
    fn test_access_decision_shape() {
        let event = access_decision("GET", "/state/userPrefs", false, "invalid token");
        assert_eq!(event["activity_id"], 99);
        assert_eq!(event["metadata"]["authorization"]["decision"], "deny");
        assert_eq!(event["metadata"]["authorization"]["resource"], "/state/userPrefs");
        assert_eq!(event["status_id"], STATUS_FAILURE);

        let permit = access_decision("GET", "/state/preview", true, "public key");
        assert_eq!(permit["severity"], "Informational");
    }

    #[test]
    fn test_severity_names() {
        assert_eq!(severity_name(SEVERITY_HIGH), "High");
        assert_eq!(severity_name(5), "Critical");
        assert_eq!(severity_name(42), "Unknown");
    }
}
