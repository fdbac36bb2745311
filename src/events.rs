//! Event ordering and rendering for teardown diagnostics

use std::fmt::Write;

use chrono::{DateTime, Utc};

use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta, Time};

/// Time an event is ordered by: `lastTimestamp`, falling back to `eventTime`
///
/// Newer reporters only set `eventTime`. Events with neither sort first.
pub fn effective_timestamp(event: &Event) -> Option<DateTime<Utc>> {
    event
        .last_timestamp
        .as_ref()
        .map(|t| t.0)
        .or_else(|| event.event_time.as_ref().map(|t| t.0))
}

/// Stable sort by [`effective_timestamp`], oldest first
pub fn sort_events(events: &mut [Event]) {
    events.sort_by_key(effective_timestamp);
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn time(value: &Option<Time>) -> String {
    value.as_ref().map(|t| t.0.to_string()).unwrap_or_default()
}

fn micro_time(value: &Option<MicroTime>) -> String {
    value.as_ref().map(|t| t.0.to_string()).unwrap_or_default()
}

fn object_meta(meta: &ObjectMeta) -> String {
    format!(
        "v1.ObjectMeta{{Name:{},Namespace:{},UID:{},ResourceVersion:{},CreationTimestamp:{}}}",
        opt(&meta.name),
        opt(&meta.namespace),
        opt(&meta.uid),
        opt(&meta.resource_version),
        time(&meta.creation_timestamp),
    )
}

fn object_reference(reference: &ObjectReference) -> String {
    format!(
        "ObjectReference{{Kind:{},Namespace:{},Name:{},UID:{},APIVersion:{},ResourceVersion:{},FieldPath:{}}}",
        opt(&reference.kind),
        opt(&reference.namespace),
        opt(&reference.name),
        opt(&reference.uid),
        opt(&reference.api_version),
        opt(&reference.resource_version),
        opt(&reference.field_path),
    )
}

/// Render every field of an event, one per line
pub fn format_event(event: &Event) -> String {
    let source = event
        .source
        .as_ref()
        .map(|s| {
            format!(
                "EventSource{{Component:{},Host:{}}}",
                opt(&s.component),
                opt(&s.host)
            )
        })
        .unwrap_or_else(|| "nil".to_string());
    let series = event
        .series
        .as_ref()
        .map(|s| {
            format!(
                "EventSeries{{Count:{},LastObservedTime:{}}}",
                s.count.unwrap_or(0),
                micro_time(&s.last_observed_time)
            )
        })
        .unwrap_or_else(|| "nil".to_string());
    let related = event
        .related
        .as_ref()
        .map(object_reference)
        .unwrap_or_else(|| "nil".to_string());

    let mut out = String::from("Event{\n");
    let _ = writeln!(out, "ObjectMeta:{}", object_meta(&event.metadata));
    let _ = writeln!(out, "InvolvedObject:{}", object_reference(&event.involved_object));
    let _ = writeln!(out, "Reason:{}", opt(&event.reason));
    let _ = writeln!(out, "Message:{}", opt(&event.message));
    let _ = writeln!(out, "Source:{}", source);
    let _ = writeln!(out, "FirstTimestamp:{}", time(&event.first_timestamp));
    let _ = writeln!(out, "LastTimestamp:{}", time(&event.last_timestamp));
    let _ = writeln!(out, "Count:{}", event.count.unwrap_or(0));
    let _ = writeln!(out, "Type:{}", opt(&event.type_));
    let _ = writeln!(out, "EventTime:{}", micro_time(&event.event_time));
    let _ = writeln!(out, "Series:{}", series);
    let _ = writeln!(out, "Action:{}", opt(&event.action));
    let _ = writeln!(out, "Related:{}", related);
    let _ = writeln!(out, "ReportingController:{}", opt(&event.reporting_component));
    let _ = writeln!(out, "ReportingInstance:{}", opt(&event.reporting_instance));
    out.push('}');
    out
}
