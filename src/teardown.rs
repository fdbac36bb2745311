//! Teardown pipeline
//!
//! Runs after a test finishes or is interrupted. Every step is best-effort:
//! a failing step is logged to the test and the next step still runs. The
//! test's pass/fail state is never changed here.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::ci::CiEnvironment;
use crate::error::{Error, Result};
use crate::events::{format_event, sort_events};
use crate::logs::LogExporter;
use crate::namespace::delete_namespace;
use crate::session::TestSession;
use crate::tracker;

/// Run one step and log its failure instead of returning it
async fn best_effort<F>(session: &TestSession, step: &str, fut: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = fut.await {
        warn!(namespace = %session.namespace(), step, error = %e, "Teardown step failed");
    }
}

/// Tear down a session: dump events, export logs on CI failure, run custom
/// cleanups, delete tracked objects and delete the namespace
///
/// Only the first call for a session does anything.
pub async fn tear_down(session: &TestSession) {
    if !session.begin_teardown() {
        debug!(namespace = %session.namespace(), "Session already torn down");
        return;
    }
    info!(namespace = %session.namespace(), test = %session.reporter().name(), "Tearing down test session");

    best_effort(session, "events", dump_events(session)).await;
    best_effort(session, "logs", export_logs(session)).await;
    best_effort(session, "cleanup", run_cleanups(session)).await;
    best_effort(session, "tracker", clean_tracker(session)).await;
    best_effort(session, "namespace", remove_namespace(session)).await;

    drop(session.take_interrupt_registration());
}

/// Log every event in the namespace, oldest first
async fn dump_events(session: &TestSession) -> Result<()> {
    let t = session.reporter();
    let mut events = match session.api().list_events(session.namespace()).await {
        Ok(events) => events,
        Err(e) => {
            t.log(format!(
                "Could not list events in the namespace {:?}: {}",
                session.namespace(),
                e
            ));
            return Err(e);
        }
    };

    sort_events(&mut events);
    for event in &events {
        t.log(format_event(event));
    }
    Ok(())
}

/// On CI, copy pod logs of a failed test into the artifacts directory
async fn export_logs(session: &TestSession) -> Result<()> {
    let ci = CiEnvironment::from_config(session.config());
    let t = session.reporter();
    if !ci.is_ci() || !t.failed() {
        return Ok(());
    }

    let dir = ci.pod_logs_dir();
    t.log(format!(
        "Export logs in {:?} to {:?}",
        session.namespace(),
        dir.display().to_string()
    ));
    match LogExporter::new(session.api().as_ref())
        .export(session.namespace(), &dir)
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => {
            t.log(format!("Error in exporting logs: {}", e));
            Err(e)
        }
    }
}

/// Run registered cleanup hooks newest-first, all of them
async fn run_cleanups(session: &TestSession) -> Result<()> {
    let mut hooks = session.take_cleanups();
    hooks.reverse();

    let mut failures = Vec::new();
    for hook in hooks {
        if let Err(e) = hook().await {
            failures.push(e.to_string());
        }
    }

    if failures.is_empty() {
        return Ok(());
    }
    let err = Error::CleanupError(failures);
    session.reporter().log(format!("Cleanup error: {}", err));
    Err(err)
}

async fn clean_tracker(session: &TestSession) -> Result<()> {
    let resources = session.drain_tracker();
    let result = tracker::clean(
        session.api().as_ref(),
        resources,
        true,
        &session.config().deletion_wait,
    )
    .await;
    if let Err(e) = &result {
        session
            .reporter()
            .log(format!("Failed to clean tracked resources: {}", e));
    }
    result
}

/// Delete the namespace unless it is owned by whoever provisioned it
async fn remove_namespace(session: &TestSession) -> Result<()> {
    if session.config().reuse_namespace {
        return Ok(());
    }
    let result = delete_namespace(session).await;
    if let Err(e) = &result {
        session.reporter().log(format!(
            "Could not delete the namespace {:?}: {}",
            session.namespace(),
            e
        ));
    }
    result
}
