//! Continuous polling until Ctrl-C.

use ambient_core::{Coordinator, UpdateEvent};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut updates = coordinator.updates();
    let first = coordinator.start().await?;

    eprintln!(
        "watching {} device(s) every {}s, Ctrl-C to stop",
        first.len(),
        coordinator.config().poll_interval.as_secs()
    );
    print_cycle(global, &UpdateEvent::Updated {
        version: first.version(),
        devices: first.len(),
    });
    // Drain the notification for the setup cycle already printed above.
    let _ = updates.try_recv();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = updates.recv() => match event {
                Ok(event) => print_cycle(global, &event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "watch output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

fn print_cycle(global: &GlobalOpts, event: &UpdateEvent) {
    if global.quiet {
        return;
    }
    let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
    match (event, &global.output) {
        (_, OutputFormat::Json | OutputFormat::JsonCompact) => {
            println!("{}", cycle_json(&now.to_string(), event));
        }
        (UpdateEvent::Updated { version, devices }, _) => {
            println!("{now}  updated  v{version}  {devices} device(s)");
        }
        (UpdateEvent::Failed { reason, message }, _) => {
            println!("{now}  failed   {reason:?}: {message}");
        }
    }
}

/// One NDJSON line per cycle.
fn cycle_json(time: &str, event: &UpdateEvent) -> serde_json::Value {
    match event {
        UpdateEvent::Updated { version, devices } => json!({
            "time": time,
            "status": "updated",
            "version": version,
            "devices": devices,
        }),
        UpdateEvent::Failed { reason, message } => json!({
            "time": time,
            "status": "failed",
            "reason": format!("{reason:?}").to_lowercase(),
            "message": message,
        }),
    }
}
