//! Recent device events.

use ambient_core::{Coordinator, CoreError, DeviceEvent};
use tabled::Tabled;

use crate::cli::{EventsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Type")]
    event_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&DeviceEvent> for EventRow {
    fn from(e: &DeviceEvent) -> Self {
        Self {
            time: output::timestamp(e.timestamp),
            event_type: output::opt(e.event_type.as_deref()),
            severity: output::opt(e.severity.as_deref()),
            message: output::opt(e.message.as_deref()),
        }
    }
}

pub async fn handle(coordinator: &Coordinator, args: &EventsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if args.limit == 0 {
        return Err(CliError::Validation {
            field: "limit".into(),
            reason: "must be at least 1".into(),
        });
    }

    let events = coordinator
        .client()
        .get_recent_events(&args.device_id, args.limit)
        .await
        .map_err(CoreError::from)?;

    let out = output::render_list(&global.output, &events, |e| EventRow::from(e), |e| {
        format!(
            "{}\t{}",
            output::timestamp(e.timestamp),
            output::opt(e.event_type.as_deref())
        )
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
