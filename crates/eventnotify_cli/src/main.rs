//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `eventnotify_core` linkage and SQLite wiring end to end.
//! - Run one scripted select/save/send round on a demo event.
//!
//! Usage: `eventnotify_cli [config.json]`

use chrono::{NaiveDate, NaiveTime};
use eventnotify_core::db::SharedConnection;
use eventnotify_core::logging::init_logging_from;
use eventnotify_core::{core_version, ContactDraft, CoreConfig, EventDraft, NotifyService};
use std::error::Error;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("eventnotify error={err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    println!("eventnotify_core version={}", core_version());

    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str::<CoreConfig>(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    config.validate()?;
    if init_logging_from(&config)? {
        log::info!("event=cli_start module=cli status=ok");
    }

    let conn = match &config.db_path {
        Some(path) => SharedConnection::open(path)?,
        None => SharedConnection::open_in_memory()?,
    };
    let service = NotifyService::with_sqlite(conn, &config)?;

    let event = service
        .create_event(&EventDraft::new(
            "Demo standup",
            NaiveDate::from_ymd_opt(2026, 1, 5).ok_or("invalid demo date")?,
            NaiveTime::from_hms_opt(9, 30, 0).ok_or("invalid demo time")?,
        ))
        .await?;
    let first = service
        .create_contact(&ContactDraft::new("Demo One", "9000000001"))
        .await?;
    service
        .create_contact(&ContactDraft::new("Demo Two", "9000000002"))
        .await?;

    let view = service.open_view(event.id).await?;
    view.toggle(first.id)?;
    let report = view.save().await?;
    println!(
        "save created={} deleted={} saved={}",
        report.created,
        report.deleted,
        report.baseline().len()
    );

    let confirmation = view.prepare_send().await?;
    println!("confirm recipients={}", confirmation.len());
    let receipt = view.confirm_send().await?;
    println!(
        "sent batch={} recipients={}",
        receipt.batch_id, receipt.recipients
    );
    Ok(())
}
