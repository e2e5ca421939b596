// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use postsheet_app::Row;
use postsheet_http::{Dispatcher, Transport};
use postsheet_tui::{DispatchEvent, DispatchRequest, InternalEvent};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Connects the grid to the dispatcher and the export writers.
pub struct SheetRuntime<T> {
    dispatcher: Arc<Dispatcher<T>>,
    export_dir: PathBuf,
}

impl<T: Transport + 'static> SheetRuntime<T> {
    pub fn new(dispatcher: Dispatcher<T>, export_dir: PathBuf) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            export_dir,
        }
    }
}

fn dispatch_event<T: Transport>(
    dispatcher: &Dispatcher<T>,
    request: &DispatchRequest,
) -> DispatchEvent {
    let result = match request {
        DispatchRequest::PostAll(rows) => dispatcher.post_all(rows).map(DispatchEvent::Posted),
        DispatchRequest::PostRow(row) => dispatcher.post_row(row).map(DispatchEvent::Posted),
        DispatchRequest::AutoReply(rows) => dispatcher
            .auto_reply_scan(rows)
            .map(DispatchEvent::Replied),
    };
    result.unwrap_or_else(|error| request.failed(format!("{error:#}")))
}

/// Runs `work` for `request`, turning a panic into the request's failure
/// event so the worker always has something to send.
fn settle<F>(request: &DispatchRequest, work: F) -> DispatchEvent
where
    F: FnOnce() -> DispatchEvent,
{
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|_| {
        warn!(request = request.label(), "dispatch worker panicked");
        request.failed("dispatch worker panicked")
    })
}

impl<T: Transport + 'static> postsheet_tui::AppRuntime for SheetRuntime<T> {
    fn export_csv(&mut self, rows: &[Row]) -> Result<PathBuf> {
        let path = postsheet_export::write_csv(&self.export_dir, rows)?;
        info!(path = %path.display(), rows = rows.len(), "exported csv");
        Ok(path)
    }

    fn export_pdf(&mut self, rows: &[Row]) -> Result<PathBuf> {
        let now = OffsetDateTime::now_utc();
        let path = postsheet_export::write_pdf(&self.export_dir, rows, now)?;
        info!(path = %path.display(), rows = rows.len(), "exported pdf");
        Ok(path)
    }

    fn spawn_dispatch(
        &mut self,
        request: DispatchRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        thread::Builder::new()
            .name("postsheet-dispatch".to_owned())
            .spawn(move || {
                let event = settle(&request, || dispatch_event(&dispatcher, &request));
                if tx.send(InternalEvent::Dispatch(event)).is_err() {
                    warn!(request = request.label(), "ui gone before dispatch finished");
                }
            })
            .context("spawn dispatch worker thread")?;
        Ok(())
    }
}
