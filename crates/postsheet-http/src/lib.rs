// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod transport;

use anyhow::{Context, Result, anyhow, bail};
use postsheet_app::{PostOutcome, PostReport, ReplyReport, RequestResult, Row, RowField, RowId};
use serde::Serialize;
use std::thread;
use tracing::{debug, info, warn};
use url::Url;

pub use transport::{Delivery, HttpTransport, Transport};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/post";
pub const DEFAULT_REPLY_MARKER: &str = "reply";
pub const DEFAULT_REPLY_MESSAGE: &str = "Thank you for your reply!";

/// Where and as whom the dispatcher posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    endpoint: String,
    token: String,
}

impl DispatchConfig {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let endpoint = endpoint.trim().trim_end_matches('/').to_owned();
        if endpoint.is_empty() {
            bail!("http.endpoint must not be empty");
        }
        let parsed =
            Url::parse(&endpoint).with_context(|| format!("parse http.endpoint {endpoint:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "http.endpoint {endpoint:?} must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if token.trim().is_empty() {
            bail!("http.token must not be empty");
        }

        Ok(Self {
            endpoint,
            token: token.to_owned(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn reply_url(&self) -> String {
        format!("{}/reply", self.endpoint)
    }
}

/// Which rows earn a canned reply, and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoReplyRule {
    pub field: RowField,
    pub marker: String,
    pub message: String,
}

impl Default for AutoReplyRule {
    fn default() -> Self {
        Self {
            field: RowField::ContentA,
            marker: DEFAULT_REPLY_MARKER.to_owned(),
            message: DEFAULT_REPLY_MESSAGE.to_owned(),
        }
    }
}

impl AutoReplyRule {
    pub fn matches(&self, row: &Row) -> bool {
        !self.marker.is_empty() && row.field(self.field).contains(&self.marker)
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    config: DispatchConfig,
    rule: AutoReplyRule,
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(config: DispatchConfig, transport: T) -> Self {
        Self {
            config,
            rule: AutoReplyRule::default(),
            transport,
        }
    }

    pub fn with_rule(mut self, rule: AutoReplyRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn rule(&self) -> &AutoReplyRule {
        &self.rule
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Posts all three content fields of every row, all at once, empty or
    /// not.
    ///
    /// Individual request failures are logged and recorded in the report;
    /// the `Err` path is reserved for a request worker dying outright or
    /// the OS refusing to start one.
    pub fn post_all(&self, rows: &[Row]) -> Result<PostReport> {
        let jobs: Vec<PostJob> = rows.iter().flat_map(PostJob::for_row).collect();
        info!(rows = rows.len(), requests = jobs.len(), "posting all rows");
        self.run_posts(&jobs)
    }

    pub fn post_row(&self, row: &Row) -> Result<PostReport> {
        let jobs: Vec<PostJob> = PostJob::for_row(row).collect();
        info!(row = %row.id, requests = jobs.len(), "posting row");
        self.run_posts(&jobs)
    }

    /// Sends the canned reply once for every row matching the rule.
    ///
    /// Nothing remembers earlier scans, so a row that still matches is
    /// replied to again on every call.
    pub fn auto_reply_scan(&self, rows: &[Row]) -> Result<ReplyReport> {
        let matched_rows: Vec<RowId> = rows
            .iter()
            .filter(|row| self.rule.matches(row))
            .map(|row| row.id)
            .collect();
        info!(matched = matched_rows.len(), marker = %self.rule.marker, "auto-reply scan");

        let url = self.config.reply_url();
        let body = serde_json::to_value(ReplyBody {
            content: &self.rule.message,
        })
        .context("encode reply body")?;

        let results = fan_out(&matched_rows, |row_id| {
            match self.transport.post_json(&url, &self.config.token, &body) {
                Ok(delivery) => {
                    info!(row = %row_id, status = delivery.status, body = %delivery.body, "auto-replied");
                    RequestResult::Delivered {
                        status: delivery.status,
                    }
                }
                Err(error) => {
                    let error = format!("{error:#}");
                    warn!(row = %row_id, error = %error, "auto-reply failed");
                    RequestResult::Failed { error }
                }
            }
        })?;

        Ok(ReplyReport {
            matched_rows,
            results,
        })
    }

    fn run_posts(&self, jobs: &[PostJob]) -> Result<PostReport> {
        let outcomes = fan_out(jobs, |job| self.post_one(job))?;
        let report = PostReport { outcomes };
        debug!(
            attempted = report.attempted(),
            failed = report.failed(),
            "dispatch settled"
        );
        Ok(report)
    }

    fn post_one(&self, job: &PostJob) -> PostOutcome {
        let result = serde_json::to_value(PostBody {
            account: &job.account,
            business_account: &job.business_account,
            content: &job.content,
        })
        .context("encode post body")
        .and_then(|body| {
            self.transport
                .post_json(&self.config.endpoint, &self.config.token, &body)
        });

        let result = match result {
            Ok(delivery) => {
                info!(
                    account = %job.account,
                    business = %job.business_account,
                    field = job.field.as_str(),
                    status = delivery.status,
                    body = %delivery.body,
                    "posted"
                );
                RequestResult::Delivered {
                    status: delivery.status,
                }
            }
            Err(error) => {
                let error = format!("{error:#}");
                warn!(
                    account = %job.account,
                    business = %job.business_account,
                    field = job.field.as_str(),
                    error = %error,
                    "post failed"
                );
                RequestResult::Failed { error }
            }
        };

        PostOutcome {
            row_id: job.row_id,
            account: job.account.clone(),
            field: job.field,
            result,
        }
    }
}

/// Payload for one request, copied out of the row when the dispatch starts.
#[derive(Debug, Clone)]
struct PostJob {
    row_id: RowId,
    account: String,
    business_account: String,
    field: RowField,
    content: String,
}

impl PostJob {
    fn for_row(row: &Row) -> impl Iterator<Item = Self> + '_ {
        row.contents()
            .into_iter()
            .map(move |(field, content)| Self {
                row_id: row.id,
                account: row.account.clone(),
                business_account: row.business_account.clone(),
                field,
                content: content.to_owned(),
            })
    }
}

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    account: &'a str,
    #[serde(rename = "businessAccount")]
    business_account: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplyBody<'a> {
    content: &'a str,
}

const REQUEST_THREAD_NAME: &str = "postsheet-request";

/// Runs `run` for every job on its own thread and waits for all of them.
fn fan_out<J, R, F>(jobs: &[J], run: F) -> Result<Vec<R>>
where
    J: Sync,
    R: Send,
    F: Fn(&J) -> R + Sync,
{
    fan_out_with(jobs, || thread::Builder::new().name(REQUEST_THREAD_NAME.to_owned()), run)
}

fn fan_out_with<J, R, B, F>(jobs: &[J], builder: B, run: F) -> Result<Vec<R>>
where
    J: Sync,
    R: Send,
    B: Fn() -> thread::Builder,
    F: Fn(&J) -> R + Sync,
{
    let run = &run;
    let total = jobs.len();
    let (joined, spawn_error) = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(total);
        let mut spawn_error = None;
        for job in jobs {
            match builder().spawn_scoped(scope, move || run(job)) {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    spawn_error = Some(error);
                    break;
                }
            }
        }
        // Requests already started are not cancelled; wait them out.
        let joined: Vec<thread::Result<R>> =
            handles.into_iter().map(|handle| handle.join()).collect();
        (joined, spawn_error)
    });

    if let Some(error) = spawn_error {
        let started = joined.len();
        warn!(started, total, error = %error, "request worker failed to start");
        return Err(anyhow!(
            "could not start request worker {} of {total} ({error}); {started} requests were already sent",
            started + 1
        ));
    }

    let mut results = Vec::with_capacity(total);
    let mut panicked = 0usize;
    for outcome in joined {
        match outcome {
            Ok(result) => results.push(result),
            Err(_) => panicked += 1,
        }
    }
    if panicked > 0 {
        return Err(anyhow!("{panicked} of {total} request workers panicked"));
    }
    Ok(results)
}
