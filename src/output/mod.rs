pub mod json;
pub mod raw;

use std::io;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::fingerprint::QueryId;
use crate::settings::Change;

/// Something worth telling the user, stamped with when it happened.
#[derive(Clone, Debug)]
pub struct Report {
    pub wall_time: DateTime<Local>,
    pub kind: ReportKind,
}

impl Report {
    pub fn now(kind: ReportKind) -> Self {
        Self {
            wall_time: Local::now(),
            kind,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportKind {
    Normalized {
        text: String,
        /// Why the text stops early, if it does.
        truncated: Option<String>,
    },
    QueryId {
        queryid: QueryId,
        normalized: String,
    },
    /// `queryid` is absent when tuning is disabled.
    Applied {
        queryid: Option<QueryId>,
        changes: Vec<Change>,
    },
    Restored {
        changes: Vec<Change>,
    },
}

/// Writes reports somewhere.
pub trait OutputSink: Send {
    fn handle_report(&mut self, report: &Report) -> io::Result<()>;
    fn shutdown(&mut self) -> io::Result<()>;
}
