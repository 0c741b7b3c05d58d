use std::io::{self, Write};

use super::{OutputSink, Report, ReportKind};

/// Plain lines, pipe-friendly. Normalized text and ids are printed bare so
/// they can be fed to other tools.
pub struct RawSink<W: Write + Send> {
    out: W,
}

impl RawSink<io::Stdout> {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> RawSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for RawSink<W> {
    fn handle_report(&mut self, report: &Report) -> io::Result<()> {
        let time = report.wall_time.format("%H:%M:%S%.3f");

        match &report.kind {
            ReportKind::Normalized { text, .. } => writeln!(self.out, "{text}"),
            ReportKind::QueryId { queryid, .. } => writeln!(self.out, "{queryid}"),
            ReportKind::Applied { queryid: None, .. } => {
                writeln!(self.out, "{time} tuning disabled")
            }
            ReportKind::Applied {
                queryid: Some(id),
                changes,
            } => {
                if changes.is_empty() {
                    return writeln!(self.out, "{time} [queryid:{id}] no settings registered");
                }
                for change in changes {
                    let was = change
                        .previous
                        .as_deref()
                        .map(|p| format!(" (was '{p}')"))
                        .unwrap_or_default();
                    writeln!(
                        self.out,
                        "{time} [queryid:{id}] SET {} = '{}'{was}",
                        change.name, change.value
                    )?;
                }
                Ok(())
            }
            ReportKind::Restored { changes } => {
                for change in changes.iter().rev() {
                    match &change.previous {
                        Some(p) => writeln!(self.out, "{time} RESTORE {} = '{p}'", change.name)?,
                        None => writeln!(self.out, "{time} RESET {}", change.name)?,
                    }
                }
                Ok(())
            }
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
