use std::io::{self, Write};

use serde::Serialize;

use super::{OutputSink, Report, ReportKind};

/// One JSON object per line.
pub struct JsonSink<W: Write + Send> {
    out: W,
}

#[derive(Serialize)]
struct Line<'a> {
    time: String,
    #[serde(flatten)]
    kind: &'a ReportKind,
}

impl JsonSink<io::Stdout> {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputSink for JsonSink<W> {
    fn handle_report(&mut self, report: &Report) -> io::Result<()> {
        let line = Line {
            time: report.wall_time.to_rfc3339(),
            kind: &report.kind,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::fingerprint::QueryId;
    use crate::settings::Change;

    fn render(kind: ReportKind) -> Value {
        let mut sink = JsonSink::with_writer(Vec::new());
        sink.handle_report(&Report::now(kind)).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.ends_with('\n'));
        let mut value: Value = serde_json::from_str(out.trim_end()).unwrap();
        assert!(value["time"].is_string());
        value.as_object_mut().unwrap().remove("time");
        value
    }

    #[test]
    fn test_normalized() {
        let value = render(ReportKind::Normalized {
            text: "SELECT".to_string(),
            truncated: Some("unterminated quoted string starting at byte 7".to_string()),
        });
        assert_eq!(
            value,
            json!({
                "event": "normalized",
                "text": "SELECT",
                "truncated": "unterminated quoted string starting at byte 7"
            })
        );
    }

    #[test]
    fn test_queryid_is_signed() {
        let value = render(ReportKind::QueryId {
            queryid: QueryId::from(u64::MAX),
            normalized: "SELECT ?".to_string(),
        });
        assert_eq!(
            value,
            json!({"event": "query_id", "queryid": -1, "normalized": "SELECT ?"})
        );
    }

    #[test]
    fn test_applied() {
        let value = render(ReportKind::Applied {
            queryid: Some(QueryId::from(3u64)),
            changes: vec![Change {
                name: "myext.mode".to_string(),
                previous: None,
                value: "fast".to_string(),
            }],
        });
        assert_eq!(
            value,
            json!({
                "event": "applied",
                "queryid": 3,
                "changes": [{"name": "myext.mode", "previous": null, "value": "fast"}]
            })
        );
    }
}
