//! Per-query runtime parameters.
//!
//! A [`SettingsTable`] maps query identifiers to parameter assignments. A
//! [`QueryTuner`] looks a query up, applies its assignments to a
//! [`ParameterStore`] and hands back an [`AppliedSettings`] guard that puts
//! the previous values back once the query is done.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fingerprint::{query_id, QueryId};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed settings table: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized configuration parameter \"{0}\"")]
    UnknownParameter(String),

    #[error("invalid value for parameter \"{name}\": \"{value}\"")]
    InvalidValue { name: String, value: String },
}

/// One row of the settings table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingRow {
    pub queryid: QueryId,
    pub name: String,
    pub value: String,
}

/// Assignments grouped by query, rows kept in file order.
#[derive(Clone, Debug, Default)]
pub struct SettingsTable {
    by_query: HashMap<QueryId, Vec<SettingRow>>,
    rows: usize,
}

impl SettingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = SettingRow>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.insert(row);
        }
        table
    }

    /// Parses a JSON array of `{"queryid", "name", "value"}` objects.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let rows: Vec<SettingRow> = serde_json::from_str(json)?;
        Ok(Self::from_rows(rows))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        debug!(
            "Loaded {} settings for {} queries from {}",
            table.rows,
            table.by_query.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn insert(&mut self, row: SettingRow) {
        self.by_query.entry(row.queryid).or_default().push(row);
        self.rows += 1;
    }

    pub fn lookup(&self, id: QueryId) -> &[SettingRow] {
        self.by_query.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}

/// Named runtime parameters that can be read, changed and reset.
pub trait ParameterStore {
    fn get(&self, name: &str) -> Result<String, SettingsError>;
    fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsError>;
    fn reset(&mut self, name: &str) -> Result<(), SettingsError>;
}

/// Largest value a kB-based memory parameter accepts.
const MAX_KILOBYTES: i64 = i32::MAX as i64;

#[derive(Clone, Copy, Debug)]
enum ParamType {
    Bool,
    Integer { min: i64, max: i64 },
    /// Stored in kB.
    Memory { min: i64, max: i64 },
    Real { min: f64, max: f64 },
    Enum(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug)]
struct ParamDef {
    name: &'static str,
    kind: ParamType,
    default: &'static str,
}

const fn boolean(name: &'static str, default: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamType::Bool,
        default,
    }
}

const fn integer(name: &'static str, min: i64, max: i64, default: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamType::Integer { min, max },
        default,
    }
}

const fn memory(name: &'static str, min: i64, default: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamType::Memory {
            min,
            max: MAX_KILOBYTES,
        },
        default,
    }
}

const fn real(name: &'static str, min: f64, max: f64, default: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind: ParamType::Real { min, max },
        default,
    }
}

const INT_MAX: i64 = i32::MAX as i64;

/// Planner and executor parameters a session knows about. Sorted by name.
static CATALOG: &[ParamDef] = &[
    ParamDef {
        name: "constraint_exclusion",
        kind: ParamType::Enum(&["on", "off", "partition"]),
        default: "partition",
    },
    real("cpu_index_tuple_cost", 0.0, f64::MAX, "0.005"),
    real("cpu_operator_cost", 0.0, f64::MAX, "0.0025"),
    real("cpu_tuple_cost", 0.0, f64::MAX, "0.01"),
    real("cursor_tuple_fraction", 0.0, 1.0, "0.1"),
    integer("default_statistics_target", 1, 10000, "100"),
    memory("effective_cache_size", 8, "4GB"),
    integer("effective_io_concurrency", 0, 1000, "1"),
    boolean("enable_async_append", "on"),
    boolean("enable_bitmapscan", "on"),
    boolean("enable_gathermerge", "on"),
    boolean("enable_hashagg", "on"),
    boolean("enable_hashjoin", "on"),
    boolean("enable_incremental_sort", "on"),
    boolean("enable_indexonlyscan", "on"),
    boolean("enable_indexscan", "on"),
    boolean("enable_material", "on"),
    boolean("enable_memoize", "on"),
    boolean("enable_mergejoin", "on"),
    boolean("enable_nestloop", "on"),
    boolean("enable_parallel_append", "on"),
    boolean("enable_parallel_hash", "on"),
    boolean("enable_partition_pruning", "on"),
    boolean("enable_partitionwise_aggregate", "off"),
    boolean("enable_partitionwise_join", "off"),
    boolean("enable_seqscan", "on"),
    boolean("enable_sort", "on"),
    boolean("enable_tidscan", "on"),
    integer("from_collapse_limit", 1, INT_MAX, "8"),
    boolean("geqo", "on"),
    integer("geqo_threshold", 2, INT_MAX, "12"),
    real("hash_mem_multiplier", 1.0, 1000.0, "2"),
    boolean("jit", "on"),
    real("jit_above_cost", -1.0, f64::MAX, "100000"),
    integer("join_collapse_limit", 1, INT_MAX, "8"),
    memory("maintenance_work_mem", 1024, "64MB"),
    integer("max_parallel_workers_per_gather", 0, 1024, "2"),
    real("parallel_setup_cost", 0.0, f64::MAX, "1000"),
    real("parallel_tuple_cost", 0.0, f64::MAX, "0.1"),
    ParamDef {
        name: "plan_cache_mode",
        kind: ParamType::Enum(&["auto", "force_generic_plan", "force_custom_plan"]),
        default: "auto",
    },
    real("random_page_cost", 0.0, f64::MAX, "4"),
    real("seq_page_cost", 0.0, f64::MAX, "1"),
    memory("temp_buffers", 800, "8MB"),
    memory("work_mem", 64, "4MB"),
];

fn find_param(name: &str) -> Option<&'static ParamDef> {
    CATALOG
        .binary_search_by(|def| def.name.cmp(name))
        .ok()
        .map(|i| &CATALOG[i])
}

/// `ext.name` style placeholders hold arbitrary text.
fn is_custom(name: &str) -> bool {
    match name.split_once('.') {
        Some((prefix, rest)) => !prefix.is_empty() && !rest.is_empty(),
        None => false,
    }
}

/// Accepts unique prefixes of true/false/yes/no, `on`/`off` and `1`/`0`.
fn parse_bool(value: &str) -> Option<bool> {
    let v = value.to_ascii_lowercase();
    let prefix_of = |word: &str, min: usize| v.len() >= min && word.starts_with(v.as_str());
    if prefix_of("true", 1) || prefix_of("yes", 1) || prefix_of("on", 2) || v == "1" {
        Some(true)
    } else if prefix_of("false", 1) || prefix_of("no", 1) || prefix_of("off", 2) || v == "0" {
        Some(false)
    } else {
        None
    }
}

/// Splits `"1.5 GB"` into the number and the unit.
fn split_unit(value: &str) -> Option<(f64, &str)> {
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    let number = value[..end].parse::<f64>().ok()?;
    Some((number, value[end..].trim_start()))
}

/// Memory units are case sensitive, as the server has them.
fn memory_to_kb(value: &str) -> Option<i64> {
    let (number, unit) = split_unit(value)?;
    let kb = match unit {
        "" | "kB" => number,
        "B" => number / 1024.0,
        "MB" => number * 1024.0,
        "GB" => number * 1024.0 * 1024.0,
        "TB" => number * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    let kb = kb.round();
    if kb.is_finite() && kb.abs() <= i64::MAX as f64 {
        Some(kb as i64)
    } else {
        None
    }
}

/// Largest unit that represents the value exactly.
fn format_kb(kb: i64) -> String {
    const UNITS: [(&str, i64); 3] = [("TB", 1 << 30), ("GB", 1 << 20), ("MB", 1 << 10)];
    for (unit, factor) in UNITS {
        if kb != 0 && kb % factor == 0 {
            return format!("{}{unit}", kb / factor);
        }
    }
    format!("{kb}kB")
}

impl ParamType {
    /// Checks a value and returns its canonical spelling.
    fn canonicalize(self, value: &str) -> Option<String> {
        match self {
            ParamType::Bool => parse_bool(value).map(|b| if b { "on" } else { "off" }.to_string()),
            ParamType::Integer { min, max } => {
                let n = value.trim().parse::<i64>().ok()?;
                (min..=max).contains(&n).then(|| n.to_string())
            }
            ParamType::Memory { min, max } => {
                let kb = memory_to_kb(value)?;
                (min..=max).contains(&kb).then(|| format_kb(kb))
            }
            ParamType::Real { min, max } => {
                let x = value.trim().parse::<f64>().ok()?;
                (x.is_finite() && x >= min && x <= max).then(|| x.to_string())
            }
            ParamType::Enum(options) => options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(value.trim()))
                .map(|o| o.to_string()),
        }
    }
}

/// In-memory parameter store with the defaults of a fresh session.
#[derive(Clone, Debug, Default)]
pub struct Session {
    overrides: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters changed from their defaults, sorted by name.
    pub fn changed(&self) -> Vec<(&str, &str)> {
        let mut changed: Vec<_> = self
            .overrides
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        changed.sort_unstable();
        changed
    }
}

impl ParameterStore for Session {
    fn get(&self, name: &str) -> Result<String, SettingsError> {
        let key = name.to_ascii_lowercase();
        if let Some(value) = self.overrides.get(&key) {
            return Ok(value.clone());
        }
        find_param(&key)
            .map(|def| def.default.to_string())
            .ok_or_else(|| SettingsError::UnknownParameter(name.to_string()))
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), SettingsError> {
        let key = name.to_ascii_lowercase();
        let def = find_param(&key);
        let canonical = match def {
            Some(def) => def.kind.canonicalize(value).ok_or_else(|| SettingsError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
            })?,
            None if is_custom(&key) => value.to_string(),
            None => return Err(SettingsError::UnknownParameter(name.to_string())),
        };
        if def.is_some_and(|def| def.default == canonical) {
            self.overrides.remove(&key);
        } else {
            self.overrides.insert(key, canonical);
        }
        Ok(())
    }

    fn reset(&mut self, name: &str) -> Result<(), SettingsError> {
        let key = name.to_ascii_lowercase();
        if find_param(&key).is_none() && !is_custom(&key) {
            return Err(SettingsError::UnknownParameter(name.to_string()));
        }
        self.overrides.remove(&key);
        Ok(())
    }
}

/// A parameter changed for the duration of one query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Change {
    pub name: String,
    /// `None` when the parameter had no value, as with an unset placeholder.
    pub previous: Option<String>,
    pub value: String,
}

/// Applies table entries to queries as they arrive.
#[derive(Clone, Debug)]
pub struct QueryTuner {
    table: SettingsTable,
    enabled: bool,
    print_queryid: bool,
}

impl QueryTuner {
    pub fn new(table: SettingsTable) -> Self {
        Self {
            table,
            enabled: true,
            print_queryid: false,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn print_queryid(mut self, print: bool) -> Self {
        self.print_queryid = print;
        self
    }

    pub fn table(&self) -> &SettingsTable {
        &self.table
    }

    /// Applies the settings registered for `text`.
    ///
    /// If one of them is rejected, the ones already applied are put back
    /// and the error is returned.
    pub fn begin<'s, S: ParameterStore>(
        &self,
        store: &'s mut S,
        text: &str,
    ) -> Result<AppliedSettings<'s, S>, SettingsError> {
        let mut applied = AppliedSettings {
            store,
            queryid: None,
            changes: Vec::new(),
        };
        if !self.enabled {
            debug!("Query tuning disabled");
            return Ok(applied);
        }

        let id = query_id(text);
        applied.queryid = Some(id);
        if self.print_queryid {
            info!("QueryID is '{id}'");
        }

        let rows = self.table.lookup(id);
        debug!("{} settings registered for QueryID {id}", rows.len());
        for row in rows {
            let previous = applied.store.get(&row.name).ok();
            if let Err(e) = applied.store.set(&row.name, &row.value) {
                warn!("Cannot apply {} = '{}': {e}", row.name, row.value);
                applied.restore();
                return Err(e);
            }
            let value = applied.store.get(&row.name).unwrap_or_else(|_| row.value.clone());
            debug!("Setting {} = {value}", row.name);
            applied.changes.push(Change {
                name: row.name.clone(),
                previous,
                value,
            });
        }
        Ok(applied)
    }
}

/// Settings in effect for one query. Dropping the guard restores the
/// previous values; [`AppliedSettings::finish`] does the same and reports
/// failures.
pub struct AppliedSettings<'s, S: ParameterStore> {
    store: &'s mut S,
    queryid: Option<QueryId>,
    changes: Vec<Change>,
}

impl<'s, S: ParameterStore> AppliedSettings<'s, S> {
    /// `None` when tuning is disabled.
    pub fn queryid(&self) -> Option<QueryId> {
        self.queryid
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn store(&self) -> &S {
        &*self.store
    }

    pub fn finish(mut self) -> Result<Vec<Change>, SettingsError> {
        let changes = self.changes.clone();
        match self.restore() {
            Some(e) => Err(e),
            None => Ok(changes),
        }
    }

    /// Undoes the changes, most recent first. Returns the first failure.
    fn restore(&mut self) -> Option<SettingsError> {
        let mut first_error = None;
        while let Some(change) = self.changes.pop() {
            let result = match &change.previous {
                Some(previous) => self.store.set(&change.name, previous),
                None => self.store.reset(&change.name),
            };
            match result {
                Ok(()) => debug!("Restored {}", change.name),
                Err(e) => {
                    warn!("Cannot restore {}: {e}", change.name);
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error
    }
}

impl<S: ParameterStore> Drop for AppliedSettings<'_, S> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "SELECT * FROM orders WHERE customer = 42";

    fn row(query: &str, name: &str, value: &str) -> SettingRow {
        SettingRow {
            queryid: query_id(query),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_catalog_is_sorted() {
        assert!(CATALOG.windows(2).all(|w| w[0].name < w[1].name));
        for def in CATALOG {
            assert_eq!(
                def.kind.canonicalize(def.default).as_deref(),
                Some(def.default),
                "{}",
                def.name
            );
        }
    }

    #[test]
    fn test_table_from_json() {
        let id = query_id(QUERY);
        let json = format!(
            r#"[
                {{"queryid": {id}, "name": "work_mem", "value": "64MB"}},
                {{"queryid": 1, "name": "enable_seqscan", "value": "off"}},
                {{"queryid": {id}, "name": "enable_hashjoin", "value": "off"}}
            ]"#
        );
        let table = SettingsTable::from_json(&json).unwrap();
        assert_eq!(table.len(), 3);
        let names: Vec<_> = table.lookup(id).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["work_mem", "enable_hashjoin"]);
        assert!(table.lookup(QueryId::from(2u64)).is_empty());
    }

    #[test]
    fn test_table_rejects_malformed_json() {
        match SettingsTable::from_json(r#"[{"queryid": 1, "name": "work_mem"}]"#) {
            Err(SettingsError::Malformed(_)) => {}
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        match SettingsTable::load(Path::new("/nonexistent/pgqs.json")) {
            Err(SettingsError::Io { path, .. }) => assert_eq!(path, "/nonexistent/pgqs.json"),
            other => panic!("Expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_session_defaults() {
        let session = Session::new();
        assert_eq!(session.get("work_mem").unwrap(), "4MB");
        assert_eq!(session.get("ENABLE_SEQSCAN").unwrap(), "on");
        assert_eq!(session.get("random_page_cost").unwrap(), "4");
        assert!(matches!(
            session.get("no_such_thing"),
            Err(SettingsError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_bool_spellings() {
        let mut session = Session::new();
        for (input, expected) in [
            ("off", "off"),
            ("ON", "on"),
            ("f", "off"),
            ("yes", "on"),
            ("0", "off"),
            ("tru", "on"),
        ] {
            session.set("enable_nestloop", input).unwrap();
            assert_eq!(session.get("enable_nestloop").unwrap(), expected, "{input}");
        }
        for bad in ["o", "maybe", "", "2"] {
            assert!(session.set("enable_nestloop", bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_memory_units() {
        let mut session = Session::new();
        session.set("work_mem", "1GB").unwrap();
        assert_eq!(session.get("work_mem").unwrap(), "1GB");
        session.set("work_mem", "2048kB").unwrap();
        assert_eq!(session.get("work_mem").unwrap(), "2MB");
        session.set("work_mem", "1000").unwrap();
        assert_eq!(session.get("work_mem").unwrap(), "1000kB");
        session.set("work_mem", "1.5 MB").unwrap();
        assert_eq!(session.get("work_mem").unwrap(), "1536kB");

        // Units are case sensitive; minimum is 64kB.
        for bad in ["512KB", "12", "64 mb", "lots"] {
            match session.set("work_mem", bad) {
                Err(SettingsError::InvalidValue { name, value }) => {
                    assert_eq!(name, "work_mem");
                    assert_eq!(value, bad);
                }
                other => panic!("Expected InvalidValue for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_integer_real_and_enum() {
        let mut session = Session::new();
        session.set("join_collapse_limit", "1").unwrap();
        assert_eq!(session.get("join_collapse_limit").unwrap(), "1");
        assert!(session.set("join_collapse_limit", "0").is_err());
        assert!(session.set("join_collapse_limit", "1.5").is_err());

        session.set("random_page_cost", "1.1").unwrap();
        assert_eq!(session.get("random_page_cost").unwrap(), "1.1");
        assert!(session.set("random_page_cost", "-1").is_err());
        assert!(session.set("random_page_cost", "NaN").is_err());

        session.set("plan_cache_mode", "Force_Generic_Plan").unwrap();
        assert_eq!(session.get("plan_cache_mode").unwrap(), "force_generic_plan");
        assert!(session.set("plan_cache_mode", "sometimes").is_err());
    }

    #[test]
    fn test_custom_placeholders() {
        let mut session = Session::new();
        assert!(session.get("pg_hint_plan.enable_hint").is_err());
        session.set("pg_hint_plan.enable_hint", "On").unwrap();
        assert_eq!(session.get("pg_hint_plan.enable_hint").unwrap(), "On");
        session.reset("pg_hint_plan.enable_hint").unwrap();
        assert!(session.get("pg_hint_plan.enable_hint").is_err());

        assert!(matches!(
            session.set("dalibo", "1"),
            Err(SettingsError::UnknownParameter(_))
        ));
        assert!(session.set(".x", "1").is_err());
    }

    #[test]
    fn test_setting_default_clears_override() {
        let mut session = Session::new();
        session.set("work_mem", "64MB").unwrap();
        assert_eq!(session.changed(), [("work_mem", "64MB")]);
        session.set("work_mem", "4096kB").unwrap();
        assert!(session.changed().is_empty());
    }

    #[test]
    fn test_begin_applies_and_finish_restores() {
        let table = SettingsTable::from_rows([
            row(QUERY, "work_mem", "64MB"),
            row(QUERY, "enable_seqscan", "off"),
            row("SELECT 1", "work_mem", "1GB"),
        ]);
        let tuner = QueryTuner::new(table);
        let mut session = Session::new();
        session.set("work_mem", "8MB").unwrap();

        // Literals do not matter.
        let applied = tuner
            .begin(&mut session, "select * from orders where customer = 7")
            .unwrap();
        assert_eq!(applied.queryid(), Some(query_id(QUERY)));
        assert_eq!(applied.store().get("work_mem").unwrap(), "64MB");
        assert_eq!(applied.store().get("enable_seqscan").unwrap(), "off");
        assert_eq!(
            applied.changes()[0],
            Change {
                name: "work_mem".to_string(),
                previous: Some("8MB".to_string()),
                value: "64MB".to_string(),
            }
        );

        let changes = applied.finish().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(session.get("work_mem").unwrap(), "8MB");
        assert_eq!(session.get("enable_seqscan").unwrap(), "on");
    }

    #[test]
    fn test_drop_restores() {
        let tuner = QueryTuner::new(SettingsTable::from_rows([
            row(QUERY, "geqo", "off"),
            row(QUERY, "myext.mode", "fast"),
        ]));
        let mut session = Session::new();
        {
            let applied = tuner.begin(&mut session, QUERY).unwrap();
            assert_eq!(applied.store().get("myext.mode").unwrap(), "fast");
        }
        assert_eq!(session.get("geqo").unwrap(), "on");
        assert!(session.get("myext.mode").is_err());
    }

    #[test]
    fn test_failure_rolls_back() {
        let tuner = QueryTuner::new(SettingsTable::from_rows([
            row(QUERY, "enable_nestloop", "off"),
            row(QUERY, "work_mem", "512KB"),
            row(QUERY, "enable_sort", "off"),
        ]));
        let mut session = Session::new();
        match tuner.begin(&mut session, QUERY) {
            Err(SettingsError::InvalidValue { name, .. }) => assert_eq!(name, "work_mem"),
            Err(e) => panic!("Expected InvalidValue, got {e}"),
            Ok(_) => panic!("Expected an error"),
        }
        assert!(session.changed().is_empty());
    }

    #[test]
    fn test_unknown_parameter_in_table() {
        let tuner = QueryTuner::new(SettingsTable::from_rows([row(QUERY, "Dalibo", "1")]));
        let mut session = Session::new();
        match tuner.begin(&mut session, QUERY) {
            Err(e) => assert_eq!(e.to_string(), "unrecognized configuration parameter \"Dalibo\""),
            Ok(_) => panic!("Expected an error"),
        };
    }

    #[test]
    fn test_disabled_tuner_changes_nothing() {
        let tuner = QueryTuner::new(SettingsTable::from_rows([row(QUERY, "work_mem", "64MB")]))
            .enabled(false);
        let mut session = Session::new();
        let applied = tuner.begin(&mut session, QUERY).unwrap();
        assert_eq!(applied.queryid(), None);
        assert!(applied.changes().is_empty());
        assert_eq!(applied.store().get("work_mem").unwrap(), "4MB");
    }

    #[test]
    fn test_unmatched_query() {
        let tuner = QueryTuner::new(SettingsTable::from_rows([row(QUERY, "work_mem", "64MB")]))
            .print_queryid(true);
        let mut session = Session::new();
        let applied = tuner.begin(&mut session, "SELECT now()").unwrap();
        assert_eq!(applied.queryid(), Some(query_id("SELECT now()")));
        assert!(applied.changes().is_empty());
    }
}
