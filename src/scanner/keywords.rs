//! PostgreSQL keyword table.
//!
//! Unreserved keywords are included too: the grammar hands them back as
//! keyword tokens, so they get upcased like any other keyword.

/// Sorted by byte value so lookups can binary search.
pub static KEYWORDS: &[&str] = &[
    "abort", "absent", "absolute", "access", "action", "add", "admin", "after", "aggregate",
    "all", "also", "alter", "always", "analyse", "analyze", "and", "any", "array", "as",
    "asc", "asensitive", "assertion", "assignment", "asymmetric", "at", "atomic", "attach",
    "attribute", "authorization", "backward", "before", "begin", "between", "bigint",
    "binary", "bit", "boolean", "both", "breadth", "by", "cache", "call", "called",
    "cascade", "cascaded", "case", "cast", "catalog", "chain", "char", "character",
    "characteristics", "check", "checkpoint", "class", "close", "cluster", "coalesce",
    "collate", "collation", "column", "columns", "comment", "comments", "commit",
    "committed", "compression", "concurrently", "conditional", "configuration", "conflict",
    "connection", "constraint", "constraints", "content", "continue", "conversion", "copy",
    "cost", "create", "cross", "csv", "cube", "current", "current_catalog", "current_role",
    "current_schema", "current_timestamp", "current_user", "cursor", "cycle", "data",
    "database", "day", "deallocate", "dec", "decimal", "declare", "default", "defaults",
    "deferrable", "deferred", "definer", "delete", "delimiter", "delimiters", "depends",
    "depth", "desc", "detach", "dictionary", "disable", "discard", "distinct", "do",
    "document", "domain", "double", "drop", "each", "else", "empty", "enable", "encoding",
    "encrypted", "end", "enum", "error", "escape", "event", "except", "exclude",
    "excluding", "exclusive", "execute", "exists", "explain", "expression", "extension",
    "external", "extract", "family", "fetch", "filter", "finalize", "first", "float",
    "following", "for", "force", "foreign", "format", "forward", "freeze", "from", "full",
    "function", "functions", "generated", "global", "grant", "granted", "greatest", "group",
    "grouping", "groups", "handler", "having", "header", "hold", "hour", "identity", "if",
    "ilike", "immediate", "immutable", "implicit", "import", "in", "include", "including",
    "increment", "indent", "index", "indexes", "inherit", "inherits", "initially", "inline",
    "inner", "inout", "input", "insensitive", "insert", "instead", "int", "integer",
    "intersect", "interval", "into", "invoker", "is", "isnull", "isolation", "join", "json",
    "json_array", "json_arrayagg", "json_exists", "json_object", "json_objectagg",
    "json_query", "json_scalar", "json_serialize", "json_table", "json_value", "keep",
    "key", "keys", "label", "language", "large", "last", "lateral", "leading", "leakproof",
    "least", "left", "level", "like", "limit", "listen", "load", "local", "location",
    "lock", "locked", "logged", "mapping", "match", "matched", "materialized", "maxvalue",
    "merge", "merge_action", "method", "minute", "minvalue", "mode", "month", "move",
    "name", "names", "national", "natural", "nchar", "nested", "new", "next", "nfc", "nfd",
    "nfkc", "nfkd", "no", "none", "normalize", "normalized", "not", "nothing", "notify",
    "notnull", "nowait", "nullif", "nulls", "numeric", "object", "of", "off", "offset",
    "oids", "old", "omit", "on", "only", "operator", "option", "options", "or", "order",
    "ordinality", "others", "out", "outer", "over", "overlaps", "overlay", "overriding",
    "owned", "owner", "parallel", "parameter", "parser", "partial", "partition", "passing",
    "password", "path", "placing", "plans", "policy", "position", "preceding", "precision",
    "prepare", "prepared", "preserve", "primary", "prior", "privileges", "procedural",
    "procedure", "procedures", "program", "publication", "quote", "quotes", "range", "read",
    "real", "reassign", "recheck", "recursive", "ref", "references", "referencing",
    "refresh", "reindex", "relative", "release", "rename", "repeatable", "replace",
    "replica", "reset", "restart", "restrict", "return", "returning", "returns", "revoke",
    "right", "role", "rollback", "rollup", "routine", "routines", "row", "rows", "rule",
    "savepoint", "scalar", "schema", "schemas", "scroll", "search", "second", "security",
    "select", "sequence", "sequences", "serializable", "server", "session", "session_user",
    "set", "setof", "sets", "share", "show", "similar", "simple", "skip", "smallint",
    "snapshot", "some", "sql", "stable", "standalone", "start", "statement", "statistics",
    "stdin", "stdout", "storage", "stored", "strict", "string", "strip", "subscription",
    "substring", "support", "symmetric", "sysid", "system", "system_user", "table",
    "tables", "tablesample", "tablespace", "temp", "template", "temporary", "text", "then",
    "ties", "time", "timestamp", "to", "trailing", "transaction", "transform", "treat",
    "trigger", "trim", "truncate", "trusted", "type", "types", "uescape", "unbounded",
    "uncommitted", "unconditional", "unencrypted", "union", "unique", "unknown", "unlisten",
    "unlogged", "until", "update", "user", "using", "vacuum", "valid", "validate",
    "validator", "value", "values", "varchar", "variadic", "varying", "verbose", "version",
    "view", "views", "volatile", "when", "where", "whitespace", "window", "with", "within",
    "without", "work", "wrapper", "write", "xml", "xmlattributes", "xmlconcat",
    "xmlelement", "xmlexists", "xmlforest", "xmlnamespaces", "xmlparse", "xmlpi", "xmlroot",
    "xmlserialize", "xmltable", "year", "yes", "zone",
];

/// Keywords that stand for a value and are masked like literals.
pub static KEYWORD_LITERALS: &[&str] = &[
    "current_date", "current_time", "false", "localtime", "localtimestamp", "null", "true",
];

const MAX_KEYWORD_LEN: usize = 32;

/// Lowercases `word` into `buf` if it can possibly be a keyword.
fn fold(word: &[u8], buf: &mut [u8; MAX_KEYWORD_LEN]) -> Option<usize> {
    if word.len() > MAX_KEYWORD_LEN || !word.is_ascii() {
        return None;
    }
    for (dst, src) in buf.iter_mut().zip(word) {
        *dst = src.to_ascii_lowercase();
    }
    Some(word.len())
}

fn contains(table: &[&str], word: &[u8]) -> bool {
    let mut buf = [0u8; MAX_KEYWORD_LEN];
    match fold(word, &mut buf) {
        Some(len) => table
            .binary_search_by(|kw| kw.as_bytes().cmp(&buf[..len]))
            .is_ok(),
        None => false,
    }
}

pub fn is_keyword(word: &[u8]) -> bool {
    contains(KEYWORDS, word)
}

pub fn is_keyword_literal(word: &[u8]) -> bool {
    contains(KEYWORD_LITERALS, word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_sorted() {
        for table in [KEYWORDS, KEYWORD_LITERALS] {
            for pair in table.windows(2) {
                assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        assert!(is_keyword(b"select"));
        assert!(is_keyword(b"SeLeCt"));
        assert!(is_keyword(b"current_timestamp"));
        assert!(!is_keyword(b"users"));
        assert!(!is_keyword(b"id"));
    }

    #[test]
    fn test_sql_json_keywords() {
        let words = [
            "json_table", "json_value", "json_query", "json_exists", "json_scalar",
            "json_serialize", "keep", "omit", "quotes", "string", "empty", "error", "nested",
            "conditional", "unconditional", "merge_action", "path",
        ];
        for word in words {
            assert!(is_keyword(word.as_bytes()), "{word}");
            assert!(is_keyword(word.to_ascii_uppercase().as_bytes()), "{word}");
        }
    }

    #[test]
    fn test_literals_are_not_plain_keywords() {
        for word in KEYWORD_LITERALS {
            assert!(is_keyword_literal(word.as_bytes()));
            assert!(!is_keyword(word.as_bytes()));
        }
        assert!(is_keyword_literal(b"NULL"));
        assert!(!is_keyword_literal(b"current_timestamp"));
    }

    #[test]
    fn test_non_ascii_never_matches() {
        assert!(!is_keyword("sélect".as_bytes()));
    }
}
