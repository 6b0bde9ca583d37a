//! Type mapping from cluster value classes to SQL type names.
//!
//! Resolution runs in three steps:
//!
//! 1. [`infer_sql_type`]: the driver-level inference from a class name,
//!    returning [`SQL_UNKNOWN_TYPE`] for anything it does not know.
//! 2. [`lookup_sql_type`]: a fixed table keyed by fully-qualified class name.
//! 3. Degrade to [`SQL_OBJECT_TYPE`] or reject, depending on the caller's policy.

/// Type name returned by inference for unknown classes.
pub const SQL_UNKNOWN_TYPE: &str = "OTHER";

/// Generic type used when an unknown class is degraded.
pub const SQL_OBJECT_TYPE: &str = "OBJECT";

/// Infer the SQL type of a value class.
pub fn infer_sql_type(class_name: &str) -> &'static str {
    match class_name {
        "java.lang.Boolean" | "boolean" => "BOOLEAN",
        "java.lang.Byte" | "byte" => "TINYINT",
        "java.lang.Short" | "short" => "SMALLINT",
        "java.lang.Integer" | "int" => "INTEGER",
        "java.lang.Long" | "long" => "BIGINT",
        "java.lang.Float" | "float" => "FLOAT",
        "java.lang.Double" | "double" => "DOUBLE",
        "java.lang.String" => "VARCHAR",
        "[B" | "byte[]" => "BINARY",
        "java.sql.Time" => "TIME",
        "java.sql.Timestamp" => "TIMESTAMP",
        "java.util.Date" | "java.sql.Date" => "DATE",
        "java.math.BigDecimal" => "DECIMAL",
        _ => SQL_UNKNOWN_TYPE,
    }
}

/// Fixed class-name lookup table consulted when inference yields unknown.
const TYPE_LOOKUP: &[(&str, &str)] = &[
    ("java.util.UUID", "UUID"),
    ("java.lang.String", "VARCHAR"),
    ("java.lang.Object", SQL_OBJECT_TYPE),
    ("java.time.LocalDate", "DATE"),
    ("java.time.LocalTime", "TIME"),
    ("java.time.LocalDateTime", "TIMESTAMP"),
];

/// Look up the SQL type of a class in the fixed table.
pub fn lookup_sql_type(class_name: &str) -> Option<&'static str> {
    TYPE_LOOKUP
        .iter()
        .find(|(cls, _)| *cls == class_name)
        .map(|(_, sql)| *sql)
}

/// How a type was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Native inference.
    Inferred,
    /// Fixed lookup table.
    Lookup,
    /// Unknown class degraded to the generic object type.
    Degraded,
}

/// Result of resolving a class name to an SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    /// SQL type name.
    pub sql_type: &'static str,
    /// Which step produced it.
    pub source: ResolutionSource,
}

impl TypeResolution {
    /// Whether the resolution lost type information.
    pub fn is_lossy(&self) -> bool {
        self.source == ResolutionSource::Degraded
    }
}

/// Resolve a class name, optionally degrading unknown classes.
///
/// Returns `None` when the class is unknown and degrading is not allowed.
pub fn resolve_sql_type(class_name: &str, degrade_unknown: bool) -> Option<TypeResolution> {
    let inferred = infer_sql_type(class_name);
    if inferred != SQL_UNKNOWN_TYPE {
        return Some(TypeResolution {
            sql_type: inferred,
            source: ResolutionSource::Inferred,
        });
    }

    if let Some(sql_type) = lookup_sql_type(class_name) {
        return Some(TypeResolution {
            sql_type,
            source: ResolutionSource::Lookup,
        });
    }

    degrade_unknown.then_some(TypeResolution {
        sql_type: SQL_OBJECT_TYPE,
        source: ResolutionSource::Degraded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_types() {
        assert_eq!(infer_sql_type("java.lang.Integer"), "INTEGER");
        assert_eq!(infer_sql_type("int"), "INTEGER");
        assert_eq!(infer_sql_type("java.lang.Long"), "BIGINT");
        assert_eq!(infer_sql_type("short"), "SMALLINT");
        assert_eq!(infer_sql_type("java.lang.Byte"), "TINYINT");
    }

    #[test]
    fn test_temporal_and_decimal_types() {
        assert_eq!(infer_sql_type("java.sql.Timestamp"), "TIMESTAMP");
        assert_eq!(infer_sql_type("java.util.Date"), "DATE");
        assert_eq!(infer_sql_type("java.math.BigDecimal"), "DECIMAL");
        assert_eq!(infer_sql_type("[B"), "BINARY");
    }

    #[test]
    fn test_unknown_class_is_other() {
        assert_eq!(infer_sql_type("java.util.UUID"), SQL_UNKNOWN_TYPE);
        assert_eq!(infer_sql_type("com.example.Address"), SQL_UNKNOWN_TYPE);
    }

    #[test]
    fn test_lookup_table() {
        assert_eq!(lookup_sql_type("java.util.UUID"), Some("UUID"));
        assert_eq!(lookup_sql_type("java.lang.String"), Some("VARCHAR"));
        assert_eq!(lookup_sql_type("java.lang.Object"), Some("OBJECT"));
        assert_eq!(lookup_sql_type("com.example.Address"), None);
    }

    #[test]
    fn test_resolution_order() {
        let r = resolve_sql_type("java.lang.Long", false).unwrap();
        assert_eq!(r.sql_type, "BIGINT");
        assert_eq!(r.source, ResolutionSource::Inferred);

        let r = resolve_sql_type("java.util.UUID", false).unwrap();
        assert_eq!(r.sql_type, "UUID");
        assert_eq!(r.source, ResolutionSource::Lookup);
        assert!(!r.is_lossy());
    }

    #[test]
    fn test_unknown_class_policy() {
        assert!(resolve_sql_type("com.example.Address", false).is_none());

        let r = resolve_sql_type("com.example.Address", true).unwrap();
        assert_eq!(r.sql_type, SQL_OBJECT_TYPE);
        assert!(r.is_lossy());
    }
}
