//! SQL type mapping and sea-orm structural annotations.
//!
//! `map_sql_type` turns a storage type into the Rust type a generated entity
//! field uses. `column_attributes` decides which `#[sea_orm(...)]` items a
//! column needs so that the storage type survives a round trip; most columns
//! need none and get no attribute at all.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::Column;

static DECIMAL_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:numeric|decimal)\s*\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)")
        .expect("decimal pattern is valid")
});

static PARAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parameter pattern is valid"));

/// Storage types that map to `String` but cannot be written as plain text.
const CUSTOM_STRING_TYPES: &[&str] = &[
    "inet",
    "cidr",
    "macaddr",
    "macaddr8",
    "bit",
    "bit varying",
    "varbit",
    "point",
    "line",
    "lseg",
    "box",
    "path",
    "polygon",
    "circle",
    "tsvector",
    "tsquery",
    "interval",
    "xml",
];

const LONG_TEXT_TYPES: &[&str] = &["text", "tinytext", "mediumtext", "longtext"];

/// Types that do not serialize cleanly for API consumers.
const VIEW_STRING_TYPES: &[&str] = &[
    "Date",
    "Time",
    "DateTime",
    "DateTimeUtc",
    "DateTimeLocal",
    "DateTimeWithTimeZone",
    "Uuid",
    "Decimal",
    "Json",
];

/// Lower-cases `sql_type`, drops parenthesized parameters and collapses
/// whitespace: `NUMERIC(10, 2)` -> `numeric`.
pub fn normalize_sql_type(sql_type: &str) -> String {
    let lowered = sql_type.to_ascii_lowercase();
    let stripped = PARAMS.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_array_type(normalized: &str) -> bool {
    normalized.ends_with("[]") || normalized.starts_with('_') || normalized == "array"
}

/// Maps a storage type to the Rust type used by generated code.
pub fn map_sql_type(sql_type: &str) -> String {
    let normalized = normalize_sql_type(sql_type);
    if is_array_type(&normalized) {
        let element = normalized
            .strip_suffix("[]")
            .or_else(|| normalized.strip_prefix('_'))
            .unwrap_or("");
        if element.is_empty() {
            return "Vec<String>".to_string();
        }
        return format!("Vec<{}>", map_sql_type(element));
    }

    let unsigned = normalized.contains("unsigned");
    let base = normalized
        .replace(" unsigned", "")
        .replace(" zerofill", "");
    let mapped = match base.as_str() {
        "tinyint" | "int1" => {
            if unsigned {
                "u8"
            } else {
                "i8"
            }
        }
        "smallint" | "int2" | "smallserial" | "serial2" | "year" => {
            if unsigned {
                "u16"
            } else {
                "i16"
            }
        }
        "int" | "integer" | "int4" | "mediumint" | "serial" | "serial4" => {
            if unsigned {
                "u32"
            } else {
                "i32"
            }
        }
        "bigint" | "int8" | "bigserial" | "serial8" => {
            if unsigned {
                "u64"
            } else {
                "i64"
            }
        }
        "real" | "float4" => "f32",
        "float" | "float8" | "double" | "double precision" => "f64",
        "numeric" | "decimal" | "money" => "Decimal",
        "bool" | "boolean" => "bool",
        "date" => "Date",
        "time" | "time without time zone" | "timetz" | "time with time zone" => "Time",
        "timestamp" | "timestamp without time zone" | "datetime" => "DateTime",
        "timestamptz" | "timestamp with time zone" => "DateTimeWithTimeZone",
        "uuid" => "Uuid",
        "json" | "jsonb" => "Json",
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
            "Vec<u8>"
        }
        "char" | "character" | "varchar" | "character varying" | "nchar" | "nvarchar"
        | "text" | "tinytext" | "mediumtext" | "longtext" | "citext" | "enum" | "set" => "String",
        other if CUSTOM_STRING_TYPES.contains(&other) => "String",
        other => {
            tracing::debug!(sql_type = other, "unmapped sql type, using String");
            "String"
        }
    };
    mapped.to_string()
}

/// Annotation that pins a column's storage type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralType {
    JsonBinary,
    Text,
    Decimal { precision: u32, scale: u32 },
    /// Literal storage type name, read back as text.
    Custom(String),
}

impl StructuralType {
    pub fn attribute(&self) -> String {
        match self {
            StructuralType::JsonBinary => r#"column_type = "JsonBinary""#.to_string(),
            StructuralType::Text => r#"column_type = "Text""#.to_string(),
            StructuralType::Decimal { precision, scale } => {
                format!(r#"column_type = "Decimal(Some(({precision}, {scale})))""#)
            }
            StructuralType::Custom(name) => format!(r#"column_type = "custom(\"{name}\")""#),
        }
    }

    /// Read and write casts for custom storage types.
    pub fn cast_attributes(&self) -> Option<[String; 2]> {
        match self {
            StructuralType::Custom(name) => Some([
                r#"select_as = "text""#.to_string(),
                format!(r#"save_as = "{name}""#),
            ]),
            _ => None,
        }
    }
}

fn base_rust_type(rust_type: &str) -> &str {
    rust_type
        .strip_prefix("Option<")
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(rust_type)
        .trim()
}

/// Decides whether the column's storage type needs an explicit annotation.
pub fn structural_type(sql_type: &str, rust_type: &str) -> Option<StructuralType> {
    let normalized = normalize_sql_type(sql_type);
    if normalized.is_empty() || is_array_type(&normalized) {
        return None;
    }
    if normalized == "jsonb" {
        return Some(StructuralType::JsonBinary);
    }

    let is_string = matches!(base_rust_type(rust_type), "String" | "std::string::String");
    if LONG_TEXT_TYPES.contains(&normalized.as_str()) && is_string {
        return Some(StructuralType::Text);
    }

    if let Some(caps) = DECIMAL_PARAMS.captures(&sql_type.to_ascii_lowercase()) {
        let precision = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let scale = caps
            .get(2)
            .map_or(Some(0), |m| m.as_str().parse().ok());
        if let (Some(precision), Some(scale)) = (precision, scale) {
            return Some(StructuralType::Decimal { precision, scale });
        }
    }

    if CUSTOM_STRING_TYPES.contains(&normalized.as_str()) && is_string {
        return Some(StructuralType::Custom(normalized));
    }
    None
}

/// Assembles the `#[sea_orm(...)]` items of a column in their fixed order:
/// primary key, disabled auto increment, structural type, read/write casts,
/// uniqueness, nullability, then a column rename.
pub fn column_attributes(column: &Column) -> Vec<String> {
    let mut attrs = Vec::new();
    if column.primary_key {
        attrs.push("primary_key".to_string());
        if !column.auto_increment {
            attrs.push("auto_increment = false".to_string());
        }
    }

    let structural = structural_type(&column.sql_type, &column.rust_type);
    if let Some(structural) = &structural {
        attrs.push(structural.attribute());
        if let Some(casts) = structural.cast_attributes() {
            attrs.extend(casts);
        }
    }

    if column.unique && !column.primary_key {
        attrs.push("unique".to_string());
    }
    // Without a structural type the Option wrapper already implies nullability.
    if structural.is_some() && column.nullable {
        attrs.push("nullable".to_string());
    }
    if column.is_renamed() {
        attrs.push(format!(r#"column_name = "{}""#, column.name));
    }
    attrs
}

/// Rendered attribute line, or `None` for columns that need no annotation.
pub fn column_annotation(column: &Column) -> Option<String> {
    let attrs = column_attributes(column);
    if attrs.is_empty() {
        None
    } else {
        Some(format!("#[sea_orm({})]", attrs.join(", ")))
    }
}

/// Type a column takes in view objects.
pub fn view_type(rust_type: &str, nullable: bool) -> String {
    let base = if VIEW_STRING_TYPES.contains(&base_rust_type(rust_type)) {
        "String"
    } else {
        rust_type
    };
    if nullable {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

pub fn is_view_coerced(rust_type: &str) -> bool {
    VIEW_STRING_TYPES.contains(&base_rust_type(rust_type))
}

/// JSON and binary payloads make poor list filters.
pub fn is_unfilterable(rust_type: &str) -> bool {
    let base = base_rust_type(rust_type);
    matches!(base, "Json" | "serde_json::Value" | "Vec<u8>")
}

/// Expression producing "now" for a timestamp field of `rust_type`.
pub fn now_expression(rust_type: &str) -> &'static str {
    match base_rust_type(rust_type) {
        "DateTimeWithTimeZone" => "chrono::Utc::now().fixed_offset()",
        "DateTimeUtc" => "chrono::Utc::now()",
        "DateTime" => "chrono::Utc::now().naive_utc()",
        "Date" => "chrono::Utc::now().date_naive()",
        "i64" => "chrono::Utc::now().timestamp()",
        _ => "chrono::Utc::now().naive_utc()",
    }
}
