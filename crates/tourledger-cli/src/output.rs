//! Output formatting for records.

use anyhow::Result;
use tourledger_core::Record;

/// Maximum width of a summary line
const SUMMARY_WIDTH: usize = 100;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// One line: id, creation time, then the remaining fields as `key=value`.
pub fn summary_line(record: &Record) -> String {
    let created = record
        .created_at
        .as_deref()
        .map(|ts| ts.chars().take(10).collect::<String>())
        .unwrap_or_else(|| "-".to_string());
    let rest: Vec<String> = record
        .fields
        .iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{}={}", k, s),
            other => format!("{}={}", k, other),
        })
        .collect();
    let line = format!("{:<15} {:<10} {}", record.id.to_string(), created, rest.join(" "));
    truncate_string(&line, SUMMARY_WIDTH)
}

pub fn print_record(record: Option<&Record>, summary: bool) -> Result<()> {
    match record {
        Some(record) if summary => println!("{}", summary_line(record)),
        Some(record) => println!("{}", serde_json::to_string_pretty(record)?),
        None => println!("not found"),
    }
    Ok(())
}

pub fn print_records(records: &[Record], summary: bool) -> Result<()> {
    if summary {
        for record in records {
            println!("{}", summary_line(record));
        }
    } else {
        println!("{}", serde_json::to_string_pretty(records)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Alexandria", 3), "Ale");
    }

    #[test]
    fn test_summary_line() {
        let record = Record::from_value(json!({
            "id": 7,
            "createdAt": "2024-05-01T09:00:00.000Z",
            "group": "Nile Trip"
        }))
        .unwrap();
        let line = summary_line(&record);
        assert!(line.starts_with("7 "));
        assert!(line.contains("2024-05-01"));
        assert!(line.ends_with("group=Nile Trip"));
    }
}
