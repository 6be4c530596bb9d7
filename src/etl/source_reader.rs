// ==========================================
// CRM ETL - source readers
// ==========================================
// Chunked readers over the flat-file feeds. Each record arrives as a
// field-name -> raw-string map; blank values are dropped so "absent" and
// "empty" look identical to the validators. A source is restarted by
// constructing it again.
// ==========================================

use crate::etl::error::{EtlError, EtlResult};
use csv::{Reader, ReaderBuilder, StringRecordsIntoIter};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

// ==========================================
// RawRecord - one source record, pre-validation
// ==========================================
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 1-based data row number in the source file (error report identifier
    /// when the record has no id field).
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    /// Required-field accessor used by transformers: absent or blank is None.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    /// Identifier for error reports: the id field when present, else the row.
    pub fn identifier(&self) -> String {
        self.get("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("row {}", self.row_number))
    }
}

// ==========================================
// RecordSource trait
// ==========================================
// "give me the next chunk" / "no more chunks" is all the pipeline needs.
pub trait RecordSource {
    /// Next bounded chunk of records, or None when the source is exhausted.
    fn next_chunk(&mut self) -> EtlResult<Option<Vec<RawRecord>>>;
}

// ==========================================
// CsvSource
// ==========================================
pub struct CsvSource {
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
    chunk_size: usize,
    next_row_number: usize,
}

impl std::fmt::Debug for CsvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSource")
            .field("headers", &self.headers)
            .field("records", &"<StringRecordsIntoIter>")
            .field("chunk_size", &self.chunk_size)
            .field("next_row_number", &self.next_row_number)
            .finish()
    }
}

impl CsvSource {
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> EtlResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EtlError::FileNotFound(path.display().to_string()));
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("csv") {
            return Err(EtlError::UnsupportedFormat(ext.to_string()));
        }

        let file = File::open(path)?;
        let mut reader: Reader<File> = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            headers,
            records: reader.into_records(),
            chunk_size,
            next_row_number: 1,
        })
    }
}

impl RecordSource for CsvSource {
    fn next_chunk(&mut self) -> EtlResult<Option<Vec<RawRecord>>> {
        let mut chunk = Vec::new();

        while chunk.len() < self.chunk_size {
            let record = match self.records.next() {
                Some(result) => result?,
                None => break,
            };
            let row_number = self.next_row_number;
            self.next_row_number += 1;

            let mut fields = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                if let Some(header) = self.headers.get(col_idx) {
                    fields.insert(header.clone(), value.to_string());
                }
            }

            // skip fully blank rows
            if fields.is_empty() {
                continue;
            }

            chunk.push(RawRecord { row_number, fields });
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}

// ==========================================
// JsonSource
// ==========================================
// The feed is one JSON array of objects (not NDJSON), so the file is parsed
// up front and replayed in chunks.
#[derive(Debug)]
pub struct JsonSource {
    records: std::vec::IntoIter<RawRecord>,
    chunk_size: usize,
}

impl JsonSource {
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> EtlResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EtlError::FileNotFound(path.display().to_string()));
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("json") {
            return Err(EtlError::UnsupportedFormat(ext.to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let array = match value {
            Value::Array(items) => items,
            _ => {
                return Err(EtlError::JsonParseError(format!(
                    "{}: expected a top-level JSON array",
                    path.display()
                )))
            }
        };

        let mut records = Vec::with_capacity(array.len());
        for (idx, item) in array.into_iter().enumerate() {
            let object = match item {
                Value::Object(map) => map,
                other => {
                    return Err(EtlError::JsonParseError(format!(
                        "{}: element {} is not an object: {}",
                        path.display(),
                        idx,
                        other
                    )))
                }
            };

            let mut fields = HashMap::new();
            for (key, value) in object {
                if let Some(text) = scalar_to_string(&value) {
                    if !text.trim().is_empty() {
                        fields.insert(key, text);
                    }
                }
            }
            if fields.is_empty() {
                continue;
            }
            records.push(RawRecord {
                row_number: idx + 1,
                fields,
            });
        }

        Ok(Self {
            records: records.into_iter(),
            chunk_size,
        })
    }
}

/// JSON scalars become the strings the validators expect; null is absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // nested structures are not part of any feed; keep them visible
        // in the error report instead of dropping them silently
        other => Some(other.to_string()),
    }
}

impl RecordSource for JsonSource {
    fn next_chunk(&mut self) -> EtlResult<Option<Vec<RawRecord>>> {
        let chunk: Vec<RawRecord> = self.records.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}
