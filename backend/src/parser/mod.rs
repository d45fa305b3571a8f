//! Reader for resolved records with format, encoding and delimiter auto-detection.
//!
//! Records arrive from the key-lookup step in one of three shapes:
//!
//! - a JSON array of objects
//! - JSON lines (or any whitespace-separated stream of JSON objects)
//! - delimited text with a header row, e.g. a `_id<TAB>ndc` export
//!
//! JSON lines are streamed one record at a time; the other two are loaded
//! whole. No source-specific logic here.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ParseError;

/// Lazy sequence of parsed records.
pub type RecordStream = Box<dyn Iterator<Item = Result<Value, ParseError>>>;

/// Detected layout of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    JsonArray,
    JsonLines,
    Delimited,
}

/// Result of parsing delimited text with metadata
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// Parsed records as JSON objects
    pub records: Vec<Value>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, ParseError> {
    let text = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(e) => {
                return Err(ParseError::Encoding {
                    encoding: encoding.to_string(),
                    message: e.to_string(),
                })
            }
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(codec) => codec.decode(bytes).0.into_owned(),
            // Unknown label: lossy UTF-8
            None => String::from_utf8_lossy(bytes).into_owned(),
        },
    };
    Ok(text)
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = ['\t', ';', ',', '|'];
    let mut best_sep = '\t';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Detect the input layout from its first non-whitespace byte
pub fn detect_format(bytes: &[u8]) -> Option<InputFormat> {
    let first = strip_bom(bytes)
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())?;
    Some(match first {
        b'[' => InputFormat::JsonArray,
        b'{' => InputFormat::JsonLines,
        _ => InputFormat::Delimited,
    })
}

/// Open a file of resolved records.
///
/// # Example
/// ```ignore
/// use drugload::parser::read_records;
///
/// for record in read_records("sider_resolved.jsonl")? {
///     let record = record?;
///     println!("{}", record["_id"]);
/// }
/// ```
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<RecordStream, ParseError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    let format = detect_format(reader.fill_buf()?).ok_or(ParseError::EmptyInput)?;
    debug!(path = %path.display(), ?format, "reading records");

    match format {
        InputFormat::JsonLines => Ok(stream_json(reader)),
        InputFormat::JsonArray => parse_json_array(reader),
        InputFormat::Delimited => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes)?;
            let table = parse_bytes_auto(&bytes)?;
            Ok(Box::new(table.records.into_iter().map(Ok)))
        }
    }
}

/// Parse records held in memory, same detection as [`read_records`].
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Value>, ParseError> {
    let bytes = strip_bom(bytes);
    let format = detect_format(bytes).ok_or(ParseError::EmptyInput)?;
    match format {
        InputFormat::JsonLines => stream_json(std::io::Cursor::new(bytes.to_vec())).collect(),
        InputFormat::JsonArray => parse_json_array(bytes)?.collect(),
        InputFormat::Delimited => Ok(parse_bytes_auto(bytes)?.records),
    }
}

fn stream_json<R: Read + 'static>(reader: R) -> RecordStream {
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
    Box::new(
        stream
            .enumerate()
            .map(|(index, item)| item.map_err(ParseError::from).and_then(|v| expect_object(index, v))),
    )
}

fn parse_json_array<R: Read>(reader: R) -> Result<RecordStream, ParseError> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(Box::new(
        values
            .into_iter()
            .enumerate()
            .map(|(index, v)| expect_object(index, v)),
    ))
}

fn expect_object(index: usize, value: Value) -> Result<Value, ParseError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ParseError::NotAnObject { index })
    }
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParsedTable, ParseError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_delimited(&content, delimiter, encoding)
}

/// Parse delimited text with an explicit delimiter.
///
/// Each row becomes a JSON object keyed by the header. Cells holding a JSON
/// array or object are decoded, so an exported `ndc` list survives the trip.
pub fn parse_delimited(content: &str, delimiter: char, encoding: String) -> Result<ParsedTable, ParseError> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(String::is_empty) {
        return Err(ParseError::NoHeaders);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }

        let mut obj = Map::new();
        for (i, header) in headers.iter().enumerate() {
            let raw_value = row.get(i).unwrap_or("");
            obj.insert(header.clone(), cell_value(raw_value));
        }
        records.push(Value::Object(obj));
    }

    Ok(ParsedTable {
        records,
        encoding,
        delimiter,
        headers,
    })
}

fn cell_value(raw: &str) -> Value {
    if raw.starts_with('[') || raw.starts_with('{') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_tab_delimited() {
        let table = parse_delimited("_id\tndc\nIK1\tN1\nIK2\tN2", '\t', "utf-8".into()).unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0], json!({"_id": "IK1", "ndc": "N1"}));
        assert_eq!(table.headers, vec!["_id", "ndc"]);
    }

    #[test]
    fn test_json_cells_are_decoded() {
        let content = "_id\tndc\nIK1\t[\"N1\",\"N2\"]\nIK2\t[not json";
        let table = parse_delimited(content, '\t', "utf-8".into()).unwrap();

        assert_eq!(table.records[0]["ndc"], json!(["N1", "N2"]));
        assert_eq!(table.records[1]["ndc"], json!("[not json"));
    }

    #[test]
    fn test_empty_lines_skipped_and_missing_values() {
        let table = parse_delimited("a;b;c\n1;;3\n\n4;5;6\n", ';', "utf-8".into()).unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["b"], "");
        assert_eq!(table.records[1]["c"], "6");
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_delimited("a,b,c\n1", ',', "utf-8".into()).unwrap();
        assert_eq!(table.records[0], json!({"a": "1", "b": "", "c": ""}));
    }

    #[test]
    fn test_empty_input_error() {
        assert!(matches!(
            parse_delimited("", ',', "utf-8".into()),
            Err(ParseError::EmptyInput)
        ));
        assert!(matches!(parse_records(b"   \n"), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), '\t');
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"  [{}]"), Some(InputFormat::JsonArray));
        assert_eq!(detect_format(b"{\"_id\":1}\n"), Some(InputFormat::JsonLines));
        assert_eq!(detect_format(b"_id\tndc"), Some(InputFormat::Delimited));
        assert_eq!(detect_format(b"\n\t "), None);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let result = decode_content(&[0x66, 0xFF, 0x6F], "utf-8");
        assert!(matches!(result, Err(ParseError::Encoding { .. })));
    }

    #[test]
    fn test_parse_records_json_lines() {
        let records = parse_records(b"{\"_id\":\"IK1\"}\n{\"_id\":\"IK2\"}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["_id"], "IK2");
    }

    #[test]
    fn test_parse_records_rejects_non_objects() {
        let err = parse_records(b"[{\"_id\":\"IK1\"}, 5]").unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject { index: 1 }));
    }

    #[test]
    fn test_read_records_streams_json_lines() {
        let file = temp_file(b"{\"_id\":\"IK1\",\"sider\":[]}\n{\"_id\":\"IK2\"}\n{broken\n");
        let mut stream = read_records(file.path()).unwrap();

        assert_eq!(stream.next().unwrap().unwrap()["_id"], "IK1");
        assert_eq!(stream.next().unwrap().unwrap()["_id"], "IK2");
        assert!(matches!(stream.next(), Some(Err(ParseError::Json { line: 3, .. }))));
    }

    #[test]
    fn test_bom_prefixed_json() {
        let file = temp_file(b"\xEF\xBB\xBF{\"_id\":\"IK1\"}\n{\"_id\":\"IK2\"}\n");
        let records: Vec<Value> = read_records(file.path()).unwrap().map(Result::unwrap).collect();
        assert_eq!(records, vec![json!({"_id": "IK1"}), json!({"_id": "IK2"})]);

        let records = parse_records(b"\xEF\xBB\xBF[{\"_id\":\"IK1\"}]").unwrap();
        assert_eq!(records, vec![json!({"_id": "IK1"})]);
        assert_eq!(detect_format(b"\xEF\xBB\xBF _id\tndc"), Some(InputFormat::Delimited));
    }

    #[test]
    fn test_read_records_array_and_table() {
        let file = temp_file(b"[{\"_id\":\"IK1\",\"ndc\":\"N1\"}]");
        let records: Vec<Value> = read_records(file.path()).unwrap().map(Result::unwrap).collect();
        assert_eq!(records, vec![json!({"_id": "IK1", "ndc": "N1"})]);

        let file = temp_file(b"_id\tndc\nIK1\tN1\n");
        let records: Vec<Value> = read_records(file.path()).unwrap().map(Result::unwrap).collect();
        assert_eq!(records, vec![json!({"_id": "IK1", "ndc": "N1"})]);
    }
}
