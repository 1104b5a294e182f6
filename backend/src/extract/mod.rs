//! Extract stage: raw sales CSV into a [`RawDataset`].
//!
//! Checks that the file exists, decodes it (UTF-8, or a detected legacy
//! encoding), parses it as comma-separated CSV with a header row, and
//! verifies that every required column is present. Extra columns are
//! carried on each record so duplicate detection sees the whole row. Cell
//! contents are not validated here.

use std::path::Path;

use crate::api::logs::{log_info, log_success, Stage};
use crate::config::REQUIRED_COLUMNS;
use crate::error::{ExtractError, ExtractResult};
use crate::models::{CsvInfo, RawDataset, RawRecord};

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the given encoding. Undecodable input is a read error.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ExtractResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| ExtractError::Read(format!("invalid UTF-8: {}", e)))?,
        // Latin-1 labels use the windows-1252 table.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                ExtractError::Read(format!("unsupported encoding '{}'", other))
            })?;
            let (text, _, had_errors) = codec.decode(bytes);
            if had_errors {
                return Err(ExtractError::Read(format!("cannot decode input as {}", other)));
            }
            text.into_owned()
        }
    };

    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Required columns absent from `headers`, in canonical order.
pub fn missing_columns(headers: &[String]) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect()
}

/// Read the raw sales CSV at `path`.
///
/// # Errors
/// - [`ExtractError::FileNotFound`] if the path does not exist
/// - [`ExtractError::Read`] if the file cannot be read or parsed as CSV
/// - [`ExtractError::Schema`] if required columns are missing
pub fn extract_sales_data<P: AsRef<Path>>(path: P) -> ExtractResult<RawDataset> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExtractError::FileNotFound(path.to_path_buf()));
    }

    log_info(Stage::Extract, format!("Reading {}", path.display()));
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractError::Read(format!("cannot read '{}': {}", path.display(), e)))?;

    let mut dataset = extract_bytes(&bytes)?;
    dataset.info.source = Some(path.to_path_buf());
    Ok(dataset)
}

/// Parse raw sales CSV bytes (e.g. an uploaded file).
pub fn extract_bytes(bytes: &[u8]) -> ExtractResult<RawDataset> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let dataset = parse_sales_csv(&content, encoding)?;

    log_success(Stage::Extract, format!("Raw data loaded: {} rows", dataset.len()));
    log_success(Stage::Extract, "Columns validated");
    Ok(dataset)
}

/// Parse decoded CSV text.
pub fn parse_sales_csv(content: &str, encoding: String) -> ExtractResult<RawDataset> {
    if content.trim().is_empty() {
        return Err(ExtractError::Read("file is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ExtractError::Read(format!("cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let missing = missing_columns(&headers);
    if !missing.is_empty() {
        return Err(ExtractError::Schema { missing });
    }

    let index_of = |name: &str| headers.iter().position(|h| h == name).unwrap_or_default();
    let [date_idx, product_idx, category_idx, quantity_idx, price_idx] =
        REQUIRED_COLUMNS.map(index_of);
    let extra_idx: Vec<usize> = (0..headers.len())
        .filter(|i| !REQUIRED_COLUMNS.contains(&headers[*i].as_str()))
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| ExtractError::Read(e.to_string()))?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let cell = |idx: usize| row.get(idx).unwrap_or("").to_string();

        records.push(RawRecord {
            line,
            date: cell(date_idx),
            product: cell(product_idx),
            category: cell(category_idx),
            quantity: cell(quantity_idx),
            price: cell(price_idx),
            extra: extra_idx.iter().map(|i| cell(*i)).collect(),
        });
    }

    let info = CsvInfo {
        source: None,
        encoding,
        row_count: records.len(),
        headers,
    };

    Ok(RawDataset { records, info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_extract_simple_file() {
        let file = write_csv(
            b"date,product,category,quantity,price\n2024-01-05,Apple,Food,3,10.0\n2024-01-06,Pen,Office,2,5.5\n",
        );
        let dataset = extract_sales_data(file.path()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].product, "Apple");
        assert_eq!(dataset.records[0].line, 2);
        assert_eq!(dataset.records[1].price, "5.5");
        assert_eq!(dataset.info.encoding, "utf-8");
        assert_eq!(dataset.info.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_file() {
        let err = extract_sales_data("/definitely/not/here/raw_sales.csv").unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound(_)));
        assert!(err.to_string().contains("raw_sales.csv"));
    }

    #[test]
    fn test_missing_price_column() {
        let file = write_csv(b"date,product,category,quantity\n2024-01-05,Apple,Food,3\n");
        match extract_sales_data(file.path()).unwrap_err() {
            ExtractError::Schema { missing } => assert_eq!(missing, vec!["price".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_lists_every_missing_column() {
        let err = parse_sales_csv("date,product\n2024-01-05,Apple\n", "utf-8".into()).unwrap_err();
        match err {
            ExtractError::Schema { missing } => {
                assert_eq!(missing, vec!["category", "quantity", "price"]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_columns_kept_and_order_free() {
        let csv = "store,price,quantity,category,product,region,date\nS1,9.99,1,Toys,Ball,North,2024-03-01\n";
        let dataset = parse_sales_csv(csv, "utf-8".into()).unwrap();

        let row = &dataset.records[0];
        assert_eq!(row.date, "2024-03-01");
        assert_eq!(row.product, "Ball");
        assert_eq!(row.category, "Toys");
        assert_eq!(row.quantity, "1");
        assert_eq!(row.price, "9.99");
        assert_eq!(row.extra, vec!["S1", "North"]);
    }

    #[test]
    fn test_malformed_row_is_read_error() {
        let csv = "date,product,category,quantity,price\n2024-01-05,Apple,Food,3\n";
        let err = parse_sales_csv(csv, "utf-8".into()).unwrap_err();
        assert!(matches!(err, ExtractError::Read(_)));
    }

    #[test]
    fn test_empty_file_is_read_error() {
        let file = write_csv(b"");
        let err = extract_sales_data(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Read(_)));
    }

    #[test]
    fn test_quoted_values_and_empty_cells() {
        let csv = "date,product,category,quantity,price\n2024-01-05,\"Pen, blue\",,3,\"1.50\"\n";
        let dataset = parse_sales_csv(csv, "utf-8".into()).unwrap();

        assert_eq!(dataset.records[0].product, "Pen, blue");
        assert_eq!(dataset.records[0].category, "");
        assert_eq!(dataset.records[0].price, "1.50");
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"date,product,category,quantity,price\n2024-01-05,A,B,1,2\n");
        let dataset = extract_bytes(&bytes).unwrap();
        assert_eq!(dataset.info.headers[0], "date");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Café" in ISO-8859-1
        let bytes: &[u8] = &[0x43, 0x61, 0x66, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Café");

        // Currency sign, broken bar and acute accent, not ISO-8859-15's €/Š/Ž.
        let decoded = decode_content(&[0xA4, 0xA6, 0xB4], "latin1").unwrap();
        assert_eq!(decoded, "¤¦´");
    }

    #[test]
    fn test_invalid_utf8_reported() {
        let err = decode_content(&[0xFF, 0xFE, 0x00], "utf-8").unwrap_err();
        assert!(matches!(err, ExtractError::Read(_)));
    }
}
