use camino::Utf8Path;
use csv::StringRecord;

use crate::domain::{KeyValuePayload, PlateName, WellPosition};
use crate::error::AnnotateError;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "plate_name",
    "row",
    "column",
    "individual",
    "concentration",
    "compound",
];

/// One CSV row, resolved to a plate name, a zero-based well position and the
/// key-value payload to annotate the well with.
#[derive(Debug, Clone)]
pub struct PlateRecord {
    pub plate_name: PlateName,
    pub position: WellPosition,
    pub payload: KeyValuePayload,
}

#[derive(Debug, Clone)]
pub struct PlateTable {
    pub records: Vec<PlateRecord>,
}

/// Reads the CSV and validates the header before parsing any row, so a
/// missing column aborts the run before anything is resolved.
pub fn load_table(path: &Utf8Path) -> Result<PlateTable, AnnotateError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|_| AnnotateError::CsvRead(path.to_owned()))?;
    let headers = reader
        .headers()
        .map_err(|err| AnnotateError::CsvParse(err.to_string()))?
        .clone();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(AnnotateError::MissingColumn(column.to_string()));
        }
    }

    // Extra columns ride along as additional annotation fields, in header order.
    let extra_columns: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !REQUIRED_COLUMNS.contains(header))
        .map(|(index, _)| index)
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| AnnotateError::CsvParse(err.to_string()))?;
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or_default();
        records.push(parse_record(&headers, &extra_columns, &record, line)?);
    }

    Ok(PlateTable { records })
}

fn parse_record(
    headers: &StringRecord,
    extra_columns: &[usize],
    record: &StringRecord,
    line: u64,
) -> Result<PlateRecord, AnnotateError> {
    let plate_name: PlateName = field(headers, record, "plate_name")?.parse()?;
    let row = parse_integer(field(headers, record, "row")?, "row", line)?;
    let column = parse_integer(field(headers, record, "column")?, "column", line)?;
    let position = WellPosition::from_one_based(row, column)?;

    let individual = field(headers, record, "individual")?;
    let concentration = parse_number(field(headers, record, "concentration")?, line)?;
    let compound = field(headers, record, "compound")?;

    let mut payload = KeyValuePayload::new();
    payload.push("individual", individual);
    payload.push("concentration", concentration.to_string());
    payload.push("compound", compound);
    for &index in extra_columns {
        let key = &headers[index];
        let value = record.get(index).unwrap_or_default();
        payload.push(key, value);
    }

    Ok(PlateRecord {
        plate_name,
        position,
        payload,
    })
}

fn field<'r>(
    headers: &StringRecord,
    record: &'r StringRecord,
    column: &str,
) -> Result<&'r str, AnnotateError> {
    let index = headers
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| AnnotateError::MissingColumn(column.to_string()))?;
    Ok(record.get(index).unwrap_or_default().trim())
}

fn parse_integer(value: &str, column: &str, line: u64) -> Result<i64, AnnotateError> {
    value
        .parse::<i64>()
        .map_err(|_| AnnotateError::InvalidField {
            line,
            column: column.to_string(),
            message: format!("expected an integer, got {value:?}"),
        })
}

fn parse_number(value: &str, line: u64) -> Result<f64, AnnotateError> {
    value
        .parse::<f64>()
        .map_err(|_| AnnotateError::InvalidField {
            line,
            column: "concentration".to_string(),
            message: format!("expected a number, got {value:?}"),
        })
}
