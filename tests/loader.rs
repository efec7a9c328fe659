use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use omero_plate_annotator::error::AnnotateError;
use omero_plate_annotator::loader::{REQUIRED_COLUMNS, load_table};

fn write_csv(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
    let path = dir.path().join("plate.csv");
    std::fs::write(&path, content).unwrap();
    Utf8PathBuf::from_path_buf(path).unwrap()
}

#[test]
fn load_single_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "plate_name,row,column,individual,concentration,compound\n\
         PlateA,1,1,X,0.5,Y\n",
    );

    let table = load_table(&path).unwrap();
    assert_eq!(table.records.len(), 1);
    let record = &table.records[0];
    assert_eq!(record.plate_name.as_str(), "PlateA");
    assert_eq!(record.position.row, 0);
    assert_eq!(record.position.column, 0);
    assert_eq!(
        record.payload.pairs(),
        [
            ("individual".to_string(), "X".to_string()),
            ("concentration".to_string(), "0.5".to_string()),
            ("compound".to_string(), "Y".to_string()),
        ]
    );
}

#[test]
fn missing_any_required_column_fails() {
    for dropped in REQUIRED_COLUMNS {
        let header: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| *column != dropped)
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, &format!("{}\n", header.join(",")));

        let err = load_table(&path).unwrap_err();
        assert_matches!(err, AnnotateError::MissingColumn(column) if column == dropped);
    }
}

#[test]
fn one_based_positions_are_decremented() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "plate_name,row,column,individual,concentration,compound\n\
         PlateA,3,5,X,0.5,Y\n",
    );

    let table = load_table(&path).unwrap();
    assert_eq!(table.records[0].position.row, 2);
    assert_eq!(table.records[0].position.column, 4);
}

#[test]
fn zero_position_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "plate_name,row,column,individual,concentration,compound\n\
         PlateA,0,1,X,0.5,Y\n",
    );

    let err = load_table(&path).unwrap_err();
    assert_matches!(err, AnnotateError::InvalidPosition(_));
}

#[test]
fn extra_columns_ride_along() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "plate_name,row,column,individual,concentration,compound,batch,note\n\
         PlateA,1,2,X,0.5,Y,B7,fixed\n",
    );

    let table = load_table(&path).unwrap();
    assert_eq!(
        table.records[0].payload.pairs(),
        [
            ("individual".to_string(), "X".to_string()),
            ("concentration".to_string(), "0.5".to_string()),
            ("compound".to_string(), "Y".to_string()),
            ("batch".to_string(), "B7".to_string()),
            ("note".to_string(), "fixed".to_string()),
        ]
    );
}

#[test]
fn non_integer_row_fails_with_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(
        &dir,
        "plate_name,row,column,individual,concentration,compound\n\
         PlateA,1,1,X,0.5,Y\n\
         PlateA,two,1,X,0.5,Y\n",
    );

    let err = load_table(&path).unwrap_err();
    assert_matches!(err, AnnotateError::InvalidField { line: 3, ref column, .. } if column.as_str() == "row");
}

#[test]
fn missing_file_is_read_error() {
    let err = load_table(Utf8PathBuf::from("/nonexistent/plate.csv").as_path()).unwrap_err();
    assert_matches!(err, AnnotateError::CsvRead(_));
}
