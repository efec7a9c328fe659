use omero_plate_annotator::error::AnnotateError;

#[test]
fn report_downcasts_to_concrete_error() {
    // The binary maps exit codes by downcasting the report, so the
    // conversion in run() must keep the concrete error type visible.
    let report = miette::Report::new(AnnotateError::PlateNotFound("PlateA".to_string()));
    let annotate = report.downcast_ref::<AnnotateError>();
    assert!(annotate.is_some());
    assert_eq!(annotate.unwrap().exit_code(), 2);
}

#[test]
fn exit_codes_by_error_class() {
    assert_eq!(
        AnnotateError::MissingColumn("compound".to_string()).exit_code(),
        2
    );
    assert_eq!(
        AnnotateError::WellNotFound {
            plate: 1,
            row: 0,
            column: 0
        }
        .exit_code(),
        2
    );
    assert_eq!(
        AnnotateError::AnnotationConflict { well: 10, count: 2 }.exit_code(),
        2
    );
    assert_eq!(
        AnnotateError::LoginFailed("bad password".to_string()).exit_code(),
        3
    );
    assert_eq!(
        AnnotateError::OmeroStatus {
            status: 502,
            message: "bad gateway".to_string()
        }
        .exit_code(),
        3
    );
}
