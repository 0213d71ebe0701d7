use serde_json::json;
use sketchcast_core::status::{StatusSummary, StreamStatus};
use sketchcast_core::upload::{classify_remote_url, RemoteSource};
use sketchcast_core::{is_live, validate_upload, UploadError, MAX_UPLOAD_BYTES};

const MB: u64 = 1024 * 1024;

#[test]
fn test_file_size_and_type_gate() {
    assert_eq!(validate_upload("image/png", 5 * MB), Err(UploadError::TooLarge));
    assert!(validate_upload("image/jpeg", 3 * MB).is_ok());
    assert!(validate_upload("video/mp4", MAX_UPLOAD_BYTES).is_ok());
    assert_eq!(
        validate_upload("application/pdf", MB),
        Err(UploadError::UnsupportedType)
    );
    assert_eq!(
        UploadError::TooLarge.to_string(),
        "File too large (max 4MB)."
    );
}

#[test]
fn test_remote_url_classification() {
    assert!(matches!(
        classify_remote_url("https://cdn.example.com/a/b.WEBP"),
        Ok(RemoteSource::Direct { .. })
    ));
    assert!(matches!(
        classify_remote_url("https://firebasestorage.googleapis.com/v0/b/x/o/img?alt=media"),
        Ok(RemoteSource::FetchFirst { .. })
    ));
    assert!(classify_remote_url("https://example.com/page.html").is_err());
}

#[test]
fn test_liveness_single_derivation() {
    let healthy = StreamStatus::from_value(json!({ "data": { "gateway_status": {} } }));
    let failing = StreamStatus::from_value(json!({
        "data": { "gateway_status": { "error_message": "ingest timeout" } }
    }));

    assert!(is_live(Some(&healthy)));
    assert!(!is_live(Some(&failing)));
    assert!(!is_live(None));

    // The badge and the panel read the same summary.
    assert_eq!(StatusSummary::from_status(Some(&healthy)).live, is_live(Some(&healthy)));
    assert_eq!(StatusSummary::from_status(Some(&failing)).live, is_live(Some(&failing)));
}
