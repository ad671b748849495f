//! OCR fallback behaviour: blank images, scanned PDFs and missing engines.

use cvinsight::{CvError, Pipeline, PipelineConfig, ProcessOptions, TextSource};
use std::sync::Arc;

mod helpers;
use helpers::*;

fn without_engine() -> Pipeline {
    Pipeline::builder(PipelineConfig::default()).without_ocr().build().unwrap()
}

#[test]
fn test_blank_images_without_engine_are_empty_not_errors() {
    let pipeline = without_engine();
    for (name, format) in [("blank.png", image::ImageFormat::Png), ("blank.jpg", image::ImageFormat::Jpeg)] {
        let bytes = encode(&blank_image(200, 120), format);
        let record = pipeline
            .process_bytes(name, bytes, &ProcessOptions::default())
            .unwrap_or_else(|e| panic!("{} should not fail: {}", name, e));
        assert!(record.personal_info.email.is_none(), "{}", name);
        assert!(record.missing_fields.contains(&"name".to_string()), "{}", name);
    }
}

#[test]
fn test_inked_image_without_engine_is_ocr_failure() {
    let pipeline = without_engine();
    let bytes = encode(&inked_image(200, 120), image::ImageFormat::Png);
    let err = pipeline
        .process_bytes("scan.png", bytes, &ProcessOptions::default())
        .unwrap_err();
    assert!(matches!(err, CvError::Ocr { .. }));
    assert_eq!(err.kind(), "ocr_failure");
}

#[test]
fn test_scanned_pdf_goes_through_engine() {
    let mock = Arc::new(MockOcr::new("Jane Roe\nEmail: jane.roe@example.com\nSkills: Rust, SQL"));
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .ocr_backend(Arc::clone(&mock) as Arc<dyn cvinsight::OcrBackend>)
        .build()
        .unwrap();

    let jpeg = encode(&inked_image(300, 150), image::ImageFormat::Jpeg);
    let record = pipeline
        .process_bytes("scan.pdf", scanned_pdf(&jpeg, 300, 150), &ProcessOptions::default())
        .unwrap();

    assert_eq!(mock.calls(), 1);
    assert_eq!(record.text_source, TextSource::Ocr);
    assert_eq!(record.ocr_confidence, Some(87.0));
    assert_eq!(record.personal_info.email.as_deref(), Some("jane.roe@example.com"));
    assert_eq!(record.skill_names(), vec!["Rust", "SQL"]);
}

#[test]
fn test_scanned_image_goes_through_engine() {
    let mock = Arc::new(MockOcr::new("Contact: ocr@example.com"));
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .ocr_backend(Arc::clone(&mock) as Arc<dyn cvinsight::OcrBackend>)
        .build()
        .unwrap();

    let bytes = encode(&inked_image(200, 120), image::ImageFormat::Png);
    let record = pipeline
        .process_bytes("scan.png", bytes, &ProcessOptions::default())
        .unwrap();
    assert_eq!(mock.calls(), 1);
    assert_eq!(record.personal_info.email.as_deref(), Some("ocr@example.com"));
}

fn with_mock(text: &str) -> (Arc<MockOcr>, Pipeline) {
    let mock = Arc::new(MockOcr::new(text));
    let pipeline = Pipeline::builder(PipelineConfig::default())
        .ocr_backend(Arc::clone(&mock) as Arc<dyn cvinsight::OcrBackend>)
        .build()
        .unwrap();
    (mock, pipeline)
}

#[test]
fn test_undecodable_scan_is_ocr_failure() {
    let (mock, pipeline) = with_mock("never returned");
    let err = pipeline
        .process_bytes("fax.pdf", ccitt_pdf(1728, 2200), &ProcessOptions::default())
        .unwrap_err();

    assert_eq!(mock.calls(), 0);
    assert!(matches!(err, CvError::Ocr { .. }));
    assert!(err.to_string().contains("unsupported encodings"));
}

#[test]
fn test_direct_text_threshold_boundary() {
    let threshold = PipelineConfig::default().ocr.min_text_length;
    let jpeg = encode(&inked_image(300, 150), image::ImageFormat::Jpeg);

    let at_threshold = "a".repeat(threshold);
    let (mock, pipeline) = with_mock("Contact: scan@example.com");
    let record = pipeline
        .process_bytes(
            "cv.pdf",
            text_and_scan_pdf(&[&at_threshold], &jpeg, 300, 150),
            &ProcessOptions::default(),
        )
        .unwrap();
    assert_eq!(mock.calls(), 0);
    assert_eq!(record.text_source, TextSource::Direct);

    let below_threshold = "a".repeat(threshold - 1);
    let (mock, pipeline) = with_mock("Contact: scan@example.com");
    let record = pipeline
        .process_bytes(
            "cv.pdf",
            text_and_scan_pdf(&[&below_threshold], &jpeg, 300, 150),
            &ProcessOptions::default(),
        )
        .unwrap();
    assert_eq!(mock.calls(), 1);
    assert_eq!(record.text_source, TextSource::Ocr);
    assert_eq!(record.personal_info.email.as_deref(), Some("scan@example.com"));
}

#[test]
fn test_short_docx_recognizes_media() {
    let png = encode(&inked_image(200, 120), image::ImageFormat::Png);
    let (mock, pipeline) = with_mock("Email: media@example.com\nSkills: Docker");
    let record = pipeline
        .process_bytes(
            "cv.docx",
            docx_with_media(&["Curriculum Vitae"], &[("image1.png", png.as_slice())]),
            &ProcessOptions::default(),
        )
        .unwrap();

    assert_eq!(mock.calls(), 1);
    assert_eq!(record.text_source, TextSource::Mixed);
    assert_eq!(record.personal_info.email.as_deref(), Some("media@example.com"));
    assert_eq!(record.skill_names(), vec!["Docker"]);
}

#[test]
fn test_long_docx_ignores_media() {
    let png = encode(&inked_image(200, 120), image::ImageFormat::Png);
    let (mock, pipeline) = with_mock("Email: media@example.com");
    let record = pipeline
        .process_bytes(
            "cv.docx",
            docx_with_media(
                &[
                    "Budi Santoso",
                    "Email: budi@example.com",
                    "Backend engineer building payment platforms in Jakarta",
                ],
                &[("image1.png", png.as_slice())],
            ),
            &ProcessOptions::default(),
        )
        .unwrap();

    assert_eq!(mock.calls(), 0);
    assert_eq!(record.text_source, TextSource::Direct);
    assert_eq!(record.personal_info.email.as_deref(), Some("budi@example.com"));
}
