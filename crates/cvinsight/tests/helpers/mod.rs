//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use cvinsight::{OcrBackend, RecognitionParams, RecognizedText};
use image::{GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use zip::write::{FileOptions, ZipWriter};

pub const JOHN_DOE: &str = "John Doe\nEmail: john.doe@example.com\nPhone: +1-555-123-4567";

/// A resume long enough to take the direct-text path.
pub fn resume_text(name: &str, email: &str) -> String {
    format!(
        "{name}\nEmail: {email}\nPhone: +62 812 3456 7890\n\nSummary\nBackend engineer with eight years of experience building payment and logistics platforms.\n\nWork Experience\nSenior Engineer at Acme Corp\nJan 2019 - Present\n- Built the billing platform\n\nEducation\nUniversitas Indonesia\nS1 Teknik Informatika, 2010 - 2014\n\nSkills\nRust, Python, PostgreSQL, Docker\n"
    )
}

/// A one-page PDF with each line drawn in its own text object.
pub fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    page_pdf(lines, None)
}

/// A one-page PDF whose only content is an embedded grayscale JPEG.
pub fn scanned_pdf(jpeg: &[u8], width: u32, height: u32) -> Vec<u8> {
    page_pdf(&[], Some(jpeg_xobject(jpeg, width, height)))
}

/// A page carrying both a text layer and a scanned JPEG.
pub fn text_and_scan_pdf(lines: &[&str], jpeg: &[u8], width: u32, height: u32) -> Vec<u8> {
    page_pdf(lines, Some(jpeg_xobject(jpeg, width, height)))
}

/// A scanned page stored as a CCITT Group 4 fax image.
pub fn ccitt_pdf(width: u32, height: u32) -> Vec<u8> {
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 1,
            "Filter" => "CCITTFaxDecode",
            "DecodeParms" => dictionary! {
                "K" => -1,
                "Columns" => width as i64,
                "Rows" => height as i64,
            },
        },
        vec![0x26, 0xa0, 0x5f, 0xff, 0x00, 0x10, 0x01, 0x00],
    );
    page_pdf(&[], Some(image))
}

fn jpeg_xobject(jpeg: &[u8], width: u32, height: u32) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    )
}

fn page_pdf(lines: &[&str], image: Option<Stream>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };
    let mut operations = Vec::new();
    if let Some(image) = image {
        let image_id = doc.add_object(image);
        resources.set("XObject", dictionary! { "Im1" => image_id });
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![595.into(), 0.into(), 0.into(), 842.into(), 0.into(), 0.into()],
        ));
        operations.push(Operation::new("Do", vec!["Im1".into()]));
        operations.push(Operation::new("Q", vec![]));
    }
    for (i, line) in lines.iter().enumerate() {
        let y = 780 - (i as i64) * 16;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 11.into()]));
        operations.push(Operation::new("Td", vec![50.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let resources_id = doc.add_object(resources);
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    finish(doc, pages_id, page_id)
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, page_id: lopdf::ObjectId) -> Vec<u8> {
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn blank_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

/// White page with a few dark bars standing in for lines of text.
pub fn inked_image(width: u32, height: u32) -> GrayImage {
    let mut img = blank_image(width, height);
    for bar in 0..3 {
        let top = height / 5 + bar * height / 5;
        for y in top..(top + height / 12).min(height) {
            for x in width / 10..width * 9 / 10 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
    }
    img
}

pub fn encode(img: &GrayImage, format: image::ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = FileOptions::<'_, ()>::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Minimal DOCX with one paragraph per line.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    docx_with_media(paragraphs, &[])
}

/// Minimal DOCX with paragraphs plus files under `word/media/`.
pub fn docx_with_media(paragraphs: &[&str], media: &[(&str, &[u8])]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    let content_types = br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    let media_names: Vec<String> = media.iter().map(|(name, _)| format!("word/media/{}", name)).collect();
    let mut entries: Vec<(&str, &[u8])> = vec![
        ("[Content_Types].xml", content_types),
        ("word/document.xml", document.as_bytes()),
    ];
    for (name, (_, data)) in media_names.iter().zip(media) {
        entries.push((name.as_str(), data));
    }
    build_zip(&entries)
}

/// PNG bytes whose header claims `width` x `height`, with a valid CRC.
pub fn png_with_claimed_size(width: u32, height: u32) -> Vec<u8> {
    let mut png = encode(&blank_image(20, 20), image::ImageFormat::Png);
    png[16..20].copy_from_slice(&width.to_be_bytes());
    png[20..24].copy_from_slice(&height.to_be_bytes());
    let crc = crc32(&png[12..29]);
    png[29..33].copy_from_slice(&crc.to_be_bytes());
    png
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

/// OCR engine that panics on every page.
pub struct PanickingOcr;

impl OcrBackend for PanickingOcr {
    fn name(&self) -> &str {
        "panicking"
    }

    fn recognize(&self, _image: &GrayImage, _params: &RecognitionParams) -> cvinsight::Result<RecognizedText> {
        panic!("engine crashed on this page");
    }
}

/// OCR engine returning fixed text and counting its calls.
pub struct MockOcr {
    pub text: String,
    pub calls: AtomicUsize,
}

impl MockOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrBackend for MockOcr {
    fn name(&self) -> &str {
        "mock"
    }

    fn recognize(&self, _image: &GrayImage, _params: &RecognitionParams) -> cvinsight::Result<RecognizedText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RecognizedText {
            text: self.text.clone(),
            confidence: Some(87.0),
        })
    }
}
