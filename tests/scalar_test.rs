//! Status, StringData and std::string printers against hand-built images

mod common;

use common::{Fixture, Image};
use mongo_printers::printers::{status, string_data, DisplayHint, Rendered};
use mongo_printers::InspectError;

fn render(image: &Image, address: u64, type_name: &str) -> Result<Rendered, InspectError> {
    Fixture::new().renderer(image, None).render_at(address, type_name)
}

fn render_text(image: &Image, address: u64, type_name: &str) -> String {
    render(image, address, type_name).unwrap().to_string()
}

#[test]
fn test_status_ok_when_error_is_null() {
    let mut image = Image::new();
    let status = image.status(0);

    let rendered = render(&image, status, "mongo::Status").unwrap();
    assert_eq!(rendered.summary, status::OK_TEXT);
    assert!(rendered.children.is_empty());
}

#[test]
fn test_status_error_without_location() {
    let mut image = Image::new();
    let info = image.error_info(2, "bad thing", 0);
    let status = image.status(info);

    assert_eq!(
        render_text(&image, status, "mongo::Status"),
        r#"Status(BadValue, "bad thing")"#
    );
}

#[test]
fn test_status_error_with_location() {
    let mut image = Image::new();
    let info = image.error_info(11000, "dup key", 16550);
    let status = image.status(info);

    assert_eq!(
        render_text(&image, status, "mongo::Status"),
        r#"Status(DuplicateKey, "dup key", 16550)"#
    );
}

#[test]
fn test_status_unknown_code_is_numeric() {
    let mut image = Image::new();
    let info = image.error_info(424242, "odd", 0);
    let status = image.status(info);

    assert_eq!(
        render_text(&image, status, "mongo::Status"),
        r#"Status(424242, "odd")"#
    );
}

#[test]
fn test_status_dangling_error_pointer_fails() {
    let mut image = Image::new();
    let status = image.status(0xdead_0000);

    assert!(matches!(
        render(&image, status, "mongo::Status"),
        Err(InspectError::Memory(_))
    ));
}

#[test]
fn test_disabled_status_falls_back_to_plain() {
    let mut image = Image::new();
    let status = image.status(0);

    let mut fixture = Fixture::new();
    assert!(fixture.printers.set_enabled("Status", false));
    let rendered = fixture
        .renderer(&image, None)
        .render_at(status, "mongo::Status")
        .unwrap();
    assert_eq!(rendered.summary, "{_error = 0x0}");
}

#[test]
fn test_string_data_explicit_size_keeps_embedded_nul() {
    let mut image = Image::new();
    let view = image.string_data(b"ab\0cd\0tail", 5);

    let rendered = render(&image, view, "mongo::StringData").unwrap();
    assert_eq!(rendered.summary, "ab\0cd");
    assert_eq!(rendered.hint, Some(DisplayHint::String));
    assert!(!rendered.capped);
    assert_eq!(rendered.to_string(), r#""ab\0cd""#);
}

#[test]
fn test_string_data_sentinel_stops_at_terminator() {
    let mut image = Image::new();
    let view = image.string_data(b"hello\0world\0", string_data::UNKNOWN_SIZE);

    assert_eq!(render_text(&image, view, "mongo::StringData"), r#""hello""#);
}

#[test]
fn test_string_data_unreadable_data_fails() {
    let mut image = Image::new();
    let mut view = Vec::new();
    view.extend_from_slice(&0x10u64.to_le_bytes());
    view.extend_from_slice(&4i64.to_le_bytes());
    let view = image.alloc(&view);

    assert!(matches!(
        render(&image, view, "mongo::StringData"),
        Err(InspectError::Memory(_))
    ));
}

#[test]
fn test_string_data_longer_than_limit_is_marked() {
    let mut image = Image::new();
    let text = vec![b'x'; 70000];
    let view = image.string_data(&text, 70000);

    let rendered = render(&image, view, "mongo::StringData").unwrap();
    assert_eq!(rendered.summary.len(), 65536);
    assert!(rendered.capped);
    assert!(rendered.to_string().ends_with("x\"..."));

    // Raising the limit shows the whole view
    let mut fixture = Fixture::new();
    fixture.options.max_string_len = 70000;
    let rendered = fixture
        .renderer(&image, None)
        .render_at(view, "mongo::StringData")
        .unwrap();
    assert_eq!(rendered.summary.len(), 70000);
    assert!(!rendered.capped);
}

#[test]
fn test_std_string() {
    let mut image = Image::new();
    let bytes = image.std_string("quote \" me");
    let string = image.alloc(&bytes);

    assert_eq!(render_text(&image, string, "std::string"), r#""quote \" me""#);
}

#[test]
fn test_std_string_longer_than_limit_is_marked() {
    let mut image = Image::new();
    let bytes = image.std_string("abcdefgh");
    let string = image.alloc(&bytes);

    let mut fixture = Fixture::new();
    fixture.options.max_string_len = 4;
    let rendered = fixture
        .renderer(&image, None)
        .render_at(string, "std::string")
        .unwrap();
    assert_eq!(rendered.to_string(), r#""abcd"..."#);
}

#[test]
fn test_capped_reason_inside_status() {
    let mut image = Image::new();
    let info = image.error_info(2, "a long reason", 0);
    let status = image.status(info);

    let mut fixture = Fixture::new();
    fixture.options.max_string_len = 6;
    let rendered = fixture
        .renderer(&image, None)
        .render_at(status, "mongo::Status")
        .unwrap();
    assert_eq!(rendered.summary, r#"Status(BadValue, "a long"...)"#);
    assert!(!rendered.capped);
}

#[test]
fn test_plain_struct_uses_printers_for_members() {
    let mut image = Image::new();
    let info = image.error_info(2, "why", 7);

    assert_eq!(
        render_text(&image, info, "mongo::Status::ErrorInfo"),
        r#"{refs = 1, code = mongo::ErrorCodes::BadValue, reason = "why", location = 7}"#
    );
}

#[test]
fn test_plain_char_pointer_shows_string() {
    let mut image = Image::new();
    let text = image.alloc(b"abc\0");
    let ptr = image.alloc(&text.to_le_bytes());

    assert_eq!(
        render_text(&image, ptr, "const char*"),
        format!("{:#x} \"abc\"", text)
    );
}
