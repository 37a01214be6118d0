//! Model serialization and request-shaping tests.

use super::paste::*;
use crate::ids::Visibility;

fn sample_request() -> SubmitPasteRequest {
    SubmitPasteRequest {
        code: "echo hi".to_string(),
        name: " alice ".to_string(),
        syntax: "bash ".to_string(),
        private: "0".to_string(),
        ..SubmitPasteRequest::default()
    }
}

#[test]
fn normalized_trims_everything_but_code() {
    let mut request = sample_request();
    request.code = "  indented\n".to_string();
    let request = request.normalized();
    assert_eq!(request.name, "alice");
    assert_eq!(request.syntax, "bash");
    assert_eq!(request.code, "  indented\n");
}

#[test]
fn visibility_follows_private_flag() {
    let request = sample_request();
    assert_eq!(request.visibility(), Visibility::Public);

    let request = SubmitPasteRequest {
        private: "yes".to_string(),
        ..sample_request()
    };
    assert_eq!(request.visibility(), Visibility::Private);
}

#[test]
fn into_paste_keeps_fields_and_drops_blank_parent() {
    let paste = sample_request()
        .normalized()
        .into_paste("192.0.2.7".to_string());
    assert_eq!(paste.code, "echo hi");
    assert_eq!(paste.name, "alice");
    assert_eq!(paste.syntax, "bash");
    assert!(!paste.private);
    assert_eq!(paste.forked_from, None);
    assert_eq!(paste.origin_addr, "192.0.2.7");
}

#[test]
fn paste_deserializes_legacy_string_private_flag() {
    let raw = r#"{"code":"x","name":"n","syntax":"text","private":"1","origin_addr":"198.51.100.1"}"#;
    let paste: Paste = serde_json::from_str(raw).expect("legacy record");
    assert!(paste.private);
    assert_eq!(paste.forked_from, None);

    let raw = r#"{"code":"x","name":"n","syntax":"text","private":false,"forked_from":"ab"}"#;
    let paste: Paste = serde_json::from_str(raw).expect("current record");
    assert!(!paste.private);
    assert_eq!(paste.forked_from.as_deref(), Some("ab"));
}

#[test]
fn paste_view_never_exposes_origin_address() {
    let paste = sample_request().into_paste("203.0.113.9".to_string());
    let view = PasteView::new("ab", paste);
    let json = serde_json::to_string(&view).expect("json");
    assert!(!json.contains("203.0.113.9"));
    assert!(!json.contains("origin_addr"));
}

#[test]
fn fork_title_truncates_parent_name() {
    assert_eq!(fork_title("short"), "re: short");
    let long = "x".repeat(40);
    assert_eq!(fork_title(&long), format!("re: {}", "x".repeat(32)));
}

#[test]
fn fork_draft_clears_name_and_links_parent() {
    let mut parent = sample_request().normalized().into_paste(String::new());
    parent.private = true;
    let draft = ForkDraft::from_parent("ab", parent);
    assert_eq!(draft.paste_id, "ab");
    assert_eq!(draft.title, "re: alice");
    assert_eq!(draft.private, "1");
    assert!(draft.name.is_empty());
    assert_eq!(draft.code, "echo hi");
}

#[test]
fn submit_request_accepts_json_booleans_and_numbers() {
    let raw = r#"{"code":"x","name":"alice","syntax":"text","private":true,"ttl":60}"#;
    let request: SubmitPasteRequest = serde_json::from_str(raw).expect("typed json");
    assert_eq!(request.private, "1");
    assert_eq!(request.ttl, "60");
    assert_eq!(request.visibility(), Visibility::Private);

    let raw = r#"{"code":"x","name":"alice","syntax":"text","private":"0"}"#;
    let request: SubmitPasteRequest = serde_json::from_str(raw).expect("string json");
    assert_eq!(request.private, "0");
    assert!(request.ttl.is_empty());

    let request: SubmitPasteRequest =
        serde_json::from_str(r#"{"code":"x"}"#).expect("defaults");
    assert_eq!(request.private, "0");
}
