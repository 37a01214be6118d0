use super::*;
use clap::Parser;
use serde_json::json;

#[test]
fn submit_defaults_and_flags_parse() {
    let cli = Cli::try_parse_from(["pwpaste", "submit"]).expect("parse");
    match cli.command {
        Commands::Submit {
            name,
            syntax,
            private,
            fork,
            ttl,
            ..
        } => {
            assert_eq!(name, "anonymous");
            assert_eq!(syntax, "text");
            assert!(!private);
            assert!(fork.is_none());
            assert!(ttl.is_none());
        }
        _ => panic!("expected submit"),
    }

    let cli = Cli::try_parse_from([
        "pwpaste", "--json", "submit", "-p", "--fork", "ab", "--ttl", "60",
    ])
    .expect("parse");
    assert!(cli.json);
    match cli.command {
        Commands::Submit {
            private, fork, ttl, ..
        } => {
            assert!(private);
            assert_eq!(fork.as_deref(), Some("ab"));
            assert_eq!(ttl, Some(60));
        }
        _ => panic!("expected submit"),
    }
}

#[test]
fn admin_requires_a_token() {
    std::env::remove_var("PW_ADMIN_TOKEN");
    assert!(Cli::try_parse_from(["pwpaste", "admin", "del", "ab"]).is_err());

    let cli = Cli::try_parse_from(["pwpaste", "admin", "wl", "--token", "k"]).expect("parse");
    match cli.command {
        Commands::Admin {
            command,
            target,
            token,
        } => {
            assert_eq!(command, "wl");
            assert!(target.is_none());
            assert_eq!(token, "k");
        }
        _ => panic!("expected admin"),
    }
}

#[test]
fn api_url_appends_segments_and_escapes() {
    let url = api_url("http://127.0.0.1:38411", &["api", "paste", "a/b"]).expect("url");
    assert_eq!(url.as_str(), "http://127.0.0.1:38411/api/paste/a%2Fb");

    let url = api_url("http://host/base/", &["r", "ab"]).expect("url");
    assert_eq!(url.as_str(), "http://host/base/r/ab");

    assert!(api_url("not a url", &["admin"]).is_err());
    assert!(api_url("mailto:someone@example.com", &["admin"]).is_err());
}

#[test]
fn resolve_server_keeps_host_and_drops_trailing_slashes() {
    assert_eq!(
        resolve_server(Some("http://localhost:38411//".to_string())),
        "http://localhost:38411"
    );
    assert_eq!(
        resolve_server(Some("https://paste.example/base/".to_string())),
        "https://paste.example/base"
    );
}

#[test]
fn resolve_server_falls_back_to_default() {
    assert_eq!(resolve_server(None), DEFAULT_CLI_SERVER_URL);
    assert_eq!(resolve_server(Some("   ".to_string())), DEFAULT_CLI_SERVER_URL);
    assert_eq!(
        resolve_server(Some(" http://paste.example ".to_string())),
        "http://paste.example"
    );
}

#[test]
fn error_message_prefers_error_then_message() {
    let status = reqwest::StatusCode::BAD_REQUEST;
    assert_eq!(
        error_message_for_response(status, r#"{"error":"Name too long."}"#),
        "Name too long."
    );
    assert_eq!(
        error_message_for_response(status, r#"{"message":"Invalid auth.","status":"error"}"#),
        "Invalid auth."
    );
    assert_eq!(error_message_for_response(status, "plain"), "plain");
    assert_eq!(error_message_for_response(status, "  "), "Bad Request");
}

#[test]
fn submit_body_encodes_optional_fields_as_strings() {
    let body = submit_body("x".to_string(), "me", "rust", true, Some("ab"), Some(90));
    assert_eq!(body["private"], "1");
    assert_eq!(body["forked_from"], "ab");
    assert_eq!(body["ttl"], "90");

    let body = submit_body("x".to_string(), "me", "rust", false, None, None);
    assert_eq!(body["private"], "0");
    assert!(body.get("forked_from").is_none());
    assert!(body.get("ttl").is_none());
}

#[test]
fn output_formatting() {
    let created = json!({ "id": "ab", "url": "http://paste.test/ab" });
    assert_eq!(
        format_created_output(&created, false).expect("url"),
        "http://paste.test/ab"
    );
    assert!(format_created_output(&json!({}), false).is_err());
    assert!(format_created_output(&created, true)
        .expect("json")
        .contains("\"id\": \"ab\""));

    let paste = json!({ "code": "fn main() {}" });
    assert_eq!(format_get_output(&paste, false).expect("code"), "fn main() {}");
    assert!(format_get_output(&json!({ "name": "x" }), false).is_err());
}

#[test]
fn admin_outcome_reads_status() {
    assert_eq!(
        admin_outcome(&json!({ "message": "Paste deleted.", "status": "success" })),
        Ok("Paste deleted.".to_string())
    );
    assert_eq!(
        admin_outcome(&json!({ "message": "Invalid auth.", "status": "error" })),
        Err("Invalid auth.".to_string())
    );
    assert_eq!(admin_outcome(&json!({})), Err("no message".to_string()));
}
