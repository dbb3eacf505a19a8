//! Tests for serve and get subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_serve_defaults() {
    match parse(&["mdl", "serve"]) {
        CliCommand::Serve {
            host,
            port,
            downloads_dir,
            config,
        } => {
            assert!(host.is_none());
            assert!(port.is_none());
            assert!(downloads_dir.is_none());
            assert!(config.is_none());
        }
        _ => panic!("expected Serve"),
    }
}

#[test]
fn cli_parse_serve_overrides() {
    match parse(&[
        "mdl",
        "serve",
        "--host",
        "0.0.0.0",
        "--port",
        "8080",
        "--downloads-dir",
        "/srv/media",
        "--config",
        "/etc/mdl.toml",
    ]) {
        CliCommand::Serve {
            host,
            port,
            downloads_dir,
            config,
        } => {
            assert_eq!(host.as_deref(), Some("0.0.0.0"));
            assert_eq!(port, Some(8080));
            assert_eq!(downloads_dir.as_deref(), Some(Path::new("/srv/media")));
            assert_eq!(config.as_deref(), Some(Path::new("/etc/mdl.toml")));
        }
        _ => panic!("expected Serve with overrides"),
    }
}

#[test]
fn cli_parse_serve_rejects_bad_port() {
    assert!(Cli::try_parse_from(["mdl", "serve", "--port", "70000"]).is_err());
}

#[test]
fn cli_parse_get_single() {
    match parse(&["mdl", "get", "https://example.com/watch?v=1"]) {
        CliCommand::Get {
            urls,
            audio_only,
            format,
            quality,
            downloads_dir,
        } => {
            assert_eq!(urls, vec!["https://example.com/watch?v=1"]);
            assert!(!audio_only);
            assert!(format.is_none());
            assert!(quality.is_none());
            assert!(downloads_dir.is_none());
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_many_with_options() {
    match parse(&[
        "mdl",
        "get",
        "https://a.example/1",
        "https://b.example/2",
        "--audio-only",
        "--format",
        "m4a",
        "--quality",
        "720p",
    ]) {
        CliCommand::Get {
            urls,
            audio_only,
            format,
            quality,
            ..
        } => {
            assert_eq!(urls.len(), 2);
            assert!(audio_only);
            assert_eq!(format.as_deref(), Some("m4a"));
            assert_eq!(quality.as_deref(), Some("720p"));
        }
        _ => panic!("expected Get with options"),
    }
}

#[test]
fn cli_parse_get_requires_url() {
    assert!(Cli::try_parse_from(["mdl", "get"]).is_err());
}
