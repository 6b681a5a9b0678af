//! Tests for resolve, checksum, completions.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_resolve() {
    match parse(&["tbdl", "resolve", "https://terabox.app/sharing/link?surl=abc"]) {
        CliCommand::Resolve { url, json, headful } => {
            assert_eq!(url, "https://terabox.app/sharing/link?surl=abc");
            assert!(!json);
            assert!(!headful);
        }
        _ => panic!("expected Resolve"),
    }
}

#[test]
fn cli_parse_resolve_json() {
    match parse(&["tbdl", "resolve", "https://terabox.com/s/1x", "--json"]) {
        CliCommand::Resolve { json, .. } => assert!(json),
        _ => panic!("expected Resolve with --json"),
    }
}

#[test]
fn cli_parse_checksum() {
    match parse(&["tbdl", "checksum", "videos/clip.mp4"]) {
        CliCommand::Checksum { path } => {
            assert_eq!(path, std::path::PathBuf::from("videos/clip.mp4"));
        }
        _ => panic!("expected Checksum"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["tbdl", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, clap_complete::Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["tbdl", "add", "https://terabox.com/s/1x"]).is_err());
}

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
