//! Integration tests for CLI commands
//!
//! Every invocation points CARAVEL_HOME at a throwaway directory so the
//! user's real registry is never touched.

use std::process::Command;

/// Helper to run caravel against an isolated home
fn caravel(home: &std::path::Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_caravel"))
        .env("CARAVEL_HOME", home)
        .args(args)
        .output()
        .expect("Failed to execute caravel")
}

mod pull_command {
    use super::*;

    #[test]
    fn test_rejects_nested_chart_path() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(
            home.path(),
            &["pull", "helm://repo.example.com/a/b", "file:///tmp/out.tgz"],
        );

        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("single path segment"));
    }

    #[test]
    fn test_rejects_wrong_source_scheme() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(
            home.path(),
            &["pull", "https://repo.example.com/nginx", "file:///tmp/out.tgz"],
        );

        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_rejects_wrong_target_scheme() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(
            home.path(),
            &["pull", "helm://repo.example.com/nginx", "s3://bucket/out.tgz"],
        );

        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_missing_arguments_is_usage_error() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(home.path(), &["pull"]);

        assert!(!output.status.success());
        // clap's own exit code for bad usage
        assert_eq!(output.status.code(), Some(2));
    }
}

mod repo_command {
    use super::*;

    #[test]
    fn test_list_with_empty_registry() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(home.path(), &["repo", "list"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("No repositories registered"));
    }

    #[test]
    fn test_add_rejects_bad_url() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(home.path(), &["repo", "add", "test", "oci://ghcr.io/org"]);

        assert!(!output.status.success());
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_update_unknown_repository_fails() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(home.path(), &["repo", "update", "nope"]);

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("not found"));
    }

    #[test]
    fn test_add_with_only_username_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        let output = caravel(
            home.path(),
            &[
                "repo",
                "add",
                "test",
                "https://charts.example.com",
                "--username",
                "user",
            ],
        );

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("username and password"));
    }
}
