//! Integration tests for `LocalChannel` against a real directory tree.

use std::time::Duration;

use depprobe_channel::LocalChannel;
use depprobe_core::channel::CommandChannel;

#[tokio::test]
async fn local_channel_runs_find_listing_in_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("lib/pkg")).expect("mkdir");
    std::fs::write(dir.path().join("lib/pkg/__init__.py"), "x = 1\n").expect("write");
    std::fs::write(dir.path().join("lib/pkg/core.py"), "y = 2\n").expect("write");

    let channel = LocalChannel::new();
    let root = dir.path().to_str().expect("utf-8 path");
    let out = channel
        .execute("find . -type f | sort", Some(root))
        .await;

    assert!(out.is_success(), "stderr: {}", out.stderr);
    let lines: Vec<_> = out.stdout.lines().collect();
    assert_eq!(lines, vec!["./lib/pkg/__init__.py", "./lib/pkg/core.py"]);
}

#[tokio::test]
async fn local_channel_keeps_stdout_and_stderr_apart() {
    let channel = LocalChannel::new();
    let out = channel
        .execute("echo out; echo err >&2; exit 0", None)
        .await;
    assert_eq!(out.stdout.trim(), "out");
    assert_eq!(out.stderr.trim(), "err");
    assert!(out.is_success());
}

#[tokio::test]
async fn local_channel_missing_tool_is_not_an_error() {
    let channel = LocalChannel::new();
    let out = channel
        .execute("depprobe-definitely-missing-tool --version", None)
        .await;
    assert_eq!(out.exit_code, 127);
}

#[tokio::test]
async fn local_channel_timeout_is_configurable() {
    let channel = LocalChannel::with_timeout(Duration::from_secs(1));
    assert_eq!(channel.timeout(), Duration::from_secs(1));
    let out = channel.execute("sleep 3", None).await;
    assert_eq!(out.stderr, "Command timed out after 1 seconds");
}
