use std::process::Command;

fn check_feed() -> Command {
    Command::new(env!("CARGO_BIN_EXE_check_feed"))
}

#[test]
fn test_missing_url_exits_with_failure() {
    let status = check_feed().status().unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_help_exits_successfully() {
    let output = check_feed().arg("--help").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
}

#[test]
fn test_invalid_url_exits_with_failure() {
    let status = check_feed().arg("ftp://example.com/feed").status().unwrap();
    assert_eq!(status.code(), Some(1));
}
