use std::process::Command;

use pplog::Config;

const CHILD_ENV: &str = "PPLOG_MUST_NEW_LOGGER_CHILD";

#[test]
fn test_must_new_logger_exits_without_sinks() {
    if std::env::var_os(CHILD_ENV).is_some() {
        // Both sinks are off, so this never returns.
        let _handles = pplog::must_new_logger(Config::new());
        return;
    }

    let output = Command::new(std::env::current_exe().expect("test binary"))
        .args(["--exact", "test_must_new_logger_exits_without_sinks", "--nocapture"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("run child");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("pplog: "), "stderr: {}", stderr);
}
