use assert_cmd::Command;
use predicates::str::contains;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("reset-monitor").unwrap();
    cmd.env_clear();
    cmd
}

#[test]
fn missing_api_url_exits_nonzero() {
    bin()
        .assert()
        .failure()
        .code(1)
        .stderr(contains("API_URL"));
}

#[test]
fn invalid_api_url_exits_nonzero() {
    bin()
        .env("API_URL", "not a url")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("Invalid API_URL"));
}

#[test]
fn invalid_notification_method_exits_nonzero() {
    bin()
        .env("API_URL", "http://127.0.0.1:9/status")
        .env("NOTIFICATION_METHOD", "pager")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("NOTIFICATION_METHOD"));
}

#[test]
fn email_method_requires_credentials() {
    // NOTIFICATION_METHOD defaults to email, which needs the SMTP triple
    bin()
        .env("API_URL", "http://127.0.0.1:9/status")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("SMTP_USER"));
}

#[test]
fn webhook_method_requires_url() {
    bin()
        .env("API_URL", "http://127.0.0.1:9/status")
        .env("NOTIFICATION_METHOD", "webhook")
        .assert()
        .failure()
        .code(1)
        .stderr(contains("WEBHOOK_URL"));
}

#[test]
fn version_flag_prints_version() {
    bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
