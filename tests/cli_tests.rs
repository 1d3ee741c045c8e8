mod common;

use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;

/// `tg` with the TG_* environment cleared
fn tg() -> Command {
    let mut cmd = Command::new(common::tg_binary());
    for var in [
        "TG_SERVER_URL",
        "TG_USER_ID",
        "TG_USER_ROLE",
        "TG_TIMEOUT_SECS",
        "TG_BIND",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A `tg serve` child process, killed on drop
struct Server {
    child: Child,
    url: String,
    _logs: tempfile::TempDir,
}

impl Server {
    fn start() -> Self {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let bind = format!("127.0.0.1:{}", port);
        let log_dir = tempfile::tempdir().unwrap();

        let child = StdCommand::new(common::tg_binary())
            .args(["serve", "--bind", bind.as_str(), "--seed-admin", "root"])
            .arg("--log-file")
            .arg(log_dir.path().join("server.log"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while TcpStream::connect(&bind).is_err() {
            assert!(Instant::now() < deadline, "server did not start on {}", bind);
            std::thread::sleep(Duration::from_millis(50));
        }

        Self {
            child,
            url: format!("http://{}", bind),
            _logs: log_dir,
        }
    }

    /// `tg` acting as the seeded admin (user 1)
    fn admin(&self) -> Command {
        let mut cmd = tg();
        cmd.args(["--server", self.url.as_str(), "--user-id", "1", "--role", "admin", "--yes"]);
        cmd
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_help_lists_commands() {
    tg().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("claim"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_missing_user_id_reports_json_error() {
    tg().arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"code\": \"INVALID_INPUT\""))
        .stderr(predicate::str::contains("TG_USER_ID"));
}

#[test]
fn test_invalid_status_is_a_usage_error() {
    tg().args(["--user-id", "1", "status", "3", "done"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid status"));
}

#[test]
fn test_unreachable_server_is_transport_error() {
    tg().args([
        "--server",
        "http://127.0.0.1:9",
        "--user-id",
        "1",
        "--timeout",
        "2",
        "list",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("TRANSPORT_ERROR"));
}

#[test]
fn test_end_to_end_against_served_collaborator() {
    let server = Server::start();

    server
        .admin()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found"));

    server
        .admin()
        .args(["create", "--title", "Boss fight"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Task created"))
        .stdout(predicate::str::contains("Task #1"));

    server
        .admin()
        .args(["create", "--title", "Boss music", "--parent", "1"])
        .assert()
        .success();

    server
        .admin()
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"Boss music\""));

    // Unfinished child: --yes confirms the warning
    server
        .admin()
        .args(["status", "1", "started"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Boss music"))
        .stdout(predicate::str::contains("Status updated"));

    server
        .admin()
        .args(["parent", "add", "2", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task cannot be its own parent"));

    server
        .admin()
        .args(["graph", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 1:"))
        .stdout(predicate::str::contains("#1: Boss fight"));

    server
        .admin()
        .args(["delete", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot delete task with children"));

    server
        .admin()
        .args(["users", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("root"));
}
