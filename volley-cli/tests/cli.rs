use std::process::{Output, Stdio};
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::Command;
use volley_test::server::{Behavior, StubServer};

const VOLLEY_EXE: &str = env!("CARGO_BIN_EXE_volley");

fn volley() -> Command {
    let mut command = Command::new(VOLLEY_EXE);
    command
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "Process exited with non-zero status: {:?}\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn text_report() {
    let server = StubServer::ok().await;

    let output = volley()
        .args(["--url", &server.url("/health"), "-n", "20", "--concurrency", "4"])
        .output()
        .await
        .unwrap();

    assert_success(&output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("20 responses, 20 HTTP 200"), "{stdout}");
    assert!(stdout.contains("requests/s"), "{stdout}");
    assert_eq!(server.hits(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn json_report() {
    let server = StubServer::new(Behavior::Rotating(vec![200, 404])).await;

    let output = volley()
        .args(["--url", &server.url("/"), "-n", "10", "--format", "json"])
        .env("VOLLEY__CONCURRENCY", "2")
        .output()
        .await
        .unwrap();

    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_done"], 10);
    assert_eq!(report["status_200"], 5);
    assert_eq!(report["errors"], 0);
    assert_eq!(report["status_map"]["404"], 5);
    assert_eq!(report["concurrency"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn config_file() {
    let server = StubServer::ok().await;

    let config = tempfile::NamedTempFile::new().unwrap();
    let yaml = format!(
        "url: {}\nrequests: 7\nconcurrency: 2\nformat: json\n",
        server.url("/from-file")
    );
    std::fs::write(config.path(), yaml).unwrap();

    let output = volley()
        .arg("-c")
        .arg(config.path())
        .output()
        .await
        .unwrap();

    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_done"], 7);
    assert_eq!(server.hits(), 7);
}

#[tokio::test]
async fn validation_failures() {
    let cases: [&[&str]; 3] = [
        &[],
        &["--url", "http://127.0.0.1:1/", "--requests", "0"],
        &["--url", "http://127.0.0.1:1/", "--concurrency", "0"],
    ];

    for args in cases {
        let output = volley().args(args).output().await.unwrap();

        assert!(!output.status.success(), "{args:?} should fail");
        assert!(output.stdout.is_empty(), "{args:?} printed a report");
    }
}

#[tokio::test]
async fn version() {
    let output = volley().arg("--version").output().await.unwrap();

    assert_success(&output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("volley "), "{stdout}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interrupt_prints_partial_report() {
    let server = StubServer::new(Behavior::Delayed(200, Duration::from_millis(20))).await;

    let child = volley()
        .args(["--url", &server.url("/"), "-n", "100000", "--format", "json"])
        .spawn()
        .unwrap();

    // Give the load test time to send some requests.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let pid = Pid::from_raw(child.id().unwrap() as i32);
    signal::kill(pid, Signal::SIGINT).expect("Failed to send SIGINT");

    let output = tokio::time::timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .expect("volley did not stop after SIGINT")
        .unwrap();

    assert_success(&output);
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let total_done = report["total_done"].as_u64().unwrap();
    assert!(total_done > 0);
    assert!(total_done < 100_000);
}
