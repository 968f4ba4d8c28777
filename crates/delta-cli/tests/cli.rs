// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
use std::io::Write;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use delta_app_core::prefs::NodePrefs;
use delta_node::{bind, Node};
use predicates::prelude::*;
use tempfile::{NamedTempFile, TempDir};

fn cli() -> Command {
    Command::cargo_bin("delta-cli").expect("binary built")
}

fn delta_file(lines: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile");
    f.write_all(lines.as_bytes()).expect("write deltas");
    f
}

/// Runs a node on a background runtime for the duration of a test.
struct LiveNode {
    _dir: TempDir,
    socket: PathBuf,
    stop: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl LiveNode {
    fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("deltad.sock");
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let path = socket.clone();
        let thread = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("runtime");
            rt.block_on(async move {
                let listener = bind(&path).expect("bind");
                ready_tx.send(()).expect("ready");
                let mut node = Node::from_prefs(&NodePrefs::default()).expect("node");
                node.serve(listener, async {
                    let _ = stopped.await;
                })
                .await
                .expect("serve");
            });
        });
        ready_rx.recv().expect("node ready");
        Self {
            _dir: dir,
            socket,
            stop: Some(stop),
            thread: Some(thread),
        }
    }

    fn socket(&self) -> &Path {
        &self.socket
    }

    fn run(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        cli()
            .arg("--socket")
            .arg(self.socket())
            .args(args)
            .assert()
    }
}

impl Drop for LiveNode {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[test]
fn simulate_prints_a_table() {
    let deltas = delta_file("# scenario A\n1\n2\n3\n4\n");
    cli()
        .args(["simulate", "--deltas"])
        .arg(deltas.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("merged"))
        .stdout(predicate::str::contains("0x0000000000000004"))
        .stdout(predicate::str::contains("bank[3]"));
}

#[test]
fn simulate_json_reports_zero_after_self_inverse_pair() {
    let deltas = delta_file("0xAAAAAAAAAAAAAAAA\n0xAAAAAAAAAAAAAAAA\n");
    let out = cli()
        .args(["--json", "simulate", "--initial", "0x5555555555555555", "--deltas"])
        .arg(deltas.path())
        .output()
        .expect("run");
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(report["zero"], true);
    assert_eq!(report["state"], "0x5555555555555555");
    assert_eq!(report["dispatch"], "round_robin");
}

#[test]
fn simulate_rejects_bad_delta_lines() {
    let deltas = delta_file("1\nnot-hex\n");
    cli()
        .args(["simulate", "--deltas"])
        .arg(deltas.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn unreachable_socket_fails_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    cli()
        .arg("--socket")
        .arg(dir.path().join("absent.sock"))
        .arg("read")
        .assert()
        .failure()
        .stderr(predicate::str::contains("connecting to"));
}

#[test]
fn controls_a_live_node() {
    let node = LiveNode::start();
    node.run(&["load", "0x0123456789ABCDEF"])
        .success()
        .stdout("ok\n");
    node.run(&["status"]).success().stdout("zero\n");
    node.run(&["accumulate", "1", "2", "3", "4"])
        .success()
        .stdout("ok\n");
    node.run(&["status"]).success().stdout("nonzero\n");
    node.run(&["read"])
        .success()
        .stdout("0x0123456789abcdeb\n");
    node.run(&["debug"])
        .success()
        .stdout("0x0123456789abcdef\n");
    node.run(&["--json", "read"])
        .success()
        .stdout(predicate::str::contains(r#""state":"0x0123456789abcdeb""#));
}
