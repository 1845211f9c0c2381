// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use forge_ssh::{Credentials, FakeCommand, FakeTransport, TransportCall};

const REMOTE: &str = "/tmp/forge-run-1.sh";

async fn connected(transport: &FakeTransport) -> SshClient<FakeTransport> {
    let client = SshClient::new(
        transport.clone(),
        "10.0.0.5",
        Credentials::with_password("builder", "hunter2"),
    );
    client.connect().await.unwrap();
    client
}

fn prepared(script: &str) -> Prepared {
    Prepared {
        script: script.into(),
        remote_path: REMOTE.into(),
    }
}

fn exec_commands(transport: &FakeTransport) -> Vec<String> {
    transport
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            TransportCall::Exec { command, .. } => Some(command),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn uploads_runs_and_removes_script() {
    let transport = FakeTransport::new();
    transport.on_command("/bin/sh /tmp/forge-run-1.sh", FakeCommand::prints("installed\n"));
    transport.on_command("rm -f /tmp/forge-run-1.sh", FakeCommand::default());
    let client = connected(&transport).await;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let code = handle(&client, prepared("apt-get install -y nginx\n"), &mut stdout, &mut stderr)
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(stdout, b"installed\n");
    let uploaded = transport.file(REMOTE).unwrap();
    assert_eq!(uploaded.content, b"apt-get install -y nginx\n");
    assert_eq!(uploaded.mode, 0o755);

    let commands = exec_commands(&transport);
    assert_eq!(commands.len(), 3);
    assert!(commands[0].contains("scp -t"), "got {:?}", commands);
    assert_eq!(commands[1], "/bin/sh /tmp/forge-run-1.sh");
    assert_eq!(commands[2], "rm -f /tmp/forge-run-1.sh");
}

#[tokio::test]
async fn script_exit_code_is_returned_and_script_still_removed() {
    let transport = FakeTransport::new();
    transport.on_command(
        "/bin/sh /tmp/forge-run-1.sh",
        FakeCommand::exits(7).with_stderr("E: Unable to locate package\n"),
    );
    transport.on_command("rm -f /tmp/forge-run-1.sh", FakeCommand::default());
    let client = connected(&transport).await;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let code = handle(&client, prepared("apt-get install nope"), &mut stdout, &mut stderr)
        .await
        .unwrap();

    assert_eq!(code, 7);
    assert_eq!(stderr, b"E: Unable to locate package\n");
    assert_eq!(exec_commands(&transport).last().unwrap(), "rm -f /tmp/forge-run-1.sh");
}

#[tokio::test]
async fn failed_cleanup_does_not_change_exit_code() {
    let transport = FakeTransport::new();
    transport.on_command("/bin/sh /tmp/forge-run-1.sh", FakeCommand::default());
    // no rm scripted: the fake answers 127
    let client = connected(&transport).await;

    let code = handle(
        &client,
        prepared("true"),
        &mut tokio::io::sink(),
        &mut tokio::io::sink(),
    )
    .await
    .unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn disconnected_client_is_an_error() {
    let transport = FakeTransport::new();
    let client = SshClient::new(
        transport,
        "10.0.0.5",
        Credentials::with_password("builder", "hunter2"),
    );
    let err = handle(
        &client,
        prepared("true"),
        &mut tokio::io::sink(),
        &mut tokio::io::sink(),
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("uploading script"));
}

#[tokio::test]
async fn prepare_prefers_inline_script_and_names_by_id() {
    let prepared = RunArgs {
        script: Some("echo hi".into()),
        script_file: None,
        id: Some("1a2b3c4d-5e6f".into()),
    }
    .prepare()
    .await
    .unwrap();
    assert_eq!(prepared.script, "echo hi");
    assert_eq!(prepared.remote_path, "/tmp/forge-1a2b3c4d-5e6f.sh");
}

#[tokio::test]
async fn prepare_reads_script_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("setup.sh");
    std::fs::write(&path, "#!/bin/sh\nuname -a\n").unwrap();

    let prepared = RunArgs {
        script: None,
        script_file: Some(path),
        id: None,
    }
    .prepare()
    .await
    .unwrap();
    assert_eq!(prepared.script, "#!/bin/sh\nuname -a\n");
    assert!(prepared.remote_path.starts_with("/tmp/forge-"));
    assert!(prepared.remote_path.ends_with(".sh"));
}

#[tokio::test]
async fn prepare_without_script_fails() {
    let err = RunArgs {
        script: None,
        script_file: None,
        id: None,
    }
    .prepare()
    .await
    .unwrap_err();
    assert!(err.to_string().contains("no script given"));

    let err = RunArgs {
        script: Some("  \n".into()),
        script_file: None,
        id: None,
    }
    .prepare()
    .await
    .unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[test]
fn remote_path_drops_shell_metacharacters() {
    assert_eq!(
        remote_script_path("run-1; rm -rf /"),
        "/tmp/forge-run-1rm-rf.sh"
    );
}
