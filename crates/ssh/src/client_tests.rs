// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::transport::{FakeCommand, FakeTransport, TransportCall};
use tokio::io::AsyncReadExt;

fn client(transport: &FakeTransport) -> SshClient<FakeTransport> {
    SshClient::new(
        transport.clone(),
        "build-vm",
        Credentials::with_password("forge", "secret"),
    )
}

async fn connected(transport: &FakeTransport) -> SshClient<FakeTransport> {
    let client = client(transport);
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn connect_rejects_invalid_credentials_without_dialing() {
    let transport = FakeTransport::new();
    let client = SshClient::new(transport.clone(), "build-vm", Credentials::default());

    assert!(matches!(
        client.connect().await,
        Err(SshError::InvalidUsername)
    ));
    assert_eq!(transport.dial_count(), 0);
}

#[tokio::test]
async fn connect_dials_default_port_with_preferred_auth() {
    let transport = FakeTransport::new();
    let client = client(&transport).with_port(0);
    client.set_private_key("-----BEGIN KEY-----");
    client.connect().await.unwrap();

    assert!(client.is_connected());
    assert_eq!(
        transport.calls()[0],
        TransportCall::Dial {
            target: Target {
                host: "build-vm".into(),
                port: 22,
                username: "forge".into(),
            },
            auth: "key",
        }
    );
}

#[test]
fn credential_accessors_round_trip() {
    let transport = FakeTransport::new();
    let client = client(&transport);
    client.set_password("rotated");
    client.set_private_key("KEY");

    assert_eq!(client.username(), "forge");
    assert_eq!(client.password(), "rotated");
    assert_eq!(client.private_key(), "KEY");
    assert!(client.validate().is_ok());
}

#[tokio::test]
async fn operations_require_a_connection() {
    let transport = FakeTransport::new();
    let client = client(&transport);
    let mut out = Vec::new();
    let mut err = Vec::new();

    assert!(matches!(
        client.run("true", &mut out, &mut err).await,
        Err(SshError::NotConnected)
    ));
    assert!(matches!(
        client.upload(&mut &b"x"[..], "/tmp/x", 0o644).await,
        Err(SshError::NotConnected)
    ));
}

#[tokio::test]
async fn run_streams_both_outputs() {
    let transport = FakeTransport::new();
    transport.on_command(
        "uname -a",
        FakeCommand::prints("Linux build-vm\n").with_stderr("warning\n"),
    );
    let client = connected(&transport).await;

    let mut out = Vec::new();
    let mut err = Vec::new();
    client.run("uname -a", &mut out, &mut err).await.unwrap();

    assert_eq!(out, b"Linux build-vm\n");
    assert_eq!(err, b"warning\n");
}

#[tokio::test]
async fn run_reports_non_zero_exit_after_streaming() {
    let transport = FakeTransport::new();
    transport.on_command(
        "make",
        FakeCommand::exits(3).with_stderr("make: *** [all] Error 3\n"),
    );
    let client = connected(&transport).await;

    let mut out = Vec::new();
    let mut err = Vec::new();
    let result = client.run("make", &mut out, &mut err).await;

    assert_eq!(result.unwrap_err().exit_status(), Some(3));
    assert_eq!(err, b"make: *** [all] Error 3\n");
}

#[tokio::test]
async fn run_requests_pty_when_enabled() {
    let transport = FakeTransport::new();
    transport.on_command("tty", FakeCommand::prints("/dev/pts/0\n"));
    let client = client(&transport).with_options(ClientOptions {
        pty: true,
        ..ClientOptions::default()
    });
    client.connect().await.unwrap();

    let mut out = Vec::new();
    client.run("tty", &mut out, &mut tokio::io::sink()).await.unwrap();

    assert!(transport.calls().contains(&TransportCall::Exec {
        command: "tty".into(),
        pty: true,
    }));
}

#[tokio::test]
async fn upload_creates_file_with_mode() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;

    let script = b"#!/bin/sh\necho provisioned\n";
    client
        .upload(&mut &script[..], "/tmp/forge/run.sh", 0o755)
        .await
        .unwrap();

    let file = transport.file("/tmp/forge/run.sh").unwrap();
    assert_eq!(file.mode, 0o755);
    assert_eq!(file.content, script);
    assert!(transport.calls().contains(&TransportCall::Exec {
        command: "/usr/bin/scp -t /tmp/forge".into(),
        pty: false,
    }));
}

#[tokio::test]
async fn upload_of_empty_source_creates_empty_file() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;

    client
        .upload(&mut tokio::io::empty(), "/tmp/empty", 0o600)
        .await
        .unwrap();

    assert_eq!(transport.file("/tmp/empty").unwrap().content, b"");
}

#[tokio::test]
async fn download_streams_content_and_returns_header() {
    let transport = FakeTransport::new();
    transport.put_file("/var/log/build.log", 0o640, "all good\n");
    let client = connected(&transport).await;

    let mut dst = Vec::new();
    let header = client
        .download(&mut dst, "/var/log/build.log")
        .await
        .unwrap();

    assert_eq!(dst, b"all good\n");
    assert_eq!(
        header,
        CopyHeader {
            mode: 0o640,
            length: 9,
            name: "build.log".into(),
        }
    );
}

#[tokio::test]
async fn upload_then_download_round_trips_content_and_mode() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;
    let content = b"hello\x00world\nbytes";

    client
        .upload(&mut &content[..], "/tmp/notes.bin", 0o644)
        .await
        .unwrap();
    let mut dst = Vec::new();
    let header = client.download(&mut dst, "/tmp/notes.bin").await.unwrap();

    assert_eq!(dst, content);
    assert_eq!(header.mode, 0o644);
    assert_eq!(header.length, content.len() as u64);
    assert_eq!(header.name, "notes.bin");
}

#[tokio::test]
async fn download_rejects_malformed_headers() {
    for raw in [
        &b"C644 10\n"[..],
        b"X0644 10 f\n",
        b"C0644 abc f\n",
        b"D0755 0 dir\n",
        b"C0644 twelve notes\n",
        b"C0644 12\n",
    ] {
        let transport = FakeTransport::new();
        transport.serve_raw("/tmp/notes", raw);
        let client = connected(&transport).await;

        let mut dst = Vec::new();
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            client.download(&mut dst, "/tmp/notes"),
        )
        .await
        .unwrap_or_else(|_| panic!("header {:?} hung", String::from_utf8_lossy(raw)));

        assert!(
            matches!(result, Err(SshError::InvalidMessageLength)),
            "header {:?} gave {:?}",
            String::from_utf8_lossy(raw),
            result
        );
        assert!(dst.is_empty());
    }
}

#[tokio::test]
async fn download_of_missing_file_fails_and_closes_destination() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;

    let (mut dst, mut peer) = tokio::io::duplex(1024);
    let result = client.download(&mut dst, "/does/not/exist").await;
    assert!(result.is_err());

    // shutdown of dst shows up as EOF on the other end
    let mut received = Vec::new();
    peer.read_to_end(&mut received).await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let transport = FakeTransport::new();
    let client = client(&transport);
    client.disconnect().await;

    client.connect().await.unwrap();
    client.disconnect().await;
    client.disconnect().await;

    assert!(!client.is_connected());
    let closes = transport
        .calls()
        .iter()
        .filter(|c| matches!(c, TransportCall::Close))
        .count();
    assert_eq!(closes, 1);
}

#[tokio::test]
async fn reconnect_closes_previous_connection() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;
    client.connect().await.unwrap();

    assert_eq!(transport.dial_count(), 2);
    assert!(transport.calls().contains(&TransportCall::Close));
    assert!(client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn keepalive_ticks_until_disconnect() {
    let transport = FakeTransport::new();
    let client = client(&transport).with_options(ClientOptions {
        keepalive: Duration::from_secs(1),
        ..ClientOptions::default()
    });
    client.connect().await.unwrap();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(transport.keepalive_count(), 3);

    client.disconnect().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.keepalive_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn keepalive_stops_after_first_failure() {
    let transport = FakeTransport::new();
    transport.fail_keepalives();
    let client = client(&transport).with_options(ClientOptions {
        keepalive: Duration::from_secs(1),
        ..ClientOptions::default()
    });
    client.connect().await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.keepalive_count(), 1);
}

#[tokio::test]
async fn keepalive_disabled_by_zero_interval() {
    let transport = FakeTransport::new();
    let client = connected(&transport).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.keepalive_count(), 0);
    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn wait_for_ssh_gives_up_after_max_wait() {
    let transport = FakeTransport::new();
    transport.refuse_all_dials();
    let client = client(&transport);

    let started = Instant::now();
    let result = client.wait_for_ssh(Duration::from_secs(5)).await;

    assert!(matches!(result, Err(SshError::Timeout)));
    assert_eq!(transport.dial_count(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn wait_for_ssh_closes_probe_once_sshd_answers() {
    let transport = FakeTransport::new();
    transport.refuse_dials(2);
    let client = client(&transport);

    client.wait_for_ssh(Duration::from_secs(60)).await.unwrap();

    assert_eq!(transport.dial_count(), 3);
    assert!(!client.is_connected());
    assert!(transport.calls().contains(&TransportCall::Close));
}

#[tokio::test(start_paused = true)]
async fn wait_for_ssh_with_zero_budget_tries_once() {
    let transport = FakeTransport::new();
    transport.refuse_all_dials();
    let client = client(&transport);

    assert!(client.wait_for_ssh(Duration::ZERO).await.is_err());
    assert_eq!(transport.dial_count(), 1);
}
