// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote execution and file copy client

use crate::credentials::Credentials;
use crate::error::SshError;
use crate::scp::{self, CopyHeader, ACK, ACKS_PER_FILE, MAX_HEADER_LEN};
use crate::transport::{
    Channel, Connection, ExecIo, PtyRequest, Target, Transport, DEFAULT_PORT, DIAL_TIMEOUT,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// In-memory pipe capacity between the client and a remote command
const PIPE_CAPACITY: usize = 64 * 1024;

/// Pause between connection attempts in [`SshClient::wait_for_ssh`]
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Per-client behavior switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Interval between keepalive probes; zero disables them
    pub keepalive: Duration,
    /// Request a pseudo-terminal for [`SshClient::run`]
    pub pty: bool,
}

struct Session<C> {
    connection: Arc<C>,
    stop_keepalive: Option<oneshot::Sender<()>>,
}

/// Client for one remote host
///
/// All operations take `&self`; the client can be shared across tasks. Each
/// operation opens its own channel on the shared connection.
pub struct SshClient<T: Transport> {
    transport: T,
    host: String,
    port: u16,
    options: ClientOptions,
    credentials: Mutex<Credentials>,
    session: Mutex<Option<Session<T::Connection>>>,
}

impl<T: Transport> SshClient<T> {
    pub fn new(transport: T, host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            transport,
            host: host.into(),
            port: DEFAULT_PORT,
            options: ClientOptions::default(),
            credentials: Mutex::new(credentials),
            session: Mutex::new(None),
        }
    }

    /// Port 0 selects the default
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = if port == 0 { DEFAULT_PORT } else { port };
        self
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    fn lock_credentials(&self) -> MutexGuard<'_, Credentials> {
        self.credentials.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<Session<T::Connection>>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn username(&self) -> String {
        self.lock_credentials().username.clone()
    }

    pub fn password(&self) -> String {
        self.lock_credentials().password.clone()
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.lock_credentials().password = password.into();
    }

    pub fn private_key(&self) -> String {
        self.lock_credentials().private_key.clone()
    }

    pub fn set_private_key(&self, private_key: impl Into<String>) {
        self.lock_credentials().private_key = private_key.into();
    }

    /// Check the credentials without touching the network
    pub fn validate(&self) -> Result<(), SshError> {
        self.lock_credentials().validate()
    }

    pub fn is_connected(&self) -> bool {
        self.lock_session().is_some()
    }

    /// Dial the host and authenticate, replacing any previous connection.
    ///
    /// Starts the keepalive task when the options ask for one.
    pub async fn connect(&self) -> Result<(), SshError> {
        let (target, auth) = {
            let credentials = self.lock_credentials();
            let auth = credentials.auth_method()?;
            let target = Target {
                host: self.host.clone(),
                port: self.port,
                username: credentials.username.clone(),
            };
            (target, auth)
        };

        let connection = self
            .transport
            .dial(&target, &auth, DIAL_TIMEOUT)
            .await
            .map_err(|e| {
                tracing::debug!(address = %target.address(), error = %e, "dial failed");
                e
            })?;
        let connection = Arc::new(connection);

        let stop_keepalive = if self.options.keepalive.is_zero() {
            None
        } else {
            let (tx, rx) = oneshot::channel();
            spawn_keepalive(Arc::clone(&connection), self.options.keepalive, rx);
            Some(tx)
        };

        let previous = self.lock_session().replace(Session {
            connection,
            stop_keepalive,
        });
        if let Some(previous) = previous {
            close_session(previous).await;
        }

        tracing::info!(
            address = %target.address(),
            username = %target.username,
            auth = auth.kind(),
            "connected"
        );
        Ok(())
    }

    /// Stop the keepalive task and close the connection.
    ///
    /// Safe to call repeatedly or when never connected.
    pub async fn disconnect(&self) {
        let session = self.lock_session().take();
        if let Some(session) = session {
            close_session(session).await;
            tracing::debug!(host = %self.host, "disconnected");
        }
    }

    fn connection(&self) -> Result<Arc<T::Connection>, SshError> {
        self.lock_session()
            .as_ref()
            .map(|s| Arc::clone(&s.connection))
            .ok_or(SshError::NotConnected)
    }

    /// Run `command`, streaming its output into the given sinks.
    ///
    /// A non-zero exit surfaces as [`SshError::ExitStatus`].
    pub async fn run<O, E>(&self, command: &str, stdout: &mut O, stderr: &mut E) -> Result<(), SshError>
    where
        O: AsyncWrite + Unpin + Send + ?Sized,
        E: AsyncWrite + Unpin + Send + ?Sized,
    {
        let connection = self.connection()?;
        let mut channel = connection.open_channel().await?;
        if self.options.pty {
            channel.request_pty(&PtyRequest::standard()).await?;
        }

        let started = Instant::now();
        let io = ExecIo {
            stdin: None,
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        };
        let result = invoke(&mut channel, command, io).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => tracing::info!(host = %self.host, elapsed_ms, "command finished"),
            Err(e) => tracing::warn!(host = %self.host, elapsed_ms, error = %e, "command failed"),
        }
        result
    }

    /// Copy everything `src` yields to the remote path `dst` with `mode`.
    ///
    /// The content is buffered first since the copy header carries its length.
    pub async fn upload<R>(&self, src: &mut R, dst: &str, mode: u32) -> Result<(), SshError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let mut content = Vec::new();
        src.read_to_end(&mut content).await?;

        let connection = self.connection()?;
        let mut channel = connection.open_channel().await?;

        let (dir, name) = scp::split_remote_path(dst);
        let header = scp::upload_header(mode, content.len() as u64, &name);
        let (stdin_tx, stdin_rx) = tokio::io::duplex(PIPE_CAPACITY);
        let (errors, mut first_error) = mpsc::channel::<SshError>(2);

        let writer = async {
            report(&errors, write_upload(stdin_tx, &header, &content).await);
        };
        let invoker = async {
            let io = ExecIo {
                stdin: Some(Box::new(stdin_rx)),
                ..ExecIo::discard()
            };
            report(&errors, invoke(&mut channel, &scp::sink_command(&dir), io).await);
        };
        tokio::join!(writer, invoker);

        if let Ok(e) = first_error.try_recv() {
            tracing::warn!(host = %self.host, dst, error = %e, "upload failed");
            return Err(e);
        }
        tracing::info!(host = %self.host, dst, bytes = content.len(), "uploaded");
        Ok(())
    }

    /// Copy the remote file at `remote_path` into `dst`.
    ///
    /// `dst` is shut down once the transfer ends, whether or not it succeeded.
    pub async fn download<W>(&self, dst: &mut W, remote_path: &str) -> Result<CopyHeader, SshError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let result = self.download_into(dst, remote_path).await;
        if let Err(e) = dst.shutdown().await {
            tracing::warn!(error = %e, "closing download destination failed");
        }
        match &result {
            Ok(header) => {
                tracing::info!(host = %self.host, remote_path, bytes = header.length, "downloaded")
            }
            Err(e) => tracing::warn!(host = %self.host, remote_path, error = %e, "download failed"),
        }
        result
    }

    async fn download_into<W>(&self, dst: &mut W, remote_path: &str) -> Result<CopyHeader, SshError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let connection = self.connection()?;
        let mut channel = connection.open_channel().await?;

        let (ack_tx, ack_rx) = tokio::io::duplex(PIPE_CAPACITY);
        let (data_tx, data_rx) = tokio::io::duplex(PIPE_CAPACITY);
        let (errors, mut first_error) = mpsc::channel::<SshError>(3);

        let acks = async {
            report(&errors, write_acks(ack_tx).await);
        };
        let reader = async {
            match read_payload(data_rx, dst).await {
                Ok(header) => Some(header),
                Err(e) => {
                    report::<()>(&errors, Err(e));
                    None
                }
            }
        };
        let invoker = async {
            let io = ExecIo {
                stdin: Some(Box::new(ack_rx)),
                stdout: Box::new(data_tx),
                stderr: Box::new(tokio::io::sink()),
            };
            report(&errors, invoke(&mut channel, &scp::source_command(remote_path), io).await);
        };
        let ((), header, ()) = tokio::join!(acks, reader, invoker);

        if let Ok(e) = first_error.try_recv() {
            return Err(e);
        }
        header.ok_or(SshError::InvalidMessageLength)
    }

    /// Probe the host until a connection succeeds or `max_wait` has elapsed,
    /// pausing [`RETRY_INTERVAL`] (clamped to the time left) between attempts.
    ///
    /// The probing connection is closed again; call [`connect`](Self::connect)
    /// afterwards to use the host.
    pub async fn wait_for_ssh(&self, max_wait: Duration) -> Result<(), SshError> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.connect().await {
                Ok(()) => {
                    self.disconnect().await;
                    tracing::debug!(host = %self.host, attempts, "sshd answered");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(host = %self.host, attempts, error = %e, "sshd not ready")
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= max_wait {
                break;
            }
            tokio::time::sleep(RETRY_INTERVAL.min(max_wait - elapsed)).await;
            if started.elapsed() >= max_wait {
                break;
            }
        }
        tracing::warn!(host = %self.host, attempts, ?max_wait, "gave up waiting for sshd");
        Err(SshError::Timeout)
    }
}

/// Send the first error of a transfer; later ones are dropped
fn report<V>(errors: &mpsc::Sender<SshError>, result: Result<V, SshError>) {
    if let Err(e) = result {
        let _ = errors.try_send(e);
    }
}

async fn invoke<C: Channel>(channel: &mut C, command: &str, io: ExecIo<'_>) -> Result<(), SshError> {
    match channel.exec(command, io).await? {
        0 => Ok(()),
        code => Err(SshError::ExitStatus(code)),
    }
}

async fn write_upload(mut pipe: DuplexStream, header: &str, content: &[u8]) -> Result<(), SshError> {
    pipe.write_all(header.as_bytes()).await?;
    pipe.write_all(content).await?;
    pipe.write_all(&[ACK]).await?;
    pipe.shutdown().await?;
    Ok(())
}

async fn write_acks(mut pipe: DuplexStream) -> Result<(), SshError> {
    pipe.write_all(&[ACK; ACKS_PER_FILE]).await?;
    pipe.shutdown().await?;
    Ok(())
}

async fn read_payload<W>(pipe: DuplexStream, dst: &mut W) -> Result<CopyHeader, SshError>
where
    W: AsyncWrite + Unpin + Send + ?Sized,
{
    let mut reader = BufReader::new(pipe);

    let mut line = Vec::new();
    (&mut reader)
        .take(MAX_HEADER_LEN)
        .read_until(b'\n', &mut line)
        .await?;
    let header = scp::parse_header(&line).map_err(|e| {
        if matches!(line.first(), Some(1 | 2)) {
            let remote = String::from_utf8_lossy(&line[1..]);
            tracing::warn!(message = %remote.trim_end(), "remote copy refused");
        }
        e
    })?;

    let copied = tokio::io::copy(&mut (&mut reader).take(header.length), dst).await?;
    if copied < header.length {
        return Err(SshError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    dst.flush().await?;

    // drain the trailer so the remote side can finish writing
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(header)
}

fn spawn_keepalive<C: Connection>(
    connection: Arc<C>,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = connection.keepalive().await {
                        tracing::debug!(error = %e, "keepalive failed, stopping");
                        return;
                    }
                }
                _ = &mut stop => return,
            }
        }
    });
}

async fn close_session<C: Connection>(session: Session<C>) {
    if let Some(stop) = session.stop_keepalive {
        let _ = stop.send(());
    }
    if let Err(e) = session.connection.close().await {
        tracing::warn!(error = %e, "closing connection failed");
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
