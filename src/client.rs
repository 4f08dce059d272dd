use std::{
    fmt, io,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::{
    fs::OpenOptions,
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpSocket, TcpStream},
    task,
};

use crate::{
    cli::Invocation,
    destination::{self, ConflictPolicy, OnConflict},
    error::{ClientError, Result},
    protocol::{self, Ack, Command, DATA_CHUNK_SIZE},
};

const DATA_BACKLOG: u32 = 1;

/// Runtime settings that are not part of the request itself.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub download_dir: PathBuf,
    pub on_conflict: OnConflict,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("."),
            on_conflict: OnConflict::Prompt,
        }
    }
}

/// How a run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Directory listing, one entry per line
    Listing(String),
    /// File written to `path`
    Saved { path: PathBuf, bytes: u64 },
    /// Error text relayed by the server
    ServerError(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Listing(listing) => write!(f, "{}", listing),
            Outcome::Saved { .. } => write!(f, "File transfer complete."),
            Outcome::ServerError(message) => write!(f, "{}", message),
        }
    }
}

/// What a run produced, printed by the binary.
#[derive(Debug)]
pub struct Report {
    /// Peer of the data connection, when one was accepted
    pub data_peer: Option<SocketAddr>,
    pub outcome: Outcome,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(peer) = self.data_peer {
            writeln!(f, "Obtained data connection from {}", peer)?;
        }
        write!(f, "{}", self.outcome)
    }
}

pub struct FileTransferClient {
    invocation: Invocation,
    download_dir: PathBuf,
    policy: Box<dyn ConflictPolicy + Send>,
}

impl FileTransferClient {
    pub fn new(invocation: Invocation, config: ClientConfig) -> FileTransferClient {
        log::info!("Client created for {:?}", invocation.command);
        Self {
            invocation,
            download_dir: config.download_dir,
            policy: config.on_conflict.policy(),
        }
    }

    /// Replaces the conflict policy chosen by the config.
    pub fn with_policy(mut self, policy: Box<dyn ConflictPolicy + Send>) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(self) -> Result<Report> {
        let mut control = self.connect().await?;

        match self.send_command(&mut control).await? {
            Ack::Accepted => {}
            Ack::Rejected(message) => {
                log::warn!("Server rejected the command");
                return Ok(Report {
                    data_peer: None,
                    outcome: Outcome::ServerError(message),
                });
            }
        }

        let listener = self.listen()?;
        let (mut data, peer) = listener.accept().await?;
        log::info!("Obtained data connection from {}", peer);

        let outcome = match self.invocation.command.clone() {
            Command::List => Outcome::Listing(receive_listing(&mut data).await?),
            Command::Get { filename } => {
                self.receive_file(&mut control, &mut data, &filename)
                    .await?
            }
        };

        drop(data);
        drop(listener);
        if let Err(e) = control.shutdown().await {
            log::debug!("Control shutdown: {}", e);
        }
        log::info!("Run finished");

        Ok(Report {
            data_peer: Some(peer),
            outcome,
        })
    }

    async fn connect(&self) -> Result<TcpStream> {
        let host = self.invocation.host.as_str();
        let port = self.invocation.control_port;

        match TcpStream::connect((host, port)).await {
            Ok(stream) => {
                log::info!("Control connection established with {}:{}", host, port);
                Ok(stream)
            }
            Err(source) => Err(ClientError::Connect {
                addr: format!("{}:{}", host, port),
                source,
            }),
        }
    }

    async fn send_command(&self, control: &mut TcpStream) -> Result<Ack> {
        let line = self
            .invocation
            .command
            .control_line(self.invocation.data_port);
        log::debug!("Sending command: {}", line);
        control.write_all(line.as_bytes()).await?;

        match protocol::read_control(control).await? {
            Some(reply) => Ok(Ack::decode(&reply)),
            None => Err(ClientError::ConnectionClosed("acknowledging the command")),
        }
    }

    fn listen(&self) -> Result<TcpListener> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.invocation.data_port));
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(DATA_BACKLOG)?;
        log::info!("Waiting for data connection on {}", addr);
        Ok(listener)
    }

    async fn receive_file(
        self,
        control: &mut TcpStream,
        data: &mut TcpStream,
        filename: &str,
    ) -> Result<Outcome> {
        let mut chunk = vec![0u8; DATA_CHUNK_SIZE];

        // The server reports a missing file on the control connection after
        // it has already connected the data channel. Whichever channel speaks
        // first decides; control wins ties.
        let first = tokio::select! {
            biased;
            reply = protocol::read_control(control) => match reply? {
                Some(message) => return Ok(Outcome::ServerError(message)),
                None => None,
            },
            n = data.read(&mut chunk) => Some(n?),
        };

        let first_len = match first {
            Some(0) => {
                if let Some(message) = protocol::read_control(control).await? {
                    return Ok(Outcome::ServerError(message));
                }
                0
            }
            Some(n) => n,
            None => data.read(&mut chunk).await?,
        };

        let dir = self.download_dir;
        let requested = filename.to_string();
        let mut policy = self.policy;
        let path = task::spawn_blocking(move || {
            destination::resolve(&dir, &requested, policy.as_mut())
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        log::info!("Receiving {} into {}", filename, path.display());

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg} {bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress_bar.set_message(format!("Downloading {}", filename));

        let mut bytes = 0u64;
        let mut n = first_len;
        while n > 0 {
            file.write_all(&chunk[..n]).await?;
            bytes += n as u64;
            progress_bar.set_position(bytes);
            n = data.read(&mut chunk).await?;
        }
        file.flush().await?;
        progress_bar.finish_and_clear();
        log::info!("Received {} bytes", bytes);

        Ok(Outcome::Saved { path, bytes })
    }
}

/// Drains the data connection and formats the listing.
async fn receive_listing(data: &mut TcpStream) -> Result<String> {
    let mut payload = Vec::new();
    data.read_to_end(&mut payload).await?;
    log::debug!("Listing payload of {} bytes", payload.len());
    Ok(protocol::format_listing(&payload))
}
