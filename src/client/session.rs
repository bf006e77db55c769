use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{copy, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

use super::{connection::Connection, stream::ControlStream};
use crate::{
    error::{Error, FtpResult},
    protocol::{
        parse_listing, parse_passive_endpoint, Command, DirectoryEntry, Reply, ReplyKind,
        TransferType, DEFAULT_PORT,
    },
};

/// Connection parameters for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Wrap the control channel in TLS from the first byte
    #[serde(default)]
    pub secure: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl FtpConfig {
    /// Plain-text session on the default port
    pub fn new<H, U, P>(host: H, username: U, password: P) -> Self
    where
        H: Into<String>,
        U: Into<String>,
        P: Into<String>,
    {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            secure: false,
        }
    }
}

/// High-level FTP client covering the everyday file-drop commands:
/// authenticate, list, upload, download, delete.
///
/// Every operation takes `&mut self`, so commands and replies stay
/// paired on the control channel and cannot interleave.
pub struct FtpClient {
    config: FtpConfig,
    control: Option<Connection<ControlStream>>,
    greeting: Option<Reply>,
}

impl FtpClient {
    pub fn new(config: FtpConfig) -> Self {
        Self {
            config,
            control: None,
            greeting: None,
        }
    }

    /// Whether a control connection is currently held
    pub fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    /// Welcome banner of the current connection
    pub fn greeting(&self) -> Option<&Reply> {
        self.greeting.as_ref()
    }

    /// Dials the server and consumes the welcome banner. The banner
    /// must be a positive completion (usually 220) and stays available
    /// through [`Self::greeting`].
    pub async fn connect(&mut self) -> FtpResult<()> {
        if self.control.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let stream =
            ControlStream::dial(&self.config.host, self.config.port, self.config.secure).await?;
        let mut control = Connection::new(stream);

        let greeting = control.read_reply().await?;
        if greeting.kind() != ReplyKind::PositiveCompletion {
            return Err(Error::Reply(greeting));
        }

        debug!("connected to {}:{}", self.config.host, self.config.port);
        self.greeting = Some(greeting);
        self.control = Some(control);

        Ok(())
    }

    /// Authenticates with the configured credentials. Servers that do
    /// not ask for a password complete on USER alone.
    pub async fn login(&mut self) -> FtpResult<()> {
        let username = self.config.username.clone();
        let password = self.config.password.clone();

        let control = self.control()?;
        let reply = control.execute(&Command::User(username)).await?;

        match reply.kind() {
            ReplyKind::PositiveCompletion => {}
            ReplyKind::PositiveIntermediate => {
                completed(control.execute(&Command::Pass(password)).await?)?;
            }
            _ => return Err(Error::Reply(reply)),
        }

        debug!("logged in as {}", self.config.username);
        Ok(())
    }

    /// Connects and authenticates in one step.
    pub async fn connect_and_login(&mut self) -> FtpResult<()> {
        self.connect().await?;
        self.login().await
    }

    /// Downloads the listing of `path` over a passive data channel and
    /// parses it into entries, preserving server order.
    pub async fn list<P: Into<String>>(&mut self, path: P) -> FtpResult<Vec<DirectoryEntry>> {
        let path = path.into();
        let control = self.control()?;

        completed(control.execute(&Command::Type(TransferType::Ascii)).await?)?;

        let mut data = open_data_channel(control).await?;
        transfer_started(control.execute(&Command::List(path)).await?)?;

        let mut raw = Vec::new();
        let _ = data.read_to_end(&mut raw).await?;
        drop(data);

        completed(control.read_reply().await?)?;

        parse_listing(&String::from_utf8_lossy(&raw))
    }

    /// Uploads a local file, returning the number of bytes sent.
    pub async fn upload<L, R>(&mut self, local_path: L, remote_path: R) -> FtpResult<u64>
    where
        L: AsRef<Path>,
        R: Into<String>,
    {
        let mut file = File::open(local_path).await?;
        self.upload_from(&mut file, remote_path).await
    }

    /// Streams `reader` into a remote file over a passive data channel,
    /// returning the number of bytes sent. The remote file is complete
    /// only once the server acknowledges the transfer.
    pub async fn upload_from<R, P>(&mut self, reader: &mut R, remote_path: P) -> FtpResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
        P: Into<String>,
    {
        let remote_path = remote_path.into();
        let control = self.control()?;

        completed(control.execute(&Command::Type(TransferType::Binary)).await?)?;

        let mut data = open_data_channel(control).await?;
        transfer_started(control.execute(&Command::Stor(remote_path.clone())).await?)?;

        let sent = copy(reader, &mut data).await?;
        data.shutdown().await?;
        drop(data);

        completed(control.read_reply().await?)?;

        debug!("stored {remote_path} ({sent} bytes)");
        Ok(sent)
    }

    /// Downloads a remote file to a local path, returning the number of
    /// bytes received.
    pub async fn download<R, L>(&mut self, remote_path: R, local_path: L) -> FtpResult<u64>
    where
        R: Into<String>,
        L: AsRef<Path>,
    {
        let mut file = File::create(local_path).await?;
        let received = self.download_to(remote_path, &mut file).await?;
        file.flush().await?;

        Ok(received)
    }

    /// Streams a remote file into `writer` over a passive data channel,
    /// returning the number of bytes received.
    pub async fn download_to<P, W>(&mut self, remote_path: P, writer: &mut W) -> FtpResult<u64>
    where
        P: Into<String>,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let remote_path = remote_path.into();
        let control = self.control()?;

        completed(control.execute(&Command::Type(TransferType::Binary)).await?)?;

        let mut data = open_data_channel(control).await?;
        transfer_started(control.execute(&Command::Retr(remote_path.clone())).await?)?;

        let received = copy(&mut data, writer).await?;
        drop(data);

        completed(control.read_reply().await?)?;

        debug!("retrieved {remote_path} ({received} bytes)");
        Ok(received)
    }

    /// Deletes a remote file.
    pub async fn remove<P: Into<String>>(&mut self, path: P) -> FtpResult<()> {
        let path = path.into();
        let control = self.control()?;

        completed(control.execute(&Command::Dele(path)).await?)?;

        Ok(())
    }

    /// Sends QUIT and closes the control channel. The connection is
    /// torn down whatever the server answers; only transport failures
    /// surface as errors.
    pub async fn disconnect(&mut self) -> FtpResult<()> {
        let control = self.control()?;
        let farewell = control.execute(&Command::Quit).await;

        self.control = None;
        self.greeting = None;
        debug!("disconnected from {}", self.config.host);

        farewell.map(|_| ())
    }

    fn control(&mut self) -> FtpResult<&mut Connection<ControlStream>> {
        self.control.as_mut().ok_or(Error::NotConnected)
    }
}

/// Negotiates a passive data channel: PASV, extract the endpoint from
/// the reply, dial it. The endpoint is validated before anything is
/// dialed.
async fn open_data_channel(control: &mut Connection<ControlStream>) -> FtpResult<TcpStream> {
    let reply = control.execute(&Command::Pasv).await?;
    if reply.kind() != ReplyKind::PositiveCompletion {
        return Err(Error::Reply(reply));
    }

    let endpoint = parse_passive_endpoint(&reply.message)?;
    debug!("data channel at {endpoint}");

    Ok(TcpStream::connect(endpoint).await?)
}

/// Fails unless the reply is a positive completion (2xx)
fn completed(reply: Reply) -> FtpResult<()> {
    match reply.kind() {
        ReplyKind::PositiveCompletion => Ok(()),
        _ => Err(Error::Reply(reply)),
    }
}

/// Fails unless the reply opens a transfer: positive preliminary
/// (usually 150), or a completion from servers that answer 2xx
/// right away
fn transfer_started(reply: Reply) -> FtpResult<()> {
    match reply.kind() {
        ReplyKind::PositivePreliminary | ReplyKind::PositiveCompletion => Ok(()),
        _ => Err(Error::Reply(reply)),
    }
}

#[cfg(test)]
mod test_session {
    use std::{io::Cursor, net::SocketAddr};

    use tokio::{
        io::{AsyncBufReadExt, BufReader},
        net::TcpListener,
    };

    use super::*;

    fn config(addr: SocketAddr) -> FtpConfig {
        FtpConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            username: "alice".to_owned(),
            password: "secret".to_owned(),
            secure: false,
        }
    }

    struct Script {
        control: BufReader<TcpStream>,
    }

    impl Script {
        async fn expect(&mut self, line: &str) {
            let mut received = String::new();
            let _ = self.control.read_line(&mut received).await.unwrap();
            assert_eq!(received, format!("{line}\r\n"));
        }

        async fn send(&mut self, line: &str) {
            self.control
                .write_all(format!("{line}\r\n").as_bytes())
                .await
                .unwrap();
        }
    }

    async fn accept(listener: &TcpListener) -> Script {
        let (stream, _) = listener.accept().await.unwrap();
        Script {
            control: BufReader::new(stream),
        }
    }

    async fn accept_with_login(listener: &TcpListener) -> Script {
        let mut script = accept(listener).await;

        script.send("220 test server ready").await;
        script.expect("USER alice").await;
        script.send("331 need password").await;
        script.expect("PASS secret").await;
        script.send("230 logged in").await;

        script
    }

    fn passive_reply(listener: &TcpListener) -> String {
        let port = listener.local_addr().unwrap().port();
        format!(
            "227 Entering Passive Mode (127,0,0,1,{},{}).",
            port / 256,
            port % 256
        )
    }

    #[tokio::test]
    async fn test_connect_login_list_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept_with_login(&listener).await;

            script.expect("TYPE A").await;
            script.send("200 switched to ascii").await;

            script.expect("PASV").await;
            let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            script.send(&passive_reply(&data_listener)).await;

            script.expect("LIST /").await;
            script.send("150 sending listing").await;

            let (mut data, _) = data_listener.accept().await.unwrap();
            data.write_all(
                b"-rw-r--r-- 1 user group 1024 Jan 15 2019 myfile.txt\r\n\
                  drwxr-xr-x 2 user group 4096 Aug 10 2020 my dir\r\n",
            )
            .await
            .unwrap();
            drop(data);

            script.send("226 done").await;

            script.expect("QUIT").await;
            script.send("221 bye").await;
        });

        let mut client = FtpClient::new(config(addr));
        client.connect_and_login().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(client.greeting().unwrap().code, 220);
        assert!(matches!(
            client.connect().await,
            Err(Error::AlreadyConnected)
        ));

        let entries = client.list("/").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "myfile.txt");
        assert_eq!(entries[0].size, 1024);
        assert_eq!(entries[1].name, "my dir");

        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        assert!(client.greeting().is_none());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_the_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept(&listener).await;

            script.send("220 ready").await;
            script.expect("USER alice").await;
            script.send("331 need password").await;
            script.expect("PASS secret").await;
            script.send("530 login incorrect").await;
        });

        let mut client = FtpClient::new(config(addr));
        client.connect().await.unwrap();

        match client.login().await.unwrap_err() {
            Error::Reply(reply) => assert_eq!(reply.code, 530),
            other => panic!("unexpected error: {other:?}"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_server_banner_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept(&listener).await;
            script.send("421 too many users").await;
        });

        let mut client = FtpClient::new(config(addr));

        match client.connect().await.unwrap_err() {
            Error::Reply(reply) => assert_eq!(reply.code, 421),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!client.is_connected());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_streams_the_payload_over_the_data_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept_with_login(&listener).await;

            script.expect("TYPE I").await;
            script.send("200 switched to binary").await;

            script.expect("PASV").await;
            let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            script.send(&passive_reply(&data_listener)).await;

            script.expect("STOR upload.bin").await;
            script.send("150 ready for data").await;

            let (mut data, _) = data_listener.accept().await.unwrap();
            let mut payload = Vec::new();
            let _ = data.read_to_end(&mut payload).await.unwrap();
            drop(data);

            script.send("226 stored").await;
            payload
        });

        let mut client = FtpClient::new(config(addr));
        client.connect_and_login().await.unwrap();

        let sent = client
            .upload_from(&mut &b"lorem ipsum"[..], "upload.bin")
            .await
            .unwrap();
        assert_eq!(sent, 11);

        assert_eq!(server.await.unwrap(), b"lorem ipsum".to_vec());
    }

    #[tokio::test]
    async fn test_download_collects_the_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept_with_login(&listener).await;

            script.expect("TYPE I").await;
            script.send("200 switched to binary").await;

            script.expect("PASV").await;
            let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            script.send(&passive_reply(&data_listener)).await;

            script.expect("RETR remote.bin").await;
            script.send("150 opening data connection").await;

            let (mut data, _) = data_listener.accept().await.unwrap();
            data.write_all(b"file contents").await.unwrap();
            drop(data);

            script.send("226 sent").await;
        });

        let mut client = FtpClient::new(config(addr));
        client.connect_and_login().await.unwrap();

        let mut sink = Cursor::new(Vec::new());
        let received = client.download_to("remote.bin", &mut sink).await.unwrap();

        assert_eq!(received, 13);
        assert_eq!(sink.into_inner(), b"file contents".to_vec());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_requires_a_completion_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept_with_login(&listener).await;

            script.expect("DELE gone.txt").await;
            script.send("250 deleted").await;

            script.expect("DELE missing.txt").await;
            script.send("550 no such file").await;
        });

        let mut client = FtpClient::new(config(addr));
        client.connect_and_login().await.unwrap();

        client.remove("gone.txt").await.unwrap();

        match client.remove("missing.txt").await.unwrap_err() {
            Error::Reply(reply) => assert_eq!(reply.code, 550),
            other => panic!("unexpected error: {other:?}"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_passive_reply_aborts_before_any_data_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut script = accept_with_login(&listener).await;

            script.expect("TYPE A").await;
            script.send("200 switched to ascii").await;

            script.expect("PASV").await;
            script.send("227 Entering Passive Mode ().").await;
        });

        let mut client = FtpClient::new(config(addr));
        client.connect_and_login().await.unwrap();

        assert!(matches!(client.list("/").await, Err(Error::Protocol(_))));
        assert!(client.is_connected());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_require_a_connection() {
        let mut client = FtpClient::new(FtpConfig::new("localhost", "alice", "secret"));

        assert!(matches!(client.list("/").await, Err(Error::NotConnected)));
        assert!(matches!(
            client.remove("a.txt").await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(client.disconnect().await, Err(Error::NotConnected)));
    }
}
