use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    error::{Error, FtpResult},
    protocol::{parse_continuation_line, parse_lead_line, Command, Reply},
};

/// Control-channel codec. Commands go out one per line, replies come
/// back complete and in command order, with multi-line replies
/// reassembled before they reach the caller.
pub(crate) struct Connection<S> {
    stream: BufReader<S>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Writes the rendered command followed by CRLF, nothing else.
    pub async fn send_command(&mut self, command: &Command) -> FtpResult<()> {
        debug!(">> {}", command.redacted());

        let line = format!("{command}\r\n");
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Reads one complete reply off the control channel.
    pub async fn read_reply(&mut self) -> FtpResult<Reply> {
        let line = self.read_line().await?;
        let (code, mut done, text) = parse_lead_line(&line)?;
        let mut message = text.trim().to_owned();

        while !done {
            let line = self.read_line().await?;
            let (finished, text) = parse_continuation_line(code, &line);

            done = finished;
            message.push('\n');
            message.push_str(text.trim());
        }

        debug!("<< {} {}", code, message.lines().last().unwrap_or(""));

        Ok(Reply { code, message })
    }

    /// Sends one command and waits for the matching reply.
    pub async fn execute(&mut self, command: &Command) -> FtpResult<Reply> {
        self.send_command(command).await?;
        self.read_reply().await
    }

    async fn read_line(&mut self) -> FtpResult<String> {
        let mut line = String::new();
        if self.stream.read_line(&mut line).await? == 0 {
            return Err(Error::Protocol("connection closed mid-reply".to_owned()));
        }

        Ok(line.trim_end_matches(|c| c == '\r' || c == '\n').to_owned())
    }
}
