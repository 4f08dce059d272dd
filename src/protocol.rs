use tokio::io::{AsyncRead, AsyncReadExt};

/// The acknowledgement the server sends when it accepts a command.
pub const ACK_OK: &str = "0";

/// Upper bound of a single read on the control connection.
pub const CONTROL_READ_SIZE: usize = 32;

/// Chunk size used when streaming the data connection.
pub const DATA_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Get { filename: String },
}

impl Command {
    /// Token the server matches the command on.
    pub fn token(&self) -> &'static str {
        match self {
            Command::List => "-l",
            Command::Get { .. } => "-g",
        }
    }

    /// Builds the control line `<data_port> <token>[ <filename>]`.
    ///
    /// The line is sent as-is: no terminator and no length prefix.
    pub fn control_line(&self, data_port: u16) -> String {
        match self {
            Command::List => format!("{} {}", data_port, self.token()),
            Command::Get { filename } => format!("{} {} {}", data_port, self.token(), filename),
        }
    }
}

/// The server's first reply to a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Ack {
    Accepted,
    Rejected(String),
}

impl Ack {
    pub fn decode(reply: &str) -> Self {
        if reply == ACK_OK {
            Ack::Accepted
        } else {
            Ack::Rejected(reply.to_string())
        }
    }
}

/// Performs one read of at most [`CONTROL_READ_SIZE`] bytes.
///
/// Returns `None` when the peer has closed the connection.
pub async fn read_control<T>(reader: &mut T) -> std::io::Result<Option<String>>
where
    T: AsyncRead + Unpin,
{
    let mut buffer = [0u8; CONTROL_READ_SIZE];
    let n = reader.read(&mut buffer).await?;
    if n == 0 {
        return Ok(None);
    }
    let message = String::from_utf8_lossy(&buffer[..n]).into_owned();
    log::debug!("Control received: {:?}", message);
    Ok(Some(message))
}

/// Turns a raw listing payload into one entry per line.
///
/// Entries arrive separated by single spaces; the server pads the payload
/// with NUL bytes, which are dropped.
pub fn format_listing(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).replace(' ', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_line_for_list_has_no_filename() {
        assert_eq!(Command::List.control_line(30022), "30022 -l");
    }

    #[test]
    fn control_line_for_get_carries_filename() {
        let command = Command::Get {
            filename: "shortfile.txt".into(),
        };
        assert_eq!(command.control_line(30022), "30022 -g shortfile.txt");
    }

    #[test]
    fn only_literal_zero_is_accepted() {
        assert_eq!(Ack::decode("0"), Ack::Accepted);
        assert_eq!(
            Ack::decode("ERROR Incorrect Command"),
            Ack::Rejected("ERROR Incorrect Command".into())
        );
        assert_eq!(Ack::decode("0 "), Ack::Rejected("0 ".into()));
        assert_eq!(Ack::decode("00"), Ack::Rejected("00".into()));
    }

    #[test]
    fn listing_spaces_become_newlines() {
        assert_eq!(format_listing(b"a.txt b.txt c.txt"), "a.txt\nb.txt\nc.txt");
    }

    #[test]
    fn listing_drops_nul_padding() {
        let mut payload = b". .. notes.txt ".to_vec();
        payload.resize(1023, 0);
        assert_eq!(format_listing(&payload), ".\n..\nnotes.txt\n");
    }

    #[tokio::test]
    async fn read_control_reports_closed_peer() {
        let mut empty: &[u8] = b"";
        assert_eq!(read_control(&mut empty).await.unwrap(), None);

        let mut reply: &[u8] = b"ERROR File not found";
        assert_eq!(
            read_control(&mut reply).await.unwrap(),
            Some("ERROR File not found".to_string())
        );
    }
}
