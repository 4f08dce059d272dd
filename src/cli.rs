use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::{
    destination::OnConflict,
    error::{ClientError, Result},
    protocol::Command,
};

/// Hosts that may be given by their short name.
const SHORT_HOSTS: [&str; 3] = ["flip1", "flip2", "flip3"];
const SHORT_HOST_DOMAIN: &str = "engr.oregonstate.edu";

#[derive(Parser, Debug)]
#[command(version, about = "Lists or fetches files from an ftserver", long_about = None)]
#[command(group(ArgGroup::new("command").required(true).args(["list", "get"])))]
pub struct CLI {
    /// Server host name or address
    pub host: String,

    /// Server control port
    #[arg(value_parser = parse_control_port)]
    pub control_port: u16,

    /// List the server's directory
    #[arg(short = 'l')]
    pub list: bool,

    /// Fetch FILENAME from the server
    #[arg(short = 'g', value_name = "FILENAME", allow_hyphen_values = true)]
    pub get: Option<String>,

    /// Local port the server connects back to
    #[arg(value_parser = parse_data_port)]
    pub data_port: u16,

    /// What to do when the downloaded file already exists
    #[arg(long, value_enum, default_value_t = OnConflict::Prompt, env = "FTCLIENT_ON_CONFLICT")]
    pub on_conflict: OnConflict,

    /// Directory downloads are written to
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

/// A validated request for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub host: String,
    pub control_port: u16,
    pub command: Command,
    pub data_port: u16,
}

impl CLI {
    pub fn invocation(&self) -> Result<Invocation> {
        let command = match &self.get {
            Some(filename) => {
                if filename.is_empty() || filename.contains(char::is_whitespace) {
                    return Err(ClientError::Usage(format!(
                        "Invalid file name {:?}: must be non-empty and contain no spaces",
                        filename
                    )));
                }
                Command::Get {
                    filename: filename.clone(),
                }
            }
            None => Command::List,
        };

        Ok(Invocation {
            host: expand_host(&self.host),
            control_port: self.control_port,
            command,
            data_port: self.data_port,
        })
    }
}

pub fn expand_host(host: &str) -> String {
    if SHORT_HOSTS.contains(&host) {
        format!("{}.{}", host, SHORT_HOST_DOMAIN)
    } else {
        host.to_string()
    }
}

fn parse_control_port(value: &str) -> std::result::Result<u16, String> {
    parse_port(value, "Connection port number too high")
}

fn parse_data_port(value: &str) -> std::result::Result<u16, String> {
    parse_port(value, "Data port number too high")
}

fn parse_port(value: &str, too_high: &str) -> std::result::Result<u16, String> {
    match value.parse::<u64>() {
        Err(_) => Err(format!("{:?} is not a port number", value)),
        Ok(port) if port > u16::MAX as u64 => Err(too_high.to_string()),
        Ok(port) => Ok(port as u16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> std::result::Result<CLI, clap::Error> {
        CLI::try_parse_from(args)
    }

    #[test]
    fn list_takes_five_arguments() {
        let cli = parse(&["ftclient", "flip1", "30021", "-l", "30022"]).unwrap();
        let invocation = cli.invocation().unwrap();
        assert_eq!(invocation.host, "flip1.engr.oregonstate.edu");
        assert_eq!(invocation.control_port, 30021);
        assert_eq!(invocation.command, Command::List);
        assert_eq!(invocation.data_port, 30022);

        assert!(parse(&["ftclient", "flip1", "30021", "-l"]).is_err());
        assert!(parse(&["ftclient", "flip1", "30021", "-l", "file.txt", "30022"]).is_err());
    }

    #[test]
    fn get_takes_six_arguments() {
        let cli = parse(&["ftclient", "localhost", "30021", "-g", "file.txt", "30022"]).unwrap();
        let invocation = cli.invocation().unwrap();
        assert_eq!(invocation.host, "localhost");
        assert_eq!(
            invocation.command,
            Command::Get {
                filename: "file.txt".into()
            }
        );
        assert_eq!(invocation.data_port, 30022);

        let err = parse(&["ftclient", "localhost", "30021", "-g", "file.txt"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn a_command_is_required_and_exclusive() {
        let err = parse(&["ftclient", "localhost", "30021", "30022"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse(&["ftclient", "localhost", "30021", "-l", "-g", "f", "30022"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn control_port_above_range_is_rejected() {
        for args in [
            &["ftclient", "localhost", "65536", "-l", "30022"][..],
            &["ftclient", "localhost", "70000", "-g", "file.txt", "30022"][..],
        ] {
            let err = parse(args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
            assert_eq!(err.exit_code(), 2);
            assert!(err.to_string().contains("Connection port number too high"));
        }
        assert!(parse(&["ftclient", "localhost", "65535", "-l", "30022"]).is_ok());
    }

    #[test]
    fn get_accepts_filenames_starting_with_a_hyphen() {
        let cli = parse(&["ftclient", "localhost", "30021", "-g", "-notes.txt", "30022"]).unwrap();
        assert_eq!(
            cli.invocation().unwrap().command,
            Command::Get {
                filename: "-notes.txt".into()
            }
        );
    }

    #[test]
    fn command_flag_may_appear_anywhere() {
        let canonical = parse(&["ftclient", "localhost", "30021", "-l", "30022"]).unwrap();
        let leading = parse(&["ftclient", "-l", "localhost", "30021", "30022"]).unwrap();
        assert_eq!(leading.invocation().unwrap(), canonical.invocation().unwrap());

        let trailing = parse(&["ftclient", "localhost", "30021", "30022", "-g", "f.txt"]).unwrap();
        assert_eq!(trailing.invocation().unwrap().data_port, 30022);
    }

    #[test]
    fn filenames_with_spaces_are_usage_errors() {
        let cli = parse(&["ftclient", "localhost", "30021", "-g", "my file.txt", "30022"]).unwrap();
        let err = cli.invocation().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn other_hosts_are_kept_verbatim() {
        assert_eq!(expand_host("flip3"), "flip3.engr.oregonstate.edu");
        assert_eq!(expand_host("flip4"), "flip4");
        assert_eq!(expand_host("127.0.0.1"), "127.0.0.1");
    }
}
