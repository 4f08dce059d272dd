//! # ftclient
//! Client for the ftserver file-transfer protocol: a one-line command on a
//! control connection, the payload on a data connection the server opens
//! back to the client.

pub mod cli;
pub mod client;
pub mod destination;
pub mod error;
pub mod protocol;
