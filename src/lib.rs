//! A blocking client for the MySQL 4.1+ text protocol: handshake,
//! authentication (secure and legacy 3.23 scrambles), `COM_QUERY`
//! dispatch, multi-statement result sets, `LOCAL INFILE` upload, and
//! optional packet compression — over TCP, a Unix domain socket, or TLS.
//!
//! This crate intentionally does not implement prepared statements
//! (`COM_STMT_*`), replication, connection pooling, or a DB-API style
//! cursor/paramstyle layer; see `DESIGN.md` for the reasoning.

pub mod buffer;
pub mod constant;
pub mod engine;
pub mod error;
mod opts;
pub mod protocol;
mod scramble;

pub use buffer::ByteStream;
pub use engine::{Connection, QueryResult, ResultSet, Row, SimpleResult};
pub use error::{Error, Result, ServerErrorKind};
pub use opts::{Opts, SslOpts};
pub use protocol::message::Field;
