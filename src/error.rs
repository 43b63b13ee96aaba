//! Error taxonomy for the protocol engine.
//!
//! Kinds mirror spec.md §7: transport/framing failures, server-reported
//! failures (further classified by errno), and local API misuse.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Classification of a server-reported error, derived from its errno.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    Operational,
    Integrity,
    Data,
    Programming,
    Internal,
    NotSupported,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Socket connect/read/write failed, or TLS handshake failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Packet shape did not match the protocol: truncated length-coded
    /// value, impossible field count, bad magic byte, etc.
    #[error("malformed protocol data: {0}")]
    ProtocolMalformed(String),

    /// API misuse: command issued in the wrong state, operation on a
    /// closed/invalidated result set, unsupported feature request.
    #[error("interface error: {0}")]
    Interface(String),

    /// The server itself reported a failure. `kind` is derived from
    /// `errno` via [`classify_errno`].
    #[error("server error {errno} ({sqlstate}): {message}")]
    Server {
        kind: ServerErrorKind,
        errno: u16,
        sqlstate: String,
        message: String,
    },

    /// A feature was requested that this engine intentionally does not
    /// implement (prepared statements, COM_CHANGE_USER, server cursors, ...).
    #[error("not supported: {0}")]
    NotSupported(String),

    /// TLS connector setup or handshake failed.
    #[error("tls error: {0}")]
    Tls(String),

    /// Connection options could not be parsed or were incomplete.
    #[error("bad connection options: {0}")]
    BadConfig(String),
}

impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Self {
        match e {}
    }
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::ProtocolMalformed(msg.into())
    }

    pub fn interface(msg: impl Into<String>) -> Self {
        Error::Interface(msg.into())
    }

    pub fn server(errno: u16, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Server {
            kind: classify_errno(errno),
            errno,
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }

    /// `true` for the connection-ending failures described in spec.md §7 —
    /// a caller should not attempt further commands on this connection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::ProtocolMalformed(_) | Error::Tls(_)
        )
    }
}

/// Map a server errno to a [`ServerErrorKind`].
///
/// Grounded on `examples/original_source/mysql4py/errors.py`'s
/// `errno_to_exception` table; unmapped errnos default to `Internal`
/// per spec.md §7.
pub fn classify_errno(errno: u16) -> ServerErrorKind {
    use ServerErrorKind::*;
    match errno {
        1043 => Internal,                  // ER_BAD_HANDSHAKE
        1044 | 1045 => Operational,         // ER_DBACCESS_DENIED / ER_ACCESS_DENIED
        1046 => Operational,                // ER_NO_DB
        1047 => Internal,                   // ER_UNKNOWN_COM
        1048 => Data,                       // ER_BAD_NULL
        1049 => Operational,                // ER_BAD_DB
        1050..=1052 => Operational,         // ER_TABLE_EXISTS / ER_BAD_TABLE / ER_NON_UNIQ
        1053 => Operational,                // ER_SERVER_SHUTDOWN
        1054 => Operational,                // ER_BAD_FIELD
        1055..=1060 => Programming,         // group/sum-select/value-count/too-long-ident/dup-fieldname
        1061 => Data,                       // ER_DUP_KEYNAME
        1062 => Integrity,                  // ER_DUP_ENTRY
        1063 | 1064..=1068 => Programming,  // field-spec/parse/empty-query/nonuniq-table/invalid-default/multiple-pri-key
        1069..=1072 => Operational,         // too-many-keys/key-parts/too-long-key/key-column
        1216 | 1217 | 1451 | 1452 => Integrity, // FK constraint failures
        1157 => Operational,                // ER_NET_UNCOMPRESS_ERROR
        2006 => Operational,                // CR_SERVER_GONE_ERROR
        2013 => Operational,                // CR_SERVER_LOST
        2026 => Operational,                // CR_SSL_CONNECTION_ERROR
        _ => Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_entry_is_integrity() {
        assert_eq!(classify_errno(1062), ServerErrorKind::Integrity);
    }

    #[test]
    fn parse_error_is_programming() {
        assert_eq!(classify_errno(1064), ServerErrorKind::Programming);
    }

    #[test]
    fn access_denied_is_operational() {
        assert_eq!(classify_errno(1045), ServerErrorKind::Operational);
    }

    #[test]
    fn unknown_errno_defaults_internal() {
        assert_eq!(classify_errno(9999), ServerErrorKind::Internal);
    }

    #[test]
    fn server_constructor_fills_kind() {
        let err = Error::server(1062, "23000", "Duplicate entry");
        match err {
            Error::Server { kind, errno, .. } => {
                assert_eq!(kind, ServerErrorKind::Integrity);
                assert_eq!(errno, 1062);
            }
            _ => panic!("expected Error::Server"),
        }
    }
}
