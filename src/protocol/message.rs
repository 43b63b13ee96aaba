//! Wire messages (spec.md §3/§4.D): the initial handshake, the client's
//! auth response, and the OK/EOF/Field/Error payloads exchanged once a
//! connection is established.
//!
//! Grounded on the teacher's `protocol/connection/handshake.rs` and
//! `protocol/response.rs` for shape and naming, but decoded against the
//! simpler single capability-word HandshakeV10 layout
//! `examples/original_source/mysql4py/protocol.py`'s `Handshake.decode`
//! and `Field.decode` actually use, since that is what this engine's
//! 4.1-era scope requires.

use crate::buffer::ByteStream;
use crate::constant::{CapabilityFlags, ServerStatusFlags};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: u8,
    pub server_version: String,
    pub thread_id: u32,
    pub salt: Vec<u8>,
    pub server_capabilities: CapabilityFlags,
    pub charset: u8,
    pub server_status: ServerStatusFlags,
}

impl Handshake {
    /// Decodes a `HandshakeV10` payload (spec.md §3): 8-byte salt, a
    /// filler byte, the 16-bit capability word, charset, status, 13
    /// reserved bytes, then (for 4.1+ servers) 12 more salt bytes and a
    /// terminating NUL.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut bs = ByteStream::new(payload);
        let protocol_version = bs.read_u8()?;
        let server_version = String::from_utf8_lossy(bs.read_nullstr()?).into_owned();
        let thread_id = bs.read_u32()?;

        let mut salt = bs.read(8)?.to_vec();
        bs.skip(1)?;

        let capabilities_lo = bs.read_u16()?;
        let charset = bs.read_u8()?;
        let server_status = bs.read_u16()?;
        bs.skip(13)?;

        if !bs.is_empty() {
            let rest = bs.read_nullstr().unwrap_or_else(|_| bs.read_all());
            salt.extend_from_slice(rest);
        }

        let server_capabilities = CapabilityFlags::from_bits_truncate(capabilities_lo as u32);
        let server_status = ServerStatusFlags::from_bits_truncate(server_status);

        if !server_capabilities.contains(CapabilityFlags::CLIENT_PROTOCOL_41) {
            return Err(Error::NotSupported(
                "server does not advertise CLIENT_PROTOCOL_41".into(),
            ));
        }

        Ok(Self {
            protocol_version,
            server_version,
            thread_id,
            salt,
            server_capabilities,
            charset,
            server_status,
        })
    }
}

/// Builds the `ClientAuthentication` (`HandshakeResponse320`-with-4.1-
/// extensions) payload: capability flags, max packet size, charset, 23
/// zero filler bytes, username, the scramble token (length-prefixed),
/// and an optional schema name.
pub fn write_client_auth(
    capabilities: CapabilityFlags,
    charset: u8,
    user: &str,
    scramble: &[u8],
    db: Option<&str>,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&capabilities.bits().to_le_bytes());
    out.extend_from_slice(&(16 * 1024 * 1024u32).to_le_bytes());
    out.push(charset);
    out.extend_from_slice(&[0u8; 23]);
    out.extend_from_slice(user.as_bytes());
    out.push(0);
    out.push(scramble.len() as u8);
    out.extend_from_slice(scramble);
    if let Some(db) = db {
        out.extend_from_slice(db.as_bytes());
        out.push(0);
    }
    out
}

/// `SSLRequest`: the truncated auth packet sent before upgrading to TLS,
/// carrying only the negotiated capabilities/charset so the server knows
/// to wait for a TLS ClientHello next.
pub fn write_ssl_request(capabilities: CapabilityFlags, charset: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&capabilities.bits().to_le_bytes());
    out.extend_from_slice(&(16 * 1024 * 1024u32).to_le_bytes());
    out.push(charset);
    out.extend_from_slice(&[0u8; 23]);
    out
}

/// Legacy (pre-4.1) client auth payload: no capability word, a fixed
/// 2-byte max-packet-size-in-kilobytes field, username, scramble (with
/// its own NUL terminator, not a length prefix), and optional schema.
pub fn write_client_auth_323(user: &str, scramble: &[u8; 9], db: Option<&str>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xFFFFu16.to_le_bytes());
    out.extend_from_slice(user.as_bytes());
    out.push(0);
    out.extend_from_slice(scramble);
    if let Some(db) = db {
        out.extend_from_slice(db.as_bytes());
        out.push(0);
    }
    out
}

#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: ServerStatusFlags,
    pub warnings: u16,
    pub message: String,
}

impl OkPayload {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut bs = ByteStream::new(payload);
        let marker = bs.read_u8()?;
        if marker != 0x00 {
            return Err(Error::protocol("OK packet does not start with 0x00"));
        }
        let affected_rows = bs.read_lcb()?.unwrap_or(0);
        let last_insert_id = bs.read_lcb()?.unwrap_or(0);
        let status_flags = ServerStatusFlags::from_bits_truncate(bs.read_u16()?);
        let warnings = bs.read_u16()?;
        let message = String::from_utf8_lossy(bs.read_all()).into_owned();
        Ok(Self {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
            message,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EofPayload {
    pub warnings: u16,
    pub status_flags: ServerStatusFlags,
}

impl EofPayload {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut bs = ByteStream::new(payload);
        let marker = bs.read_u8()?;
        if marker != 0xFE {
            return Err(Error::protocol("EOF packet does not start with 0xFE"));
        }
        let warnings = bs.read_u16()?;
        let status_flags = ServerStatusFlags::from_bits_truncate(bs.read_u16()?);
        Ok(Self {
            warnings,
            status_flags,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ErrPayload {
    pub errno: u16,
    pub sqlstate: String,
    pub message: String,
}

impl ErrPayload {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut bs = ByteStream::new(payload);
        let marker = bs.read_u8()?;
        if marker != 0xFF {
            return Err(Error::protocol("error packet does not start with 0xFF"));
        }
        let errno = bs.read_u16()?;
        // A 4.1+ server prefixes the message with '#' + 5-byte sqlstate.
        let sqlstate = if bs.remaining() >= 6 && bs.peek_u8_at(0) == Some(b'#') {
            bs.skip(1)?;
            String::from_utf8_lossy(bs.read(5)?).into_owned()
        } else {
            "HY000".to_string()
        };
        let message = String::from_utf8_lossy(bs.read_all()).into_owned();
        Ok(Self {
            errno,
            sqlstate,
            message,
        })
    }

    pub fn into_error(self) -> Error {
        Error::server(self.errno, self.sqlstate, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub type_code: u8,
    pub charset: u16,
    pub flags: u16,
}

impl Field {
    /// Decodes a column definition packet: five leading length-coded
    /// strings (catalog, schema, table, org_table, column), a sixth
    /// (org_name) this engine discards, a 1-byte filler, then the fixed
    /// tail (charset, length, type, flags, decimals, 2 reserved bytes).
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut bs = ByteStream::new(payload);
        let _catalog = lcs_string(&mut bs)?;
        let schema = lcs_string(&mut bs)?;
        let table = lcs_string(&mut bs)?;
        let _org_table = lcs_string(&mut bs)?;
        let column = lcs_string(&mut bs)?;
        let _org_name = lcs_string(&mut bs)?;

        bs.skip(1)?;
        let charset = bs.read_u16()?;
        bs.skip(4)?; // column length
        let type_code = bs.read_u8()?;
        let flags = bs.read_u16()?;
        // decimals (1 byte) + 2 reserved bytes follow; not needed.

        Ok(Self {
            schema,
            table,
            column,
            type_code,
            charset,
            flags,
        })
    }
}

fn lcs_string(bs: &mut ByteStream<'_>) -> Result<String> {
    Ok(bs
        .read_lcs()?
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .unwrap_or_default())
}
