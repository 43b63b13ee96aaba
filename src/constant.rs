//! Wire-protocol constants: command bytes, capability flags, server
//! status flags. Type-code/column-flag enumeration is intentionally not
//! modeled here — converting a column's raw bytes by type code belongs
//! to the consumer of this crate, not the core (spec.md §4.F, §9).

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandByte {
    Quit = 0x01,
    Query = 0x03,
    Ping = 0x0e,
}

bitflags::bitflags! {
    /// Client/server capability flags (spec.md §6). Only the low 16 bits
    /// are meaningful to this 4.1+ text-protocol engine; the struct is
    /// `u32`-backed so the full `ClientAuth.capability_flags` field can
    /// round-trip without masking.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilityFlags: u32 {
        const CLIENT_LONG_PASSWORD      = 0x0000_0001;
        const CLIENT_FOUND_ROWS         = 0x0000_0002;
        const CLIENT_LONG_FLAG          = 0x0000_0004;
        const CLIENT_CONNECT_WITH_DB    = 0x0000_0008;
        const CLIENT_NO_SCHEMA          = 0x0000_0010;
        const CLIENT_COMPRESS           = 0x0000_0020;
        const CLIENT_ODBC               = 0x0000_0040;
        const CLIENT_LOCAL_FILES        = 0x0000_0080;
        const CLIENT_IGNORE_SPACE       = 0x0000_0100;
        const CLIENT_PROTOCOL_41        = 0x0000_0200;
        const CLIENT_INTERACTIVE        = 0x0000_0400;
        const CLIENT_SSL                = 0x0000_0800;
        const CLIENT_IGNORE_SIGPIPE     = 0x0000_1000;
        const CLIENT_TRANSACTIONS       = 0x0000_2000;
        const CLIENT_RESERVED           = 0x0000_4000;
        const CLIENT_SECURE_CONNECTION  = 0x0000_8000;
        const CLIENT_MULTI_STATEMENTS   = 0x0001_0000;
        const CLIENT_MULTI_RESULTS      = 0x0002_0000;
    }
}

/// Capabilities this engine always requests, per spec.md §6.
pub const CAPABILITIES_ALWAYS_REQUESTED: CapabilityFlags = CapabilityFlags::CLIENT_LONG_PASSWORD
    .union(CapabilityFlags::CLIENT_LONG_FLAG)
    .union(CapabilityFlags::CLIENT_TRANSACTIONS)
    .union(CapabilityFlags::CLIENT_PROTOCOL_41)
    .union(CapabilityFlags::CLIENT_SECURE_CONNECTION)
    .union(CapabilityFlags::CLIENT_MULTI_STATEMENTS)
    .union(CapabilityFlags::CLIENT_MULTI_RESULTS);

/// Flags the engine never requests and therefore always clears out of the
/// server's advertised set before negotiating: the feature negotiation
/// invariant in spec.md §3 ("never request a capability the server did
/// not advertise") and the handshake's `allowed_mask` clearing in
/// spec.md §4.F.
pub const CAPABILITIES_NEVER_NEGOTIATED: CapabilityFlags = CapabilityFlags::CLIENT_INTERACTIVE
    .union(CapabilityFlags::CLIENT_NO_SCHEMA);

bitflags::bitflags! {
    /// Server status flags, spec.md §3/§GLOSSARY.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServerStatusFlags: u16 {
        const SERVER_STATUS_IN_TRANS             = 0x0001;
        const SERVER_STATUS_AUTOCOMMIT            = 0x0002;
        const SERVER_MORE_RESULTS_EXISTS          = 0x0008;
        const SERVER_QUERY_NO_GOOD_INDEX_USED      = 0x0010;
        const SERVER_QUERY_NO_INDEX_USED           = 0x0020;
        const SERVER_STATUS_CURSOR_EXISTS          = 0x0040;
        const SERVER_STATUS_LAST_ROW_SENT          = 0x0080;
        const SERVER_STATUS_DB_DROPPED             = 0x0100;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES    = 0x0200;
        const SERVER_STATUS_METADATA_CHANGED        = 0x0400;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_requested_excludes_ssl_and_compress() {
        assert!(!CAPABILITIES_ALWAYS_REQUESTED.contains(CapabilityFlags::CLIENT_SSL));
        assert!(!CAPABILITIES_ALWAYS_REQUESTED.contains(CapabilityFlags::CLIENT_COMPRESS));
    }

    #[test]
    fn never_negotiated_has_no_overlap_with_always_requested() {
        assert!(
            CAPABILITIES_ALWAYS_REQUESTED
                .intersection(CAPABILITIES_NEVER_NEGOTIATED)
                .is_empty()
        );
    }
}
