//! The transport channel (spec.md §4.A): a closed, tagged enum over the
//! three byte streams this engine ever talks to, plus a `Mock` variant
//! for deterministic tests. Grounded on the teacher's `sync/stream.rs`,
//! minus its nightly `BorrowedCursor` read path — this engine only ever
//! needs whole-buffer `read_exact`/`write_all`.

use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(test)]
use std::io::Cursor;

#[cfg(feature = "tls")]
use native_tls::TlsStream;

use crate::error::{Error, Result};
use crate::opts::SslOpts;

enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(unix)]
    Unix(BufReader<UnixStream>),
    #[cfg(feature = "tls")]
    Tls(BufReader<TlsStream<TcpStream>>),
    #[cfg(test)]
    Mock {
        read: Cursor<Vec<u8>>,
        write: Vec<u8>,
    },
}

/// A byte-oriented connection to the server: TCP, Unix domain socket, or
/// (once upgraded) TLS over TCP.
pub struct Channel {
    stream: Stream,
}

impl Channel {
    pub fn connect_tcp(host: &str, port: u16) -> Result<Self> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(Error::Transport)?
            .next()
            .ok_or_else(|| Error::interface(format!("could not resolve {host}:{port}")))?;
        let tcp = TcpStream::connect(addr).map_err(Error::Transport)?;
        tcp.set_nodelay(true).map_err(Error::Transport)?;
        Ok(Self {
            stream: Stream::Tcp(BufReader::new(tcp)),
        })
    }

    #[cfg(unix)]
    pub fn connect_unix(path: &str) -> Result<Self> {
        let sock = UnixStream::connect(path).map_err(Error::Transport)?;
        Ok(Self {
            stream: Stream::Unix(BufReader::new(sock)),
        })
    }

    #[cfg(not(unix))]
    pub fn connect_unix(_path: &str) -> Result<Self> {
        Err(Error::NotSupported(
            "unix domain sockets are not available on this platform".into(),
        ))
    }

    #[cfg(test)]
    pub fn mock(server_bytes: Vec<u8>) -> Self {
        Self {
            stream: Stream::Mock {
                read: Cursor::new(server_bytes),
                write: Vec::new(),
            },
        }
    }

    #[cfg(test)]
    pub fn mock_written(&self) -> &[u8] {
        match &self.stream {
            Stream::Mock { write, .. } => write,
            _ => &[],
        }
    }

    /// Upgrades a plain TCP channel to TLS, per spec.md §4.A's `start_tls`.
    /// `host` is used for certificate verification.
    #[cfg(feature = "tls")]
    pub fn start_tls(self, host: &str, ssl: &SslOpts) -> Result<Self> {
        let tcp = match self.stream {
            Stream::Tcp(r) => r.into_inner(),
            Stream::Tls(_) => return Err(Error::interface("channel is already using TLS")),
            #[cfg(unix)]
            Stream::Unix(_) => {
                return Err(Error::interface("TLS is not supported over unix sockets"));
            }
            #[cfg(test)]
            Stream::Mock { .. } => return Err(Error::interface("mock channel cannot use TLS")),
        };

        let mut builder = native_tls::TlsConnector::builder();
        if let Some(cipher) = &ssl.cipher {
            log::debug!("ignoring unsupported cipher list override: {cipher}");
        }
        let connector = builder
            .build()
            .map_err(|e| Error::Tls(format!("TLS connector setup failed: {e}")))?;
        let tls = connector
            .connect(host, tcp)
            .map_err(|e| Error::Tls(format!("TLS handshake failed: {e}")))?;

        Ok(Self {
            stream: Stream::Tls(BufReader::new(tls)),
        })
    }

    #[cfg(not(feature = "tls"))]
    pub fn start_tls(self, _host: &str, _ssl: &SslOpts) -> Result<Self> {
        Err(Error::NotSupported(
            "this build was compiled without the `tls` feature".into(),
        ))
    }

    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let res = match &mut self.stream {
            Stream::Tcp(r) => r.read_exact(buf),
            #[cfg(unix)]
            Stream::Unix(r) => r.read_exact(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(r) => r.read_exact(buf),
            #[cfg(test)]
            Stream::Mock { read, .. } => read.read_exact(buf),
        };
        match res {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(Error::server(2006, "HY000", "MySQL server has gone away"))
            }
            Err(e) => Err(Error::Transport(e)),
        }
    }

    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let res = match &mut self.stream {
            Stream::Tcp(r) => r.get_mut().write_all(buf),
            #[cfg(unix)]
            Stream::Unix(r) => r.get_mut().write_all(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(r) => r.get_mut().write_all(buf),
            #[cfg(test)]
            Stream::Mock { write, .. } => {
                write.extend_from_slice(buf);
                Ok(())
            }
        };
        res.map_err(Error::Transport)
    }

    pub fn flush(&mut self) -> Result<()> {
        let res = match &mut self.stream {
            Stream::Tcp(r) => r.get_mut().flush(),
            #[cfg(unix)]
            Stream::Unix(r) => r.get_mut().flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(r) => r.get_mut().flush(),
            #[cfg(test)]
            Stream::Mock { .. } => Ok(()),
        };
        res.map_err(Error::Transport)
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_channel_round_trips_writes() {
        let mut ch = Channel::mock(vec![1, 2, 3]);
        ch.write(&[9, 9]).unwrap();
        assert_eq!(ch.mock_written(), &[9, 9]);
    }

    #[test]
    fn mock_channel_reads_scripted_bytes() {
        let mut ch = Channel::mock(vec![1, 2, 3, 4]);
        assert_eq!(ch.read(2).unwrap(), vec![1, 2]);
        assert_eq!(ch.read(2).unwrap(), vec![3, 4]);
    }

    #[test]
    fn read_past_scripted_bytes_is_server_gone_away() {
        let mut ch = Channel::mock(vec![1]);
        let err = ch.read(5).unwrap_err();
        match err {
            Error::Server { errno, .. } => assert_eq!(errno, 2006),
            other => panic!("expected Error::Server, got {other:?}"),
        }
    }
}
