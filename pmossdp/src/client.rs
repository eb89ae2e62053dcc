/*!
The SSDP client is a *control point*: it never binds UDP port 1900.

It binds an ephemeral port, sends one M-SEARCH to the multicast group and
waits for the unicast HTTP/200 answer of the device. The first datagram
received is the answer; there is no deduplication and no quorum.
*/

use super::{SCALAR_WEB_API_ST, SSDP_MULTICAST_ADDR, SSDP_PORT};
use crate::error::{Result, SsdpError};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace, warn};

/// Default time to wait for the first advertisement
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and what to search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Destination of the M-SEARCH (the SSDP multicast group by default)
    pub target: SocketAddr,
    /// ST header value
    pub search_target: String,
    /// Advertisement window requested from devices, in seconds
    pub mx: u32,
    /// How long to wait for the first answer
    pub timeout: Duration,
    /// USER-AGENT header value
    pub user_agent: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            target: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(239, 255, 255, 250)), SSDP_PORT),
            search_target: SCALAR_WEB_API_ST.to_string(),
            mx: 1,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            user_agent: concat!("PMOCamera/", env!("CARGO_PKG_VERSION"), " UPnP/1.0").to_string(),
        }
    }
}

/// Answer to an M-SEARCH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub location: String,
    pub st: Option<String>,
    pub usn: Option<String>,
    pub server: Option<String>,
    pub from: SocketAddr,
}

/// One-shot SSDP client
pub struct SsdpClient {
    socket: UdpSocket,
}

impl SsdpClient {
    /// Bind an ephemeral UDP socket able to reach `target`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(target: &SocketAddr) -> Result<Self> {
        let socket2 = Socket::new(Domain::for_address(*target), Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr = match target {
            SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        };
        socket2.bind(&bind_addr.into())?;

        if target.is_ipv4() {
            socket2.set_multicast_ttl_v4(4)?;
            socket2.set_multicast_loop_v4(true)?; // utile en dev local
        }
        socket2.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket2.into())?;
        debug!("SSDP client bound on {}", socket.local_addr()?);

        Ok(Self { socket })
    }

    /// Envoie un M-SEARCH pour un type donné
    pub async fn send_msearch(&self, options: &SearchOptions) -> Result<()> {
        let msg = build_msearch(options);

        match self.socket.send_to(msg.as_bytes(), options.target).await {
            Ok(_) => {
                info!(
                    "📤 M-SEARCH sent to {} (ST={}, MX={})",
                    options.target, options.search_target, options.mx
                );
                trace!("M-SEARCH payload:\n{}", msg);
                Ok(())
            }
            Err(e) => {
                warn!("❌ Failed to send M-SEARCH: {}", e);
                Err(e.into())
            }
        }
    }

    /// Wait for the first datagram and parse it as a search response.
    pub async fn recv_first(&self, timeout: Duration) -> Result<SearchResponse> {
        let mut buf = [0u8; 8192];

        let (n, from) = tokio::time::timeout(timeout, self.socket.recv_from(&mut buf))
            .await
            .map_err(|_| {
                warn!("❌ No SSDP answer within {:?}", timeout);
                SsdpError::NoAdvertisement(timeout)
            })??;

        let data = String::from_utf8_lossy(&buf[..n]);
        debug!("📥 SSDP answer from {} ({} bytes)", from, n);
        trace!("SSDP answer payload:\n{}", data);

        parse_search_response(&data, from)
    }

    /// Send one M-SEARCH and return the first answer. The socket is closed
    /// when this returns.
    pub async fn search_first(options: &SearchOptions) -> Result<SearchResponse> {
        let client = Self::new(&options.target)?;
        client.send_msearch(options).await?;
        client.recv_first(options.timeout).await
    }
}

/// Build the M-SEARCH datagram
pub fn build_msearch(options: &SearchOptions) -> String {
    let mx = options.mx.max(1); // MX doit être >= 1
    let host = if options.target.port() == SSDP_PORT && options.target.is_ipv4() {
        format!("{}:{}", SSDP_MULTICAST_ADDR, SSDP_PORT)
    } else {
        options.target.to_string()
    };

    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: {}\r\n\
         \r\n",
        host, mx, options.search_target, options.user_agent
    )
}

/// Parse an advertisement. Only the `LOCATION` header is mandatory.
pub fn parse_search_response(data: &str, from: SocketAddr) -> Result<SearchResponse> {
    let mut lines = data.lines();
    let status_line = lines.next().unwrap_or_default().trim();
    trace!("SSDP status line from {}: {}", from, status_line);

    let mut headers = parse_headers(lines);

    let location = headers
        .remove("LOCATION")
        .ok_or(SsdpError::MissingLocation { from })?;

    Ok(SearchResponse {
        location,
        st: headers.remove("ST"),
        usn: headers.remove("USN"),
        server: headers.remove("SERVER"),
        from,
    })
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();

        // Empty line marks end of headers
        if line.is_empty() {
            break;
        }

        // Split on first ':' only (values may contain ':')
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_uppercase();
            let value = value.trim();

            if !name.is_empty() && !value.is_empty() {
                headers.insert(name, value.to_string());
            } else {
                trace!("Skipping malformed header: '{}'", line);
            }
        } else {
            trace!("Skipping line without colon: '{}'", line);
        }
    }
    headers
}
