//! Subnet resolution through the Team Cymru IP-to-ASN WHOIS service.

use super::SubnetResolver;
use crate::error::AppError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Upper bound on a verbose single-address answer.
const MAX_RESPONSE_BYTES: u64 = 16 * 1024;

/// WHOIS client asking `whois.cymru.com` for the BGP prefix of an address.
#[derive(Debug, Clone)]
pub struct CymruResolver {
    server: String,
    timeout: Duration,
}

impl CymruResolver {
    /// # Arguments
    /// - `server`: `host:port` of the WHOIS service.
    /// - `timeout`: Bound on connect, write and read combined.
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
        }
    }

    async fn query(&self, ip: IpAddr) -> Result<String, AppError> {
        let mut stream = TcpStream::connect(&self.server)
            .await
            .map_err(|err| AppError::Upstream(format!("WHOIS connect failed: {}", err)))?;
        stream
            .write_all(format!(" -v {}\n", ip).as_bytes())
            .await
            .map_err(|err| AppError::Upstream(format!("WHOIS write failed: {}", err)))?;

        let mut response = String::new();
        stream
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut response)
            .await
            .map_err(|err| AppError::Upstream(format!("WHOIS read failed: {}", err)))?;
        Ok(response)
    }
}

#[async_trait]
impl SubnetResolver for CymruResolver {
    async fn resolve(&self, addr: &str) -> Result<String, AppError> {
        let ip: IpAddr = addr
            .trim()
            .parse()
            .map_err(|_| AppError::Upstream(format!("Not an IP address: '{}'", addr)))?;
        let response = timeout(self.timeout, self.query(ip))
            .await
            .map_err(|_| AppError::Upstream("WHOIS lookup timed out".to_string()))??;
        parse_prefix(&response)
            .ok_or_else(|| AppError::Upstream(format!("No BGP prefix listed for {}", ip)))
    }
}

/// Extract the `BGP Prefix` column from a verbose Cymru answer.
///
/// ```text
/// AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name
/// 15169   | 8.8.8.8          | 8.8.8.0/24          | US | arin     | 2023-12-28 | GOOGLE, US
/// ```
pub fn parse_prefix(response: &str) -> Option<String> {
    response.lines().find_map(|line| {
        let columns: Vec<&str> = line.split('|').map(str::trim).collect();
        if columns.len() < 3 {
            return None;
        }
        let asn = columns[0];
        let prefix = columns[2];
        let is_data_row = asn.chars().all(|ch| ch.is_ascii_digit()) && !asn.is_empty();
        (is_data_row && prefix.contains('/')).then(|| prefix.to_string())
    })
}
