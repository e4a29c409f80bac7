use crate::{FixSource, FixStream};
use chrono::{DateTime, Utc};
use common::{
    fix::Fix,
    provider::{Accuracy, PowerUsage, ProviderDescriptor, ProviderError},
};
use futures::StreamExt;
use gpsd_proto::{self, Mode, Tpv};
use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
    str::FromStr,
};
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info};

/// GPSD daemon based fix source.
///
/// Every opened stream uses its own connection to the daemon.
pub struct GpsdSource {
    descriptor: ProviderDescriptor,
    address: SocketAddr,
}

impl GpsdSource {
    pub const DEFAULT_ADDRESS: &'static str = "127.0.0.1:2947";
    pub const PROVIDER_ID: &'static str = "gpsd";

    /// Creates a source for the daemon listening on `address`.
    ///
    /// The connection is only established when a stream is opened.
    pub fn new(address: &str) -> Result<Self, io::Error> {
        let address: SocketAddr = address
            .parse()
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))?;
        Ok(GpsdSource {
            descriptor: ProviderDescriptor::new(Self::PROVIDER_ID, Accuracy::Fine, PowerUsage::High),
            address,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

/// Converts one line of the gpsd JSON protocol into a fix.
///
/// Only `TPV` reports with a position carry a fix, every other line yields
/// `None`. The fix time is taken from the report and falls back to now.
pub fn parse_tpv_line(line: &str) -> Option<Fix> {
    let tpv = serde_json::from_str::<Tpv>(line).ok()?;
    if matches!(tpv.mode, Mode::NoFix) {
        return None;
    }
    let lat = tpv.lat?;
    let lon = tpv.lon?;
    let timestamp = tpv
        .time
        .as_deref()
        .and_then(|time| DateTime::<Utc>::from_str(time).ok())
        .unwrap_or_else(Utc::now);
    Some(Fix::new(lat, lon, timestamp))
}

#[async_trait::async_trait]
impl FixSource for GpsdSource {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn open(&self) -> Result<FixStream, ProviderError> {
        let mut stream = TcpStream::connect(self.address)
            .await
            .map_err(|e| ProviderError::Connection(format!("{}: {e}", self.address)))?;
        stream
            .write_all(gpsd_proto::ENABLE_WATCH_CMD.as_bytes())
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        info!("Connected to gpsd at {}", self.address);
        let lines = Framed::new(stream, LinesCodec::new());
        let fixes = lines.filter_map(|line| async move {
            match line {
                Ok(line) => {
                    let fix = parse_tpv_line(&line);
                    if fix.is_none() {
                        debug!("Skipping gpsd message {line}");
                    }
                    fix.map(Ok)
                }
                Err(e) => Some(Err(ProviderError::Protocol(e.to_string()))),
            }
        });
        Ok(fixes.boxed())
    }
}
