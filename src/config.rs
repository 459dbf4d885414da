//! Service configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::convert::tools::{default_office_binary, DEFAULT_DPI};
use crate::convert::{Converters, OfficeRenderer, Rasterizer};
use crate::error::{Error, Result};
use crate::pdf::fonts::FontBook;
use crate::session::SessionRoot;

/// First port tried when the port is left to discovery
pub const DEFAULT_PORT: u16 = 3000;

/// How many consecutive ports discovery tries
pub const PORT_PROBE_ATTEMPTS: u16 = 100;

/// Default request body limit (256 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Everything the HTTP service needs to start
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: IpAddr,
    /// 0 means probe upward from [`DEFAULT_PORT`]
    pub port: u16,
    /// Parent of the per-request session directories
    pub temp_root: PathBuf,
    /// Directory holding `*-Regular` / `*-Bold` font files
    pub fonts_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub pdftoppm: PathBuf,
    pub soffice: PathBuf,
    pub raster_dpi: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            temp_root: SessionRoot::default_location(),
            fonts_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pdftoppm: PathBuf::from("pdftoppm"),
            soffice: PathBuf::from(default_office_binary()),
            raster_dpi: DEFAULT_DPI,
        }
    }
}

impl ServiceConfig {
    /// Bind the configured port, or the first free one when it is 0
    pub fn bind(&self) -> Result<TcpListener> {
        if self.port == 0 {
            return bind_free_port(self.host, DEFAULT_PORT, PORT_PROBE_ATTEMPTS);
        }
        Ok(TcpListener::bind(SocketAddr::new(self.host, self.port))?)
    }

    pub fn fonts(&self) -> FontBook {
        match &self.fonts_dir {
            Some(dir) => FontBook::from_dir(dir),
            None => FontBook::standard(),
        }
    }

    pub fn converters(&self) -> Converters {
        Converters::new(
            Box::new(Rasterizer {
                binary: self.pdftoppm.clone(),
                dpi: self.raster_dpi,
            }),
            Box::new(OfficeRenderer {
                binary: self.soffice.clone(),
            }),
        )
    }

    pub fn session_root(&self) -> Result<SessionRoot> {
        SessionRoot::new(&self.temp_root)
    }
}

/// Bind the first free port in `start..start + attempts`.
///
/// Returning the bound listener rather than the number leaves no window in
/// which another process could take the port.
pub fn bind_free_port(host: IpAddr, start: u16, attempts: u16) -> Result<TcpListener> {
    for port in (start..=u16::MAX).take(attempts as usize) {
        match TcpListener::bind(SocketAddr::new(host, port)) {
            Ok(listener) => {
                info!("found free port {}", port);
                return Ok(listener);
            }
            Err(e) => debug!("port {} unavailable: {}", port, e),
        }
    }
    Err(Error::General(format!(
        "No free port in {}..{}",
        start,
        start.saturating_add(attempts)
    )))
}
