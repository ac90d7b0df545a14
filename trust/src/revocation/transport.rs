// Copyright (c) 2023 The MobileCoin Foundation

//! Opening CRL distribution points

use super::FetchSettings;
use reqwest::blocking::Client;
use reqwest::Url;
use std::fmt::Debug;
use std::io::{Cursor, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::debug;

const ANONYMOUS: &str = "anonymous";
const FTP_PORT: u16 = 21;

/// Error retrieving a single CRL.
///
/// These never escape [`super::RevocationFetcher::fetch()`], they are logged
/// against the distribution point that produced them.
#[derive(displaydoc::Display, Debug)]
pub enum FetchError {
    /// The URL is not valid: {0}
    InvalidUrl(String),
    /// The URL scheme {0} is not supported by this transport
    UnsupportedScheme(String),
    /// The request failed: {0}
    Transport(String),
    /// The server responded with status {0}
    Status(u16),
    /// I/O error while reading the response: {0}
    Io(std::io::Error),
    /// The CRL is larger than the limit of {0} bytes
    TooLarge(u64),
    /// The response is not a CRL: {0}
    Crl(crate::x509::Error),
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}

impl From<crate::x509::Error> for FetchError {
    fn from(e: crate::x509::Error) -> Self {
        FetchError::Crl(e)
    }
}

/// Opens a byte stream for a distribution point URI.
pub trait CrlTransport: Debug + Send + Sync {
    /// Open `uri` for reading.
    ///
    /// The stream is dropped once the CRL has been read or reading failed.
    fn open(&self, uri: &str) -> Result<Box<dyn Read + Send>, FetchError>;
}

impl<T: CrlTransport + ?Sized> CrlTransport for std::sync::Arc<T> {
    fn open(&self, uri: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        (**self).open(uri)
    }
}

fn parse(uri: &str) -> Result<Url, FetchError> {
    Url::parse(uri).map_err(|e| FetchError::InvalidUrl(e.to_string()))
}

/// Retrieves CRLs over HTTP(S).
///
/// Any other scheme is reported as [`FetchError::UnsupportedScheme`].
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the timeouts of `settings`.
    ///
    /// # Errors
    /// `Error::HttpClient` if the client cannot be built.
    pub fn new(settings: &FetchSettings) -> crate::Result<Self> {
        let client = Self::builder(settings).build()?;
        Ok(Self { client })
    }

    /// Create a transport whose HTTPS connections use `tls` for their trust
    /// decisions, usually one from [`crate::tls::client_config()`].
    ///
    /// # Errors
    /// `Error::HttpClient` if the client cannot be built.
    pub fn with_tls(settings: &FetchSettings, tls: rustls::ClientConfig) -> crate::Result<Self> {
        let client = Self::builder(settings)
            .use_preconfigured_tls(tls)
            .build()?;
        Ok(Self { client })
    }

    fn builder(settings: &FetchSettings) -> reqwest::blocking::ClientBuilder {
        Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
    }
}

impl CrlTransport for HttpTransport {
    fn open(&self, uri: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        let url = parse(uri)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(Box::new(response))
    }
}

/// Retrieves CRLs over FTP, logging in anonymously unless the URL carries
/// credentials.
///
/// The connect timeout bounds establishing the control connection, the
/// request timeout bounds each read on the control and data connections.
/// The session is closed before [`CrlTransport::open()`] returns, the body is
/// handed out from memory.
#[derive(Clone, Debug)]
pub struct FtpTransport {
    connect_timeout: Duration,
    timeout: Duration,
    max_size: u64,
}

impl FtpTransport {
    /// Create a transport with the limits of `settings`.
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            timeout: settings.timeout,
            max_size: settings.max_size,
        }
    }

    fn address(url: &Url) -> Result<SocketAddr, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{url} has no host")))?;
        let port = url.port_or_known_default().unwrap_or(FTP_PORT);
        (host, port)
            .to_socket_addrs()
            .map_err(|e| FetchError::Transport(e.to_string()))?
            .next()
            .ok_or_else(|| FetchError::Transport(format!("{host} did not resolve")))
    }

    fn connect(&self, url: &Url) -> Result<FtpStream, FetchError> {
        let stream = TcpStream::connect_timeout(&Self::address(url)?, self.connect_timeout)
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        // The greeting is read under the request timeout as well
        stream.set_read_timeout(Some(self.timeout))?;
        FtpStream::connect_with_stream(stream).map_err(ftp_error)
    }

    fn download(&self, control: &mut FtpStream, url: &Url) -> Result<Vec<u8>, FetchError> {
        let user = match url.username() {
            "" => ANONYMOUS,
            user => user,
        };
        control
            .login(user, url.password().unwrap_or(ANONYMOUS))
            .map_err(ftp_error)?;
        control
            .transfer_type(FileType::Binary)
            .map_err(ftp_error)?;

        let mut data = control
            .retr_as_stream(url.path().trim_start_matches('/'))
            .map_err(ftp_error)?;
        data.get_ref().set_read_timeout(Some(self.timeout))?;
        // One byte past the limit lets the fetcher tell an oversized CRL apart
        let mut body = Vec::new();
        (&mut data)
            .take(self.max_size.saturating_add(1))
            .read_to_end(&mut body)?;
        if let Err(error) = control.finalize_retr_stream(data) {
            debug!(%url, %error, "FTP transfer not confirmed");
        }
        Ok(body)
    }
}

fn ftp_error(error: suppaftp::FtpError) -> FetchError {
    FetchError::Transport(error.to_string())
}

impl CrlTransport for FtpTransport {
    fn open(&self, uri: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        let url = parse(uri)?;
        if url.scheme() != "ftp" {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let mut control = self.connect(&url)?;
        let body = self.download(&mut control, &url);
        if let Err(error) = control.quit() {
            debug!(%url, %error, "FTP session not closed cleanly");
        }
        Ok(Box::new(Cursor::new(body?)))
    }
}

/// Routes `http`, `https` and `ftp` URIs to the matching transport.
///
/// This is what [`super::RevocationFetcher::new()`] retrieves through.
#[derive(Clone, Debug)]
pub struct NetworkTransport {
    http: HttpTransport,
    ftp: FtpTransport,
}

impl NetworkTransport {
    /// Create a transport with the limits of `settings`.
    ///
    /// # Errors
    /// `Error::HttpClient` if the HTTP client cannot be built.
    pub fn new(settings: &FetchSettings) -> crate::Result<Self> {
        Ok(Self {
            http: HttpTransport::new(settings)?,
            ftp: FtpTransport::new(settings),
        })
    }

    /// Like [`NetworkTransport::new()`], with HTTPS trust decisions made by
    /// `tls`. See [`HttpTransport::with_tls()`].
    ///
    /// # Errors
    /// `Error::HttpClient` if the HTTP client cannot be built.
    pub fn with_tls(settings: &FetchSettings, tls: rustls::ClientConfig) -> crate::Result<Self> {
        Ok(Self {
            http: HttpTransport::with_tls(settings, tls)?,
            ftp: FtpTransport::new(settings),
        })
    }
}

impl CrlTransport for NetworkTransport {
    fn open(&self, uri: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        match parse(uri)?.scheme() {
            "http" | "https" => self.http.open(uri),
            "ftp" => self.ftp.open(uri),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
