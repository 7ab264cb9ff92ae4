use crate::constants::PAYLOAD_BUFFER;
use bytes::Bytes;
use sagemaker_mlflow_core::hash::{hex_sha256, hex_sha256_reader, EMPTY_STRING_SHA256};
use sagemaker_mlflow_core::{Error, Result};
use std::fmt::{Debug, Formatter};
use std::io::{Read, Seek, SeekFrom};

/// Readers that can also seek, the only streams a request body may be.
pub trait ReadSeek: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> ReadSeek for T {}

/// Body of a request handed to [`MlflowSigner`](crate::MlflowSigner).
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// In-memory body.
    Bytes(Bytes),
    /// Seekable stream, e.g. an open file.
    Seekable(Box<dyn ReadSeek>),
    /// Stream that can't rewind.
    ///
    /// Its payload can't be hashed without consuming it, so signing rejects it.
    Stream(Box<dyn Read + Send + Sync>),
}

impl Body {
    /// Wrap a seekable stream.
    pub fn seekable(r: impl Read + Seek + Send + Sync + 'static) -> Self {
        Body::Seekable(Box::new(r))
    }

    /// Wrap a stream that can't rewind.
    pub fn stream(r: impl Read + Send + Sync + 'static) -> Self {
        Body::Stream(Box::new(r))
    }

    /// Read the whole body into memory.
    ///
    /// Streams are read from their current position.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bs) => Ok(bs),
            Body::Seekable(mut r) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                Ok(buf.into())
            }
            Body::Stream(mut r) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                Ok(buf.into())
            }
        }
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Bytes(bs) => write!(f, "Bytes({} bytes)", bs.len()),
            Body::Seekable(_) => f.write_str("Seekable"),
            Body::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bs: Bytes) -> Self {
        Body::Bytes(bs)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bs: Vec<u8>) -> Self {
        Body::Bytes(bs.into())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(s.into())
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(s))
    }
}

/// Hex encoded SHA256 of the payload, the value of `x-amz-content-sha256`.
///
/// Seekable streams are hashed from their current position in 1 MiB chunks
/// and rewound to that position afterwards.
pub fn payload_sha256(body: &mut Body) -> Result<String> {
    match body {
        Body::Empty => Ok(EMPTY_STRING_SHA256.to_string()),
        Body::Bytes(bs) if bs.is_empty() => Ok(EMPTY_STRING_SHA256.to_string()),
        Body::Bytes(bs) => Ok(hex_sha256(bs)),
        Body::Seekable(r) => {
            let position = r.stream_position()?;
            let checksum = hex_sha256_reader(r, PAYLOAD_BUFFER);
            r.seek(SeekFrom::Start(position))?;
            Ok(checksum?)
        }
        Body::Stream(_) => Err(Error::signing_contract_violation(
            "request body must be empty, bytes or a seekable stream",
        )),
    }
}
