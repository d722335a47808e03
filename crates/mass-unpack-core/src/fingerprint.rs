use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::hash::Hasher as _;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;
use twox_hash::XxHash64;

pub(crate) const READ_CHUNK: usize = 8192;

/// How content identity is established when two files want the same path.
///
/// One strategy is fixed for a whole batch; fingerprints from different
/// strategies never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Length only. Equal sizes are treated as identical content, which is lossy.
    Size,
    /// Length plus XxHash64 over the full stream.
    #[default]
    HashFast,
    /// Length plus SHA-256 over the full stream.
    HashSha256,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Size => "size",
            Strategy::HashFast => "hash-fast",
            Strategy::HashSha256 => "hash-sha256",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "size" => Ok(Strategy::Size),
            "hash-fast" => Ok(Strategy::HashFast),
            "hash-sha256" => Ok(Strategy::HashSha256),
            other => Err(format!(
                "unknown collision strategy '{}' (expected size, hash-fast or hash-sha256)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub strategy: Strategy,
    pub size: u64,
    pub digest: Option<Vec<u8>>,
}

impl Fingerprint {
    pub fn digest_hex(&self) -> String {
        match &self.digest {
            Some(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            None => String::from("-"),
        }
    }
}

enum HashState {
    Length,
    Fast(XxHash64),
    Sha256(Sha256),
}

/// Incremental fingerprint computation, fed chunk by chunk.
pub struct FingerprintBuilder {
    strategy: Strategy,
    size: u64,
    state: HashState,
}

impl FingerprintBuilder {
    pub fn new(strategy: Strategy) -> Self {
        let state = match strategy {
            Strategy::Size => HashState::Length,
            Strategy::HashFast => HashState::Fast(XxHash64::with_seed(0)),
            Strategy::HashSha256 => HashState::Sha256(Sha256::new()),
        };
        Self {
            strategy,
            size: 0,
            state,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.size += data.len() as u64;
        match &mut self.state {
            HashState::Length => {}
            HashState::Fast(hasher) => hasher.write(data),
            HashState::Sha256(hasher) => hasher.update(data),
        }
    }

    pub fn finish(self) -> Fingerprint {
        let digest = match self.state {
            HashState::Length => None,
            HashState::Fast(hasher) => Some(hasher.finish().to_be_bytes().to_vec()),
            HashState::Sha256(hasher) => Some(hasher.finalize().to_vec()),
        };
        Fingerprint {
            strategy: self.strategy,
            size: self.size,
            digest,
        }
    }
}

/// Fingerprint a byte stream without holding it in memory.
pub fn compute<R: Read>(mut reader: R, strategy: Strategy) -> io::Result<Fingerprint> {
    let mut builder = FingerprintBuilder::new(strategy);
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        builder.update(&buffer[..n]);
    }
    Ok(builder.finish())
}

/// Fingerprint a file on disk. The size strategy reads metadata only.
pub fn compute_file(path: &Path, strategy: Strategy) -> io::Result<Fingerprint> {
    if strategy == Strategy::Size {
        let size = fs::metadata(path)?.len();
        return Ok(Fingerprint {
            strategy,
            size,
            digest: None,
        });
    }
    compute(File::open(path)?, strategy)
}

/// Writer adapter that fingerprints everything passing through it.
pub struct HashingWriter<W> {
    inner: W,
    builder: FingerprintBuilder,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W, strategy: Strategy) -> Self {
        Self {
            inner,
            builder: FingerprintBuilder::new(strategy),
        }
    }

    pub fn into_parts(self) -> (W, Fingerprint) {
        (self.inner, self.builder.finish())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.builder.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
