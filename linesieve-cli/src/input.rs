use linesieve::{EngineResult, SearchError};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{trace, warn};

// Files at or above this size are memory mapped instead of read into a buffer
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB
const BUFFER_CAPACITY: usize = 65536;

/// How invalid UTF-8 in an input file is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodingMode {
    /// Reject the file
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    Lossy,
}

impl EncodingMode {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "lossy" => EncodingMode::Lossy,
            _ => EncodingMode::FailFast,
        }
    }
}

/// Decodes bytes into a String according to the encoding mode
fn decode_bytes(bytes: &[u8], path: &Path, encoding_mode: EncodingMode) -> EngineResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| SearchError::encoding_error(path, e)),
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // Owned means at least one invalid sequence was replaced
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(cow.into_owned())
        }
    }
}

fn open(path: &Path) -> EngineResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SearchError::file_not_found(path),
        _ => SearchError::IoError(e),
    })
}

/// Reads a whole input file as text
pub fn read_document(path: &Path, encoding_mode: EncodingMode) -> EngineResult<String> {
    let file = open(path)?;
    let size = file.metadata()?.len();

    if size >= LARGE_FILE_THRESHOLD {
        trace!("Memory mapping {} ({} bytes)", path.display(), size);
        // SAFETY: the map is read-only and dropped before this function returns
        let mmap = unsafe { Mmap::map(&file)? };
        return decode_bytes(&mmap, path, encoding_mode);
    }

    trace!("Buffered read of {} ({} bytes)", path.display(), size);
    let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
    let mut bytes = Vec::with_capacity(size as usize);
    reader.read_to_end(&mut bytes)?;
    decode_bytes(&bytes, path, encoding_mode)
}

/// Reads all of standard input as text
pub fn read_stdin(encoding_mode: EncodingMode) -> EngineResult<String> {
    let mut bytes = Vec::new();
    io::stdin().lock().read_to_end(&mut bytes)?;
    decode_bytes(&bytes, Path::new("<stdin>"), encoding_mode)
}
