//! Streaming reader, writer and chunker for Wikidata JSON dumps.
//!
//! A dump is one JSON array with one entity object per line, optionally gzip or bzip2
//! compressed. The reader never holds more than one line in memory and accepts both
//! the strict array form and a bare stream of newline-delimited objects.

use crate::config::{CHUNK_INDEX_WIDTH, DEFAULT_LINES_PER_CHUNK, READ_BUFFER_SIZE, WRITE_BUFFER_SIZE};
use crate::error::{Error, Result};
use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    /// File name suffix for a dump in this compression.
    pub fn extension(self) -> &'static str {
        match self {
            Compression::None => "json",
            Compression::Gzip => "json.gz",
            Compression::Bzip2 => "json.bz2",
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        split_dump_name(path).map(|(_, compression)| compression)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
        })
    }
}

/// Splits `dir/name.json[.gz|.bz2]` into `dir/name` and the compression.
fn split_dump_name(path: &Path) -> Result<(PathBuf, Compression)> {
    let unsupported = || Error::UnsupportedCompression {
        path: path.to_path_buf(),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(unsupported)?;

    let (stem, compression) = if let Some(stem) = name.strip_suffix(".json.bz2") {
        (stem, Compression::Bzip2)
    } else if let Some(stem) = name.strip_suffix(".json.gz") {
        (stem, Compression::Gzip)
    } else if let Some(stem) = name.strip_suffix(".json") {
        (stem, Compression::None)
    } else {
        return Err(unsupported());
    };
    if stem.is_empty() {
        return Err(unsupported());
    }
    Ok((path.with_file_name(stem), compression))
}

/// Strips array punctuation (`[`, `]`, trailing `,`) and whitespace from one dump line.
/// Wrapper-only lines come back empty.
pub fn entity_slice(line: &[u8]) -> &[u8] {
    let mut s = line.trim_ascii();
    if let Some(rest) = s.strip_prefix(b"[") {
        s = rest.trim_ascii_start();
    }
    if let Some(rest) = s.strip_suffix(b",") {
        s = rest.trim_ascii_end();
    }
    if let Some(rest) = s.strip_suffix(b"]") {
        let rest = rest.trim_ascii_end();
        // only the closing bracket of the array, never one belonging to the object
        if rest.is_empty() || rest.ends_with(b"}") {
            s = rest;
        }
    }
    s
}

fn parse_object(line: &[u8]) -> std::result::Result<Value, String> {
    let value: Value = serde_json::from_slice(line).map_err(|e| e.to_string())?;
    if value.is_object() {
        Ok(value)
    } else {
        Err("expected a JSON object".to_string())
    }
}

enum DumpStream {
    Plain(BufReader<File>),
    Gzip(BufReader<MultiGzDecoder<File>>),
    Bzip2(BufReader<MultiBzDecoder<File>>),
}

impl DumpStream {
    fn open(path: &Path, compression: Compression) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(match compression {
            Compression::None => {
                DumpStream::Plain(BufReader::with_capacity(READ_BUFFER_SIZE, file))
            }
            Compression::Gzip => DumpStream::Gzip(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiGzDecoder::new(file),
            )),
            Compression::Bzip2 => DumpStream::Bzip2(BufReader::with_capacity(
                READ_BUFFER_SIZE,
                MultiBzDecoder::new(file),
            )),
        })
    }

    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            DumpStream::Plain(r) => r.read_until(b'\n', buf),
            DumpStream::Gzip(r) => r.read_until(b'\n', buf),
            DumpStream::Bzip2(r) => r.read_until(b'\n', buf),
        }
    }
}

/// Forward-only iterator over the entity dictionaries of one dump file.
///
/// Each call decodes one line. A line that is not a JSON object yields
/// [`Error::MalformedDumpLine`] and iteration continues with the next line; an I/O or
/// decompression failure ends the iteration. Restarting means opening a new reader.
/// The file is closed when the reader is dropped, including after an early `break`.
pub struct DumpReader {
    stream: DumpStream,
    buf: Vec<u8>,
    line_number: u64,
    done: bool,
}

impl DumpReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        WikidataJsonDump::new(path)?.open()
    }

    /// Number of physical lines consumed so far, wrapper lines included.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Next entity line with array punctuation removed, skipping wrapper lines.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        loop {
            self.buf.clear();
            let read = match self.stream.read_line(&mut self.buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Err(e.into());
                }
            };
            if read == 0 {
                self.done = true;
                return Ok(None);
            }
            self.line_number += 1;
            if !entity_slice(&self.buf).is_empty() {
                return Ok(Some(entity_slice(&self.buf)));
            }
        }
    }

    /// Raw entity lines as strings instead of decoded dictionaries.
    pub fn lines(self) -> DumpLines {
        DumpLines { reader: self }
    }
}

impl Iterator for DumpReader {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let parsed = match self.next_line() {
            Ok(Some(line)) => parse_object(line),
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        Some(parsed.map_err(|reason| Error::MalformedDumpLine {
            line_number: self.line_number,
            reason,
        }))
    }
}

pub struct DumpLines {
    reader: DumpReader,
}

impl Iterator for DumpLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = match self.reader.next_line() {
            Ok(Some(line)) => line.to_vec(),
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };
        Some(
            String::from_utf8(bytes).map_err(|e| Error::MalformedDumpLine {
                line_number: self.reader.line_number,
                reason: e.to_string(),
            }),
        )
    }
}

enum DumpSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
}

impl DumpSink {
    fn create(path: &Path, compression: Compression) -> io::Result<Self> {
        let writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, File::create(path)?);
        Ok(match compression {
            Compression::None => DumpSink::Plain(writer),
            Compression::Gzip => {
                DumpSink::Gzip(GzEncoder::new(writer, flate2::Compression::default()))
            }
            Compression::Bzip2 => {
                DumpSink::Bzip2(BzEncoder::new(writer, bzip2::Compression::default()))
            }
        })
    }

    fn finish(self) -> io::Result<()> {
        let mut writer = match self {
            DumpSink::Plain(w) => w,
            DumpSink::Gzip(e) => e.finish()?,
            DumpSink::Bzip2(e) => e.finish()?,
        };
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

impl Write for DumpSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            DumpSink::Plain(w) => w.write(buf),
            DumpSink::Gzip(w) => w.write(buf),
            DumpSink::Bzip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            DumpSink::Plain(w) => w.flush(),
            DumpSink::Gzip(w) => w.flush(),
            DumpSink::Bzip2(w) => w.flush(),
        }
    }
}

/// Writes entities as a dump file readable by [`DumpReader`].
///
/// Output goes to a `.tmp` sibling that is renamed into place by [`DumpWriter::finish`];
/// a writer dropped before finishing removes its temporary file.
pub struct DumpWriter {
    sink: Option<DumpSink>,
    path: PathBuf,
    tmp_path: PathBuf,
    entities: u64,
}

impl DumpWriter {
    /// Creates a writer whose compression follows the path's extension.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::with_compression(path, Compression::from_path(path)?)
    }

    pub fn with_compression(path: impl AsRef<Path>, compression: Compression) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = OsString::from(path.as_os_str());
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut sink = DumpSink::create(&tmp_path, compression)?;
        sink.write_all(b"[\n")?;
        Ok(Self {
            sink: Some(sink),
            path,
            tmp_path,
            entities: 0,
        })
    }

    pub fn entities(&self) -> u64 {
        self.entities
    }

    fn sink(&mut self) -> io::Result<&mut DumpSink> {
        self.sink
            .as_mut()
            .ok_or_else(|| io::Error::other("dump writer already finished"))
    }

    /// Appends one entity line as read by [`DumpReader::next_line`].
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        let first = self.entities == 0;
        let sink = self.sink()?;
        if !first {
            sink.write_all(b",\n")?;
        }
        sink.write_all(line)?;
        self.entities += 1;
        Ok(())
    }

    pub fn write_entity(&mut self, entity: &Value) -> Result<()> {
        let line = serde_json::to_vec(entity).map_err(io::Error::from)?;
        self.write_line(&line)
    }

    /// Closes the array, flushes the encoder and moves the file to its final name.
    pub fn finish(mut self) -> Result<PathBuf> {
        let mut sink = self
            .sink
            .take()
            .ok_or_else(|| io::Error::other("dump writer already finished"))?;
        let closing: &[u8] = if self.entities == 0 { b"]\n" } else { b"\n]\n" };
        sink.write_all(closing)?;
        sink.finish()?;
        fs::rename(&self.tmp_path, &self.path)?;
        Ok(self.path.clone())
    }
}

impl Drop for DumpWriter {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            drop(sink);
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

/// Writes `entities` to `path` as a dump; returns how many were written.
pub fn write_entities<'a, I>(path: impl AsRef<Path>, entities: I) -> Result<u64>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut writer = DumpWriter::create(path)?;
    for entity in entities {
        writer.write_entity(entity)?;
    }
    let count = writer.entities();
    writer.finish()?;
    Ok(count)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    pub lines_per_chunk: usize,
    pub max_chunks: Option<usize>,
    /// Chunk name prefix; defaults to the source path without its extension.
    pub out_base: Option<PathBuf>,
    /// Chunk compression; defaults to the source's.
    pub compression: Option<Compression>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            lines_per_chunk: DEFAULT_LINES_PER_CHUNK,
            max_chunks: None,
            out_base: None,
            compression: None,
        }
    }
}

impl ChunkOptions {
    pub fn new(lines_per_chunk: usize) -> Self {
        Self {
            lines_per_chunk,
            ..Self::default()
        }
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = Some(max_chunks);
        self
    }

    pub fn with_out_base(mut self, out_base: impl Into<PathBuf>) -> Self {
        self.out_base = Some(out_base.into());
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }
}

/// A dump file on disk: its path, compression and the basename chunks are named from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikidataJsonDump {
    path: PathBuf,
    basename: PathBuf,
    compression: Compression,
}

impl WikidataJsonDump {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (basename, compression) = split_dump_name(&path)?;
        Ok(Self {
            path,
            basename,
            compression,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn basename(&self) -> &Path {
        &self.basename
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Opens a fresh reader positioned at the start of the file.
    pub fn open(&self) -> Result<DumpReader> {
        debug!(path = ?self.path, compression = %self.compression, "Opening dump");
        Ok(DumpReader {
            stream: DumpStream::open(&self.path, self.compression)?,
            buf: Vec::with_capacity(64 * 1024),
            line_number: 0,
            done: false,
        })
    }

    pub fn iter_lines(&self) -> Result<DumpLines> {
        Ok(self.open()?.lines())
    }

    pub fn chunk_path(out_base: &Path, index: usize, compression: Compression) -> PathBuf {
        let mut name = OsString::from(out_base.as_os_str());
        name.push(format!(
            "-ichunk_{:0width$}.{}",
            index,
            compression.extension(),
            width = CHUNK_INDEX_WIDTH
        ));
        PathBuf::from(name)
    }

    /// Splits the dump into files of `lines_per_chunk` entities each.
    pub fn create_chunks(
        &self,
        lines_per_chunk: usize,
        max_chunks: Option<usize>,
    ) -> Result<Vec<PathBuf>> {
        let mut options = ChunkOptions::new(lines_per_chunk);
        options.max_chunks = max_chunks;
        self.create_chunks_with(&options)
    }

    /// Re-reads the dump from the start and writes consecutive entity lines into
    /// independently readable chunk files, returning their paths in order.
    pub fn create_chunks_with(&self, options: &ChunkOptions) -> Result<Vec<PathBuf>> {
        if options.lines_per_chunk == 0 {
            return Err(Error::invalid(
                "chunk options",
                "lines per chunk must be at least 1",
            ));
        }
        let compression = options.compression.unwrap_or(self.compression);
        let out_base = options.out_base.as_deref().unwrap_or(&self.basename);
        let max_chunks = options.max_chunks.unwrap_or(usize::MAX);

        let mut written = Vec::new();
        if max_chunks == 0 {
            return Ok(written);
        }

        let mut reader = self.open()?;
        let mut current: Option<DumpWriter> = None;

        while let Some(line) = reader.next_line()? {
            let mut writer = match current.take() {
                Some(w) => w,
                None => DumpWriter::with_compression(
                    Self::chunk_path(out_base, written.len(), compression),
                    compression,
                )?,
            };
            writer.write_line(line)?;

            if writer.entities() >= options.lines_per_chunk as u64 {
                let path = writer.finish()?;
                debug!(path = ?path, "Chunk written");
                written.push(path);
                if written.len() >= max_chunks {
                    break;
                }
            } else {
                current = Some(writer);
            }
        }

        if let Some(writer) = current {
            let path = writer.finish()?;
            debug!(path = ?path, "Chunk written");
            written.push(path);
        }

        info!(
            source = ?self.path,
            chunks = written.len(),
            lines_per_chunk = options.lines_per_chunk,
            compression = %compression,
            "Chunking complete"
        );

        Ok(written)
    }
}

impl fmt::Display for WikidataJsonDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WikidataJsonDump(filename={})", self.path.display())
    }
}
