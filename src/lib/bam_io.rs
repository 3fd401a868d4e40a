//! SAM/BAM file I/O.
//!
//! The rewrite pipeline sees input and output only through two small traits:
//!
//! - [`RecordSource`]: a header plus a forward-only, finite stream of records
//! - [`RecordSink`]: accepts records and is finalized with [`RecordSink::close`]
//!
//! [`AlignmentSource`] and [`AlignmentSink`] implement them over files. The format is chosen
//! from the path: `.sam` is text, anything else is BAM.
//!
//! # Threading Model
//!
//! BAM uses BGZF compression, which can be parallelized for both reading and writing:
//!
//! - **Single-threaded**: `threads=1` (lower overhead, good for small files)
//! - **Multi-threaded**: `threads>1` (noodles' multithreaded BGZF reader and writer)
//!
//! # Atomic output
//!
//! [`AlignmentSink`] writes to a hidden temporary file next to the output and renames it onto
//! the output path only when [`RecordSink::close`] succeeds. Dropping a sink without closing
//! it (including on any error) deletes the temporary file, so a failed run never leaves a
//! finalized output behind.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::num::NonZero;
use std::path::{Path, PathBuf};

use log::debug;
use noodles::bam;
use noodles::bgzf::io::{
    MultithreadedReader, MultithreadedWriter, Reader as BgzfReader, Writer as BgzfWriter,
};
use noodles::sam;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::RecordBuf;
use tempfile::TempPath;

use crate::errors::{Result, RgError};

/// Container format of an alignment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    /// Plain-text SAM
    Sam,
    /// BGZF-compressed BAM
    Bam,
}

impl AlignmentFormat {
    /// `.sam` (any case) is SAM; everything else is BAM.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("sam") => Self::Sam,
            _ => Self::Bam,
        }
    }
}

/// Enum wrapping single-threaded and multi-threaded BGZF readers.
pub enum BgzfReaderEnum {
    /// Single-threaded BGZF reader (lower overhead for small files)
    SingleThreaded(BgzfReader<File>),
    /// Multi-threaded BGZF reader
    MultiThreaded(MultithreadedReader<File>),
}

impl BgzfReaderEnum {
    fn new(file: File, threads: usize) -> Self {
        match NonZero::new(threads) {
            Some(worker_count) if threads > 1 => {
                Self::MultiThreaded(MultithreadedReader::with_worker_count(worker_count, file))
            }
            _ => Self::SingleThreaded(BgzfReader::new(file)),
        }
    }
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.read(buf),
            BgzfReaderEnum::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.fill_buf(),
            BgzfReaderEnum::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.consume(amt),
            BgzfReaderEnum::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// Enum wrapping single-threaded and multi-threaded BGZF writers
pub enum BgzfWriterEnum {
    /// Single-threaded BGZF writer
    SingleThreaded(BgzfWriter<File>),
    /// Multi-threaded BGZF writer
    MultiThreaded(MultithreadedWriter<File>),
}

impl BgzfWriterEnum {
    fn new(file: File, threads: usize) -> Self {
        match NonZero::new(threads) {
            Some(worker_count) if threads > 1 => {
                Self::MultiThreaded(MultithreadedWriter::with_worker_count(worker_count, file))
            }
            _ => Self::SingleThreaded(BgzfWriter::new(file)),
        }
    }

    /// Flush all blocks and write the BGZF EOF marker.
    ///
    /// # Errors
    /// Returns an error if flushing or finalizing the writer fails.
    pub fn finish(self) -> io::Result<()> {
        match self {
            BgzfWriterEnum::SingleThreaded(mut w) => w.try_finish(),
            BgzfWriterEnum::MultiThreaded(mut w) => w.finish().map(drop),
        }
    }
}

impl Write for BgzfWriterEnum {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.write(buf),
            BgzfWriterEnum::MultiThreaded(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BgzfWriterEnum::SingleThreaded(w) => w.flush(),
            BgzfWriterEnum::MultiThreaded(w) => w.flush(),
        }
    }
}

/// Type alias for a BAM reader that supports both single and multi-threaded BGZF.
pub type BamReaderAuto = bam::io::Reader<BgzfReaderEnum>;

/// Type alias for a BAM writer that supports both single and multi-threaded BGZF
pub type BamWriter = bam::io::Writer<BgzfWriterEnum>;

/// A forward-only stream of records with the header that describes them.
pub trait RecordSource {
    /// The header read from the start of the input.
    fn header(&self) -> &Header;

    /// The next record, or `None` at end of input.
    ///
    /// # Errors
    /// Returns `Decode` if the record is malformed or cannot be read
    fn next_record(&mut self) -> Result<Option<RecordBuf>>;
}

/// Destination for records.
pub trait RecordSink {
    /// Write one record.
    ///
    /// # Errors
    /// Returns `Encode` if the record cannot be written
    fn write_record(&mut self, record: &RecordBuf) -> Result<()>;

    /// Records accepted so far.
    fn records_written(&self) -> u64;

    /// Finalize the output. Output is only complete once this returns `Ok`; a sink dropped
    /// without closing leaves nothing behind.
    ///
    /// # Errors
    /// Returns `Encode` if the output cannot be finalized
    fn close(self) -> Result<()>;
}

enum AlignmentReader {
    Sam(sam::io::Reader<BufReader<File>>),
    Bam(BamReaderAuto),
}

impl AlignmentReader {
    fn read_record_buf(&mut self, header: &Header, record: &mut RecordBuf) -> io::Result<usize> {
        match self {
            Self::Sam(r) => r.read_record_buf(header, record),
            Self::Bam(r) => r.read_record_buf(header, record),
        }
    }
}

/// Reads records from a SAM or BAM file.
pub struct AlignmentSource {
    path: PathBuf,
    header: Header,
    reader: AlignmentReader,
    records_read: u64,
}

impl AlignmentSource {
    /// Open `path` and read its header.
    ///
    /// # Errors
    /// Returns `Source` if the file cannot be opened or the header cannot be parsed
    pub fn open<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let source_error = |source: io::Error| RgError::Source { path: path.clone(), source };

        let file = File::open(&path).map_err(source_error)?;
        let (reader, header) = match AlignmentFormat::from_path(&path) {
            AlignmentFormat::Sam => {
                let mut reader = sam::io::Reader::new(BufReader::new(file));
                let header = reader.read_header().map_err(source_error)?;
                (AlignmentReader::Sam(reader), header)
            }
            AlignmentFormat::Bam => {
                let mut reader = bam::io::Reader::from(BgzfReaderEnum::new(file, threads));
                let header = reader.read_header().map_err(source_error)?;
                (AlignmentReader::Bam(reader), header)
            }
        };

        Ok(Self { path, header, reader, records_read: 0 })
    }

    /// Records successfully decoded so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }
}

impl RecordSource for AlignmentSource {
    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<RecordBuf>> {
        let mut record = RecordBuf::default();
        match self.reader.read_record_buf(&self.header, &mut record) {
            Ok(0) => Ok(None),
            Ok(_) => {
                self.records_read += 1;
                Ok(Some(record))
            }
            Err(source) => Err(RgError::Decode {
                path: self.path.clone(),
                record_number: self.records_read + 1,
                source,
            }),
        }
    }
}

enum AlignmentWriter {
    Sam(sam::io::Writer<BufWriter<File>>),
    Bam(BamWriter),
}

impl AlignmentWriter {
    fn write_header(&mut self, header: &Header) -> io::Result<()> {
        match self {
            Self::Sam(w) => w.write_header(header),
            Self::Bam(w) => w.write_header(header),
        }
    }

    fn write_record(&mut self, header: &Header, record: &RecordBuf) -> io::Result<()> {
        match self {
            Self::Sam(w) => w.write_alignment_record(header, record),
            Self::Bam(w) => w.write_alignment_record(header, record),
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Self::Sam(w) => w.into_inner().flush(),
            Self::Bam(w) => w.into_inner().finish(),
        }
    }
}

/// Writes records to a SAM or BAM file via a staging file that is renamed on close.
pub struct AlignmentSink {
    output: PathBuf,
    staging: TempPath,
    header: Header,
    writer: AlignmentWriter,
    presorted: bool,
    records_written: u64,
}

impl AlignmentSink {
    /// Create the staging file next to `output` and write `header` to it.
    ///
    /// `presorted` records whether records will arrive already in the header's declared order.
    ///
    /// # Errors
    /// Returns `Encode` if the staging file cannot be created or the header cannot be written
    pub fn create<P: AsRef<Path>>(
        output: P,
        header: &Header,
        presorted: bool,
        threads: usize,
    ) -> Result<Self> {
        let output = output.as_ref().to_path_buf();
        let encode_error = |source: io::Error| RgError::Encode { path: output.clone(), source };

        let dir = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let (file, staging) = tempfile::Builder::new()
            .prefix(".fgrg.")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(encode_error)?
            .into_parts();

        let mut writer = match AlignmentFormat::from_path(&output) {
            AlignmentFormat::Sam => AlignmentWriter::Sam(sam::io::Writer::new(BufWriter::new(file))),
            AlignmentFormat::Bam => {
                AlignmentWriter::Bam(bam::io::Writer::from(BgzfWriterEnum::new(file, threads)))
            }
        };
        writer.write_header(header).map_err(encode_error)?;

        debug!(
            "Staging output {} at {} (presorted: {presorted})",
            output.display(),
            staging.display()
        );

        Ok(Self { output, staging, header: header.clone(), writer, presorted, records_written: 0 })
    }

    /// Whether records arrive in the header's declared order.
    #[must_use]
    pub fn is_presorted(&self) -> bool {
        self.presorted
    }
}

impl RecordSink for AlignmentSink {
    fn write_record(&mut self, record: &RecordBuf) -> Result<()> {
        self.writer
            .write_record(&self.header, record)
            .map_err(|source| RgError::Encode { path: self.output.clone(), source })?;
        self.records_written += 1;
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records_written
    }

    fn close(self) -> Result<()> {
        let Self { output, staging, writer, .. } = self;
        let encode_error = |source: io::Error| RgError::Encode { path: output.clone(), source };

        writer.finish().map_err(encode_error)?;
        staging.persist(&output).map_err(|e| encode_error(e.error))?;
        Ok(())
    }
}
