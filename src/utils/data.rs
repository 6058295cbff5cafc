use crate::models::EventRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Consumer of scraped records, fed one record at a time as they are parsed
pub trait RecordSink {
    fn consume(&mut self, record: &EventRecord) -> Result<()>;

    /// Called once after the last record
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<EventRecord> {
    fn consume(&mut self, record: &EventRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jsonl,
    Csv,
    Text,
}

/// One JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn consume(&mut self, record: &EventRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record).context("Failed to serialize event")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush output")
    }
}

/// CSV with a header row written before the first record
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn consume(&mut self, record: &EventRecord) -> Result<()> {
        self.writer
            .serialize(record)
            .context("Failed to write CSV row")?;
        // Keep rows visible to whoever tails the file
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV output")
    }
}

pub struct TextSink<W: Write> {
    writer: W,
    count: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn consume(&mut self, record: &EventRecord) -> Result<()> {
        self.count += 1;
        writeln!(self.writer, "{}. {}", self.count, record.format())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.count == 0 {
            writeln!(self.writer, "No upcoming events found.")?;
        }
        self.writer.flush().context("Failed to flush output")
    }
}

/// Output file written in the target's directory and moved over the target
/// only by `finish`. A run that fails before finishing leaves any previous
/// file untouched.
pub struct StagedFileSink {
    sink: Box<dyn RecordSink>,
    staging: Option<NamedTempFile>,
    target: PathBuf,
}

impl StagedFileSink {
    pub fn create(format: OutputFormat, target: &Path) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create output file in {}", dir.display()))?;
        let file = staging
            .as_file()
            .try_clone()
            .context("Failed to open staged output file")?;

        Ok(Self {
            sink: format_sink(format, Box::new(BufWriter::new(file))),
            staging: Some(staging),
            target: target.to_path_buf(),
        })
    }
}

impl RecordSink for StagedFileSink {
    fn consume(&mut self, record: &EventRecord) -> Result<()> {
        self.sink.consume(record)
    }

    fn finish(&mut self) -> Result<()> {
        self.sink.finish()?;
        if let Some(staging) = self.staging.take() {
            staging
                .persist(&self.target)
                .with_context(|| format!("Failed to save output file {}", self.target.display()))?;
        }
        Ok(())
    }
}

fn format_sink(format: OutputFormat, writer: Box<dyn Write>) -> Box<dyn RecordSink> {
    match format {
        OutputFormat::Jsonl => Box::new(JsonLinesSink::new(writer)),
        OutputFormat::Csv => Box::new(CsvSink::new(writer)),
        OutputFormat::Text => Box::new(TextSink::new(writer)),
    }
}

/// Build a sink writing to `path`, or stdout when no path is given
pub fn open_sink(format: OutputFormat, path: Option<&Path>) -> Result<Box<dyn RecordSink>> {
    Ok(match path {
        Some(path) => Box::new(StagedFileSink::create(format, path)?),
        None => format_sink(format, Box::new(std::io::stdout())),
    })
}

/// Load records back from a JSON lines file
pub fn load_records_from_jsonl(path: &Path) -> Result<Vec<EventRecord>> {
    let file = File::open(path).context("Failed to open records file")?;
    let mut records = Vec::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read records file")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line)
            .with_context(|| format!("Failed to deserialize record on line {}", number + 1))?;
        records.push(record);
    }

    Ok(records)
}
