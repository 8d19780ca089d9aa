use super::OutcomeRecord;
use crate::pipeline::StatusSink;
use crate::validation::ArtifactOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Appends one JSON object per outcome.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open outcome log {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> StatusSink for JsonLinesSink<W> {
    fn record(&mut self, outcome: &ArtifactOutcome) -> Result<()> {
        let record = OutcomeRecord::from_outcome(outcome, Utc::now());
        serde_json::to_writer(&mut self.writer, &record).context("Failed to serialize outcome")?;
        writeln!(self.writer).context("Failed to write outcome")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }
}

pub fn read_outcomes(path: &Path) -> Result<Vec<OutcomeRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open outcome log {}", path.display()))?;
    BufReader::new(file)
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .map(|(idx, line)| {
            let line = line?;
            serde_json::from_str(&line).with_context(|| format!("Invalid outcome on line {}", idx + 1))
        })
        .collect()
}
