//! Destinations for decoded samples.

use crate::decoder::DecodedSample;
use std::io::{self, Write};

/// Header line of the text format, naming the fields of each sample line.
pub const TEXT_HEADER: &str = "timestamp sample_in_packet voltage_V current_A dp_V dn_V temp_C_ema energy_Ws capacity_As";

/// Receives samples in the order they were decoded.
pub trait SampleSink {
    /// Called once before the first sample.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn emit(&mut self, sample: &DecodedSample) -> io::Result<()>;

    /// Called after each report's samples have been emitted.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SampleSink for Vec<DecodedSample> {
    fn emit(&mut self, sample: &DecodedSample) -> io::Result<()> {
        self.push(*sample);
        Ok(())
    }
}

/// Space-separated text lines, one per sample, preceded by a header.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for TextSink<W> {
    fn begin(&mut self) -> io::Result<()> {
        // Leading blank line keeps concatenated logs separable in gnuplot
        writeln!(self.writer)?;
        writeln!(self.writer, "{TEXT_HEADER}")
    }

    fn emit(&mut self, sample: &DecodedSample) -> io::Result<()> {
        writeln!(self.writer, "{sample}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for JsonLinesSink<W> {
    fn emit(&mut self, sample: &DecodedSample) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, sample)?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
