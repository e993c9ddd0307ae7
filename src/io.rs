//! Reading edge lists and writing embeddings.  Files ending in `.gz` are transparently
//! (de)compressed.
use std::fs::File;
use std::io::{Write,BufWriter,Result as IOResult,BufReader,BufRead};

use fast_float::parse;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use ryu::Buffer;

use crate::algos::line::Embeddings;
use crate::error::{LineError,Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Space separated decimal values
    Text,

    /// Raw little endian f32s
    Binary
}

impl OutputFormat {
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary { OutputFormat::Binary } else { OutputFormat::Text }
    }
}

/// Writes embeddings as a `<vertices> <dims>` header followed by one `<name> <vector>` line per
/// vertex, in vertex order.
pub struct EmbeddingWriter<W: Write> {
    output: W,
    format: OutputFormat,
    buffer: String
}

impl EmbeddingWriter<Box<dyn Write>> {
    pub fn create(path: &str, format: OutputFormat, comp_level: Option<u32>) -> Result<Self> {
        let encoder = open_file_for_writing(path, comp_level)?;
        Ok(EmbeddingWriter::new(encoder, format))
    }
}

impl <W: Write> EmbeddingWriter<W> {

    pub fn new(output: W, format: OutputFormat) -> Self {
        EmbeddingWriter {
            output,
            format,
            buffer: String::new()
        }
    }

    pub fn write(&mut self, embeddings: &Embeddings) -> Result<()> {
        writeln!(&mut self.output, "{} {}", embeddings.len(), embeddings.dims())?;
        self.stream(embeddings.iter())
    }

    pub fn stream<'a>(&mut self, it: impl Iterator<Item=(&'a str, &'a [f32])>) -> Result<()> {
        let mut formatter = Buffer::new();

        for (name, emb) in it {
            match self.format {
                OutputFormat::Text => {
                    self.buffer.clear();
                    format_embedding(&mut formatter, &mut self.buffer, emb);
                    writeln!(&mut self.output, "{} {}", name, self.buffer)?;
                },
                OutputFormat::Binary => {
                    write!(&mut self.output, "{} ", name)?;
                    for wi in emb.iter() {
                        self.output.write_all(&wi.to_le_bytes())?;
                    }
                    writeln!(&mut self.output)?;
                }
            }
        }

        self.output.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

fn format_embedding(buff: &mut Buffer, output: &mut String, emb: &[f32]) {
    for (idx, wi) in emb.iter().enumerate() {
        if idx > 0 {
            output.push(' ');
        }
        output.push_str(buff.format(*wi));
    }
}

/// Parses lines in parallel chunks while handing records to `drain` in file order.
struct RecordReader {
    chunk_size: usize
}

impl RecordReader {
    pub fn new(chunk_size: usize) -> Self {
        RecordReader { chunk_size }
    }

    pub fn read<F,D,A>(
        &self,
        it: impl Iterator<Item=IOResult<String>>,
        mapper: F,
        mut drain: D
    ) -> Result<()>
        where F: Fn(usize, &str) -> Option<Result<A>> + Sync,
              A: Send,
              D: FnMut(A) -> Result<()>
    {
        let mut i = 0;
        let mut buffer = Vec::with_capacity(self.chunk_size);
        let mut p_buffer = Vec::with_capacity(self.chunk_size);
        for chunk in &it.chunks(self.chunk_size.max(1)) {
            buffer.clear();

            // Read lines into a buffer for parallelizing
            for line in chunk {
                buffer.push(line?);
            }

            buffer.par_iter().enumerate().map(|(idx, line)| {
                mapper(i + idx, line)
            }).collect_into_vec(&mut p_buffer);

            for record in p_buffer.drain(..).flatten() {
                drain(record?)?;
            }
            i += buffer.len();
        }
        Ok(())
    }
}

/// Parses `<u> <v> <w>`, separated by spaces or tabs.  Blank lines are skipped.
fn line_to_edge(i: usize, line: &str) -> Option<Result<(String, String, f64)>> {
    let pieces: Vec<_> = line.split_whitespace().collect();
    if pieces.is_empty() {
        return None
    }

    if pieces.len() != 3 {
        return Some(Err(LineError::Parse {
            line: i + 1,
            message: format!("Expected 3 fields, found {}", pieces.len())
        }))
    }

    let weight = match parse::<f64, _>(pieces[2]) {
        Ok(w) => w,
        Err(_) => return Some(Err(LineError::Parse {
            line: i + 1,
            message: format!("Invalid weight {:?}", pieces[2])
        }))
    };

    Some(Ok((pieces[0].to_string(), pieces[1].to_string(), weight)))
}

/// Reads a directed edge list.  Undirected edges need to be listed in both directions.
pub struct EdgeReader {
    chunk_size: usize
}

impl Default for EdgeReader {
    fn default() -> Self {
        EdgeReader { chunk_size: 10_000 }
    }
}

impl EdgeReader {
    pub fn new(chunk_size: usize) -> Self {
        EdgeReader { chunk_size }
    }

    pub fn load(&self, path: &str) -> Result<Vec<(String, String, f64)>> {
        let reader = open_file_for_reading(path)?;
        let edges = self.read(reader)?;
        info!("Read {} edges from {}", edges.len(), path);
        Ok(edges)
    }

    pub fn read(&self, reader: impl BufRead) -> Result<Vec<(String, String, f64)>> {
        let mut edges = Vec::new();
        RecordReader::new(self.chunk_size).read(reader.lines(), line_to_edge, |edge| {
            edges.push(edge);
            Ok(())
        })?;
        Ok(edges)
    }
}

pub fn open_file_for_reading(path: &str) -> IOResult<Box<dyn BufRead>> {
    let f = File::open(path)?;

    let f = BufReader::new(f);
    let result: Box<dyn BufRead> = if path.ends_with(".gz") {
        let decoder = BufReader::new(GzDecoder::new(f));
        Box::new(decoder)
    } else {
        Box::new(f)
    };
    Ok(result)
}

pub fn open_file_for_writing(path: &str, compression: Option<u32>) -> IOResult<Box<dyn Write>> {
    let comp_level = compression.map(Compression::new);
    let f = File::create(path)?;
    let bw = BufWriter::new(f);
    let encoder: Box<dyn Write> = if path.ends_with(".gz") {
        let e = GzEncoder::new(bw, comp_level.unwrap_or_else(Compression::fast));
        Box::new(e)
    } else {
        Box::new(bw)
    };
    Ok(encoder)
}
