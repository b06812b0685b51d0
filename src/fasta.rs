//! FASTA parsing for reference genomes.
//!
//! Whole-genome files are read into memory in one pass; gzip-compressed
//! input (`.gz`) is decompressed transparently.

use crate::error::{KlerosError, KlerosResult};
use flate2::read::GzDecoder;
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{line_ending, not_line_ending},
    combinator::{map, opt},
    sequence::preceded,
    IResult,
};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parse a FASTA header line, returning the record id (text up to the first
/// whitespace). Any description after the id is discarded.
fn parse_header(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, _) = tag(b">")(input)?;
    let (input, id) = map(
        take_till(|c: u8| c == b' ' || c == b'\t' || c == b'\n' || c == b'\r'),
        |s| std::str::from_utf8(s).unwrap_or(""),
    )(input)?;
    let (input, _) = opt(preceded(tag(b" "), not_line_ending))(input)?;
    let (input, _) = opt(preceded(tag(b"\t"), not_line_ending))(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, id))
}

/// Parse sequence lines until the next header or EOF. Bases are uppercased;
/// whitespace inside wrapped lines is dropped.
fn parse_sequence(input: &[u8]) -> IResult<&[u8], Vec<u8>> {
    let mut sequence = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() && remaining[0] != b'>' {
        let (rest, line) =
            take_till::<_, _, nom::error::Error<_>>(|c: u8| c == b'\n' || c == b'\r')(remaining)?;
        // Consume the terminator by hand. `line_ending` only matches LF and
        // CRLF; a bare CR (classic-Mac endings) would otherwise never be
        // consumed and the loop would stall.
        let rest = match rest {
            [b'\r', b'\n', tail @ ..] => tail,
            [b'\r', tail @ ..] | [b'\n', tail @ ..] => tail,
            _ => rest,
        };

        for &c in line {
            if !c.is_ascii_whitespace() {
                sequence.push(c.to_ascii_uppercase());
            }
        }

        remaining = rest;
    }

    Ok((remaining, sequence))
}

fn parse_record(input: &[u8]) -> IResult<&[u8], (String, Vec<u8>)> {
    let (input, id) = parse_header(input)?;
    let (input, sequence) = parse_sequence(input)?;
    Ok((input, (id.to_string(), sequence)))
}

/// Parse all records from raw FASTA bytes, preserving file order.
pub fn parse_fasta_bytes(data: &[u8]) -> KlerosResult<Vec<(String, Vec<u8>)>> {
    let mut records = Vec::new();
    let mut remaining = data;

    // Skip any leading blank lines
    while !remaining.is_empty() && (remaining[0] == b'\n' || remaining[0] == b'\r') {
        remaining = &remaining[1..];
    }

    while !remaining.is_empty() {
        match parse_record(remaining) {
            Ok((rest, (id, sequence))) => {
                if id.is_empty() {
                    return Err(KlerosError::Parse(
                        "FASTA record with empty id".to_string(),
                    ));
                }
                records.push((id, sequence));
                remaining = rest;
            }
            Err(e) => {
                return Err(KlerosError::Parse(format!("malformed FASTA record: {}", e)));
            }
        }
    }

    if records.is_empty() {
        return Err(KlerosError::Parse("no FASTA records found".to_string()));
    }

    Ok(records)
}

/// Read and parse a FASTA file, decompressing `.gz` input.
pub fn parse_fasta(path: &Path) -> KlerosResult<Vec<(String, Vec<u8>)>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();

    let is_gzip = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        let mut decoder = GzDecoder::new(file);
        decoder.read_to_end(&mut data)?;
    } else {
        file.read_to_end(&mut data)?;
    }

    parse_fasta_bytes(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_parse_single_record() {
        let records = parse_fasta_bytes(b">chr1\nACGTACGT\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "chr1");
        assert_eq!(records[0].1, b"ACGTACGT");
    }

    #[test]
    fn test_parse_wrapped_lines_and_case() {
        let records = parse_fasta_bytes(b">chr1\nacgt\nACGT\nnnnn\n").unwrap();
        assert_eq!(records[0].1, b"ACGTACGTNNNN");
    }

    #[test]
    fn test_parse_multiple_records_preserve_order() {
        let data = b">chr2 Mus musculus chromosome 2\nAAAA\n>chr1\nCCCC\n>chrX\nGGGG";
        let records = parse_fasta_bytes(data).unwrap();
        let ids: Vec<&str> = records.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["chr2", "chr1", "chrX"]);
        assert_eq!(records[2].1, b"GGGG");
    }

    #[test]
    fn test_parse_bare_carriage_return_advances() {
        let records = parse_fasta_bytes(b">chr1\nAC\rGT\n").unwrap();
        assert_eq!(records[0].1, b"ACGT");
    }

    #[test]
    fn test_parse_classic_mac_line_endings() {
        let records = parse_fasta_bytes(b">chr1\rACGT\rTTTT\r>chr2\rCCCC\r").unwrap();
        assert_eq!(records[0].0, "chr1");
        assert_eq!(records[0].1, b"ACGTTTTT");
        assert_eq!(records[1].0, "chr2");
        assert_eq!(records[1].1, b"CCCC");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_fasta_bytes(b"ACGT\nACGT\n").is_err());
        assert!(parse_fasta_bytes(b"").is_err());
    }

    #[test]
    fn test_parse_gzip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genome.fa.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b">chr1\nACGTTGCA\n").unwrap();
        encoder.finish().unwrap();

        let records = parse_fasta(&path).unwrap();
        assert_eq!(records[0].0, "chr1");
        assert_eq!(records[0].1, b"ACGTTGCA");
    }
}
