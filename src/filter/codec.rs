//! Streaming base64 (RFC 4648, `=`-padded) for arbitrary write/read chunking.
//!
//! The encoder holds back an incomplete 3-byte group between calls and only
//! pads it on `finish`. The decoder works quad by quad, so padded groups may
//! appear mid-stream (one per flushed exchange), and it skips ASCII
//! whitespace so line-wrapped input decodes as well.

use crate::filter::error::{FilterError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

const GROUP: usize = 3;
const QUAD: usize = 4;

#[derive(Debug, Default)]
pub struct Base64Encoder {
    pending: [u8; GROUP],
    pending_len: usize,
}

impl Base64Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes every complete group of `input` (after any bytes held back
    /// from earlier calls) and appends the text to `out`.
    pub fn update(&mut self, mut input: &[u8], out: &mut Vec<u8>) {
        if self.pending_len > 0 {
            let take = (GROUP - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];
            if self.pending_len < GROUP {
                return;
            }
            encode_into(&self.pending, out);
            self.pending_len = 0;
        }

        let whole = input.len() / GROUP * GROUP;
        encode_into(&input[..whole], out);

        let rest = &input[whole..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Emits the held-back partial group, padded.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending_len > 0 {
            encode_into(&self.pending[..self.pending_len], out);
            self.pending_len = 0;
        }
    }

    pub fn pending(&self) -> usize {
        self.pending_len
    }

    pub fn reset(&mut self) {
        self.pending_len = 0;
    }
}

fn encode_into(input: &[u8], out: &mut Vec<u8>) {
    if !input.is_empty() {
        out.extend_from_slice(STANDARD.encode(input).as_bytes());
    }
}

#[derive(Debug, Default)]
pub struct Base64Decoder {
    quad: [u8; QUAD],
    quad_len: usize,
}

impl Base64Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes every complete quad in `input` and appends the bytes to `out`.
    pub fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        for &byte in input.iter().filter(|b| !b.is_ascii_whitespace()) {
            self.quad[self.quad_len] = byte;
            self.quad_len += 1;
            if self.quad_len == QUAD {
                self.quad_len = 0;
                let mut group = [0u8; GROUP];
                let n = STANDARD
                    .decode_slice(self.quad, &mut group)
                    .map_err(|e| FilterError::Decode(e.to_string()))?;
                out.extend_from_slice(&group[..n]);
            }
        }
        Ok(())
    }

    /// Characters of an incomplete quad still waiting for input
    pub fn pending(&self) -> usize {
        self.quad_len
    }

    pub fn reset(&mut self) {
        self.quad_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(chunks: &[&[u8]]) -> Vec<u8> {
        let mut encoder = Base64Encoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            encoder.update(chunk, &mut out);
        }
        encoder.finish(&mut out);
        out
    }

    #[test]
    fn test_encoder_matches_one_shot() {
        let data = b"timestamps travel well";
        assert_eq!(
            encode_all(&[&data[..1], &data[1..5], &data[5..]]),
            STANDARD.encode(data).into_bytes()
        );
    }

    #[test]
    fn test_encoder_holds_back_partial_group() {
        let mut encoder = Base64Encoder::new();
        let mut out = Vec::new();
        encoder.update(b"abcd", &mut out);
        assert_eq!(out, b"YWJj");
        assert_eq!(encoder.pending(), 1);
        encoder.finish(&mut out);
        assert_eq!(out, b"YWJjZA==");
        assert_eq!(encoder.pending(), 0);
    }

    #[test]
    fn test_decoder_skips_line_breaks() -> Result<()> {
        let mut decoder = Base64Decoder::new();
        let mut out = Vec::new();
        decoder.update(b"YWJj\nZA=\r\n=", &mut out)?;
        assert_eq!(out, b"abcd");
        assert_eq!(decoder.pending(), 0);
        Ok(())
    }

    #[test]
    fn test_decoder_accepts_padding_mid_stream() -> Result<()> {
        let mut decoder = Base64Decoder::new();
        let mut out = Vec::new();
        let mut stream = encode_all(&[&b"ab"[..]]);
        stream.extend(encode_all(&[&b"cdef"[..]]));
        decoder.update(&stream, &mut out)?;
        assert_eq!(out, b"abcdef");
        Ok(())
    }

    #[test]
    fn test_decoder_rejects_garbage() {
        let mut decoder = Base64Decoder::new();
        let mut out = Vec::new();
        assert!(matches!(
            decoder.update(b"!!!!", &mut out),
            Err(FilterError::Decode(_))
        ));
    }
}
