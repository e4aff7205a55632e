//! Incremental UTF-8 decoding of chunked response bodies

/// Decodes byte chunks into text without corrupting characters that the
/// transport split across chunk boundaries.
#[derive(Debug, Default)]
pub(crate) struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Feed one chunk, returning every complete character decoded so far.
    /// A trailing incomplete sequence is held back for the next chunk.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let tail = self.pending.split_off(self.incomplete_tail_start());
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    /// Start of a trailing incomplete sequence, or the buffer length when
    /// there is none. Invalid bytes before it are skipped over.
    fn incomplete_tail_start(&self) -> usize {
        let mut offset = 0;
        loop {
            match std::str::from_utf8(&self.pending[offset..]) {
                Ok(_) => return self.pending.len(),
                Err(e) => match e.error_len() {
                    None => return offset + e.valid_up_to(),
                    Some(invalid) => offset += e.valid_up_to() + invalid,
                },
            }
        }
    }

    /// Flush whatever is left, replacing invalid bytes
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}
