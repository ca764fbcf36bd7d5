use std::borrow::Cow;

/// Append-only log of completed terminal lines.
///
/// Raw chunks are split on the separator at the byte level, so a separator or
/// a multi-byte character cut across two chunks is reassembled before
/// decoding. The trailing fragment without a separator is held back until the
/// next chunk completes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLog {
    separator: Vec<u8>,
    lines: Vec<String>,
    pending: Vec<u8>,
}

impl Default for LineLog {
    fn default() -> Self {
        Self::new('\n')
    }
}

impl LineLog {
    pub fn new(separator: char) -> Self {
        let mut buf = [0u8; 4];
        Self {
            separator: separator.encode_utf8(&mut buf).as_bytes().to_vec(),
            lines: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Appends a raw chunk and returns how many lines it completed.
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        let sep_len = self.separator.len();
        // A separator may straddle the old fragment and the new chunk.
        let mut search_from = self.pending.len().saturating_sub(sep_len - 1);
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut completed = 0;
        while let Some(pos) = find(&self.pending[search_from..], &self.separator) {
            let end = search_from + pos;
            let line = self.decode(&self.pending[start..end]);
            self.lines.push(line);
            start = end + sep_len;
            search_from = start;
            completed += 1;
        }
        self.pending.drain(..start);
        completed
    }

    /// Lines appended at or after `cursor`, plus the cursor to use next time.
    pub fn slice_since(&self, cursor: usize) -> (&[String], usize) {
        let from = cursor.min(self.lines.len());
        (&self.lines[from..], self.lines.len())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Text received after the last separator.
    pub fn pending_fragment(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.pending)
    }

    fn decode(&self, raw: &[u8]) -> String {
        // PTYs emit CRLF; drop the CR that belongs to the line terminator.
        let raw = if self.separator == b"\n" {
            raw.strip_suffix(b"\r").unwrap_or(raw)
        } else {
            raw
        };
        String::from_utf8_lossy(raw).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
