//! Byte offset <-> (line, character column) conversion

/// Start offsets of every line in a text
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, starts }
    }

    /// 1-based line and 0-based character column of a byte offset
    pub fn locate(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.starts[line_idx];
        let column = self.text[line_start..offset].chars().count();
        (line_idx + 1, column)
    }

    /// Byte range of a character span on a 1-based line, if it exists
    pub fn byte_span(&self, line: usize, column_start: usize, column_end: usize) -> Option<(usize, usize)> {
        byte_span(self.text, line, column_start, column_end)
    }
}

/// Byte range `[start, end)` of the character columns `column_start..column_end`
/// on a 1-based `line` of `text`.
///
/// Returns `None` if the line does not exist or the span runs past its end.
pub fn byte_span(
    text: &str,
    line: usize,
    column_start: usize,
    column_end: usize,
) -> Option<(usize, usize)> {
    if line == 0 || column_end < column_start {
        return None;
    }

    let line_start = if line == 1 {
        0
    } else {
        text.match_indices('\n').nth(line - 2).map(|(i, _)| i + 1)?
    };
    let line_text = text[line_start..].split('\n').next().unwrap_or("");

    let mut offsets = line_text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(line_text.len()));
    let start = offsets.nth(column_start)?;
    let end = if column_end == column_start {
        start
    } else {
        offsets.nth(column_end - column_start - 1)?
    };

    Some((line_start + start, line_start + end))
}
