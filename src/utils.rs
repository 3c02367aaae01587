// src/utils.rs
use crate::token::Span;

/// Converte offsets de bytes do fonte em pares linha/coluna a partir de 1.
pub struct LineIndex<'source> {
    source: &'source str,
    line_starts: Vec<usize>,
}

impl<'source> LineIndex<'source> {
    pub fn new(source: &'source str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(idx, _)| idx + 1));
        LineIndex { source, line_starts }
    }

    pub fn span(&self, range: std::ops::Range<usize>) -> Span {
        let line = match self.line_starts.binary_search(&range.start) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..range.start].chars().count() + 1;
        Span { start: range.start, end: range.end, line: line as u32 + 1, column: column as u32 }
    }

    /// Trecho curto ao redor de um span, para mensagens de erro.
    pub fn excerpt(&self, span: Span, radius: usize) -> String {
        let start = floor_char_boundary(self.source, span.start.saturating_sub(radius));
        let end = floor_char_boundary(self.source, (span.end + radius).min(self.source.len()));
        self.source[start..end].replace('\n', " ").trim().to_string()
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
