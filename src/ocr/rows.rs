use std::sync::OnceLock;

use regex::Regex;

use super::engine::TextFragment;

/// Non-negative decimal with optional thousands separators:
/// - Plain numbers: 12345
/// - Comma separators: 12,345 or 1,234,567
/// - Decimal point: 0.25 or 1,234.5
const NUMBER_PATTERN: &str = r"^\d+(,\d+)*(\.\d+)?$";

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NUMBER_PATTERN).expect("NUMBER_PATTERN is a valid regex"))
}

/// Fragments sharing one visual ladder row, top-to-bottom order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub fragments: Vec<TextFragment>,
}

impl Row {
    /// Concatenates the fragments that clear `threshold` in left-to-right order.
    ///
    /// Fragments at or below the threshold are left out entirely, so one
    /// doubtful glyph does not spoil the parse of an otherwise good row.
    pub fn text(&self, threshold: f32) -> String {
        let mut kept: Vec<&TextFragment> = self
            .fragments
            .iter()
            .filter(|f| f.confidence > threshold)
            .collect();
        kept.sort_by_key(|f| f.x1);
        kept.iter().map(|f| f.text.as_str()).collect()
    }

    /// Numeric value of the row, or `None` if nothing parses.
    pub fn value(&self, threshold: f32) -> Option<f64> {
        parse_number(&self.text(threshold))
    }
}

/// Groups fragments into visual rows.
///
/// Fragments are sorted by top edge; a fragment whose top lies below the bottom
/// edge of the current row starts a new row, otherwise it joins the row (one
/// ladder row often comes back as several words, e.g. split at a comma).
pub fn group_rows(fragments: &[TextFragment]) -> Vec<Row> {
    let mut sorted: Vec<TextFragment> = fragments.to_vec();
    sorted.sort_by_key(|f| f.y1);

    let mut rows: Vec<Row> = Vec::new();
    let mut prev_y2: Option<u32> = None;

    for fragment in sorted {
        let bottom = fragment.y2;
        // prev_y2 is only set once a row exists
        let joins = prev_y2.is_some_and(|prev| fragment.y1 <= prev);
        if joins {
            if let Some(row) = rows.last_mut() {
                row.fragments.push(fragment);
            }
            prev_y2 = prev_y2.map(|prev| prev.max(bottom));
        } else {
            rows.push(Row {
                fragments: vec![fragment],
            });
            prev_y2 = Some(bottom);
        }
    }

    rows
}

/// Sums the values of every row that parses. Unparseable rows count as 0.
pub fn sum_rows(rows: &[Row], threshold: f32) -> f64 {
    rows.iter().filter_map(|row| row.value(threshold)).sum()
}

/// Parses a ladder number, dropping thousands separators.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if !number_regex().is_match(text) {
        return None;
    }
    text.replace(',', "").parse::<f64>().ok()
}
