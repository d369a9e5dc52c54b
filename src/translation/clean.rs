/*!
 * Text cleanup before submission to a provider.
 *
 * Some providers and the bounding-box text insertion fail on raw
 * invisible characters, so every text is scrubbed first: the
 * non-breaking/narrow space family collapses to an ASCII space, the
 * zero-width family and the BOM are removed, and all remaining
 * control/format characters are dropped except newline, carriage
 * return, and tab.
 */

/// Scrub problematic Unicode characters from a text
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            // Space lookalikes become a plain space
            '\u{00a0}' | '\u{202f}' | '\u{2009}' | '\u{200a}' => cleaned.push(' '),
            // Zero-width family and BOM vanish
            '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}' => {}
            // Whitespace controls survive
            '\n' | '\r' | '\t' => cleaned.push(c),
            // Remaining control and format characters vanish
            c if c.is_control() || is_format_char(c) => {}
            c => cleaned.push(c),
        }
    }

    cleaned
}

/// Unicode general category Cf, minus the handful handled explicitly
/// above. Covers directional marks, soft hyphens, and similar
/// invisibles that break provider requests.
fn is_format_char(c: char) -> bool {
    matches!(c,
        '\u{00ad}'
        | '\u{0600}'..='\u{0605}'
        | '\u{061c}'
        | '\u{06dd}'
        | '\u{070f}'
        | '\u{180e}'
        | '\u{200e}'..='\u{200f}'
        | '\u{202a}'..='\u{202e}'
        | '\u{2060}'..='\u{2064}'
        | '\u{2066}'..='\u{206f}'
        | '\u{fff9}'..='\u{fffb}'
        | '\u{110bd}'
        | '\u{1d173}'..='\u{1d17a}'
        | '\u{e0001}'
        | '\u{e0020}'..='\u{e007f}')
}
