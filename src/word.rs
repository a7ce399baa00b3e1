//! Word boundaries in a line of text.
//!
//! Characters are grouped into classes (blank, punctuation, word, and a few
//! script-specific classes so that e.g. a run of CJK ideographs counts as one
//! word). A word is a maximal run of same-class characters; positions are
//! UTF-16 code units as used by LSP.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Blank,
    Punctuation,
    Word,
    Hiragana,
    Katakana,
    Ideograph,
    Hangul,
}

fn classify(c: char) -> CharClass {
    match c {
        c if c.is_whitespace() => CharClass::Blank,
        '_' => CharClass::Word,
        '\u{3040}'..='\u{309f}' => CharClass::Hiragana,
        '\u{30a0}'..='\u{30ff}' | '\u{ff66}'..='\u{ff9f}' => CharClass::Katakana,
        '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}' | '\u{f900}'..='\u{faff}' => CharClass::Ideograph,
        '\u{ac00}'..='\u{d7af}' | '\u{1100}'..='\u{11ff}' => CharClass::Hangul,
        c if c.is_alphanumeric() => CharClass::Word,
        _ => CharClass::Punctuation,
    }
}

/// A word located in a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Start character (UTF-16), inclusive
    pub start: u32,
    /// End character (UTF-16), exclusive
    pub end: u32,
}

/// Find the word enclosing `character` on line `line` of `text`.
///
/// Returns `None` when the position lies outside the text.
pub fn word_at(text: &str, line: u32, character: u32) -> Option<Word> {
    let line_text = text.split('\n').nth(line as usize)?;
    let line_text = line_text.strip_suffix('\r').unwrap_or(line_text);
    let units: Vec<u16> = line_text.encode_utf16().collect();
    let character = character as usize;
    if character > units.len() {
        return None;
    }

    // (utf16 offset, class) of every char
    let mut offsets = Vec::new();
    let mut offset = 0usize;
    for c in line_text.chars() {
        offsets.push((offset, c, classify(c)));
        offset += c.len_utf16();
    }

    let mut start = 0usize;
    let mut end: Option<usize> = None;
    let mut prev_class: Option<CharClass> = None;
    for &(pos, c, class) in &offsets {
        if prev_class != Some(class) {
            if pos <= character {
                start = pos;
            } else {
                // a trailing underscore does not end the word
                if c == '_' {
                    continue;
                }
                end = Some(pos);
                break;
            }
        }
        prev_class = Some(class);
    }
    let end = end.unwrap_or(units.len());

    Some(Word {
        text: String::from_utf16_lossy(&units[start..end]),
        start: start as u32,
        end: end as u32,
    })
}
