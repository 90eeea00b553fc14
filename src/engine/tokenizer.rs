use unicode_segmentation::UnicodeSegmentation;

/// A word token located in its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Byte offset into the source text.
    pub byte_offset: usize,
    /// Character offset into the source text.
    pub char_offset: usize,
}

impl Token<'_> {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn byte_end(&self) -> usize {
        self.byte_offset + self.text.len()
    }
}

/// Split `text` into words on Unicode word boundaries. Punctuation and
/// whitespace are dropped; identifiers such as `statusExplanation` or
/// `snake_case` stay whole.
pub fn words(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut char_offset = 0;
    let mut last_byte = 0;

    for (byte_offset, segment) in text.split_word_bound_indices() {
        char_offset += text[last_byte..byte_offset].chars().count();
        last_byte = byte_offset;

        if segment.chars().any(char::is_alphabetic) {
            tokens.push(Token {
                text: segment,
                byte_offset,
                char_offset,
            });
        }
    }

    tokens
}
