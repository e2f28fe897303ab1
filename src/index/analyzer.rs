//! Text analysis: raw body -> `DocInfo`
//!
//! Tokens are maximal runs of alphanumeric characters (plus `_`). Each token
//! gets a position (its ordinal among kept tokens) and an inclusive byte
//! range into the original body, so highlighting can slice the unmodified
//! text.

use ahash::AHashMap;

use crate::types::{DocInfo, OffsetPairs, Position, Positions};

/// Token produced by a tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: Position,
    /// First byte of the token in the body
    pub start: u32,
    /// Last byte of the token in the body (inclusive)
    pub end: u32,
}

/// Pluggable tokenizer
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Splits on anything that is not alphanumeric or `_`
#[derive(Debug, Clone)]
pub struct WhitespaceTokenizer {
    pub case_sensitive: bool,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for WhitespaceTokenizer {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            min_len: 1,
            max_len: 64,
        }
    }
}

impl WhitespaceTokenizer {
    fn is_token_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    fn normalize(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut run_start: Option<usize> = None;

        let emit = |start: usize, end: usize, tokens: &mut Vec<Token>| {
            let raw = &text[start..end];
            let len = raw.chars().count();
            if len >= self.min_len && len <= self.max_len {
                tokens.push(Token {
                    text: self.normalize(raw),
                    position: tokens.len() as Position,
                    start: start as u32,
                    end: (end - 1) as u32,
                });
            }
        };

        for (i, c) in text.char_indices() {
            match (Self::is_token_char(c), run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    emit(start, i, &mut tokens);
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            emit(start, text.len(), &mut tokens);
        }

        tokens
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Groups tokens by term into the per-term layout the index consumes
pub struct Analyzer {
    tokenizer: Box<dyn Tokenizer>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Box::new(WhitespaceTokenizer::default()))
    }
}

impl Analyzer {
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    /// Distinct terms appear in first-occurrence order
    pub fn analyze(&self, body: &str) -> DocInfo {
        let mut slots: AHashMap<String, usize> = AHashMap::new();
        let mut info = DocInfo::default();

        for token in self.tokenizer.tokenize(body) {
            let slot = match slots.get(&token.text) {
                Some(&slot) => slot,
                None => {
                    let slot = info.tokens.len();
                    slots.insert(token.text.clone(), slot);
                    info.tokens.push(token.text);
                    info.offset_pairs.push(OffsetPairs::new());
                    info.positions.push(Positions::new());
                    slot
                }
            };
            info.offset_pairs[slot].push((token.start, token.end));
            info.positions[slot].push(token.position);
        }

        info
    }
}
