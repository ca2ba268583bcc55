//! Tokenization of a single segment into words and operators.
//!
//! The grammar has no quoting and no escaping: a `|`, `<`, `>` or `>>`
//! anywhere in the segment is an operator, even glued to a word
//! (`cat<notes.txt` lexes the same as `cat < notes.txt`). This mirrors the
//! substring-based detection of the system this interpreter reproduces; an
//! argument that happens to contain an operator character will be mis-split,
//! by design.

/// One lexical unit of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of non-whitespace, non-operator characters.
    Word(String),
    /// The pipe operator, `|`.
    Pipe,
    /// Input redirection, `<`.
    RedirectIn,
    /// Truncating output redirection, `>`.
    RedirectOut,
    /// Appending output redirection, `>>`.
    RedirectAppend,
}

impl Token {
    /// The literal text of this token. Used by the stage builder when an
    /// operator ends up on the wrong side of the segment's winning operator
    /// and degrades back to a plain word.
    pub fn lexeme(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Pipe => "|",
            Token::RedirectIn => "<",
            Token::RedirectOut => ">",
            Token::RedirectAppend => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    BetweenWords,
    InWord,
}

struct Scanner {
    input: Vec<char>,
    pos: usize,
    state: ScanState,
    buffer: String,
}

impl Scanner {
    fn new(segment: &str) -> Self {
        Scanner {
            input: segment.chars().collect(),
            pos: 0,
            state: ScanState::BetweenWords,
            buffer: String::new(),
        }
    }

    fn scan(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        while let Some(ch) = self.read_char() {
            match self.state {
                ScanState::BetweenWords => self.handle_between(ch, &mut out),
                ScanState::InWord => self.handle_word(ch, &mut out),
            }
        }
        self.flush_word(&mut out);
        out
    }

    fn handle_between(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_whitespace() {
            return;
        }
        if let Some(op) = self.operator(ch) {
            out.push(op);
            return;
        }
        self.buffer.push(ch);
        self.state = ScanState::InWord;
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<Token>) {
        if ch.is_whitespace() {
            self.flush_word(out);
            self.state = ScanState::BetweenWords;
            return;
        }
        if let Some(op) = self.operator(ch) {
            self.flush_word(out);
            self.state = ScanState::BetweenWords;
            out.push(op);
            return;
        }
        self.buffer.push(ch);
    }

    /// Recognize an operator starting at `ch`, consuming the second `>` of a
    /// `>>` pair.
    fn operator(&mut self, ch: char) -> Option<Token> {
        match ch {
            '|' => Some(Token::Pipe),
            '<' => Some(Token::RedirectIn),
            '>' => {
                if self.peek_char() == Some('>') {
                    self.pos += 1;
                    Some(Token::RedirectAppend)
                } else {
                    Some(Token::RedirectOut)
                }
            }
            _ => None,
        }
    }

    fn flush_word(&mut self, out: &mut Vec<Token>) {
        if !self.buffer.is_empty() {
            out.push(Token::Word(std::mem::take(&mut self.buffer)));
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }
}

/// Tokenize one segment. Infallible: this grammar has no lexical errors.
pub fn scan(segment: &str) -> Vec<Token> {
    Scanner::new(segment).scan()
}
