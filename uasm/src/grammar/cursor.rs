use super::token::Token;

/// Cursor over the scanner's token stream. The position only moves
/// forward and clamps at the end, so `eat` and `peek` keep returning the
/// trailing end-of-file token once input is exhausted.
pub struct TokenCursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenCursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        assert!(!tokens.is_empty(), "token stream ends with an EOF token");
        TokenCursor { tokens, pos: 0 }
    }

    /// Returns the token under the cursor and advances.
    pub fn eat(&mut self) -> &'t Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Returns the token under the cursor without advancing.
    pub fn peek(&self) -> &'t Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::token::{Span, TokenKind};

    fn tok(kind: TokenKind) -> Token {
        Token {
            kind,
            span: Span::default(),
            tag: 0,
        }
    }

    #[test]
    fn clamps_at_end_of_file() {
        let tokens = vec![tok(TokenKind::Identifier), tok(TokenKind::EndOfFile)];
        let mut cur = TokenCursor::new(&tokens);
        assert_eq!(cur.peek().kind, TokenKind::Identifier);
        assert_eq!(cur.eat().kind, TokenKind::Identifier);
        assert_eq!(cur.eat().kind, TokenKind::EndOfFile);
        // Both eat and peek are idempotent at the end.
        assert_eq!(cur.eat().kind, TokenKind::EndOfFile);
        assert_eq!(cur.peek().kind, TokenKind::EndOfFile);
        assert_eq!(cur.eat().kind, TokenKind::EndOfFile);
    }
}
