//! Token store for tabfmt.
//!
//! The formatter core does not lex: it receives the tokens of a source
//! file, already classified, and keeps them in a [`TokenStore`] — a flat
//! arena indexed by [`TokenId`]. The store answers the neighborhood
//! queries the layout passes need: which comments sit next to a token,
//! which non-trivia token precedes or follows it, and how many source
//! lines separate two tokens.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabfmt_span::{BytePos, LineCol, Source, Span};

/// A copyable index of a token in a [`TokenStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TokenId(u32);

impl TokenId {
    /// The index of this token in its store.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The classification of a token.
///
/// This is the minimal set a token-preserving formatter needs: it only has
/// to know what counts as trivia (comments, whitespace) and carries the
/// rest through by source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// An identifier.
    Ident,
    /// A reserved word.
    Keyword,
    /// Punctuation or an operator.
    Symbol,
    /// An integer literal.
    IntLit,
    /// A string literal.
    StrLit,
    /// A comment running to the end of its line.
    LineComment,
    /// A delimited comment, possibly spanning several lines.
    BlockComment,
    /// A run of whitespace.
    Whitespace,
}

impl TokenKind {
    /// Whether this token is a comment.
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }

    /// Whether this token is whitespace.
    #[must_use]
    pub const fn is_whitespace(self) -> bool {
        matches!(self, Self::Whitespace)
    }

    /// Whether this token is comment or whitespace trivia.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        self.is_comment() || self.is_whitespace()
    }
}

/// Errors raised while building a [`TokenStore`].
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// A token's span does not fit in the source text.
    #[error("token {index}: span {lo}..{hi} out of bounds for source of {len} bytes")]
    OutOfBounds {
        /// Index of the offending token.
        index: usize,
        /// Span start.
        lo: u32,
        /// Span end.
        hi: u32,
        /// Source length in bytes.
        len: usize,
    },

    /// A token starts before the previous token ends.
    #[error("token {index}: span {lo}..{hi} overlaps or precedes its predecessor")]
    Unordered {
        /// Index of the offending token.
        index: usize,
        /// Span start.
        lo: u32,
        /// Span end.
        hi: u32,
    },
}

#[derive(Clone, Copy, Debug)]
struct TokenData {
    kind: TokenKind,
    span: Span,
}

/// All tokens of one [`Source`], in source order.
#[derive(Debug)]
pub struct TokenStore {
    source: Source,
    tokens: Vec<TokenData>,
}

impl TokenStore {
    /// Build a store from classified tokens in source order.
    ///
    /// Spans must be in-bounds, non-decreasing, and non-overlapping; gaps
    /// between tokens are fine (implicit whitespace).
    pub fn new(
        source: Source,
        tokens: impl IntoIterator<Item = (TokenKind, Span)>,
    ) -> Result<Self, TokenStoreError> {
        let mut data = Vec::new();
        let mut prev_end = BytePos::ZERO;
        for (index, (kind, span)) in tokens.into_iter().enumerate() {
            if span.hi.as_usize() > source.len() || span.lo > span.hi {
                return Err(TokenStoreError::OutOfBounds {
                    index,
                    lo: span.lo.0,
                    hi: span.hi.0,
                    len: source.len(),
                });
            }
            if span.lo < prev_end {
                return Err(TokenStoreError::Unordered {
                    index,
                    lo: span.lo.0,
                    hi: span.hi.0,
                });
            }
            prev_end = span.hi;
            data.push(TokenData { kind, span });
        }
        Ok(Self {
            source,
            tokens: data,
        })
    }

    /// The underlying source.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Number of tokens in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the store holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over all token ids in source order.
    pub fn ids(&self) -> impl Iterator<Item = TokenId> {
        (0..self.tokens.len() as u32).map(TokenId)
    }

    /// The token at a given index, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<TokenId> {
        (index < self.tokens.len()).then(|| TokenId(index as u32))
    }

    fn data(&self, id: TokenId) -> TokenData {
        self.tokens[id.index()]
    }

    /// The kind of a token.
    #[must_use]
    pub fn kind(&self, id: TokenId) -> TokenKind {
        self.data(id).kind
    }

    /// The span of a token.
    #[must_use]
    pub fn span(&self, id: TokenId) -> Span {
        self.data(id).span
    }

    /// The source text of a token.
    #[must_use]
    pub fn text(&self, id: TokenId) -> &str {
        self.source.text(self.span(id))
    }

    /// The 1-based line/column where a token starts.
    #[must_use]
    pub fn start_line_col(&self, id: TokenId) -> LineCol {
        self.source.line_col(self.span(id).lo)
    }

    /// The 1-based line on which a token starts.
    #[must_use]
    pub fn line_of(&self, id: TokenId) -> u32 {
        self.start_line_col(id).line
    }

    /// The 1-based line on which a token ends (the line of its last byte).
    #[must_use]
    pub fn end_line_of(&self, id: TokenId) -> u32 {
        let span = self.span(id);
        let last = if span.is_empty() {
            span.lo
        } else {
            BytePos::new(span.hi.0 - 1)
        };
        self.source.line_col(last).line
    }

    /// Source lines from the end of `a` to the start of `b`.
    ///
    /// Zero means same line; one means `b` starts on the line after `a`
    /// ends. Negative values arise only if `b` precedes `a`.
    #[must_use]
    pub fn line_difference(&self, a: TokenId, b: TokenId) -> i64 {
        i64::from(self.line_of(b)) - i64::from(self.end_line_of(a))
    }

    /// The token before `id`, if any.
    #[must_use]
    pub fn prev_token(&self, id: TokenId) -> Option<TokenId> {
        id.0.checked_sub(1).map(TokenId)
    }

    /// The token after `id`, if any.
    #[must_use]
    pub fn next_token(&self, id: TokenId) -> Option<TokenId> {
        let next = id.0 + 1;
        (next < self.tokens.len() as u32).then_some(TokenId(next))
    }

    /// The nearest preceding token that is not whitespace, if any.
    /// Comments count.
    #[must_use]
    pub fn prev_token_not_whitespace(&self, id: TokenId) -> Option<TokenId> {
        let mut cur = self.prev_token(id)?;
        loop {
            if !self.kind(cur).is_whitespace() {
                return Some(cur);
            }
            cur = self.prev_token(cur)?;
        }
    }

    /// The nearest preceding token that is neither comment nor whitespace.
    #[must_use]
    pub fn prev_token_not_comment_or_whitespace(&self, id: TokenId) -> Option<TokenId> {
        let mut cur = self.prev_token(id)?;
        loop {
            if !self.kind(cur).is_trivia() {
                return Some(cur);
            }
            cur = self.prev_token(cur)?;
        }
    }

    /// The nearest following token that is neither comment nor whitespace.
    #[must_use]
    pub fn next_token_not_comment_or_whitespace(&self, id: TokenId) -> Option<TokenId> {
        let mut cur = self.next_token(id)?;
        loop {
            if !self.kind(cur).is_trivia() {
                return Some(cur);
            }
            cur = self.next_token(cur)?;
        }
    }

    /// Whether no non-trivia token follows `id`.
    #[must_use]
    pub fn is_last_proper_token(&self, id: TokenId) -> bool {
        self.next_token_not_comment_or_whitespace(id).is_none()
    }

    /// The contiguous run of comments immediately before `id`, in source
    /// order. Whitespace between the comments and the token is skipped; any
    /// other token ends the run.
    #[must_use]
    pub fn comments_before(&self, id: TokenId) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut cur = self.prev_token(id);
        while let Some(tok) = cur {
            match self.kind(tok) {
                k if k.is_comment() => out.push(tok),
                k if k.is_whitespace() => {}
                _ => break,
            }
            cur = self.prev_token(tok);
        }
        out.reverse();
        out
    }

    /// The contiguous run of comments immediately after `id`, in source
    /// order. Whitespace is skipped; any other token ends the run.
    #[must_use]
    pub fn comments_after(&self, id: TokenId) -> Vec<TokenId> {
        let mut out = Vec::new();
        let mut cur = self.next_token(id);
        while let Some(tok) = cur {
            match self.kind(tok) {
                k if k.is_comment() => out.push(tok),
                k if k.is_whitespace() => {}
                _ => break,
            }
            cur = self.next_token(tok);
        }
        out
    }
}
