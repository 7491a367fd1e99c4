//! Comment weaving.
//!
//! Source comments are not part of the input document: the builder lays
//! out proper tokens only. This pass splices each token's neighboring
//! comments back in as siblings. Comments *before* a token go in front of
//! it unwrapped, inheriting the token's own placement; comments *after*
//! the last proper token are each re-anchored with a non-first `At` on
//! the token's flow tab so they break onto the same column.
//!
//! The flow analyzer runs again after this pass so the new token nodes
//! and `At` wrappers receive flow sets.

use tabfmt_token::{TokenId, TokenStore};

use crate::ann::{concat, AnnDoc};
use crate::tab::Tab;
use crate::PipelineStats;

/// Weave leading and trailing comments around every token in `doc`.
#[must_use]
pub fn weave(store: &TokenStore, doc: AnnDoc, stats: &mut PipelineStats) -> AnnDoc {
    Weaver { store, stats }.go(doc)
}

struct Weaver<'a> {
    store: &'a TokenStore,
    stats: &'a mut PipelineStats,
}

impl Weaver<'_> {
    fn go(&mut self, doc: AnnDoc) -> AnnDoc {
        match doc {
            AnnDoc::Empty
            | AnnDoc::Space
            | AnnDoc::NoSpace
            | AnnDoc::Newline
            | AnnDoc::Text { .. }
            | AnnDoc::Var(_) => doc,
            AnnDoc::Token { flow, tok } => self.weave_token(flow, tok),
            AnnDoc::Concat(a, b) => {
                let a = self.go(*a);
                let b = self.go(*b);
                AnnDoc::Concat(Box::new(a), Box::new(b))
            }
            AnnDoc::At {
                might_be_first,
                tab,
                doc,
            } => AnnDoc::At {
                might_be_first,
                tab,
                doc: Box::new(self.go(*doc)),
            },
            AnnDoc::NewTab { tab, body } => AnnDoc::NewTab {
                tab,
                body: Box::new(self.go(*body)),
            },
            AnnDoc::Cond {
                tab,
                inactive,
                active,
            } => AnnDoc::Cond {
                tab,
                inactive: Box::new(self.go(*inactive)),
                active: Box::new(self.go(*active)),
            },
            AnnDoc::Let { var, bound, body } => AnnDoc::Let {
                var,
                bound: Box::new(self.go(*bound)),
                body: Box::new(self.go(*body)),
            },
        }
    }

    fn weave_token(&mut self, flow: crate::tab::Flow, tok: TokenId) -> AnnDoc {
        let orig = AnnDoc::Token {
            flow: flow.clone(),
            tok,
        };
        if self.store.kind(tok).is_comment() {
            // Already a comment; nothing to weave around it.
            return orig;
        }

        let before = self.store.comments_before(tok);
        let after = if self.store.is_last_proper_token(tok) {
            self.store.comments_after(tok)
        } else {
            Vec::new()
        };
        if before.is_empty() && after.is_empty() {
            return orig;
        }
        self.stats.comments_woven += before.len() + after.len();

        let comment = |c: TokenId| AnnDoc::Token { flow: None, tok: c };

        let mut out = AnnDoc::Empty;
        for c in before {
            out = concat(out, comment(c));
        }
        out = concat(out, orig);
        match flow.as_ref().and_then(|set| set.first()) {
            Some(anchor) => {
                // Trailing comments break to the token's own column.
                for c in after {
                    out = concat(out, at_anchor(anchor, comment(c)));
                }
            }
            None => {
                for c in after {
                    out = concat(out, comment(c));
                }
            }
        }
        out
    }
}

fn at_anchor(tab: &Tab, doc: AnnDoc) -> AnnDoc {
    AnnDoc::At {
        might_be_first: false,
        tab: tab.clone(),
        doc: Box::new(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::passes::{annotate::annotate, flow::analyze};
    use tabfmt_span::{Source, Span};
    use tabfmt_strdoc::TabStyle;
    use tabfmt_token::TokenKind;

    fn comment_store() -> TokenStore {
        // (*a*) (*b*) x (*c*)
        TokenStore::new(
            Source::new("test.sml", "(*a*) (*b*) x (*c*)"),
            [
                (TokenKind::BlockComment, Span::from_raw(0, 5)),
                (TokenKind::Whitespace, Span::from_raw(5, 6)),
                (TokenKind::BlockComment, Span::from_raw(6, 11)),
                (TokenKind::Whitespace, Span::from_raw(11, 12)),
                (TokenKind::Ident, Span::from_raw(12, 13)),
                (TokenKind::Whitespace, Span::from_raw(13, 14)),
                (TokenKind::BlockComment, Span::from_raw(14, 19)),
            ],
        )
        .expect("valid store")
    }

    /// The token ids of `Token` leaves in textual order, with a marker for
    /// whether each sits under an inserted `At`.
    fn woven_tokens(ann: &AnnDoc) -> Vec<(u32, bool)> {
        fn go(ann: &AnnDoc, under_at: bool, out: &mut Vec<(u32, bool)>) {
            match ann {
                AnnDoc::Token { tok, .. } => out.push((tok.index() as u32, under_at)),
                AnnDoc::Concat(a, b) => {
                    go(a, under_at, out);
                    go(b, under_at, out);
                }
                AnnDoc::At { doc, .. } => go(doc, true, out),
                AnnDoc::NewTab { body, .. } => go(body, under_at, out),
                AnnDoc::Cond {
                    inactive, active, ..
                } => {
                    go(inactive, under_at, out);
                    go(active, under_at, out);
                }
                AnnDoc::Let { bound, body, .. } => {
                    go(bound, under_at, out);
                    go(body, under_at, out);
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        go(ann, false, &mut out);
        out
    }

    #[test]
    fn test_weaves_before_plain_and_after_anchored() {
        let store = comment_store();
        let x = store.get(4).unwrap();
        let d = doc::new_tab(&Tab::ROOT, TabStyle::Inplace, |t| {
            doc::at(t, doc::token(x))
        });
        let ann = analyze(annotate(&d));
        let mut stats = PipelineStats::default();
        let woven = weave(&store, ann, &mut stats);

        assert_eq!(stats.comments_woven, 3);
        // c1, c2 unwrapped; x under its original At; c3 under a fresh At.
        assert_eq!(
            woven_tokens(&woven),
            vec![(0, true), (2, true), (4, true), (6, true)]
        );
    }

    #[test]
    fn test_unattributed_token_gets_plain_siblings() {
        let store = comment_store();
        let x = store.get(4).unwrap();
        // An At in front consumes the root flow, leaving x unattributed.
        let t = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let d = doc::concat(doc::at(t, doc::text("pre")), doc::token(x));
        let ann = analyze(annotate(&d));
        let mut stats = PipelineStats::default();
        let woven = weave(&store, ann, &mut stats);
        assert_eq!(stats.comments_woven, 3);
        // Everything woven as plain siblings: only "pre"'s At wraps.
        assert_eq!(
            woven_tokens(&woven),
            vec![(0, false), (2, false), (4, false), (6, false)]
        );
    }

    #[test]
    fn test_token_without_neighbors_untouched() {
        let store = TokenStore::new(
            Source::new("test.sml", "x y"),
            [
                (TokenKind::Ident, Span::from_raw(0, 1)),
                (TokenKind::Whitespace, Span::from_raw(1, 2)),
                (TokenKind::Ident, Span::from_raw(2, 3)),
            ],
        )
        .expect("valid store");
        let a = store.get(0).unwrap();
        let b = store.get(2).unwrap();
        let d = doc::concat(doc::token(a), doc::token(b));
        let ann = analyze(annotate(&d));
        let mut stats = PipelineStats::default();
        let woven = weave(&store, ann.clone(), &mut stats);
        assert_eq!(stats.comments_woven, 0);
        assert_eq!(woven, ann);
    }
}
