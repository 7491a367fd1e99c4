//! Blank-line reconstruction.
//!
//! Tokens separated by more than one line in the original source were
//! separated by blank lines the author put there on purpose. This pass
//! re-creates up to two of them in front of the token, as newlines
//! conditional on the token's anchor tab: if the tab never breaks, the
//! token stays inline and the blank lines are dropped with it.
//!
//! Unattributed tokens and tokens with no preceding non-whitespace token
//! are left alone.

use tabfmt_token::TokenStore;

use crate::ann::AnnDoc;
use crate::PipelineStats;

/// The most blank lines ever reconstructed between two tokens.
const MAX_BLANK_LINES: i64 = 2;

/// Insert conditional blank lines before tokens that had them in source.
#[must_use]
pub fn insert_blank_lines(
    store: &TokenStore,
    doc: AnnDoc,
    stats: &mut PipelineStats,
) -> AnnDoc {
    Inserter { store, stats }.go(doc)
}

struct Inserter<'a> {
    store: &'a TokenStore,
    stats: &'a mut PipelineStats,
}

impl Inserter<'_> {
    fn go(&mut self, doc: AnnDoc) -> AnnDoc {
        match doc {
            AnnDoc::Empty
            | AnnDoc::Space
            | AnnDoc::NoSpace
            | AnnDoc::Newline
            | AnnDoc::Text { .. }
            | AnnDoc::Var(_) => doc,
            AnnDoc::Token { ref flow, tok } => {
                let Some(anchor) = flow.as_ref().and_then(|set| set.first()) else {
                    return doc;
                };
                let Some(prev) = self.store.prev_token_not_whitespace(tok) else {
                    return doc;
                };
                let blanks = (self.store.line_difference(prev, tok) - 1)
                    .clamp(0, MAX_BLANK_LINES);
                if blanks == 0 {
                    return doc;
                }
                self.stats.blank_conds_inserted += blanks as usize;
                let mut out = doc.clone();
                for _ in 0..blanks {
                    out = AnnDoc::Concat(
                        Box::new(AnnDoc::Cond {
                            tab: anchor.clone(),
                            inactive: Box::new(AnnDoc::Empty),
                            active: Box::new(AnnDoc::Newline),
                        }),
                        Box::new(out),
                    );
                }
                out
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::passes::{annotate::annotate, flow::analyze};
    use tabfmt_span::{Source, Span};
    use tabfmt_token::TokenKind;

    fn run(store: &TokenStore, d: &doc::Doc) -> (AnnDoc, PipelineStats) {
        let ann = analyze(annotate(d));
        let mut stats = PipelineStats::default();
        let out = insert_blank_lines(store, ann, &mut stats);
        (out, stats)
    }

    fn two_token_store(src: &str, a: (u32, u32), b: (u32, u32)) -> TokenStore {
        TokenStore::new(
            Source::new("test.sml", src),
            [
                (TokenKind::Ident, Span::from_raw(a.0, a.1)),
                (TokenKind::Ident, Span::from_raw(b.0, b.1)),
            ],
        )
        .expect("valid store")
    }

    #[test]
    fn test_no_blanks_for_adjacent_lines() {
        let store = two_token_store("a\nb", (0, 1), (2, 3));
        let (_, stats) = run(
            &store,
            &doc::concat(
                doc::token(store.get(0).unwrap()),
                doc::token(store.get(1).unwrap()),
            ),
        );
        assert_eq!(stats.blank_conds_inserted, 0);
    }

    #[test]
    fn test_single_blank_line() {
        let store = two_token_store("a\n\nb", (0, 1), (3, 4));
        let (_, stats) = run(
            &store,
            &doc::concat(
                doc::token(store.get(0).unwrap()),
                doc::token(store.get(1).unwrap()),
            ),
        );
        assert_eq!(stats.blank_conds_inserted, 1);
    }

    #[test]
    fn test_blank_lines_clamped_to_two() {
        let store = two_token_store("a\n\n\n\n\nb", (0, 1), (6, 7));
        let (out, stats) = run(
            &store,
            &doc::concat(
                doc::token(store.get(0).unwrap()),
                doc::token(store.get(1).unwrap()),
            ),
        );
        assert_eq!(stats.blank_conds_inserted, 2);
        // Both guards precede the second token, anchored to its flow tab.
        match out {
            AnnDoc::Concat(_, b) => {
                let mut conds = 0;
                let mut cur = *b;
                while let AnnDoc::Concat(guard, rest) = cur {
                    assert!(matches!(
                        *guard,
                        AnnDoc::Cond {
                            ref inactive,
                            ref active,
                            ..
                        } if **inactive == AnnDoc::Empty && **active == AnnDoc::Newline
                    ));
                    conds += 1;
                    cur = *rest;
                }
                assert_eq!(conds, 2);
                assert!(matches!(cur, AnnDoc::Token { .. }));
            }
            other => panic!("expected Concat, got {other:?}"),
        }
    }

    #[test]
    fn test_first_token_untouched() {
        let store = two_token_store("a\n\n\nb", (0, 1), (4, 5));
        let (_, stats) = run(&store, &doc::token(store.get(0).unwrap()));
        assert_eq!(stats.blank_conds_inserted, 0);
    }

    #[test]
    fn test_unattributed_token_untouched() {
        let store = two_token_store("a\n\n\nb", (0, 1), (4, 5));
        let t = crate::tab::Tab::new(&crate::tab::Tab::ROOT, tabfmt_strdoc::TabStyle::Inplace);
        // The At consumes the flow, so the second token is unattributed.
        let d = doc::concat(
            doc::at(t, doc::token(store.get(0).unwrap())),
            doc::token(store.get(1).unwrap()),
        );
        let (_, stats) = run(&store, &d);
        assert_eq!(stats.blank_conds_inserted, 0);
    }

    #[test]
    fn test_multiline_predecessor_measured_from_its_end() {
        // A block comment ending on the line above produces no blanks.
        let store = TokenStore::new(
            Source::new("test.sml", "(* a\nb *)\nx"),
            [
                (TokenKind::BlockComment, Span::from_raw(0, 9)),
                (TokenKind::Ident, Span::from_raw(10, 11)),
            ],
        )
        .expect("valid store");
        let (_, stats) = run(&store, &doc::token(store.get(1).unwrap()));
        assert_eq!(stats.blank_conds_inserted, 0);
    }
}
