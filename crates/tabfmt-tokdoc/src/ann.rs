//! The annotated document IR produced and consumed by the passes.
//!
//! Same shape as [`crate::doc::Doc`] with three additions: `At` nodes
//! carry a first-occurrence flag, token and text nodes carry an optional
//! flow set, and an explicit `Newline` leaf exists for reconstructed
//! blank lines. An `Space` node here is always an *inserted* separator;
//! the input's mandatory spaces are carried through unchanged.

use tabfmt_token::TokenId;

use crate::doc::DocVar;
use crate::tab::{Flow, Tab};

/// An annotated document.
#[derive(Clone, Debug, PartialEq)]
pub enum AnnDoc {
    /// No content.
    Empty,
    /// A space.
    Space,
    /// An explicit anti-space; suppresses separation and lowers to empty.
    NoSpace,
    /// A mandatory line break (reconstructed blank line).
    Newline,
    /// A source token, with its flow set once analyzed.
    Token {
        /// The tabs that determine this token's position, if known.
        flow: Flow,
        /// The token.
        tok: TokenId,
    },
    /// A literal fragment, with its flow set once analyzed.
    Text {
        /// The tabs that determine this fragment's position, if known.
        flow: Flow,
        /// The fragment.
        text: String,
    },
    /// Sequential composition.
    Concat(Box<AnnDoc>, Box<AnnDoc>),
    /// Placement at a tab, marked with whether this occurrence might be
    /// the first break onto that tab.
    At {
        /// Whether this may be the first occurrence of `tab`.
        might_be_first: bool,
        /// The anchor.
        tab: Tab,
        /// The placed document.
        doc: Box<AnnDoc>,
    },
    /// Tab introduction.
    NewTab {
        /// The introduced tab.
        tab: Tab,
        /// Its scope.
        body: Box<AnnDoc>,
    },
    /// Branch on tab activation.
    Cond {
        /// The governing tab.
        tab: Tab,
        /// Chosen when the tab stays inactive.
        inactive: Box<AnnDoc>,
        /// Chosen when the tab activates.
        active: Box<AnnDoc>,
    },
    /// A shared sub-document binding.
    Let {
        /// The bound variable.
        var: DocVar,
        /// The shared sub-document.
        bound: Box<AnnDoc>,
        /// The scope of the binding.
        body: Box<AnnDoc>,
    },
    /// An occurrence of a bound sub-document.
    Var(DocVar),
}

/// Sequential composition; the empty document is absorbed on either side.
#[must_use]
pub fn concat(a: AnnDoc, b: AnnDoc) -> AnnDoc {
    match (a, b) {
        (AnnDoc::Empty, d) | (d, AnnDoc::Empty) => d,
        (a, b) => AnnDoc::Concat(Box::new(a), Box::new(b)),
    }
}

impl AnnDoc {
    /// Collect the tokens and texts of the document in emission order,
    /// expanding shared sub-documents at each occurrence.
    ///
    /// Used by tests to check that the passes preserve token order.
    #[must_use]
    pub fn leaves_in_order(&self) -> Vec<Leaf> {
        fn go<'a>(
            doc: &'a AnnDoc,
            bound: &mut rustc_hash::FxHashMap<DocVar, &'a AnnDoc>,
            out: &mut Vec<Leaf>,
        ) {
            match doc {
                AnnDoc::Empty | AnnDoc::Space | AnnDoc::NoSpace | AnnDoc::Newline => {}
                AnnDoc::Token { tok, .. } => out.push(Leaf::Token(*tok)),
                AnnDoc::Text { text, .. } => out.push(Leaf::Text(text.clone())),
                AnnDoc::Concat(a, b) => {
                    go(a, bound, out);
                    go(b, bound, out);
                }
                AnnDoc::At { doc, .. } => go(doc, bound, out),
                AnnDoc::NewTab { body, .. } => go(body, bound, out),
                AnnDoc::Cond { active, .. } => go(active, bound, out),
                AnnDoc::Let { var, bound: b, body } => {
                    bound.insert(*var, b);
                    go(body, bound, out);
                }
                AnnDoc::Var(v) => {
                    let b = *bound.get(v).expect("doc var bound before use");
                    go(b, bound, out);
                }
            }
        }
        let mut out = Vec::new();
        go(self, &mut rustc_hash::FxHashMap::default(), &mut out);
        out
    }
}

/// A token or text leaf, for order-preservation checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Leaf {
    /// A source token.
    Token(TokenId),
    /// A literal fragment.
    Text(String),
}
