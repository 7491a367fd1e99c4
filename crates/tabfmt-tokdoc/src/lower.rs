//! Lowering to the string-document algebra.
//!
//! Translates the fully annotated document into [`tabfmt_strdoc`],
//! allocating one string-document tab per input tab as `NewTab` scopes
//! are entered. Tokens emit their source text; a token whose text spans
//! several lines is re-anchored on a fresh rigid in-place sub-tab, with
//! the original indentation up to the token's starting column stripped
//! from its continuation lines.
//!
//! Shared sub-documents have no downstream counterpart: the bound
//! document is lowered at each use site.

use rustc_hash::FxHashMap;

use tabfmt_span::{effective_offset, strip_effective_whitespace, Span};
use tabfmt_strdoc::{self as strdoc, StrDoc, TabStyle};
use tabfmt_token::{TokenId, TokenStore};

use crate::ann::AnnDoc;
use crate::doc::DocVar;
use crate::tab::Tab;

/// Lower `doc` to a string document.
#[must_use]
pub fn lower(store: &TokenStore, tab_width: usize, doc: &AnnDoc) -> StrDoc {
    let mut lowerer = Lowerer {
        store,
        tab_width,
        tab_map: FxHashMap::default(),
        bound: FxHashMap::default(),
    };
    lowerer.go(doc, &strdoc::Tab::ROOT)
}

struct Lowerer<'a> {
    store: &'a TokenStore,
    tab_width: usize,
    /// Input tab id to its lowered counterpart; the root maps to the root.
    tab_map: FxHashMap<u32, strdoc::Tab>,
    /// Bound sub-documents in scope, inlined at each use site.
    bound: FxHashMap<DocVar, &'a AnnDoc>,
}

impl<'a> Lowerer<'a> {
    fn map_tab(&self, tab: &Tab) -> strdoc::Tab {
        if tab.is_root() {
            return strdoc::Tab::ROOT;
        }
        self.tab_map
            .get(&tab.id())
            .cloned()
            .unwrap_or_else(|| panic!("tab {tab} not introduced by an enclosing NewTab"))
    }

    fn go(&mut self, doc: &'a AnnDoc, cur: &strdoc::Tab) -> StrDoc {
        match doc {
            AnnDoc::Empty | AnnDoc::NoSpace => strdoc::empty(),
            AnnDoc::Newline => strdoc::newline(),
            AnnDoc::Space => strdoc::space(),
            AnnDoc::Text { text, .. } => strdoc::text(text.clone()),
            AnnDoc::Token { flow, tok } => {
                let tab = flow
                    .as_ref()
                    .and_then(|set| set.first())
                    .map_or_else(|| cur.clone(), |t| self.map_tab(t));
                self.lower_token(*tok, &tab)
            }
            AnnDoc::Concat(a, b) => {
                let a = self.go(a, cur);
                let b = self.go(b, cur);
                strdoc::concat(a, b)
            }
            AnnDoc::At { tab, doc, .. } => {
                let lowered = self.map_tab(tab);
                let inner = self.go(doc, &lowered);
                strdoc::at(lowered, inner)
            }
            AnnDoc::NewTab { tab, body } => {
                let parent = self.map_tab(tab.parent().expect("allocated tab has a parent"));
                strdoc::new_tab(&parent, tab.style(), |lowered| {
                    self.tab_map.insert(tab.id(), lowered);
                    self.go(body, cur)
                })
            }
            AnnDoc::Cond {
                tab,
                inactive,
                active,
            } => {
                let lowered = self.map_tab(tab);
                let inactive = self.go(inactive, cur);
                let active = self.go(active, cur);
                strdoc::cond(lowered, inactive, active)
            }
            AnnDoc::Let { var, bound, body } => {
                self.bound.insert(*var, bound);
                self.go(body, cur)
            }
            AnnDoc::Var(v) => {
                let bound = *self.bound.get(v).expect("doc var bound before use");
                self.go(bound, cur)
            }
        }
    }

    /// Emit a token's source text: a single text fragment, or one line
    /// per source line on a fresh rigid sub-tab for multi-line tokens.
    fn lower_token(&mut self, tok: TokenId, cur: &strdoc::Tab) -> StrDoc {
        let text = self.store.text(tok);
        if !text.contains('\n') {
            return strdoc::text(text);
        }

        // Continuation lines carry the token's original indentation; strip
        // up to the column (tab-expanded) where the token started.
        let span = self.store.span(tok);
        let start = self.store.start_line_col(tok);
        let line_span = self
            .store
            .source()
            .line_span(start.line as usize - 1)
            .expect("token start line in range");
        let prefix = self.store.source().text(Span::new(line_span.lo, span.lo));
        let offset = effective_offset(self.tab_width, prefix);

        let mut lines = text.split('\n');
        let first = lines.next().expect("split yields at least one line");
        let rest: Vec<&str> = lines
            .map(|line| strip_effective_whitespace(self.tab_width, offset, line))
            .collect();

        strdoc::new_tab(cur, TabStyle::RigidInplace, |tab| {
            let mut out = strdoc::at(tab.clone(), strdoc::text(first));
            for line in rest {
                out = strdoc::concat(out, strdoc::at(tab.clone(), strdoc::text(line)));
            }
            out
        })
    }
}
