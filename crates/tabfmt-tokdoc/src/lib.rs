//! # Tabbed token documents
//!
//! The layout-analysis core of a token-preserving formatter. A [`Doc`]
//! describes how the tokens of a parsed source file should be arranged
//! relative to dynamic indentation anchors ("tabs"); this crate runs a
//! fixed sequence of analysis passes over it and lowers the result to the
//! string-document algebra of [`tabfmt_strdoc`], where a layout engine
//! later picks the actual line breaks.
//!
//! ## Pipeline
//!
//! ```text
//! Doc
//!  |  annotate      mark first occurrences of each tab
//!  |  flow          attribute tokens to the tabs that position them
//!  |  weave         splice source comments in next to their tokens
//!  |  flow          re-attribute, covering the woven comments
//!  |  spaces        make required separation explicit
//!  |  blanks        reconstruct blank lines as conditional newlines
//!  v  lower
//! StrDoc
//! ```
//!
//! Every pass is a pure rewrite over an immutable tree; the only mutable
//! process state is a pair of monotonic id counters for tabs and doc
//! vars. The pipeline is total on well-formed documents: referencing a
//! tab outside its `NewTab` scope or a doc var outside its `Let` is a
//! programmer error and panics.
//!
//! ## Example
//!
//! ```
//! use tabfmt_span::{Source, Span};
//! use tabfmt_token::{TokenKind, TokenStore};
//! use tabfmt_tokdoc::{doc, FormatConfig, Tab, to_string_doc};
//! use tabfmt_strdoc::TabStyle;
//!
//! let store = TokenStore::new(
//!     Source::new("example.sml", "val x"),
//!     [
//!         (TokenKind::Keyword, Span::from_raw(0, 3)),
//!         (TokenKind::Ident, Span::from_raw(4, 5)),
//!     ],
//! )
//! .unwrap();
//!
//! let val = store.get(0).unwrap();
//! let x = store.get(1).unwrap();
//! let d = doc::new_tab(&Tab::ROOT, TabStyle::Inplace, |t| {
//!     doc::concat(doc::token(val), doc::at(t, doc::token(x)))
//! });
//!
//! let lowered = to_string_doc(&FormatConfig::default(), &store, &d);
//! assert!(matches!(lowered, tabfmt_strdoc::StrDoc::NewTab { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ann;
pub mod doc;
pub mod lower;
pub mod passes;
pub mod tab;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tabfmt_strdoc::StrDoc;
use tabfmt_token::TokenStore;

pub use doc::{Doc, DocVar};
pub use tab::{Flow, Tab, TabSet};

/// Configuration for the engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Display width of a literal tab character in the source; at least 1.
    pub tab_width: usize,
    /// Emit per-pass `tracing` output. Never affects the result.
    pub debug: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            tab_width: 4,
            debug: false,
        }
    }
}

/// Counters reported by the analysis passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Comment tokens woven in next to their host tokens.
    pub comments_woven: usize,
    /// Explicit spaces inserted between adjacent pieces.
    pub spaces_inserted: usize,
    /// Conditional newlines inserted for reconstructed blank lines.
    pub blank_conds_inserted: usize,
}

/// Run the full pipeline and lower `doc` to a string document.
///
/// # Panics
///
/// Panics if `config.tab_width` is zero, or on structurally invalid
/// documents (a tab or doc var referenced outside its scope).
#[must_use]
pub fn to_string_doc(config: &FormatConfig, store: &TokenStore, doc: &Doc) -> StrDoc {
    to_string_doc_with_stats(config, store, doc).0
}

/// Like [`to_string_doc`], also returning the pass counters.
#[must_use]
pub fn to_string_doc_with_stats(
    config: &FormatConfig,
    store: &TokenStore,
    doc: &Doc,
) -> (StrDoc, PipelineStats) {
    assert!(config.tab_width >= 1, "tab_width must be at least 1");

    let mut stats = PipelineStats::default();

    let ann = passes::annotate::annotate(doc);
    if config.debug {
        debug!(pass = "annotate", ?ann);
    }

    let ann = passes::flow::analyze(ann);
    if config.debug {
        debug!(pass = "flow", ?ann);
    }

    let ann = passes::comments::weave(store, ann, &mut stats);
    let ann = passes::flow::analyze(ann);
    if config.debug {
        debug!(pass = "weave+flow", woven = stats.comments_woven, ?ann);
    }

    let ann = passes::spaces::ensure_spaces(ann, &mut stats);
    if config.debug {
        debug!(pass = "spaces", inserted = stats.spaces_inserted, ?ann);
    }

    let ann = passes::blanks::insert_blank_lines(store, ann, &mut stats);
    if config.debug {
        debug!(pass = "blanks", inserted = stats.blank_conds_inserted, ?ann);
    }

    let lowered = lower::lower(store, config.tab_width, &ann);
    if config.debug {
        debug!(pass = "lower", doc = %lowered);
    }

    (lowered, stats)
}
