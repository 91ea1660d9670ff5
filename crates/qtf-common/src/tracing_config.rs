//! Tracing setup for test binaries and host checkers.
//!
//! The filter comes from `QTF_LOG`, falling back to `RUST_LOG`. Setting
//! `QTF_LOG_TREE` switches from flat lines to indented `tracing-tree`
//! output, which follows nested subtype checks more easily.
//!
//! ```bash
//! QTF_LOG="qtf_solver::infer=trace" cargo test -p qtf-solver
//! QTF_LOG=debug QTF_LOG_TREE=1 cargo test -p qtf-checker
//! ```
//!
//! Without a filter variable nothing is installed.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry};

/// Filter directives; `QTF_LOG` wins over `RUST_LOG`.
pub(crate) fn directives(qtf_log: Option<String>, rust_log: Option<String>) -> Option<String> {
    let set = |d: &String| !d.trim().is_empty();
    qtf_log.filter(set).or_else(|| rust_log.filter(set))
}

/// Install the global subscriber.
///
/// Test binaries call this from every test; only the first call installs
/// anything. Flat output goes through the test writer so that libtest
/// captures it per test.
pub fn init_tracing() {
    let Some(directives) = directives(std::env::var("QTF_LOG").ok(), std::env::var("RUST_LOG").ok())
    else {
        return;
    };
    let filter = EnvFilter::builder().parse_lossy(directives);

    let _ = if std::env::var_os("QTF_LOG_TREE").is_some() {
        let tree_layer = tracing_tree::HierarchicalLayer::default()
            .with_indent_amount(2)
            .with_indent_lines(true)
            .with_targets(true);
        Registry::default().with(filter).with(tree_layer).try_init().is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .is_ok()
    };
}
