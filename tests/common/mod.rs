//! Shared fixtures for integration tests.

#![allow(dead_code)]

use spark_headless::primitives::reset_id_counter;
use spark_headless::{Document, ElementId, Host};

/// Fresh document + host with the id counter reset.
pub fn setup() -> (Document, Host) {
    reset_id_counter();
    let doc = Document::new();
    let host = Host::new(doc.clone());
    (doc, host)
}

/// `count` children of `parent` with the given tag.
pub fn children(doc: &Document, parent: ElementId, tag: &str, count: usize) -> Vec<ElementId> {
    (0..count).map(|_| doc.create_child(parent, tag)).collect()
}

/// A labelled child: `<tag>text</tag>`.
pub fn labelled(doc: &Document, parent: ElementId, tag: &str, text: &str) -> ElementId {
    let element = doc.create_child(parent, tag);
    doc.set_text(element, text);
    element
}

/// Route `tracing` output to the test writer when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
