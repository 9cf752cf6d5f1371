//! CSS selectors evaluated end to end: each selector must select exactly
//! the nodes its hand-written `XPath` equivalent selects.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use xmlguard::css::{self, CssError};
use xmlguard::query::{QueryError, QueryKind, ValidationCache};
use xmlguard::Document;

const LIBRARY: &str = r#"<library>
  <book id="id1" class="fiction classic" lang="en">
    <title>Emma</title>
    <author>Austen</author>
  </book>
  <book id="id2" class="non-fiction" lang="en-US">
    <title>Cosmos</title>
    <link href="https://example.org/cosmos.pdf" rel="alternate nofollow"/>
  </book>
  <shelf>
    <book id="id3" class="fiction">
      <title>Dune</title>
    </book>
    <magazine lang="fr"><title>Le Monde</title></magazine>
  </shelf>
</library>"#;

fn ids<'a>(nodes: impl IntoIterator<Item = xmlguard::Node<'a>>) -> Vec<String> {
    nodes
        .into_iter()
        .map(|n| {
            n.attribute("id")
                .map_or_else(|| n.name().unwrap_or_default().to_owned(), str::to_owned)
        })
        .collect()
}

fn assert_same(doc: &Document, selector: &str, expression: &str) {
    let cache = ValidationCache::new();
    let by_css = doc.search_with(&cache, selector, QueryKind::Css).unwrap();
    let by_xpath = doc.search_with(&cache, expression, QueryKind::XPath).unwrap();
    assert_eq!(by_css, by_xpath, "{selector} vs {expression}");
}

// ---------------------------------------------------------------------------
// Equivalence with XPath
// ---------------------------------------------------------------------------

#[test]
fn test_type_selector() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_same(&doc, "book", "//book");
    assert_eq!(doc.css("book").unwrap().len(), 3);
}

#[test]
fn test_class_selector() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_same(
        &doc,
        ".fiction",
        "//*[contains(concat(' ', normalize-space(@class), ' '), ' fiction ')]",
    );
    // Whole-token match: "non-fiction" is not "fiction".
    assert_eq!(ids(doc.css(".fiction").unwrap()), vec!["id1", "id3"]);
    assert_eq!(ids(doc.css("book.fiction.classic").unwrap()), vec!["id1"]);
}

#[test]
fn test_id_selector() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_same(&doc, "#id1", "//*[@id='id1']");
    assert_eq!(doc.at_css("#id2").unwrap().unwrap().name(), Some("book"));
}

#[test]
fn test_child_combinator() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_same(&doc, "library > book", "//library/book");
    assert_eq!(ids(doc.css("library > book").unwrap()), vec!["id1", "id2"]);
}

#[test]
fn test_descendant_combinator() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_same(&doc, "library title", "//library//title");
    assert_eq!(doc.css("shelf title").unwrap().len(), 2);
}

#[test]
fn test_attribute_operators() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert_eq!(ids(doc.css("[lang]").unwrap()), vec!["id1", "id2", "magazine"]);
    assert_eq!(ids(doc.css("book[lang='en']").unwrap()), vec!["id1"]);
    assert_eq!(ids(doc.css("[lang|=en]").unwrap()), vec!["id1", "id2"]);
    assert_eq!(doc.css("link[href^='https:']").unwrap().len(), 1);
    assert_eq!(doc.css("link[href$='.pdf']").unwrap().len(), 1);
    assert_eq!(doc.css("link[href$='.txt']").unwrap().len(), 0);
    assert_eq!(doc.css("link[href*=example]").unwrap().len(), 1);
    assert_eq!(doc.css("link[rel~=nofollow]").unwrap().len(), 1);
    assert_eq!(doc.css("link[rel~=follow]").unwrap().len(), 0);
}

#[test]
fn test_empty_operand_matches_nothing() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    assert!(doc.css("book[class^='']").unwrap().is_empty());
    assert!(doc.css("book[class*='']").unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Context nodes
// ---------------------------------------------------------------------------

#[test]
fn test_css_from_element_matches_compiled_xpath() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    let cache = ValidationCache::new();
    let shelf = doc.at_css("shelf").unwrap().unwrap();
    for selector in ["book", "shelf > book", "[lang]", "title"] {
        let compiled = css::compile(selector).unwrap();
        let by_css = shelf.search_with(&cache, selector, QueryKind::Css).unwrap();
        let by_xpath = shelf.search_with(&cache, &compiled, QueryKind::XPath).unwrap();
        assert_eq!(by_css, by_xpath, "{selector} vs {compiled}");
    }
}

#[test]
fn test_css_is_root_anchored_from_any_context() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    let shelf = doc.at_css("shelf").unwrap().unwrap();
    assert_eq!(ids(shelf.css("book").unwrap()), vec!["id1", "id2", "id3"]);
    assert_eq!(shelf.css("book").unwrap(), doc.css("book").unwrap());
    assert_eq!(shelf.css("shelf").unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_selectors_are_errors() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    for selector in ["", "book[", "book >", "#", "book + title", "a:hover"] {
        let err = doc.css(selector).unwrap_err();
        assert!(
            matches!(err, QueryError::InvalidSelector(_)),
            "{selector:?}: {err}"
        );
        assert!(err.is_input_validation());
    }
}

#[test]
fn test_error_positions() {
    assert_eq!(
        css::compile("book[lang").unwrap_err(),
        CssError::UnterminatedAttribute { position: 4 }
    );
    assert_eq!(css::compile("a, b").unwrap_err().position(), Some(1));
}

#[test]
fn test_compiled_xpath_is_cached() {
    let doc = Document::parse_str(LIBRARY).unwrap();
    let cache = ValidationCache::new();
    doc.search_with(&cache, "library > book", QueryKind::Css).unwrap();
    assert_eq!(cache.entries(), vec!["//library/book"]);
}
