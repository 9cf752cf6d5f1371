//! XML 1.0 parser.
//!
//! A hand-rolled recursive descent parser that builds a `Document` arena.
//! It checks well-formedness (matching tags, unique attributes, a single
//! root element), expands the predefined and internally declared entities,
//! and enforces limits on nesting depth and entity expansion.
//!
//! External entities (declared `SYSTEM` or `PUBLIC` in the internal subset)
//! are never fetched by the parser. With `allow_external_entities` off (the
//! default) a reference to one is skipped with a warning; with it on the
//! reference is handed to the configured [`EntityResolver`].

pub(crate) mod input;
mod xml;

use std::sync::Arc;

use crate::error::ParseError;
use crate::tree::Document;

use input::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTITY_EXPANSIONS};

/// A request to resolve an external entity.
///
/// Passed to the [`EntityResolver`] callback when the document references
/// an entity declared with a `SYSTEM` or `PUBLIC` identifier.
#[derive(Debug)]
pub struct ExternalEntityRequest<'a> {
    /// The entity name as declared in the DTD.
    pub name: &'a str,
    /// The SYSTEM identifier (URI) from the entity declaration.
    pub system_id: &'a str,
    /// The PUBLIC identifier from the entity declaration, if any.
    pub public_id: Option<&'a str>,
}

/// A callback for resolving external entities.
///
/// Returns `Some(replacement_text)` to expand the entity, or `None` to
/// reject the reference, which fails the parse.
///
/// # Security
///
/// Resolving external entities opens the door to XML External Entity (XXE)
/// attacks. Only install a resolver for trusted input, and restrict which
/// identifiers it is willing to serve.
pub type EntityResolver = Arc<dyn Fn(ExternalEntityRequest<'_>) -> Option<String> + Send + Sync>;

/// Parse options controlling external entity policy and security limits.
///
/// ```
/// use xmlguard::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .max_depth(64)
///     .max_entity_expansions(500);
/// assert!(!opts.allow_external_entities);
/// ```
#[derive(Clone)]
pub struct ParseOptions {
    /// Whether references to external entities may be resolved
    /// (default: `false`).
    pub allow_external_entities: bool,
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of entity reference expansions per document
    /// (default: 10,000). Nested expansions count individually.
    pub max_entity_expansions: u32,
    /// Optional callback for resolving external entities. Consulted only
    /// when `allow_external_entities` is set.
    pub entity_resolver: Option<EntityResolver>,
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("allow_external_entities", &self.allow_external_entities)
            .field("max_depth", &self.max_depth)
            .field("max_entity_expansions", &self.max_entity_expansions)
            .field(
                "entity_resolver",
                &self.entity_resolver.as_ref().map(|_| "..."),
            )
            .finish()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            allow_external_entities: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
            entity_resolver: None,
        }
    }
}

impl ParseOptions {
    /// Allows or forbids resolution of external entities.
    #[must_use]
    pub fn allow_external_entities(mut self, yes: bool) -> Self {
        self.allow_external_entities = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of entity reference expansions.
    #[must_use]
    pub fn max_entity_expansions(mut self, max: u32) -> Self {
        self.max_entity_expansions = max;
        self
    }

    /// Sets the external entity resolver callback.
    ///
    /// The resolver only runs when
    /// [`allow_external_entities`](Self::allow_external_entities) is on.
    #[must_use]
    pub fn entity_resolver(
        mut self,
        resolver: impl Fn(ExternalEntityRequest<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.entity_resolver = Some(Arc::new(resolver));
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML or exceeds one
/// of the configured limits.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let mut parser = xml::XmlParser::new(input, options);
    parser.parse()
}
