//! Parser registry
//!
//! Process-wide home for parser implementations, keyed by name and
//! resolvable by file extension or language tag. Registration and
//! lookup go through one `RwLock` so `register` is atomic with respect
//! to readers; parsers themselves are shared `Arc`s and must be
//! internally synchronised.

use crate::core::error::{Error, Result};
use crate::parse::parser::{ParserMetadata, SourceParser};
use crate::parse::swift::SwiftParser;
use crate::parse::typescript::TypeScriptParser;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct RegisteredParser {
    parser: Arc<dyn SourceParser>,
    registered_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    by_name: HashMap<String, RegisteredParser>,
    /// Names in registration order, for deterministic resolution when
    /// two parsers claim the same extension
    order: Vec<String>,
}

/// Registry of [`SourceParser`] implementations
#[derive(Default)]
pub struct ParserRegistry {
    inner: RwLock<RegistryInner>,
}

/// The process-wide registry, pre-loaded with the built-in parsers
static GLOBAL: Lazy<ParserRegistry> = Lazy::new(|| {
    let registry = ParserRegistry::new();
    registry
        .register(Arc::new(TypeScriptParser::new()))
        .expect("register builtin typescript parser");
    registry
        .register(Arc::new(SwiftParser::new()))
        .expect("register builtin swift parser");
    registry
});

/// Handle to the process-wide registry
pub fn global() -> &'static ParserRegistry {
    &GLOBAL
}

impl ParserRegistry {
    /// An empty registry (tests and embedders; the CLI uses [`global`])
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser. Fails with `DuplicateParser` when the name is
    /// taken.
    pub fn register(&self, parser: Arc<dyn SourceParser>) -> Result<()> {
        let name = parser.info().name;
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(&name) {
            return Err(Error::DuplicateParser { name });
        }
        inner.order.push(name.clone());
        inner.by_name.insert(
            name,
            RegisteredParser {
                parser,
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    pub fn get_by_name(&self, name: &str) -> Result<Arc<dyn SourceParser>> {
        self.inner
            .read()
            .by_name
            .get(name)
            .map(|r| Arc::clone(&r.parser))
            .ok_or_else(|| Error::ParserNotFound {
                lookup: format!("name {name}"),
            })
    }

    /// Lookup by name with a version requirement, matched on semver
    /// major.
    pub fn get_by_name_versioned(
        &self,
        name: &str,
        required: &str,
    ) -> Result<Arc<dyn SourceParser>> {
        let parser = self.get_by_name(name)?;
        let actual = parser.info().version;
        match (semver_major(required), semver_major(&actual)) {
            (Some(want), Some(have)) if want == have => Ok(parser),
            _ => Err(Error::IncompatibleVersion {
                name: name.to_string(),
                required: required.to_string(),
                actual,
            }),
        }
    }

    /// Lookup by extension, case-insensitive, tolerating a leading dot
    pub fn get_by_extension(&self, extension: &str) -> Result<Arc<dyn SourceParser>> {
        let wanted = extension.trim_start_matches('.').to_lowercase();
        let inner = self.inner.read();
        for name in &inner.order {
            let registered = &inner.by_name[name];
            if registered
                .parser
                .info()
                .supported_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&wanted))
            {
                return Ok(Arc::clone(&registered.parser));
            }
        }
        Err(Error::ParserNotFound {
            lookup: format!("extension .{wanted}"),
        })
    }

    /// Lookup by language tag, case-insensitive
    pub fn get_by_language(&self, language: &str) -> Result<Arc<dyn SourceParser>> {
        let inner = self.inner.read();
        for name in &inner.order {
            let registered = &inner.by_name[name];
            if registered
                .parser
                .info()
                .supported_languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(language))
            {
                return Ok(Arc::clone(&registered.parser));
            }
        }
        Err(Error::ParserNotFound {
            lookup: format!("language {language}"),
        })
    }

    /// Metadata for every registered parser, registration order
    pub fn list(&self) -> Vec<ParserMetadata> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .map(|name| {
                let registered = &inner.by_name[name];
                let info = registered.parser.info();
                ParserMetadata {
                    name: info.name,
                    version: info.version,
                    supported_extensions: info.supported_extensions,
                    supported_languages: info.supported_languages,
                    registered_at: registered.registered_at,
                }
            })
            .collect()
    }

    /// Drop all registrations (shutdown path for embedders)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.by_name.clear();
        inner.order.clear();
    }
}

/// Leading major component of a semver-ish string
fn semver_major(version: &str) -> Option<u64> {
    version.split('.').next()?.parse().ok()
}
