//! Discovery of contract declarations under a set of module paths.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::declaration::{AttributeMap, Declaration, DeclarationKind, DeclarationSource};
use crate::error::ScanError;

/// A validated module path; matches itself and every module nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation(String);

impl SourceLocation {
    /// # Errors
    /// [`ScanError::InvalidLocation`] if `raw` is not a `::`-separated path of identifiers.
    pub fn parse(raw: &str) -> Result<Self, ScanError> {
        let invalid = |reason: &str| ScanError::InvalidLocation {
            location: raw.to_owned(),
            reason: reason.to_owned(),
        };

        if raw.is_empty() {
            return Err(invalid("location is empty"));
        }
        for segment in raw.split("::") {
            let mut chars = segment.chars();
            match chars.next() {
                None => return Err(invalid("empty path segment")),
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
                Some(_) => return Err(invalid("path segment must start with a letter or '_'")),
            }
            if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("path segment contains characters outside [A-Za-z0-9_]"));
            }
        }
        Ok(Self(raw.to_owned()))
    }

    /// Trim every entry, drop empty ones and validate the rest.
    ///
    /// # Errors
    /// The first invalid entry.
    pub fn parse_list<S: AsRef<str>>(entries: &[S]) -> Result<Vec<Self>, ScanError> {
        entries
            .iter()
            .map(|e| e.as_ref().trim())
            .filter(|e| !e.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn contains(&self, module_path: &str) -> bool {
        module_path
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discovered contract: the type and the marker attributes declared on it.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub type_name: String,
    pub attributes: AttributeMap,
}

impl ContractDescriptor {
    /// Last `::` segment of the type name.
    pub fn short_name(&self) -> &str {
        self.type_name
            .rsplit_once("::")
            .map_or(self.type_name.as_str(), |(_, short)| short)
    }
}

pub struct ContractScanner {
    source: Arc<dyn DeclarationSource>,
    marker: String,
}

impl ContractScanner {
    pub fn new(source: Arc<dyn DeclarationSource>, marker: impl Into<String>) -> Self {
        Self {
            source,
            marker: marker.into(),
        }
    }

    /// Validate `locations` and return the contracts found under them.
    ///
    /// Contracts are emitted location by location, sorted by type name within each,
    /// and at most once even when locations overlap. Filtering happens as the
    /// returned iterator is advanced.
    ///
    /// # Errors
    /// [`ScanError`] for the first invalid location; nothing is scanned in that case.
    pub fn scan<S: AsRef<str>>(&self, locations: &[S]) -> Result<Scan, ScanError> {
        let locations = SourceLocation::parse_list(locations)?;
        let mut declarations = if locations.is_empty() {
            Vec::new()
        } else {
            self.source.declarations()
        };
        declarations.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        tracing::debug!(
            locations = ?locations.iter().map(SourceLocation::as_str).collect::<Vec<_>>(),
            candidates = declarations.len(),
            marker = %self.marker,
            "scanning for contracts"
        );

        Ok(Scan {
            marker: self.marker.clone(),
            locations,
            declarations,
            location_idx: 0,
            declaration_idx: 0,
            seen: HashSet::new(),
        })
    }
}

/// Lazy scan result, see [`ContractScanner::scan`].
pub struct Scan {
    marker: String,
    locations: Vec<SourceLocation>,
    declarations: Vec<Declaration>,
    location_idx: usize,
    declaration_idx: usize,
    seen: HashSet<String>,
}

impl Scan {
    fn candidate(&self, decl: &Declaration) -> Option<AttributeMap> {
        if decl.kind != DeclarationKind::Interface || !decl.independent {
            return None;
        }
        decl.marker(&self.marker).map(|m| m.attributes.clone())
    }
}

impl Iterator for Scan {
    type Item = ContractDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(location) = self.locations.get(self.location_idx) {
            while let Some(decl) = self.declarations.get(self.declaration_idx) {
                self.declaration_idx += 1;
                if !location.contains(&decl.module_path) || self.seen.contains(&decl.type_name) {
                    continue;
                }
                let Some(attributes) = self.candidate(decl) else {
                    tracing::trace!(
                        type_name = %decl.type_name,
                        "not a marked top-level trait, skipped"
                    );
                    continue;
                };
                let type_name = decl.type_name.clone();
                self.seen.insert(type_name.clone());
                tracing::debug!(%type_name, %location, "discovered contract");
                return Some(ContractDescriptor {
                    type_name,
                    attributes,
                });
            }
            self.location_idx += 1;
            self.declaration_idx = 0;
        }
        None
    }
}
