//! Small closed vocabularies shared by catalog documents and the engine
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source language variant handled by a language adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageVariant {
    #[serde(rename = "js", alias = "javascript")]
    JavaScript,
    #[serde(rename = "ts", alias = "typescript")]
    TypeScript,
    #[serde(rename = "python", alias = "py")]
    Python,
    #[serde(rename = "go", alias = "golang")]
    Go,
}

impl LanguageVariant {
    /// All variants in catalog order
    pub const ALL: [LanguageVariant; 4] = [
        LanguageVariant::JavaScript,
        LanguageVariant::TypeScript,
        LanguageVariant::Python,
        LanguageVariant::Go,
    ];

    /// Catalog identifier of this variant
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageVariant::JavaScript => "js",
            LanguageVariant::TypeScript => "ts",
            LanguageVariant::Python => "python",
            LanguageVariant::Go => "go",
        }
    }

    /// Infer the variant from a file extension (without the dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" => Some(LanguageVariant::JavaScript),
            "ts" | "mts" | "cts" | "tsx" => Some(LanguageVariant::TypeScript),
            "py" | "pyi" => Some(LanguageVariant::Python),
            "go" => Some(LanguageVariant::Go),
            _ => None,
        }
    }

    /// Conventional file extension for this variant
    pub fn extension(&self) -> &'static str {
        match self {
            LanguageVariant::JavaScript => "js",
            LanguageVariant::TypeScript => "ts",
            LanguageVariant::Python => "py",
            LanguageVariant::Go => "go",
        }
    }
}

impl fmt::Display for LanguageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "js" | "javascript" | "node" => Ok(LanguageVariant::JavaScript),
            "ts" | "typescript" => Ok(LanguageVariant::TypeScript),
            "python" | "py" => Ok(LanguageVariant::Python),
            "go" | "golang" => Ok(LanguageVariant::Go),
            other => Err(format!(
                "unknown language variant '{}' (expected js, ts, python or go)",
                other
            )),
        }
    }
}

/// Language tag of a catalog entry: one concrete variant or language-agnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LanguageScope {
    Any,
    Only(LanguageVariant),
}

impl LanguageScope {
    /// Whether an entry with this scope applies to the given variant
    pub fn applies_to(&self, variant: LanguageVariant) -> bool {
        match self {
            LanguageScope::Any => true,
            LanguageScope::Only(v) => *v == variant,
        }
    }

    pub fn variant(&self) -> Option<LanguageVariant> {
        match self {
            LanguageScope::Any => None,
            LanguageScope::Only(v) => Some(*v),
        }
    }
}

impl Default for LanguageScope {
    fn default() -> Self {
        LanguageScope::Any
    }
}

impl TryFrom<String> for LanguageScope {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("any") {
            Ok(LanguageScope::Any)
        } else {
            value.parse().map(LanguageScope::Only)
        }
    }
}

impl From<LanguageScope> for String {
    fn from(scope: LanguageScope) -> Self {
        scope.to_string()
    }
}

impl fmt::Display for LanguageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageScope::Any => f.write_str("any"),
            LanguageScope::Only(v) => write!(f, "{}", v),
        }
    }
}

/// Kind of syntactic site a matcher targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    Import,
    Construction,
    Call,
    Handler,
    TypeReference,
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteKind::Import => "import",
            SiteKind::Construction => "construction",
            SiteKind::Call => "call",
            SiteKind::Handler => "handler",
            SiteKind::TypeReference => "type_reference",
        };
        f.write_str(name)
    }
}

/// Structural fidelity offered by an adapter or required by a template
///
/// Ordered so that `adapter >= required` means the template may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Lexical tokens with delimiter matching only
    TokenStream,
    /// A complete concrete syntax tree
    Full,
}

impl Default for Fidelity {
    fn default() -> Self {
        Fidelity::TokenStream
    }
}

impl fmt::Display for Fidelity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fidelity::TokenStream => f.write_str("token_stream"),
            Fidelity::Full => f.write_str("full"),
        }
    }
}

/// Named sub-element of a site that a capture can bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePart {
    /// Receiver expression of a call or qualifier of a construction
    Receiver,
    /// Body of a handler definition
    Body,
    /// Trailing function argument of a call
    Callback,
    /// Variable the site result is assigned to
    Binding,
    /// Method, type or handler name
    Name,
}

/// Token class a cleanup rule is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupScope {
    /// String literal tokens
    String,
    /// Comment tokens
    Comment,
    /// Any text outside strings and comments
    Code,
}

impl fmt::Display for CleanupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupScope::String => f.write_str("string"),
            CleanupScope::Comment => f.write_str("comment"),
            CleanupScope::Code => f.write_str("code"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_scope_parsing() {
        let scope: LanguageScope = serde_yaml::from_str("any").unwrap();
        assert_eq!(scope, LanguageScope::Any);

        let scope: LanguageScope = serde_yaml::from_str("python").unwrap();
        assert_eq!(scope, LanguageScope::Only(LanguageVariant::Python));
        assert!(scope.applies_to(LanguageVariant::Python));
        assert!(!scope.applies_to(LanguageVariant::Go));

        assert!(serde_yaml::from_str::<LanguageScope>("cobol").is_err());
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(LanguageVariant::from_extension("mjs"), Some(LanguageVariant::JavaScript));
        assert_eq!(LanguageVariant::from_extension("TS"), Some(LanguageVariant::TypeScript));
        assert_eq!(LanguageVariant::from_extension("py"), Some(LanguageVariant::Python));
        assert_eq!(LanguageVariant::from_extension("rs"), None);
    }

    #[test]
    fn test_fidelity_ordering() {
        assert!(Fidelity::Full > Fidelity::TokenStream);
        assert_eq!(Fidelity::default(), Fidelity::TokenStream);
    }

    #[test]
    fn test_site_kind_serde() {
        let kind: SiteKind = serde_json::from_str("\"type_reference\"").unwrap();
        assert_eq!(kind, SiteKind::TypeReference);
        assert_eq!(kind.to_string(), "type_reference");
    }
}
