use crate::GuidelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of one of the served guideline documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentName {
    Rules,
    Skills,
    Steering,
}

impl DocumentName {
    /// All documents, in serving order
    pub const ALL: [DocumentName; 3] = [Self::Rules, Self::Skills, Self::Steering];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Skills => "skills",
            Self::Steering => "steering",
        }
    }

    /// Stable resource identifier, e.g. `guidelines://rules`
    pub fn uri(&self) -> String {
        format!("guidelines://{}", self.as_str())
    }

    /// Resolve a resource identifier back to a document name
    pub fn from_uri(uri: &str) -> Result<Self, GuidelineError> {
        uri.strip_prefix("guidelines://")
            .ok_or_else(|| GuidelineError::NotFound(uri.to_string()))?
            .parse()
    }

    /// Name of the protocol tool serving this document
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::Rules => "get_coding_rules",
            Self::Skills => "get_development_skills",
            Self::Steering => "get_steering_instructions",
        }
    }

    /// Title used when the document carries none of its own
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Rules => "Professional Coding Rules",
            Self::Skills => "Development Skills & Practices",
            Self::Steering => "AI Steering Instructions",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Rules => "Comprehensive professional coding rules and standards",
            Self::Skills => "Essential development skills and best practices",
            Self::Steering => "Instructions for AI agents to code effectively",
        }
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentName {
    type Err = GuidelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rules" => Ok(Self::Rules),
            "skills" => Ok(Self::Skills),
            "steering" => Ok(Self::Steering),
            other => Err(GuidelineError::NotFound(other.to_string())),
        }
    }
}

/// A loaded guideline document. Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: DocumentName,
    pub title: String,
    pub content: String,
    pub char_count: usize,
    /// Hex SHA-256 of `content`, used to detect stale encodings
    pub digest: String,
}

impl Document {
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }
}

/// Byte representation a cached document can be served in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheFormat {
    /// UTF-8 text as loaded
    Plain,
    /// gzip of the text
    CompressedText,
    /// gzip of a JSON envelope carrying the text and its metadata
    CompressedSerialized,
}

impl CacheFormat {
    pub const ALL: [CacheFormat; 3] = [
        Self::Plain,
        Self::CompressedText,
        Self::CompressedSerialized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::CompressedText => "compressed-text",
            Self::CompressedSerialized => "compressed-serialized",
        }
    }

    /// File extension used for the on-disk cache bundle
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Plain => "md",
            Self::CompressedText => "md.gz",
            Self::CompressedSerialized => "json.gz",
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

impl fmt::Display for CacheFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheFormat {
    type Err = GuidelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "compressed-text" => Ok(Self::CompressedText),
            "compressed-serialized" => Ok(Self::CompressedSerialized),
            other => Err(GuidelineError::Misuse(format!(
                "unknown cache format '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip() {
        for name in DocumentName::ALL {
            assert_eq!(DocumentName::from_uri(&name.uri()).unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        assert!(matches!(
            "recipes".parse::<DocumentName>(),
            Err(GuidelineError::NotFound(_))
        ));
        assert!(matches!(
            DocumentName::from_uri("files://rules"),
            Err(GuidelineError::NotFound(_))
        ));
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(DocumentName::Rules.tool_name(), "get_coding_rules");
        assert_eq!(DocumentName::Skills.tool_name(), "get_development_skills");
        assert_eq!(
            DocumentName::Steering.tool_name(),
            "get_steering_instructions"
        );
    }

    #[test]
    fn test_cache_format_parse() {
        assert_eq!(
            "compressed-text".parse::<CacheFormat>().unwrap(),
            CacheFormat::CompressedText
        );
        assert!("pickle".parse::<CacheFormat>().is_err());
        assert!(!CacheFormat::Plain.is_compressed());
    }
}
