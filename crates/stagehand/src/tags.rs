// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Canonical provider tags.
//!
//! Tags address values in a backend's dependency graph: by name
//! (`name:"db"`, optionally `optional:"true"`) or by group (`group:"routes"`,
//! with `flatten` or `soft` flags). They never carry values themselves.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// No tag: the value is addressed by its type alone.
pub const EMPTY: &str = "";
/// Marks a dependency as optional.
pub const OPTIONAL: &str = r#"optional:"true""#;

/// Whether a tag addresses a single named value or a group of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Name,
    Group,
}

/// Structured form of a provider tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderTag {
    pub kind: TagKind,
    pub id: String,
    pub optional: bool,
    /// Group results: a provider's collection is spread into the group.
    pub flatten: bool,
    /// Group params: only values that were already constructed.
    pub soft: bool,
}

impl ProviderTag {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: TagKind::Name,
            id: name.into(),
            optional: false,
            flatten: false,
            soft: false,
        }
    }

    pub fn group(group: impl Into<String>) -> Self {
        Self {
            kind: TagKind::Group,
            id: group.into(),
            optional: false,
            flatten: false,
            soft: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TagKind::Name => write!(f, r#"name:"{}""#, self.id)?,
            TagKind::Group => {
                write!(f, r#"group:"{}"#, self.id)?;
                if self.flatten {
                    f.write_str(",flatten")?;
                }
                if self.soft {
                    f.write_str(",soft")?;
                }
                f.write_str("\"")?;
            }
        }
        if self.optional {
            write!(f, " {OPTIONAL}")?;
        }
        Ok(())
    }
}

/// Error parsing a tag string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("empty tag")]
    Empty,
    #[error("malformed tag segment '{0}'")]
    Malformed(String),
    #[error("unknown tag key '{0}'")]
    UnknownKey(String),
    #[error("unknown group flag '{0}'")]
    UnknownFlag(String),
    #[error("tag sets both name and group")]
    Conflict,
}

impl FromStr for ProviderTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TagError::Empty);
        }

        let mut tag: Option<ProviderTag> = None;
        let mut optional = false;

        for (key, value) in segments(s)? {
            match key {
                "name" => {
                    if tag.is_some() {
                        return Err(TagError::Conflict);
                    }
                    tag = Some(ProviderTag::named(value));
                }
                "group" => {
                    if tag.is_some() {
                        return Err(TagError::Conflict);
                    }
                    let mut parts = value.split(',');
                    let mut group = ProviderTag::group(parts.next().unwrap_or_default());
                    for flag in parts {
                        group = match flag {
                            "flatten" => group.flatten(),
                            "soft" => group.soft(),
                            other => return Err(TagError::UnknownFlag(other.to_string())),
                        };
                    }
                    tag = Some(group);
                }
                "optional" => optional = value == "true",
                other => return Err(TagError::UnknownKey(other.to_string())),
            }
        }

        let mut tag = tag.ok_or_else(|| TagError::Malformed(s.to_string()))?;
        tag.optional = optional;
        Ok(tag)
    }
}

/// Splits `key:"value" key:"value"` into pairs. Values may contain spaces.
fn segments(s: &str) -> Result<Vec<(&str, &str)>, TagError> {
    let malformed = |at: &str| {
        TagError::Malformed(at.split_whitespace().next().unwrap_or(at).to_string())
    };

    let mut pairs = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        let (key, quoted) = rest.split_once(':').ok_or_else(|| malformed(rest))?;
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(malformed(rest));
        }
        let (value, tail) = quoted
            .strip_prefix('"')
            .and_then(|v| v.split_once('"'))
            .ok_or_else(|| malformed(rest))?;
        if !tail.is_empty() && !tail.starts_with(char::is_whitespace) {
            return Err(malformed(rest));
        }
        pairs.push((key, value));
        rest = tail.trim_start();
    }
    Ok(pairs)
}

/// `name:"<name>"`
pub fn named(name: &str) -> String {
    ProviderTag::named(name).to_string()
}

/// `name:"<name>" optional:"true"`
pub fn named_optional(name: &str) -> String {
    ProviderTag::named(name).optional().to_string()
}

/// `group:"<group>"`
pub fn group(group: &str) -> String {
    ProviderTag::group(group).to_string()
}

/// `group:"<group>,flatten"`
pub fn group_flatten(group: &str) -> String {
    ProviderTag::group(group).flatten().to_string()
}

/// `group:"<group>,soft"`
pub fn group_soft(group: &str) -> String {
    ProviderTag::group(group).soft().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoders() {
        assert_eq!(named("db"), r#"name:"db""#);
        assert_eq!(named_optional("db"), r#"name:"db" optional:"true""#);
        assert_eq!(group("routes"), r#"group:"routes""#);
        assert_eq!(group_flatten("routes"), r#"group:"routes,flatten""#);
        assert_eq!(group_soft("routes"), r#"group:"routes,soft""#);
    }

    #[test]
    fn test_parse_named_optional() {
        let tag: ProviderTag = r#"name:"logger.config" optional:"true""#.parse().unwrap();
        assert_eq!(tag.kind, TagKind::Name);
        assert_eq!(tag.id, "logger.config");
        assert!(tag.optional);
    }

    #[test]
    fn test_parse_group_flags() {
        let tag: ProviderTag = r#"group:"config.files,flatten""#.parse().unwrap();
        assert_eq!(tag.kind, TagKind::Group);
        assert_eq!(tag.id, "config.files");
        assert!(tag.flatten);
        assert!(!tag.soft);
    }

    #[test]
    fn test_parse_values_with_spaces() {
        let tag = ProviderTag::named("billing db").optional();
        assert_eq!(tag.to_string().parse::<ProviderTag>(), Ok(tag));

        let tag: ProviderTag = r#"group:"http routes,soft""#.parse().unwrap();
        assert_eq!(tag.id, "http routes");
        assert!(tag.soft);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ProviderTag>(), Err(TagError::Empty));
        assert!(matches!(
            "name=db".parse::<ProviderTag>(),
            Err(TagError::Malformed(_))
        ));
        assert!(matches!(
            r#"group:"a,weird""#.parse::<ProviderTag>(),
            Err(TagError::UnknownFlag(_))
        ));
        assert_eq!(
            r#"name:"a" group:"b""#.parse::<ProviderTag>(),
            Err(TagError::Conflict)
        );
        assert!(matches!(
            r#"name:"unterminated"#.parse::<ProviderTag>(),
            Err(TagError::Malformed(_))
        ));
        assert!(matches!(
            r#"name:"a"optional:"true""#.parse::<ProviderTag>(),
            Err(TagError::Malformed(_))
        ));
    }
}
