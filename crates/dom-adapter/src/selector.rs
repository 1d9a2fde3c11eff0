//! The selector subset the locator emits: `*`, `tag` and `tag[attr="value"]`.
//!
//! `VirtualDom` only understands this grammar. It is the whole output space of
//! `element-locator`, so no general CSS engine sits behind the stub page.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unterminated attribute block in `{0}`")]
    Unterminated(String),
    #[error("malformed attribute block in `{0}`")]
    MalformedAttribute(String),
    #[error("unsupported selector syntax `{0}`")]
    Unsupported(String),
}

/// Exact-match attribute condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    /// `None` matches any tag.
    pub tag: Option<String>,
    pub attribute: Option<AttributeMatch>,
}

impl Selector {
    pub fn any() -> Self {
        Self {
            tag: None,
            attribute: None,
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into().to_ascii_lowercase()),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute = Some(AttributeMatch {
            name: name.into().to_ascii_lowercase(),
            value: value.into(),
        });
        self
    }

    pub fn parse(raw: &str) -> Result<Self, SelectorError> {
        raw.parse()
    }

    /// Tests a candidate given its tag and an attribute lookup.
    pub fn matches<'a>(&self, tag: &str, attribute: impl Fn(&str) -> Option<&'a str>) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        match &self.attribute {
            Some(cond) => attribute(&cond.name) == Some(cond.value.as_str()),
            None => true,
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SelectorError::Empty);
        }
        let (head, block) = match raw.find('[') {
            Some(idx) => (&raw[..idx], Some(&raw[idx..])),
            None => (raw, None),
        };
        if !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
            return Err(SelectorError::Unsupported(raw.to_string()));
        }
        let tag = match head {
            "" | "*" => None,
            other if other.contains('*') => {
                return Err(SelectorError::Unsupported(raw.to_string()))
            }
            other => Some(other.to_ascii_lowercase()),
        };
        let attribute = match block {
            Some(block) => Some(parse_attribute(raw, block)?),
            None => None,
        };
        Ok(Self { tag, attribute })
    }
}

fn parse_attribute(raw: &str, block: &str) -> Result<AttributeMatch, SelectorError> {
    let inner = block
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| SelectorError::Unterminated(raw.to_string()))?;
    let (name, value) = inner
        .split_once('=')
        .ok_or_else(|| SelectorError::MalformedAttribute(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(SelectorError::MalformedAttribute(raw.to_string()));
    }
    let value = value.trim();
    let value = match value.chars().next() {
        Some(q @ ('"' | '\'')) => unquote(value, q)
            .ok_or_else(|| SelectorError::MalformedAttribute(raw.to_string()))?,
        _ => value.to_string(),
    };
    Ok(AttributeMatch {
        name: name.to_ascii_lowercase(),
        value,
    })
}

fn unquote(value: &str, quote: char) -> Option<String> {
    let body = value.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push(chars.next()?),
            c if c == quote => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.attribute.is_none() => f.write_str("*")?,
            None => {}
        }
        if let Some(cond) = &self.attribute {
            write!(f, "[{}=\"", cond.name)?;
            for ch in cond.value.chars() {
                if ch == '"' || ch == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{ch}")?;
            }
            f.write_str("\"]")?;
        }
        Ok(())
    }
}
