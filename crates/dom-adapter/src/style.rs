//! Inline `style` attribute codec.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Property {
    name: String,
    value: String,
    important: bool,
}

/// Ordered list of inline declarations, as held by an element's `style` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleDeclaration {
    properties: Vec<Property>,
}

impl StyleDeclaration {
    pub fn parse(raw: &str) -> Self {
        let mut properties: Vec<Property> = Vec::new();
        for chunk in split_declarations(raw) {
            let Some((name, value)) = chunk.split_once(':') else {
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            let mut value = value.trim();
            if name.is_empty() || value.is_empty() {
                continue;
            }
            let mut important = false;
            if let Some(stripped) = strip_important(value) {
                value = stripped;
                important = true;
            }
            let property = Property {
                name,
                value: value.to_string(),
                important,
            };
            match properties.iter_mut().find(|p| p.name == property.name) {
                Some(existing) => *existing = property,
                None => properties.push(property),
            }
        }
        Self { properties }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.value.as_str())
    }

    pub fn is_important(&self, name: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name) && p.important)
    }

    pub fn set(&mut self, name: &str, value: &str, important: bool) {
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                existing.value = value;
                existing.important = important;
            }
            None => self.properties.push(Property {
                name,
                value,
                important,
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| !p.name.eq_ignore_ascii_case(name));
        before != self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, property) in self.properties.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {}", property.name, property.value)?;
            if property.important {
                f.write_str(" !important")?;
            }
            f.write_str(";")?;
        }
        Ok(())
    }
}

fn strip_important(value: &str) -> Option<&str> {
    let lower = value.to_ascii_lowercase();
    let idx = lower.rfind("!important")?;
    if !lower[idx + "!important".len()..].trim().is_empty() {
        return None;
    }
    Some(value[..idx].trim_end())
}

// Splits on `;` outside quotes and parentheses so `url(...)` values survive.
fn split_declarations(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                parts.push(&raw[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_serializes_in_order() {
        let style = StyleDeclaration::parse("width: 300px; border:1px solid red ;height: 10vh !important");
        assert_eq!(style.len(), 3);
        assert_eq!(style.get("border"), Some("1px solid red"));
        assert!(style.is_important("height"));
        assert_eq!(
            style.to_css(),
            "width: 300px; border: 1px solid red; height: 10vh !important;"
        );
    }

    #[test]
    fn set_replaces_existing_property() {
        let mut style = StyleDeclaration::parse("width: 300px; height: 20px");
        style.set("WIDTH", "50vw", true);
        assert_eq!(style.to_css(), "width: 50vw !important; height: 20px;");
        assert!(style.remove("height"));
        assert!(!style.remove("height"));
    }

    #[test]
    fn keeps_semicolons_inside_urls() {
        let style = StyleDeclaration::parse(
            "background-image: url(\"data:image/svg+xml;utf8,<svg/>\") !important; color: red",
        );
        assert_eq!(
            style.get("background-image"),
            Some("url(\"data:image/svg+xml;utf8,<svg/>\")")
        );
        assert_eq!(style.get("color"), Some("red"));
    }

    #[test]
    fn ignores_garbage_chunks() {
        let style = StyleDeclaration::parse(";;nonsense; : ; color:");
        assert!(style.is_empty());
    }
}
