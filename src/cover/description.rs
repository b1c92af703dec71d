//! Filing-history description text.
//!
//! A description such as `**Registered office changed** from {old} to {new}`
//! has a bold head (`Registered office changed`) and a plain tail. Only the
//! tail carries `{name}` placeholders.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use crate::layout::normalize_whitespace;
use std::collections::HashMap;
use std::ops::Range;

const BOLD_DELIMITER: &str = "**";

lazy_static! {
    /// `{name}` placeholder tokens.
    static ref RE_PLACEHOLDER: Regex = Regex::new(r"\{([^{}\s]+)\}").unwrap();
}

/// A description split at its bold segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingDescription {
    /// Plain text before the opening delimiter
    pub lead: String,
    /// Text inside the delimiters, or the whole description
    pub head: String,
    /// Text after the closing delimiter, without its leading whitespace
    pub tail: String,
    /// Whether the head was delimited and renders bold
    pub bold: bool,
}

/// Final description text and the byte range drawn in bold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDescription {
    /// `lead`, `head` and the substituted tail, joined without a separator
    pub text: String,
    /// Byte range of the bold head within `text`; empty when the
    /// description had no delimited segment
    pub bold: Range<usize>,
}

impl FilingDescription {
    /// Split a raw description at its first `**...**` pair.
    ///
    /// Without a closing delimiter the whole text is the head and renders
    /// plain.
    pub fn parse(raw: &str) -> Self {
        if let Some(open) = raw.find(BOLD_DELIMITER) {
            let inner = &raw[open + BOLD_DELIMITER.len()..];
            if let Some(close) = inner.find(BOLD_DELIMITER) {
                return Self {
                    lead: raw[..open].to_string(),
                    head: inner[..close].to_string(),
                    tail: inner[close + BOLD_DELIMITER.len()..].trim_start().to_string(),
                    bold: true,
                };
            }
        }
        Self {
            lead: String::new(),
            head: raw.to_string(),
            tail: String::new(),
            bold: false,
        }
    }

    /// Substitute the tail's placeholders, append the filing type and join
    /// head and tail without a separator. Whitespace runs collapse to a
    /// single space.
    pub fn compose(&self, filing_type: &str, values: &HashMap<String, String>) -> Result<ComposedDescription> {
        let mut tail = substitute_placeholders(&self.tail, values)?;
        tail.push_str(" (");
        tail.push_str(filing_type);
        tail.push(')');

        let lead = normalize_whitespace(self.lead.trim_start());
        let head = normalize_whitespace(&self.head);
        let head = head.trim();
        let start = lead.len();
        let bold = if self.bold { start..start + head.len() } else { start..start };

        Ok(ComposedDescription {
            text: format!("{}{}{}", lead, head, normalize_whitespace(&tail)),
            bold,
        })
    }
}

/// Replace each `{name}` whose name has a value; unknown names stay as
/// written. Values whose name contains `date` must be ISO dates and are
/// written in long form.
pub fn substitute_placeholders(text: &str, values: &HashMap<String, String>) -> Result<String> {
    let mut failure = None;
    let replaced = RE_PLACEHOLDER.replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match values.get(name) {
            Some(value) if name.contains("date") => match long_date(value) {
                Some(formatted) => formatted,
                None => {
                    failure.get_or_insert_with(|| Error::InvalidDate {
                        key: name.to_string(),
                        value: value.clone(),
                    });
                    caps[0].to_string()
                },
            },
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// `2024-01-01` → `1 January 2024`.
pub fn long_date(iso: &str) -> Option<String> {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%-d %B %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_registered_office_change() {
        let description = FilingDescription::parse("**Registered office changed** from {old} to {new} on {date}");
        assert_eq!(description.head, "Registered office changed");
        let composed = description
            .compose(
                "AD01",
                &values(&[("old", "1 Test Lane"), ("new", "2 Test Lane"), ("date", "2023-01-01")]),
            )
            .unwrap();
        assert_eq!(
            composed.text,
            "Registered office changedfrom 1 Test Lane to 2 Test Lane on 1 January 2023 (AD01)"
        );
        assert_eq!(&composed.text[composed.bold.clone()], "Registered office changed");
    }

    #[test]
    fn test_without_bold_segment() {
        let description = FilingDescription::parse("Annual return made up to {date}");
        assert_eq!(description.head, "Annual return made up to {date}");
        assert!(description.tail.is_empty());

        let composed = description.compose("AR01", &values(&[("date", "2020-05-17")])).unwrap();
        assert_eq!(composed.text, "Annual return made up to {date} (AR01)");
        assert!(composed.bold.is_empty());
    }

    #[test]
    fn test_bold_segment_mid_description() {
        let description = FilingDescription::parse("Notice of **change of name** by resolution on {date}");
        assert_eq!(description.lead, "Notice of ");
        assert_eq!(description.head, "change of name");
        assert_eq!(description.tail, "by resolution on {date}");

        let composed = description.compose("NM01", &values(&[("date", "2022-06-30")])).unwrap();
        assert_eq!(composed.text, "Notice of change of nameby resolution on 30 June 2022 (NM01)");
        assert_eq!(&composed.text[composed.bold.clone()], "change of name");
        assert!(!composed.text.contains("**"));
    }

    #[test]
    fn test_compose_collapses_whitespace() {
        let description = FilingDescription::parse("**Full\taccounts**\n made up\r\n to {date}");
        let composed = description.compose("AA", &values(&[("date", "2023-03-31")])).unwrap();
        assert_eq!(composed.text, "Full accountsmade up to 31 March 2023 (AA)");
        assert_eq!(&composed.text[composed.bold.clone()], "Full accounts");
    }

    #[test]
    fn test_unclosed_delimiter_is_plain_text() {
        let description = FilingDescription::parse("**Unclosed bold");
        assert_eq!(description.head, "**Unclosed bold");
        assert_eq!(description.tail, "");
    }

    #[test]
    fn test_missing_placeholder_left_verbatim() {
        let text = substitute_placeholders(" on {made_up_date} by {officer}", &values(&[("officer", "J Smith")])).unwrap();
        assert_eq!(text, " on {made_up_date} by J Smith");
    }

    #[test]
    fn test_any_key_containing_date_is_formatted() {
        let text = substitute_placeholders("{change_date}", &values(&[("change_date", "2024-12-31")])).unwrap();
        assert_eq!(text, "31 December 2024");
    }

    #[test]
    fn test_bad_date_is_an_error() {
        let err = substitute_placeholders("{date}", &values(&[("date", "31/12/2024")])).unwrap_err();
        assert!(matches!(err, Error::InvalidDate { ref key, .. } if key == "date"));
    }

    #[test]
    fn test_long_date() {
        assert_eq!(long_date("2024-01-01").as_deref(), Some("1 January 2024"));
        assert_eq!(long_date("2024-02-30"), None);
    }
}
