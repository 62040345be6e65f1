/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ParseError {
    #[error("empty metric name")]
    Empty,
    #[error("invalid graphic char: {0}")]
    InvalidGraphic(char),
    #[error("not alpha numeric char")]
    NotAlphaNumeric,
}

/// The identity of a metric within its kind namespace.
///
/// A counter and a gauge may carry the same name, the two namespaces are
/// independent.
#[derive(Clone, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub(crate) struct MetricName(String);

impl MetricName {
    #[inline]
    pub(crate) fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn chars_allowed_in_metric_name(s: &str) -> Result<(), ParseError> {
    for c in s.chars() {
        // Same character range as OpenTSDB
        // http://opentsdb.net/docs/build/html/user_guide/writing/index.html#metrics-and-tags
        if c.is_ascii() {
            match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '/' => {}
                _ => {
                    return if c.is_ascii_graphic() {
                        Err(ParseError::InvalidGraphic(c))
                    } else {
                        Err(ParseError::NotAlphaNumeric)
                    };
                }
            }
        } else if !c.is_alphanumeric() {
            return Err(ParseError::NotAlphaNumeric);
        }
    }
    Ok(())
}

impl FromStr for MetricName {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        chars_allowed_in_metric_name(s)?;
        Ok(MetricName(s.to_string()))
    }
}

impl TryFrom<String> for MetricName {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        chars_allowed_in_metric_name(&s)?;
        Ok(MetricName(s))
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ok() {
        let name = MetricName::from_str("agent.poll_count").unwrap();
        assert_eq!(name.as_str(), "agent.poll_count");

        let name = MetricName::from_str("requests-2/total").unwrap();
        assert_eq!(name.to_string(), "requests-2/total");
    }

    #[test]
    fn parse_empty() {
        assert!(matches!(
            MetricName::from_str(""),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn parse_invalid_char() {
        assert!(MetricName::from_str("a b").is_err());
        assert!(MetricName::from_str("a,b").is_err());
        assert!(MetricName::from_str("a\tb").is_err());
    }
}
