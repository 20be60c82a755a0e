use regex::Regex;

use crate::errors::SessionError;

/// Path patterns that bypass authentication.
///
/// The patterns are combined into one alternation and matched anywhere in
/// the request path, so `"login"` also matches `/api/login/confirm`.
#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    regex: Option<Regex>,
    patterns: Vec<String>,
}

impl ExcludePatterns {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new<I, S>(patterns: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if patterns.is_empty() {
            return Ok(Self::none());
        }

        let alternation = patterns
            .iter()
            .map(|p| format!("(?:{p})"))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&alternation)
            .map_err(|e| SessionError::Config(format!("Invalid exclude pattern: {e}")))?;

        Ok(Self {
            regex: Some(regex),
            patterns,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(path))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
