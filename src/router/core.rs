use crate::error::ConfigError;
use regex::Regex;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered `(name, value)` path parameters, stack-allocated for ≤8 params.
///
/// Param names use `Arc<str>` because they come from the compiled template and are
/// shared by every match; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The router's view of the current request: which template matched and the
/// path parameters it captured, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    pattern: Arc<str>,
    params: ParamVec,
}

impl RouteContext {
    #[must_use]
    pub fn new(pattern: impl Into<Arc<str>>, params: ParamVec) -> Self {
        Self {
            pattern: pattern.into(),
            params,
        }
    }

    /// Template that matched, e.g. `/pets/{id}`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths (e.g., `/org/{id}/team/{team_id}/user/{id}`),
    /// returns the last occurrence (the user id, not the org id).
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameter values in template order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty() && self.params.is_empty()
    }
}

/// A compiled path template such as `/users/{id}/posts/{postId}`.
///
/// Used by the dispatcher to route, and by handlers to recover path parameters
/// when they are invoked outside of routing.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    template: Arc<str>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let (regex, param_names) = Self::path_to_regex(template)?;
        Ok(Self {
            template: Arc::from(template),
            regex,
            param_names: param_names.into_iter().map(Arc::from).collect(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }

    /// Match a raw (percent-encoded) request path, returning the captured parameters
    /// in order. Each value is decoded after matching; a value that does not decode
    /// to UTF-8 is kept as sent.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let caps = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (idx, name) in self.param_names.iter().enumerate() {
            let raw = caps.get(idx + 1).map_or("", |m| m.as_str());
            let value = urlencoding::decode(raw)
                .map_or_else(|_| raw.to_string(), Cow::into_owned);
            params.push((Arc::clone(name), value));
        }
        Some(params)
    }

    /// Convert a path template to an anchored regex and extract parameter names
    ///
    /// Transforms templates like `/users/{id}` into `^/users/([^/]+)$` and returns
    /// `["id"]`. Literal segments are escaped; a trailing slash is tolerated.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<String>), ConfigError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPathTemplate {
                template: path.to_string(),
                reason: e.to_string(),
            })
        };

        if path.is_empty() || path == "/" {
            return Ok((compile(r"^/$")?, Vec::new()));
        }

        // Reserve space for the final regex string and parameter list
        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}') {
                let param_name = &segment[1..segment.len() - 1];
                pattern.push_str("/([^/]+)");
                param_names.push(param_name.to_string());
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push_str("/?$");
        Ok((compile(&pattern)?, param_names))
    }
}
