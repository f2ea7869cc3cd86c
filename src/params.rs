use std::fmt;

use reqwest::Url;

use crate::PollError;

/// Single query-parameter value.
///
/// Values render into the query string with their natural text form:
/// integers and floats the way `Display` prints them, text verbatim
/// (percent-encoding is applied by the URL writer, not here).
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// UTF-8 text value.
    Text(String),
    /// 64-bit signed integer value.
    Int(i64),
    /// 64-bit float value.
    Float(f64),
}

impl ParamValue {
    /// Builds a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Builds an integer value.
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Builds a float value.
    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Ordered query-parameter set.
///
/// Order is preserved into the final URL. Setting a key that is already
/// present replaces the earlier value instead of appending a duplicate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a parameter, replacing an earlier value under the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    /// True when no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn pairs(&self) -> &[(String, ParamValue)] {
        &self.0
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V> From<Vec<(K, V)>> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Parses `path` and merges `params` into its query string.
///
/// A key already present in the path is overridden in place: the value is
/// replaced at the key's first occurrence and later duplicates are dropped.
/// Keys not present are appended in the order given.
pub(crate) fn build_url(path: &str, params: &[(String, ParamValue)]) -> Result<Url, PollError> {
    let mut url = Url::parse(path).map_err(|err| PollError::Url {
        path: path.to_owned(),
        reason: err.to_string(),
    })?;
    if params.is_empty() {
        return Ok(url);
    }
    if url.cannot_be_a_base() {
        return Err(PollError::Url {
            path: path.to_owned(),
            reason: "url cannot carry query parameters".to_owned(),
        });
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    for (key, value) in params {
        set_pair(&mut pairs, key, value.to_string());
    }

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())));
    Ok(url)
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: String) {
    match pairs.iter().position(|(existing, _)| existing == key) {
        Some(index) => {
            pairs[index].1 = value;
            let mut next = index + 1;
            while next < pairs.len() {
                if pairs[next].0 == key {
                    pairs.remove(next);
                } else {
                    next += 1;
                }
            }
        }
        None => pairs.push((key.to_owned(), value)),
    }
}
