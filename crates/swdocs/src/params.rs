//! Route parameters and the helpers to extract them.
// FromParam adapted from https://github.com/rwf2/Rocket/blob/28891e8072136f4641a33fb8c3f2aafce9d88d5b/core/lib/src/request/from_param.rs
// See https://github.com/rwf2/Rocket/blob/28891e8072136f4641a33fb8c3f2aafce9d88d5b/LICENSE-MIT for license information
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::errors::ParamError;

/// Parameters matched by the router for the current request, e.g. `slug` for `/sw/{slug}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub FxHashMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<S: std::hash::BuildHasher> From<std::collections::HashMap<String, String, S>> for RouteParams {
    fn from(map: std::collections::HashMap<String, String, S>) -> Self {
        map.into_iter().collect()
    }
}

/// Convert a path parameter string into a type.
///
/// ## Example
/// ```rs
/// use swdocs::params::FromParam;
///
/// struct UserId(String);
///
/// impl FromParam for UserId {
///   type Error = std::convert::Infallible;
///
///   fn from_param(param: &str) -> Result<Self, Self::Error> {
///     Ok(UserId(param.to_string()))
///   }
/// }
/// ```
pub trait FromParam: Sized {
    /// The associated error to be returned if parsing/validation fails.
    type Error: std::fmt::Display;

    /// Parses and validates an instance of `Self` from a path parameter string
    /// or returns an `Error` if parsing or validation fails.
    fn from_param(param: &str) -> Result<Self, Self::Error>;
}

impl FromParam for String {
    type Error = std::convert::Infallible;

    #[inline(always)]
    fn from_param(param: &str) -> Result<String, Self::Error> {
        Ok(param.to_string())
    }
}

macro_rules! impl_with_fromstr {
    ($($T:ty),+) => ($(
        impl FromParam for $T {
            type Error = <$T as FromStr>::Err;

            #[inline(always)]
            fn from_param(param: &str) -> Result<Self, Self::Error> {
                <$T as FromStr>::from_str(param)
            }
        }
    )+)
}

impl_with_fromstr! {
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool
}

/// Extract a required, non-empty parameter and parse it.
///
/// Fails with [`ParamError::Missing`] when the router did not provide the parameter, and with
/// [`ParamError::Empty`] when it is empty or only whitespace.
pub fn require<T: FromParam>(params: &RouteParams, name: &str) -> Result<T, ParamError> {
    let raw = params.get(name).ok_or_else(|| ParamError::Missing {
        name: name.to_string(),
    })?;

    if raw.trim().is_empty() {
        return Err(ParamError::Empty {
            name: name.to_string(),
        });
    }

    T::from_param(raw).map_err(|e| ParamError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Shorthand for [`require`] on string parameters.
pub fn require_param(params: &RouteParams, name: &str) -> Result<String, ParamError> {
    require::<String>(params, name)
}
