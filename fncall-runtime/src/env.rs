use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Source of environment variables consulted by dispatch and `check`.
///
/// Defaults to the process environment. Tests substitute a fixed map so no
/// process-wide state is touched.
#[derive(Clone)]
pub struct EnvLookup(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl EnvLookup {
    /// Reads from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::from_fn(|key| std::env::var(key).ok())
    }

    /// Wraps an arbitrary lookup function.
    pub fn from_fn<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(lookup))
    }

    /// Serves lookups from a fixed set of pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_fn(move |key| vars.get(key).cloned())
    }

    /// Returns the value of `key`, treating empty values as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }
}

impl Default for EnvLookup {
    fn default() -> Self {
        Self::process()
    }
}

impl fmt::Debug for EnvLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLookup").finish_non_exhaustive()
    }
}
