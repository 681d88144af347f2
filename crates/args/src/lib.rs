//! Application start-up arguments
//!
//! Arguments are expected in the `key=value` form. Anything else is kept as
//! an unkeyed token so callers can still inspect it.

use tracing::info;

/// Argument carrying the path of the configuration file.
pub const CONFIGURATION_FILE: &str = "configuration";

/// Argument requesting a configuration check only.
pub const CONFIGURATION_CHECK: &str = "configuration-check";

/// A single `key=value` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    key: String,
    value: String,
}

impl Argument {
    /// Create an argument from its key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Key as received, case preserved.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value following the first `=`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Split a raw token on its first `=`.
    ///
    /// Both sides must be non-empty. Everything after the first `=` is the
    /// value, so `url=http://host/?a=b` keeps its query string.
    fn parse(raw: &str) -> Option<Self> {
        let (key, value) = raw.split_once('=')?;
        if key.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self::new(key, value))
    }
}

/// Immutable table of the arguments received by the application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentTable {
    args: Vec<Argument>,
    unkeyed: Vec<String>,
}

impl ArgumentTable {
    /// Build a table from raw arguments, `None` yields an empty table.
    pub fn of<I, S>(raw: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match raw {
            Some(raw) => Self::from_args(raw),
            None => {
                info!("No arg parameters passed to the application");
                Self::default()
            }
        }
    }

    /// Build a table from raw arguments.
    pub fn from_args<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for token in raw {
            let token = token.as_ref();
            match Argument::parse(token) {
                Some(arg) => table.args.push(arg),
                None => table.unkeyed.push(token.to_string()),
            }
        }
        table
    }

    /// Build a table from the current process arguments, program name excluded.
    pub fn from_env() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    /// Value of the first argument whose key matches, ignoring case.
    pub fn get_arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|arg| arg.key.eq_ignore_ascii_case(key))
            .map(Argument::value)
    }

    /// Whether `key` was passed, either as `key=value` or as a bare token.
    pub fn has_flag(&self, key: &str) -> bool {
        self.get_arg(key).is_some()
            || self
                .unkeyed
                .iter()
                .any(|token| token.eq_ignore_ascii_case(key))
    }

    /// Keyed arguments in the order received.
    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Tokens that are not `key=value`, in the order received.
    pub fn unkeyed(&self) -> &[String] {
        &self.unkeyed
    }

    /// True when no keyed argument was parsed, unkeyed tokens are ignored.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ArgumentTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_args(iter)
    }
}
