//! Authenticated entity identities.

use std::fmt;

/// Identity of an authenticated caller or grant holder.
///
/// Unit ids have the form `<application>/<number>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// A unit of an application, e.g. `mysql/0`.
    Unit(String),
    /// An application, e.g. `mysql`.
    Application(String),
    /// Anything else (machines, users, models).
    Other(String),
}

impl Tag {
    /// Unit tag for `id` (`app/n`).
    pub fn unit(id: impl Into<String>) -> Self {
        Tag::Unit(id.into())
    }

    /// Application tag for `name`.
    pub fn application(name: impl Into<String>) -> Self {
        Tag::Application(name.into())
    }

    /// The tag's id.
    pub fn id(&self) -> &str {
        match self {
            Tag::Unit(id) | Tag::Application(id) | Tag::Other(id) => id,
        }
    }

    /// Application this entity belongs to (itself for an application tag).
    pub fn application_name(&self) -> Option<&str> {
        match self {
            Tag::Application(name) => Some(name),
            Tag::Unit(id) => id.split_once('/').map(|(app, _)| app),
            Tag::Other(_) => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Unit(id) => write!(f, "unit-{}", id.replace('/', "-")),
            Tag::Application(name) => write!(f, "application-{name}"),
            Tag::Other(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_of_each_kind() {
        assert_eq!(Tag::unit("mysql/0").application_name(), Some("mysql"));
        assert_eq!(Tag::application("mysql").application_name(), Some("mysql"));
        assert_eq!(Tag::Other("machine-0".into()).application_name(), None);
        assert_eq!(Tag::unit("broken").application_name(), None);
    }

    #[test]
    fn display_form() {
        assert_eq!(Tag::unit("mysql/0").to_string(), "unit-mysql-0");
        assert_eq!(Tag::application("mysql").to_string(), "application-mysql");
    }
}
