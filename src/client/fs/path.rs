use std::fmt;

use crate::client::SessionError;

/// The reserved ascend token
pub const PARENT: &str = "..";

/// One navigation request. A step never carries a multi-segment or absolute
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Parent,
    Child(String),
}

impl Step {
    /// Builds a descend step, refusing names that are not a single segment.
    pub fn child<T: Into<String>>(name: T) -> Result<Self, SessionError> {
        let name = name.into();
        if is_safe_name(&name) {
            Ok(Self::Child(name))
        } else {
            Err(SessionError::UnsafeName(name))
        }
    }

    /// Parses the argument of a navigation request, `..` ascends.
    pub fn parse(step: &str) -> Result<Self, SessionError> {
        match step {
            PARENT => Ok(Self::Parent),
            name => Self::child(name),
        }
    }

    /// Argument handed to the transport
    pub fn as_transport_arg(&self) -> &str {
        match self {
            Self::Parent => PARENT,
            Self::Child(name) => name,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_transport_arg())
    }
}

/// Returns `true` if `name` can be used as one path segment on both sides.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != PARENT
        && !name.contains(['/', '\\', '\0'])
}

/// Logical remote working directory.
///
/// Always absolute, `/`-separated and without a trailing separator except for
/// the root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath(String);

impl Default for RemotePath {
    fn default() -> Self {
        Self::root()
    }
}

impl RemotePath {
    pub fn root() -> Self {
        Self("/".to_owned())
    }

    /// Normalizes a path reported by the server or typed by the user.
    /// Relative input is taken relative to the root.
    pub fn new<T: AsRef<str>>(path: T) -> Self {
        let segments = path
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .fold(Vec::new(), |mut acc, s| {
                if s == PARENT {
                    let _ = acc.pop();
                } else {
                    acc.push(s);
                }
                acc
            });

        Self(format!("/{}", segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// String-level parent, the root is its own parent.
    pub fn parent(&self) -> Self {
        match self.0.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => Self(self.0[..idx].to_owned()),
        }
    }

    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Path after applying `step`
    pub fn apply(&self, step: &Step) -> Self {
        match step {
            Step::Parent => self.parent(),
            Step::Child(name) => self.join(name),
        }
    }

    /// Two-shape steps leading from `self` to `target`: ascend to the common
    /// ancestor, then descend one segment at a time.
    pub fn steps_to(&self, target: &Self) -> Result<Vec<Step>, SessionError> {
        let from = self.segments().collect::<Vec<_>>();
        let to = target.segments().collect::<Vec<_>>();

        let common = from
            .iter()
            .zip(to.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut steps = vec![Step::Parent; from.len() - common];
        for segment in &to[common..] {
            steps.push(Step::child(*segment)?);
        }

        Ok(steps)
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
