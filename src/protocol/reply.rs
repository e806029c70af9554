use std::fmt;

use crate::error::Error;

/// Three-digit reply code of the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyCode(pub u16);

/// Classification by the first digit of a [`ReplyCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    PositivePreliminary,
    PositiveCompletion,
    PositiveIntermediate,
    TransientNegative,
    PermanentNegative,
    Unknown,
}

impl ReplyCode {
    pub fn kind(self) -> ReplyKind {
        match self.0 / 100 {
            1 => ReplyKind::PositivePreliminary,
            2 => ReplyKind::PositiveCompletion,
            3 => ReplyKind::PositiveIntermediate,
            4 => ReplyKind::TransientNegative,
            5 => ReplyKind::PermanentNegative,
            _ => ReplyKind::Unknown,
        }
    }

    /// `1xx`, `2xx` and `3xx` replies
    pub fn is_positive(self) -> bool {
        matches!(
            self.kind(),
            ReplyKind::PositivePreliminary
                | ReplyKind::PositiveCompletion
                | ReplyKind::PositiveIntermediate
        )
    }
}

/// A complete (possibly multi-line) reply read from the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub lines: Vec<String>,
}

impl Reply {
    /// Parses the code out of the first line of a reply. Returns the code and
    /// whether the reply continues on further lines (`ddd-text`).
    pub fn parse_head(line: &str) -> Result<(ReplyCode, bool), Error> {
        let digits = line.get(..3).ok_or_else(|| Error::BadReply(line.to_owned()))?;
        let code = digits
            .parse::<u16>()
            .map_err(|_| Error::BadReply(line.to_owned()))?;

        if !(100..600).contains(&code) {
            return Err(Error::BadReply(line.to_owned()));
        }

        Ok((ReplyCode(code), line.as_bytes().get(3) == Some(&b'-')))
    }

    /// Returns `true` if `line` closes a multi-line reply opened with `code`
    pub fn is_last_line(code: ReplyCode, line: &str) -> bool {
        line.as_bytes().get(3) != Some(&b'-') && leading_code(line) == Some(code.0)
    }

    /// Reply text without the code prefixes, lines joined by `\n`.
    pub fn message(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                if leading_code(line) == Some(self.code.0) {
                    line.get(4..).unwrap_or_default()
                } else {
                    line.as_str()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }
}

fn leading_code(line: &str) -> Option<u16> {
    line.get(..3).and_then(|digits| digits.parse().ok())
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code.0, self.message())
    }
}
