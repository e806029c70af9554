use std::collections::HashMap;

use crate::error::Error;

/// Facts reported per entry by a machine listing, keyed by lower-cased name.
pub type FactMap = HashMap<String, String>;

/// Facts a structured listing is restricted to
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Facts(u8);

bitflags! {
    impl Facts: u8 {
        const TYPE = 0x01;
        const SIZE = 0x02;
        const MODIFY = 0x04;
    }
}

impl Facts {
    /// Argument of `OPTS MLST`, e.g. `type;size;modify;`
    pub fn opts_argument(self) -> String {
        self.names().map(|name| format!("{name};")).collect()
    }

    /// Fact names in protocol order
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        [
            (Self::TYPE, "type"),
            (Self::SIZE, "size"),
            (Self::MODIFY, "modify"),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
    }
}

/// Parses one line of a machine listing: `fact=value;fact=value; name`.
///
/// Only facts contained in `wanted` are kept. The entry name is everything
/// after the first space, so names with spaces survive.
pub fn parse_fact_line(line: &str, wanted: Facts) -> Result<(String, FactMap), Error> {
    let (facts, name) = line
        .split_once(' ')
        .ok_or_else(|| Error::BadReply(line.to_owned()))?;

    if name.is_empty() {
        return Err(Error::BadReply(line.to_owned()));
    }

    let wanted = wanted.names().collect::<Vec<_>>();
    let mut map = FactMap::new();

    for fact in facts.split(';').filter(|f| !f.is_empty()) {
        let Some((key, value)) = fact.split_once('=') else {
            return Err(Error::BadReply(line.to_owned()));
        };

        let key = key.to_ascii_lowercase();
        if wanted.contains(&key.as_str()) {
            let value = if key == "type" {
                value.to_ascii_lowercase()
            } else {
                value.to_owned()
            };
            let _ = map.insert(key, value);
        }
    }

    Ok((name.to_owned(), map))
}
