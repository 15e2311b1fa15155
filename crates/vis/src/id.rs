use std::fmt::Display;
use std::fmt::Formatter;

use serde::Serialize;
use serde::Serializer;

/// The element id of a chart in the report page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Id(u32);

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "chart{}", self.0)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Hands out chart ids in order, starting from 1, so that a report is
/// rendered the same way every time.
#[derive(Debug, Default)]
pub struct Ids {
    last: u32,
}

impl Ids {
    pub fn next(&mut self) -> Id {
        self.last += 1;
        Id(self.last)
    }
}
