use serde::Serialize;

use crate::cube::Dimension;
use crate::cube::Key;
use crate::record::Field;
use crate::record::Record;

/// Restricts an aggregate to the records whose `field` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub field: Field,
    pub value: String,
}

impl Condition {
    pub fn new(field: Field, value: impl Into<String>) -> Condition {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.field(self.field) == Some(self.value.as_str())
    }
}

/// One key of an aggregate and the number of records counted under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: Key,
    pub value: u64,
}

/// Identifies a group registered with [`crate::cube::Cube::register_group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

/// A maintained count per key of one dimension.
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub(crate) dimension: Dimension,
    pub(crate) condition: Option<Condition>,
    pub(crate) counts: Vec<u64>,
}

impl Group {
    pub(crate) fn includes(&self, record: &Record) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_compares_whole_value() {
        let record = Record {
            mime: Some(String::from("HTML")),
            ..Record::default()
        };

        assert!(Condition::new(Field::Mime, "HTML").matches(&record));
        assert!(!Condition::new(Field::Mime, "HTM").matches(&record));
        assert!(!Condition::new(Field::Rtype, "HTML").matches(&record));
    }
}
