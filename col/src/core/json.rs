//! Duplicate-key detection for JSON documents.
//!
//! `serde_json::Value` keeps only the last value of a repeated object key.
//! [`find_duplicate_key`] walks the raw text first so a repeated key is
//! reported instead of silently collapsed.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};

/// An object key that appears more than once within the same object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub name: String,
    pub line: usize,
    pub column: usize,
}

/// Return the first repeated key in `raw`, if any.
///
/// Text that is not well-formed JSON yields `None`; syntax errors are left
/// to the caller's own parse.
pub fn find_duplicate_key(raw: &str) -> Option<DuplicateKey> {
    let found = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let err = UniqueKeys { found: &found }
        .deserialize(&mut deserializer)
        .err()?;
    let name = found.into_inner()?;
    Some(DuplicateKey {
        name,
        line: err.line(),
        column: err.column(),
    })
}

#[derive(Clone, Copy)]
struct UniqueKeys<'a> {
    found: &'a RefCell<Option<String>>,
}

impl<'de> DeserializeSeed<'de> for UniqueKeys<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for UniqueKeys<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while seq.next_element_seed(self)?.is_some() {}
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                let message = format!("duplicate key `{key}`");
                *self.found.borrow_mut() = Some(key);
                return Err(de::Error::custom(message));
            }
            map.next_value_seed(self)?;
        }
        Ok(())
    }
}
