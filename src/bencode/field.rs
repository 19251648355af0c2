//! Field-name resolution for decoding dictionaries into records.
//!
//! Wire keys frequently differ from host field names only in spacing and
//! case (`"creation date"`, `"Creation-Date"`). A key matches a field when
//! both are equal after removing every space and hyphen and lower-casing.
//! Underscores are significant.

/// Normalizes a key or field name for comparison.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lookup table from normalized names to a record's declared fields.
///
/// Built once per decoded dictionary. When two fields normalize to the same
/// string, the first declared one wins.
#[derive(Debug)]
pub struct FieldTable {
    fields: &'static [&'static str],
    normalized: Vec<String>,
}

impl FieldTable {
    pub fn new(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            normalized: fields.iter().map(|f| normalize(f)).collect(),
        }
    }

    /// Resolves a raw dictionary key to the declared field name.
    ///
    /// Keys that are not valid UTF-8 never resolve.
    pub fn resolve(&self, key: &[u8]) -> Option<&'static str> {
        let key = normalize(std::str::from_utf8(key).ok()?);
        self.normalized
            .iter()
            .position(|candidate| *candidate == key)
            .map(|idx| self.fields[idx])
    }
}
