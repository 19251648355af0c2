use super::error::BencodeError;
use super::field::FieldTable;
use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, IgnoredAny, Visitor};
use serde::Deserialize;
use std::collections::HashMap;

/// Default nesting limit for lists and dictionaries.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What to do with a dictionary key that matches no field of the record
/// being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFields {
    /// Fail with [`BencodeError::UnknownField`].
    #[default]
    Reject,
    /// Validate and discard the value.
    Ignore,
}

/// Decoder configuration.
///
/// The default is permissive: leading zeros, `-0`, unsorted and duplicate
/// dictionary keys are accepted. [`DecodeOptions::strict`] rejects all of
/// them.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Enforce canonical encoding of the input.
    pub strict: bool,
    /// Maximum nesting of lists and dictionaries.
    pub max_depth: usize,
    /// Policy for record keys that resolve to no field.
    pub unknown_fields: UnknownFields,
    /// Accept bytes after the top-level value.
    pub allow_trailing: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            unknown_fields: UnknownFields::Reject,
            allow_trailing: false,
        }
    }
}

impl DecodeOptions {
    /// Options that only accept canonical bencode.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn ignore_unknown_fields(mut self) -> Self {
        self.unknown_fields = UnknownFields::Ignore;
        self
    }

    pub fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }
}

/// Decodes a complete bencode document into `T`.
///
/// `T` may be [`Value`](super::Value) for a dynamic tree, or any type
/// implementing `Deserialize`. Dictionary keys are matched to record fields
/// by [`normalize`](super::normalize).
///
/// # Errors
///
/// Returns an error if the input is malformed, does not fit the shape of
/// `T`, or has bytes left over after the value.
///
/// # Examples
///
/// ```
/// use btcodec::bencode::decode;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Info {
///     #[serde(rename = "piece length")]
///     piece_length: u64,
///     name: String,
/// }
///
/// let info: Info = decode(b"d4:name3:foo12:piece lengthi16384ee").unwrap();
/// assert_eq!(info.name, "foo");
/// assert_eq!(info.piece_length, 16384);
///
/// let list: Vec<u64> = decode(b"li1ei2ei3ee").unwrap();
/// assert_eq!(list, vec![1, 2, 3]);
/// ```
pub fn decode<'de, T: Deserialize<'de>>(data: &'de [u8]) -> Result<T, BencodeError> {
    decode_with(data, &DecodeOptions::default())
}

/// Decodes a complete bencode document with explicit options.
pub fn decode_with<'de, T: Deserialize<'de>>(
    data: &'de [u8],
    options: &DecodeOptions,
) -> Result<T, BencodeError> {
    let mut decoder = Decoder::new(data, options.clone());
    let value = T::deserialize(&mut decoder)?;
    decoder.finish()?;
    Ok(value)
}

/// Decodes the first value in `data`, returning it with the number of bytes
/// it occupied. Anything after the value is left untouched.
pub fn decode_prefix<'de, T: Deserialize<'de>>(
    data: &'de [u8],
) -> Result<(T, usize), BencodeError> {
    let mut decoder = Decoder::new(data, DecodeOptions::default());
    let value = T::deserialize(&mut decoder)?;
    Ok((value, decoder.position()))
}

/// A forward-only cursor over a bencode buffer.
pub struct Decoder<'de> {
    data: &'de [u8],
    pos: usize,
    depth: usize,
    options: DecodeOptions,
}

impl<'de> Decoder<'de> {
    pub fn new(data: &'de [u8], options: DecodeOptions) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            options,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Checks that the whole input was consumed.
    pub fn finish(&self) -> Result<(), BencodeError> {
        if self.pos != self.data.len() && !self.options.allow_trailing {
            return Err(BencodeError::TrailingData(self.pos));
        }
        Ok(())
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::TruncatedInput(self.pos))
    }

    fn enter(&mut self) -> Result<(), BencodeError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(BencodeError::NestingTooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Consumes the `e` closing a list or dictionary.
    fn expect_end(&mut self) -> Result<(), BencodeError> {
        match self.peek()? {
            b'e' => {
                self.pos += 1;
                Ok(())
            }
            byte => Err(BencodeError::mismatch("end of container", describe(byte))),
        }
    }

    /// Builds the error for a value whose tag does not fit `expected`.
    fn mismatch(&self, expected: &str) -> BencodeError {
        match self.peek() {
            Ok(byte) if is_tag(byte) => BencodeError::mismatch(expected, describe(byte)),
            Ok(byte) => BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            },
            Err(e) => e,
        }
    }

    /// Parses `i<digits>e` at the cursor.
    fn parse_integer(&mut self) -> Result<i128, BencodeError> {
        self.pos += 1;
        let start = self.pos;
        let end = self.data[start..]
            .iter()
            .position(|&b| b == b'e')
            .map(|offset| start + offset)
            .ok_or(BencodeError::TruncatedInput(self.data.len()))?;
        let digits = &self.data[start..end];
        self.pos = end + 1;

        let (negative, body) = match digits.split_first() {
            Some((b'-', rest)) => (true, rest),
            _ => (false, digits),
        };

        if body.is_empty() || !body.iter().all(u8::is_ascii_digit) {
            return Err(BencodeError::NumberFormat(format!(
                "malformed integer {:?}",
                String::from_utf8_lossy(digits)
            )));
        }

        if self.options.strict {
            if body.len() > 1 && body[0] == b'0' {
                return Err(BencodeError::NumberFormat("leading zeros".into()));
            }
            if negative && body == b"0" {
                return Err(BencodeError::NumberFormat("negative zero".into()));
            }
        }

        let magnitude = accumulate(body)?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Parses `<len>:<bytes>` at the cursor.
    fn parse_bytes(&mut self) -> Result<&'de [u8], BencodeError> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        match self.data.get(self.pos) {
            None => return Err(BencodeError::TruncatedInput(self.pos)),
            Some(b':') => {}
            Some(&byte) => {
                return Err(BencodeError::NumberFormat(format!(
                    "unexpected byte {:#04x} in string length at offset {}",
                    byte, self.pos
                )))
            }
        }

        let digits = &self.data[start..self.pos];
        if digits.is_empty() {
            return Err(BencodeError::NumberFormat("empty string length".into()));
        }
        if self.options.strict && digits.len() > 1 && digits[0] == b'0' {
            return Err(BencodeError::NumberFormat("leading zeros".into()));
        }

        let len = usize::try_from(accumulate(digits)?)
            .map_err(|_| BencodeError::NumberFormat("string length out of range".into()))?;
        self.pos += 1;

        if self.data.len() - self.pos < len {
            return Err(BencodeError::TruncatedInput(self.data.len()));
        }

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn integer(&mut self, expected: &str) -> Result<i128, BencodeError> {
        match self.peek()? {
            b'i' => self.parse_integer(),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn byte_string(&mut self, expected: &str) -> Result<&'de [u8], BencodeError> {
        match self.peek()? {
            b'0'..=b'9' => self.parse_bytes(),
            _ => Err(self.mismatch(expected)),
        }
    }

    fn utf8(&mut self, expected: &str) -> Result<&'de str, BencodeError> {
        let bytes = self.byte_string(expected)?;
        std::str::from_utf8(bytes)
            .map_err(|_| BencodeError::mismatch(expected, "non-UTF-8 byte string"))
    }

    fn visit_list<V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value, BencodeError> {
        self.pos += 1;
        self.enter()?;
        let value = visitor.visit_seq(ListAccess { de: self })?;
        self.expect_end()?;
        self.leave();
        Ok(value)
    }

    fn visit_dict<V: Visitor<'de>>(
        &mut self,
        visitor: V,
        fields: Option<FieldTable>,
    ) -> Result<V::Value, BencodeError> {
        self.pos += 1;
        self.enter()?;
        let superseded = match &fields {
            Some(table) if !self.options.strict => self.superseded_keys(table)?,
            _ => Vec::new(),
        };
        let value = visitor.visit_map(DictAccess {
            de: self,
            fields,
            last_key: None,
            superseded,
            seen: Vec::new(),
        })?;
        self.expect_end()?;
        self.leave();
        Ok(value)
    }

    /// Offsets of record keys that a later key resolving to the same field
    /// overrides. Leaves the cursor where it started.
    fn superseded_keys(&mut self, table: &FieldTable) -> Result<Vec<usize>, BencodeError> {
        let start = self.pos;
        let mut last: HashMap<&'static str, usize> = HashMap::new();
        let mut superseded = Vec::new();
        while self.peek()? != b'e' {
            let offset = self.pos;
            let key = self.byte_string("byte string key")?;
            if let Some(prev) = table.resolve(key).and_then(|f| last.insert(f, offset)) {
                superseded.push(prev);
            }
            self.skip_value()?;
        }
        self.pos = start;
        Ok(superseded)
    }

    fn check_key_order(&self, last: Option<&[u8]>, key: &[u8]) -> Result<(), BencodeError> {
        if !self.options.strict {
            return Ok(());
        }
        match last {
            Some(prev) if prev == key => Err(BencodeError::DuplicateKey(
                String::from_utf8_lossy(key).into_owned(),
            )),
            Some(prev) if prev > key => Err(BencodeError::UnsortedKey(
                String::from_utf8_lossy(key).into_owned(),
            )),
            _ => Ok(()),
        }
    }

    /// Validates and steps over one value.
    fn skip_value(&mut self) -> Result<(), BencodeError> {
        match self.peek()? {
            b'i' => self.parse_integer().map(drop),
            b'0'..=b'9' => self.parse_bytes().map(drop),
            b'l' => {
                self.pos += 1;
                self.enter()?;
                while self.peek()? != b'e' {
                    self.skip_value()?;
                }
                self.pos += 1;
                self.leave();
                Ok(())
            }
            b'd' => {
                self.pos += 1;
                self.enter()?;
                let mut last = None;
                while self.peek()? != b'e' {
                    let key = self.byte_string("byte string key")?;
                    self.check_key_order(last, key)?;
                    last = Some(key);
                    self.skip_value()?;
                }
                self.pos += 1;
                self.leave();
                Ok(())
            }
            byte => Err(BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }
}

fn accumulate(digits: &[u8]) -> Result<i128, BencodeError> {
    digits
        .iter()
        .try_fold(0i128, |acc, &d| {
            acc.checked_mul(10)?.checked_add(i128::from(d - b'0'))
        })
        .ok_or_else(|| BencodeError::NumberFormat("integer out of range".into()))
}

fn is_tag(byte: u8) -> bool {
    matches!(byte, b'i' | b'l' | b'd' | b'0'..=b'9')
}

fn describe(byte: u8) -> &'static str {
    match byte {
        b'i' => "integer",
        b'l' => "list",
        b'd' => "dictionary",
        b'0'..=b'9' => "byte string",
        b'e' => "end of container",
        _ => "invalid byte",
    }
}

macro_rules! deserialize_integer {
    ($($method:ident => $ty:ident, $visit:ident;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
                let n = self.integer(stringify!($ty))?;
                let value = $ty::try_from(n).map_err(|_| {
                    BencodeError::NumberFormat(format!("{} out of range for {}", n, stringify!($ty)))
                })?;
                visitor.$visit(value)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Decoder<'de> {
    type Error = BencodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        match self.peek()? {
            b'i' => {
                let n = self.parse_integer()?;
                if let Ok(v) = i64::try_from(n) {
                    visitor.visit_i64(v)
                } else if let Ok(v) = u64::try_from(n) {
                    visitor.visit_u64(v)
                } else {
                    Err(BencodeError::NumberFormat(format!(
                        "{} does not fit in 64 bits",
                        n
                    )))
                }
            }
            b'0'..=b'9' => visitor.visit_borrowed_bytes(self.parse_bytes()?),
            b'l' => self.visit_list(visitor),
            b'd' => self.visit_dict(visitor, None),
            byte => Err(BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }

    deserialize_integer! {
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        match self.integer("boolean")? {
            0 => visitor.visit_bool(false),
            1 => visitor.visit_bool(true),
            n => Err(BencodeError::mismatch("boolean (0 or 1)", n)),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BencodeError> {
        Err(BencodeError::UnsupportedType("f32"))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BencodeError> {
        Err(BencodeError::UnsupportedType("f64"))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        let s = self.utf8("single character string")?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(BencodeError::mismatch("single character string", s)),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        visitor.visit_borrowed_str(self.utf8("byte string")?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        visitor.visit_borrowed_bytes(self.byte_string("byte string")?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        self.deserialize_bytes(visitor)
    }

    // A value that is present is never null; absent fields are handled by
    // the record layer.
    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        self.peek()?;
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, BencodeError> {
        Err(BencodeError::UnsupportedType("unit"))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, BencodeError> {
        Err(BencodeError::UnsupportedType("unit struct"))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        match self.peek()? {
            b'l' => self.visit_list(visitor),
            _ => Err(self.mismatch("list")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        match self.peek()? {
            b'd' => self.visit_dict(visitor, None),
            _ => Err(self.mismatch("dictionary")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        match self.peek()? {
            b'd' => self.visit_dict(visitor, Some(FieldTable::new(fields))),
            _ => Err(self.mismatch("dictionary")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        let variant = self.utf8("byte string naming an enum variant")?;
        visitor.visit_enum(BorrowedStrDeserializer::<BencodeError>::new(variant))
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        self.skip_value()?;
        visitor.visit_unit()
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct ListAccess<'a, 'de> {
    de: &'a mut Decoder<'de>,
}

impl<'de> de::SeqAccess<'de> for ListAccess<'_, 'de> {
    type Error = BencodeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, BencodeError> {
        match self.de.peek()? {
            b'e' => Ok(None),
            _ => seed.deserialize(&mut *self.de).map(Some),
        }
    }
}

struct DictAccess<'a, 'de> {
    de: &'a mut Decoder<'de>,
    /// Present when decoding into a record.
    fields: Option<FieldTable>,
    last_key: Option<&'de [u8]>,
    /// Record keys to step over because a later duplicate wins.
    superseded: Vec<usize>,
    /// Fields already produced, for strict duplicate detection.
    seen: Vec<&'static str>,
}

impl<'de> de::MapAccess<'de> for DictAccess<'_, 'de> {
    type Error = BencodeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BencodeError> {
        loop {
            if self.de.peek()? == b'e' {
                return Ok(None);
            }

            let offset = self.de.pos;
            let key = self.de.byte_string("byte string key")?;
            self.de.check_key_order(self.last_key, key)?;
            self.last_key = Some(key);

            let Some(table) = &self.fields else {
                return seed.deserialize(KeyDeserializer { key }).map(Some);
            };

            match table.resolve(key) {
                Some(_) if self.superseded.contains(&offset) => {
                    self.de.skip_value()?;
                }
                Some(field) => {
                    if self.seen.contains(&field) {
                        return Err(BencodeError::DuplicateKey(
                            String::from_utf8_lossy(key).into_owned(),
                        ));
                    }
                    self.seen.push(field);
                    return seed
                        .deserialize(BorrowedStrDeserializer::<BencodeError>::new(field))
                        .map(Some)
                }
                None if self.de.options.unknown_fields == UnknownFields::Ignore => {
                    self.de.skip_value()?;
                }
                None => {
                    return Err(BencodeError::UnknownField(
                        String::from_utf8_lossy(key).into_owned(),
                    ))
                }
            }
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, BencodeError> {
        seed.deserialize(&mut *self.de)
    }
}

/// Deserializer for the raw key of a mapping entry.
struct KeyDeserializer<'de> {
    key: &'de [u8],
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = BencodeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        match std::str::from_utf8(self.key) {
            Ok(s) => visitor.visit_borrowed_str(s),
            Err(_) => visitor.visit_borrowed_bytes(self.key),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        let s = std::str::from_utf8(self.key)
            .map_err(|_| BencodeError::mismatch("UTF-8 key", "non-UTF-8 byte string"))?;
        visitor.visit_borrowed_str(s)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        self.deserialize_str(visitor)
    }

    // Field identifiers only reach a raw key when a record is decoded as a
    // plain mapping, which is what `#[serde(flatten)]` does. Keys would then
    // bypass name resolution and unknown keys would vanish.
    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, BencodeError> {
        Err(BencodeError::UnsupportedType("flattened record"))
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        visitor.visit_borrowed_bytes(self.key)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BencodeError> {
        visitor.visit_borrowed_bytes(self.key)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BencodeError> {
        let s = std::str::from_utf8(self.key)
            .map_err(|_| BencodeError::mismatch("UTF-8 key", "non-UTF-8 byte string"))?;
        visitor.visit_enum(BorrowedStrDeserializer::<BencodeError>::new(s))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char option unit
        unit_struct seq tuple tuple_struct map struct ignored_any
    }
}

/// Steps over one complete value starting at the beginning of `data`,
/// returning its length in bytes.
pub fn value_len(data: &[u8]) -> Result<usize, BencodeError> {
    decode_prefix::<IgnoredAny>(data).map(|(_, len)| len)
}
