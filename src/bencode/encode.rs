use super::error::BencodeError;
use serde::ser::{self, Impossible, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Encodes a value to canonical bencode.
///
/// The output follows the canonical bencode format:
/// - Integers: `i<number>e`, booleans as `i1e`/`i0e`
/// - Byte strings: `<length>:<data>`, including `0:` for empty strings
/// - Lists: `l<items>e`
/// - Dictionaries: `d<key><value>...e`, keys sorted by raw bytes and
///   deduplicated. Record fields are written under their declared names.
///
/// `None` record fields and map values are omitted.
///
/// # Errors
///
/// Returns [`BencodeError::UnsupportedType`] for values bencode cannot
/// represent: floats, unit, non-string map keys, enum variants carrying
/// data, and `None` outside a dictionary slot.
///
/// # Examples
///
/// ```
/// use btcodec::bencode::encode;
/// use serde::Serialize;
/// use std::collections::HashMap;
///
/// assert_eq!(encode(&42u32).unwrap(), b"i42e");
/// assert_eq!(encode("hello").unwrap(), b"5:hello");
/// assert_eq!(encode(&vec![1u64, 2, 3]).unwrap(), b"li1ei2ei3ee");
///
/// #[derive(Serialize)]
/// struct Pair {
///     b: u8,
///     a: u8,
/// }
/// assert_eq!(encode(&Pair { b: 2, a: 1 }).unwrap(), b"d1:ai1e1:bi2ee");
///
/// let map: HashMap<&str, &str> = [("spam", ""), ("cow", "moo")].into();
/// assert_eq!(encode(&map).unwrap(), b"d3:cow3:moo4:spam0:e");
/// ```
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, BencodeError> {
    let mut encoder = Encoder::default();
    value.serialize(&mut encoder)?;
    if encoder.out.is_empty() {
        return Err(BencodeError::UnsupportedType("None outside a dictionary"));
    }
    Ok(encoder.out)
}

/// Encodes a value and writes it to `writer`.
pub fn encode_to<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    value: &T,
) -> Result<(), BencodeError> {
    writer.write_all(&encode(value)?)?;
    Ok(())
}

#[derive(Default)]
struct Encoder {
    out: Vec<u8>,
}

impl Encoder {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BencodeError> {
        write!(self.out, "{}:", bytes.len())?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    fn write_integer(&mut self, n: impl std::fmt::Display) -> Result<(), BencodeError> {
        write!(self.out, "i{}e", n)?;
        Ok(())
    }

    /// Serializes one list element, rejecting elements that produce no output.
    fn element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        let before = self.out.len();
        value.serialize(&mut *self)?;
        if self.out.len() == before {
            return Err(BencodeError::UnsupportedType("None inside a list"));
        }
        Ok(())
    }
}

impl<'a> ser::Serializer for &'a mut Encoder {
    type Ok = ();
    type Error = BencodeError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), BencodeError>;
    type SerializeMap = DictEncoder<'a>;
    type SerializeStruct = DictEncoder<'a>;
    type SerializeStructVariant = Impossible<(), BencodeError>;

    fn serialize_bool(self, v: bool) -> Result<(), BencodeError> {
        self.write_integer(u8::from(v))
    }

    fn serialize_i8(self, v: i8) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_i16(self, v: i16) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_i32(self, v: i32) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_i64(self, v: i64) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_i128(self, v: i128) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_u16(self, v: u16) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_u32(self, v: u32) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_u64(self, v: u64) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<(), BencodeError> {
        self.write_integer(v)
    }

    fn serialize_f32(self, _v: f32) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("f32"))
    }

    fn serialize_f64(self, _v: f64) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("f64"))
    }

    fn serialize_char(self, v: char) -> Result<(), BencodeError> {
        let mut buf = [0u8; 4];
        self.write_bytes(v.encode_utf8(&mut buf).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<(), BencodeError> {
        self.write_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), BencodeError> {
        self.write_bytes(v)
    }

    // Writes nothing; the enclosing dictionary drops the entry.
    fn serialize_none(self) -> Result<(), BencodeError> {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), BencodeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), BencodeError> {
        self.write_bytes(variant.as_bytes())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), BencodeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, BencodeError> {
        self.out.push(b'l');
        Ok(self)
    }

    fn serialize_tuple(self, len: usize) -> Result<Self, BencodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self, BencodeError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, BencodeError> {
        Err(BencodeError::UnsupportedType("enum variant with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<DictEncoder<'a>, BencodeError> {
        Ok(DictEncoder::new(self))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<DictEncoder<'a>, BencodeError> {
        Ok(DictEncoder::new(self))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, BencodeError> {
        Err(BencodeError::UnsupportedType("enum variant with data"))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl ser::SerializeSeq for &mut Encoder {
    type Ok = ();
    type Error = BencodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        self.element(value)
    }

    fn end(self) -> Result<(), BencodeError> {
        self.out.push(b'e');
        Ok(())
    }
}

impl ser::SerializeTuple for &mut Encoder {
    type Ok = ();
    type Error = BencodeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        self.element(value)
    }

    fn end(self) -> Result<(), BencodeError> {
        self.out.push(b'e');
        Ok(())
    }
}

impl ser::SerializeTupleStruct for &mut Encoder {
    type Ok = ();
    type Error = BencodeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        self.element(value)
    }

    fn end(self) -> Result<(), BencodeError> {
        self.out.push(b'e');
        Ok(())
    }
}

/// Buffers dictionary entries so they can be written in key order.
pub(crate) struct DictEncoder<'a> {
    parent: &'a mut Encoder,
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
    pending_key: Option<Vec<u8>>,
}

impl<'a> DictEncoder<'a> {
    fn new(parent: &'a mut Encoder) -> Self {
        Self {
            parent,
            entries: BTreeMap::new(),
            pending_key: None,
        }
    }

    fn insert<T: Serialize + ?Sized>(&mut self, key: Vec<u8>, value: &T) -> Result<(), BencodeError> {
        let mut encoder = Encoder::default();
        value.serialize(&mut encoder)?;
        if !encoder.out.is_empty() {
            self.entries.insert(key, encoder.out);
        }
        Ok(())
    }

    fn finish(self) -> Result<(), BencodeError> {
        let out = &mut self.parent.out;
        out.push(b'd');
        for (key, value) in self.entries {
            write!(out, "{}:", key.len())?;
            out.extend_from_slice(&key);
            out.extend_from_slice(&value);
        }
        out.push(b'e');
        Ok(())
    }
}

impl ser::SerializeMap for DictEncoder<'_> {
    type Ok = ();
    type Error = BencodeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), BencodeError> {
        self.pending_key = Some(key.serialize(KeyEncoder)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| BencodeError::Custom("map value without a key".into()))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<(), BencodeError> {
        self.finish()
    }
}

impl ser::SerializeStruct for DictEncoder<'_> {
    type Ok = ();
    type Error = BencodeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), BencodeError> {
        self.insert(key.as_bytes().to_vec(), value)
    }

    fn end(self) -> Result<(), BencodeError> {
        self.finish()
    }
}

/// Serializer for dictionary keys; only string-like values are accepted.
struct KeyEncoder;

fn non_string_key<T>() -> Result<T, BencodeError> {
    Err(BencodeError::UnsupportedType("non-string dictionary key"))
}

impl ser::Serializer for KeyEncoder {
    type Ok = Vec<u8>;
    type Error = BencodeError;
    type SerializeSeq = Impossible<Vec<u8>, BencodeError>;
    type SerializeTuple = Impossible<Vec<u8>, BencodeError>;
    type SerializeTupleStruct = Impossible<Vec<u8>, BencodeError>;
    type SerializeTupleVariant = Impossible<Vec<u8>, BencodeError>;
    type SerializeMap = Impossible<Vec<u8>, BencodeError>;
    type SerializeStruct = Impossible<Vec<u8>, BencodeError>;
    type SerializeStructVariant = Impossible<Vec<u8>, BencodeError>;

    fn serialize_str(self, v: &str) -> Result<Vec<u8>, BencodeError> {
        Ok(v.as_bytes().to_vec())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Vec<u8>, BencodeError> {
        Ok(v.to_vec())
    }

    fn serialize_char(self, v: char) -> Result<Vec<u8>, BencodeError> {
        Ok(v.to_string().into_bytes())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Vec<u8>, BencodeError> {
        Ok(variant.as_bytes().to_vec())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Vec<u8>, BencodeError> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_i8(self, _v: i8) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_i16(self, _v: i16) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_i32(self, _v: i32) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_i64(self, _v: i64) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_u8(self, _v: u8) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_u16(self, _v: u16) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_u32(self, _v: u32) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_u64(self, _v: u64) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_f32(self, _v: f32) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_f64(self, _v: f64) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_none(self) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_unit(self) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Vec<u8>, BencodeError> {
        non_string_key()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, BencodeError> {
        non_string_key()
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, BencodeError> {
        non_string_key()
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, BencodeError> {
        non_string_key()
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, BencodeError> {
        non_string_key()
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, BencodeError> {
        non_string_key()
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, BencodeError> {
        non_string_key()
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, BencodeError> {
        non_string_key()
    }
}
