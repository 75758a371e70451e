//! Flattening of serializable records into named text fields.
//!
//! Scalars are rendered from their native type, so an `f32` keeps its own
//! shortest representation and non-finite floats come out as `NaN`, `inf`
//! and `-inf`. Nested sequences, maps and enum payloads are rendered as
//! compact JSON.

use crate::error::{Error, Result};
use serde::ser::{self, Impossible, Serialize, SerializeMap, SerializeStruct, Serializer};
use std::fmt;
use thiserror::Error;

/// Named text fields of a struct or string-keyed map
pub(crate) fn to_fields<T>(record: &T) -> Result<Vec<(String, String)>>
where
    T: Serialize + ?Sized,
{
    record.serialize(RecordSerializer)
}

fn not_a_record(kind: &str) -> Error {
    Error::serialization(format!(
        "record must serialize to an object with named fields, got {}",
        kind
    ))
}

fn render<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    match value.serialize(TextSerializer) {
        Ok(text) => Ok(text),
        Err(TextError::Compound) => Ok(serde_json::to_string(value)?),
        Err(TextError::Custom(message)) => Err(Error::serialization(message)),
    }
}

#[derive(Debug, Error)]
enum TextError {
    #[error("compound value")]
    Compound,
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for TextError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        TextError::Custom(msg.to_string())
    }
}

type TextResult<T> = std::result::Result<T, TextError>;

/// Renders a single scalar; anything compound is refused with `TextError::Compound`
struct TextSerializer;

impl Serializer for TextSerializer {
    type Ok = String;
    type Error = TextError;
    type SerializeSeq = Impossible<String, TextError>;
    type SerializeTuple = Impossible<String, TextError>;
    type SerializeTupleStruct = Impossible<String, TextError>;
    type SerializeTupleVariant = Impossible<String, TextError>;
    type SerializeMap = Impossible<String, TextError>;
    type SerializeStruct = Impossible<String, TextError>;
    type SerializeStructVariant = Impossible<String, TextError>;

    fn serialize_bool(self, v: bool) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, v: f32) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_f64(self, v: f64) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> TextResult<String> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> TextResult<String> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> TextResult<String> {
        Err(TextError::Compound)
    }

    fn serialize_none(self) -> TextResult<String> {
        Ok(String::new())
    }

    fn serialize_some<T>(self, value: &T) -> TextResult<String>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> TextResult<String> {
        Ok(String::new())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> TextResult<String> {
        Ok(String::new())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> TextResult<String> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> TextResult<String>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> TextResult<String>
    where
        T: Serialize + ?Sized,
    {
        Err(TextError::Compound)
    }

    fn serialize_seq(self, _len: Option<usize>) -> TextResult<Self::SerializeSeq> {
        Err(TextError::Compound)
    }

    fn serialize_tuple(self, _len: usize) -> TextResult<Self::SerializeTuple> {
        Err(TextError::Compound)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> TextResult<Self::SerializeTupleStruct> {
        Err(TextError::Compound)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> TextResult<Self::SerializeTupleVariant> {
        Err(TextError::Compound)
    }

    fn serialize_map(self, _len: Option<usize>) -> TextResult<Self::SerializeMap> {
        Err(TextError::Compound)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> TextResult<Self::SerializeStruct> {
        Err(TextError::Compound)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> TextResult<Self::SerializeStructVariant> {
        Err(TextError::Compound)
    }
}

type Fields = Vec<(String, String)>;

/// Accepts only structs and maps at the top level
struct RecordSerializer;

impl Serializer for RecordSerializer {
    type Ok = Fields;
    type Error = Error;
    type SerializeSeq = Impossible<Fields, Error>;
    type SerializeTuple = Impossible<Fields, Error>;
    type SerializeTupleStruct = Impossible<Fields, Error>;
    type SerializeTupleVariant = Impossible<Fields, Error>;
    type SerializeMap = FieldCollector;
    type SerializeStruct = FieldCollector;
    type SerializeStructVariant = Impossible<Fields, Error>;

    fn serialize_bool(self, _v: bool) -> Result<Fields> {
        Err(not_a_record("a boolean"))
    }

    fn serialize_i8(self, _v: i8) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_i16(self, _v: i16) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_i32(self, _v: i32) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_i64(self, _v: i64) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_u8(self, _v: u8) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_u16(self, _v: u16) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_u32(self, _v: u32) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_u64(self, _v: u64) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_f32(self, _v: f32) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_f64(self, _v: f64) -> Result<Fields> {
        Err(not_a_record("a number"))
    }

    fn serialize_char(self, _v: char) -> Result<Fields> {
        Err(not_a_record("a string"))
    }

    fn serialize_str(self, _v: &str) -> Result<Fields> {
        Err(not_a_record("a string"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Fields> {
        Err(not_a_record("an array"))
    }

    fn serialize_none(self) -> Result<Fields> {
        Err(not_a_record("null"))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Fields>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Fields> {
        Err(not_a_record("null"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Fields> {
        Err(not_a_record("null"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Fields> {
        Err(not_a_record("a string"))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Fields>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Fields>
    where
        T: Serialize + ?Sized,
    {
        Err(not_a_record("an enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(not_a_record("an array"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(not_a_record("an array"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(not_a_record("an array"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(not_a_record("an enum variant"))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(FieldCollector::with_capacity(len.unwrap_or(0)))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Self::SerializeStruct> {
        Ok(FieldCollector::with_capacity(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(not_a_record("an enum variant"))
    }
}

struct FieldCollector {
    fields: Fields,
    pending_key: Option<String>,
}

impl FieldCollector {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
            pending_key: None,
        }
    }
}

impl SerializeStruct for FieldCollector {
    type Ok = Fields;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.fields.push((key.to_owned(), render(value)?));
        Ok(())
    }

    fn end(self) -> Result<Fields> {
        Ok(self.fields)
    }
}

impl SerializeMap for FieldCollector {
    type Ok = Fields;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = key
            .serialize(TextSerializer)
            .map_err(|_| Error::serialization("record keys must be strings or scalars"))?;
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::serialization("map value without a key"))?;
        self.fields.push((key, render(value)?));
        Ok(())
    }

    fn end(self) -> Result<Fields> {
        Ok(self.fields)
    }
}
