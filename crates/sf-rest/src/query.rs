//! SOQL result pages and the sinks they are appended to.
//!
//! A query may span many pages. Each page is decoded straight into the
//! caller's sink, appending after the rows already there, without an
//! intermediate page vector.

use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess,
    Visitor,
};
use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;

/// Accumulates query rows across pages.
pub trait RecordSink {
    /// Rows held so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop rows beyond `len`.
    fn truncate(&mut self, len: usize);

    /// Append the rows of one page's `records` array. A JSON `null` appends
    /// nothing.
    fn append<'de, D: Deserializer<'de>>(&mut self, records: D) -> std::result::Result<(), D::Error>;
}

impl<T: DeserializeOwned> RecordSink for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len)
    }

    fn append<'de, D: Deserializer<'de>>(&mut self, records: D) -> std::result::Result<(), D::Error> {
        records.deserialize_option(AppendRows {
            rows: self,
            _row: PhantomData,
        })
    }
}

struct AppendRows<'v, T> {
    rows: &'v mut Vec<T>,
    _row: PhantomData<T>,
}

impl<'de, T: DeserializeOwned> Visitor<'de> for AppendRows<'_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of records or null")
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<(), E> {
        Ok(())
    }

    fn visit_some<D: Deserializer<'de>>(self, records: D) -> std::result::Result<(), D::Error> {
        records.deserialize_seq(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<(), A::Error> {
        if let Some(hint) = seq.size_hint() {
            self.rows.reserve(hint);
        }
        while let Some(row) = seq.next_element::<T>()? {
            self.rows.push(row);
        }
        Ok(())
    }
}

/// What a finished query read reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerySummary {
    /// `totalSize` of the last page read.
    pub total_size: u64,
    /// Pages fetched.
    pub pages: usize,
    /// True when the row cap ended the read before the server was done or
    /// rows were cut from the last page.
    pub truncated: bool,
}

/// Everything on a page except its rows.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PageHeader {
    pub total_size: u64,
    pub done: bool,
    pub next_records_url: Option<String>,
}

/// Decode one page, appending its rows to `sink`.
///
/// On error the sink may hold part of the page; the caller rolls it back.
pub(crate) fn decode_page<S: RecordSink>(body: &[u8], sink: &mut S) -> Result<PageHeader> {
    let mut de = serde_json::Deserializer::from_slice(body);
    let header = PageSeed { sink }.deserialize(&mut de)?;
    de.end()?;
    Ok(header)
}

struct PageSeed<'s, S> {
    sink: &'s mut S,
}

impl<'de, S: RecordSink> DeserializeSeed<'de> for PageSeed<'_, S> {
    type Value = PageHeader;

    fn deserialize<D: Deserializer<'de>>(self, de: D) -> std::result::Result<PageHeader, D::Error> {
        de.deserialize_map(self)
    }
}

impl<'de, S: RecordSink> Visitor<'de> for PageSeed<'_, S> {
    type Value = PageHeader;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a query result page")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<PageHeader, A::Error> {
        let sink = self.sink;
        let mut total_size = None;
        let mut done = None;
        let mut next_records_url = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "totalSize" => total_size = Some(map.next_value()?),
                "done" => done = Some(map.next_value()?),
                "nextRecordsUrl" => next_records_url = map.next_value()?,
                "records" => map.next_value_seed(Rows { sink: &mut *sink })?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(PageHeader {
            total_size: total_size.unwrap_or_default(),
            done: done.ok_or_else(|| <A::Error as de::Error>::missing_field("done"))?,
            next_records_url,
        })
    }
}

struct Rows<'s, S> {
    sink: &'s mut S,
}

impl<'de, S: RecordSink> DeserializeSeed<'de> for Rows<'_, S> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, de: D) -> std::result::Result<(), D::Error> {
        self.sink.append(de)
    }
}
