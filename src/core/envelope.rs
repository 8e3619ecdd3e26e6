//! Purpose: Encode and decode the on-disk `{Id, Data}` record envelope.
//! Exports: `encode`, `decode`, `RECORD_EXTENSION`.
//! Role: The only place that knows the record file format.
//! Invariants: `Id` is written before `Data`; output is tab-indented with a trailing newline.
//! Invariants: Decoding never consults the file name; the store pairs the two.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

pub const RECORD_EXTENSION: &str = "json";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "Data")]
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Data")]
    data: T,
}

pub fn encode<T: Serialize>(id: &str, data: &T) -> Result<Vec<u8>, Error> {
    let envelope = EnvelopeRef { id, data };
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    envelope.serialize(&mut serializer).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode record")
            .with_id(id)
            .with_source(err)
    })?;
    out.push(b'\n');
    Ok(out)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<(String, T), Error> {
    let envelope: Envelope<T> = parse::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::Decode)
            .with_message("malformed record envelope")
            .with_source(err)
    })?;
    Ok((envelope.id, envelope.data))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode};
    use crate::core::error::ErrorKind;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
    struct Person {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Age")]
        age: i64,
        #[serde(rename = "Sex")]
        sex: bool,
    }

    fn james() -> Person {
        Person {
            name: "James".to_string(),
            age: 33,
            sex: false,
        }
    }

    #[test]
    fn encoded_layout_is_stable() {
        let bytes = encode("p0926", &james()).expect("encode");
        let text = String::from_utf8(bytes).expect("utf8");
        let expected = "{\n\t\"Id\": \"p0926\",\n\t\"Data\": {\n\t\t\"Name\": \"James\",\n\t\t\"Age\": 33,\n\t\t\"Sex\": false\n\t}\n}\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn decode_returns_id_and_payload() {
        let bytes = encode("p0926", &james()).expect("encode");
        let (id, person) = decode::<Person>(&bytes).expect("decode");
        assert_eq!(id, "p0926");
        assert_eq!(person, james());
    }

    #[test]
    fn decode_accepts_compact_files() {
        let bytes = br#"{"Id":"z0215","Data":{"Name":"Jenna","Age":11,"Sex":false}}"#;
        let (id, person) = decode::<Person>(bytes).expect("decode");
        assert_eq!(id, "z0215");
        assert_eq!(person.age, 11);
    }

    #[test]
    fn malformed_input_is_decode_error() {
        let err = decode::<Person>(b"{\"Id\": \"x\", \"Data\": ").expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = decode::<Person>(br#"{"Id":"x","Data":{"Name":1,"Age":2,"Sex":true}}"#)
            .expect_err("wrong field type");
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = decode::<Person>(br#"{"Data":{"Name":"a","Age":2,"Sex":true}}"#)
            .expect_err("missing id");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
