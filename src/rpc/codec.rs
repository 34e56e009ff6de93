// Bilateral payment-channel node core.
// Written in 2024 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! The tagged envelope peer messages travel in over JSON-RPC: `{"class":
//! "<PacketName>", "data": "<base64 strict-encoded payload>"}`.
//!
//! Every wire packet is strict-encoded to its canonical binary form (§4's
//! "wire packets encode deterministically, field order fixed by the
//! protocol tables") and then base64-wrapped so it can ride inside a JSON
//! parameter array without further escaping.

use strict_encoding::{StrictDecode, StrictEncode};

#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum CodecError {
    /// envelope carried a class tag that does not match {expected}: got
    /// {got}
    ClassMismatch { expected: String, got: String },

    /// envelope payload was not valid base64
    BadBase64,

    /// strict-encoding of the envelope payload failed
    StrictEncoding,
}

/// A tagged envelope as it appears on the wire.
#[derive(Clone, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    pub class: String,
    pub data: String,
}

/// Wraps a strict-encodable packet in its tagged envelope.
pub fn encode<T: StrictEncode>(
    class: &str,
    packet: &T,
) -> Result<Envelope, CodecError> {
    let bytes =
        packet.strict_serialize().map_err(|_| CodecError::StrictEncoding)?;
    Ok(Envelope { class: class.to_owned(), data: base64::encode(bytes) })
}

/// Unwraps a tagged envelope, checking the class tag matches `expected`
/// before attempting to decode the payload.
pub fn decode<T: StrictDecode>(
    envelope: &Envelope,
    expected: &str,
) -> Result<T, CodecError> {
    if envelope.class != expected {
        return Err(CodecError::ClassMismatch {
            expected: expected.to_owned(),
            got: envelope.class.clone(),
        });
    }
    let bytes = base64::decode(&envelope.data).map_err(|_| CodecError::BadBase64)?;
    T::strict_deserialize(bytes).map_err(|_| CodecError::StrictEncoding)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn roundtrip_u32() {
        let envelope = encode("TestClass", &42u32).unwrap();
        assert_eq!(envelope.class, "TestClass");
        let decoded: u32 = decode(&envelope, "TestClass").unwrap();
        assert_eq!(decoded, 42);
    }

    #[test]
    fn rejects_wrong_class() {
        let envelope = encode("TestClass", &42u32).unwrap();
        let err = decode::<u32>(&envelope, "OtherClass").unwrap_err();
        assert!(matches!(err, CodecError::ClassMismatch { .. }));
    }
}
