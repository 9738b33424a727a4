use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode the given model into a bytes vec.
pub fn encode_model<M: Serialize>(model: &M) -> Result<Vec<u8>> {
    serde_json::to_vec(model).context("error serializing data model")
}

/// Decode an object from the given buffer.
pub fn decode_model<M: DeserializeOwned>(data: &[u8]) -> Result<M> {
    serde_json::from_slice(data).context("error decoding object from storage")
}

/// Serde support for timestamps stored as unix nanoseconds.
pub mod timestamp_nanos {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(val: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i128(val.unix_timestamp_nanos())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let nanos = i128::deserialize(deserializer)?;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|err| DeError::custom(err.to_string()))
    }
}

/// Serde support for optional timestamps stored as unix nanoseconds.
pub mod timestamp_nanos_opt {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(val: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match val {
            Some(val) => serializer.serialize_some(&val.unix_timestamp_nanos()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<i128>::deserialize(deserializer)?
            .map(|nanos| OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|err| DeError::custom(err.to_string())))
            .transpose()
    }
}
