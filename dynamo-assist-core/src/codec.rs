/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Serde helpers for field types without a canonical item encoding.

/// Stores bytes as a lowercase hex string.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Avatar {
///     #[serde(with = "dynamo_assist_core::codec::hex_bytes")]
///     thumbnail: Vec<u8>,
/// }
///
/// let json = serde_json::to_string(&Avatar { thumbnail: vec![0xde, 0xad] }).unwrap();
/// assert_eq!(json, r#"{"thumbnail":"dead"}"#);
/// ```
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as hex.
    pub fn serialize<S, B>(bytes: B, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        B: AsRef<[u8]>,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserializes bytes from hex.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Avatar {
        #[serde(with = "super::hex_bytes")]
        thumbnail: Vec<u8>,
    }

    #[test]
    fn bytes_are_hex_strings() {
        let avatar = Avatar {
            thumbnail: vec![0x01, 0xab, 0xff],
        };
        let value = serde_json::to_value(&avatar).unwrap();
        assert_eq!(value, json!({"thumbnail": "01abff"}));
        assert_eq!(serde_json::from_value::<Avatar>(value).unwrap(), avatar);
    }

    #[test]
    fn invalid_hex_is_rejected() {
        let err = serde_json::from_value::<Avatar>(json!({"thumbnail": "zz"})).unwrap_err();
        assert!(err.to_string().to_lowercase().contains("invalid"));
    }
}
