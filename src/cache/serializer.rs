//! Item Serializers
//!
//! Convert items to and from bytes for stores that keep them outside process
//! memory. Serializers hold no state and can be shared freely.

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::Item;
use crate::error::{CacheError, Result};

/// Encodes and decodes items for a store's medium.
///
/// `deserialize` must be the exact inverse of `serialize`.
pub trait Serializer: Send + Sync {
    /// Encodes an item.
    fn serialize(&self, item: &Item) -> Result<Vec<u8>>;

    /// Decodes bytes produced by `serialize`.
    fn deserialize(&self, bytes: &[u8]) -> Result<Item>;
}

// == JSON ==
/// JSON encoding, the default for the filesystem store.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    /// Encodes an arbitrary caller value into bytes suitable for `Store::set`.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Decodes bytes returned by `Store::get` into a caller value.
    pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, item: &Item) -> Result<Vec<u8>> {
        Self::encode(item)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Item> {
        Self::decode(bytes)
    }
}

// == Bincode ==
/// Compact binary encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn serialize(&self, item: &Item) -> Result<Vec<u8>> {
        bincode::serialize(item).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Item> {
        bincode::deserialize(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Ttl;
    use serde::Deserialize;
    use std::time::Duration;

    fn sample_item() -> Item {
        Item::new(b"Ping-Pong".to_vec(), Ttl::After(Duration::from_secs(600)), Duration::ZERO)
    }

    #[test]
    fn test_json_roundtrip() {
        let item = sample_item();
        let bytes = JsonSerializer.serialize(&item).unwrap();
        assert_eq!(JsonSerializer.deserialize(&bytes).unwrap(), item);
    }

    #[test]
    fn test_bincode_roundtrip_forever() {
        let item = Item::new(b"forever".to_vec(), Ttl::Forever, Duration::ZERO);
        let bytes = BincodeSerializer.serialize(&item).unwrap();
        let decoded = BincodeSerializer.deserialize(&bytes).unwrap();
        assert_eq!(decoded, item);
        assert!(decoded.never_expires());
    }

    #[test]
    fn test_json_rejects_malformed_input() {
        let result = JsonSerializer.deserialize(b"{\"expires_at\":");
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_bincode_rejects_truncated_input() {
        let bytes = BincodeSerializer.serialize(&sample_item()).unwrap();
        let result = BincodeSerializer.deserialize(&bytes[..bytes.len() - 3]);
        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
    }

    #[test]
    fn test_encode_decode_caller_type() {
        let user = User { name: "Lanre".to_string() };
        let bytes = JsonSerializer::encode(&user).unwrap();
        let decoded: User = JsonSerializer::decode(&bytes).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn test_encode_unrepresentable_value() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        let result = JsonSerializer::encode(&map);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }
}
