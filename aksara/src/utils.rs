use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

#[derive(Debug, Default, Clone)]
pub struct SerializableHashMap<K, V>(pub HashMap<K, V>);

impl<K, V> PartialEq for SerializableHashMap<K, V>
where
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<K, V> Deref for SerializableHashMap<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<K, V> DerefMut for SerializableHashMap<K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K, V> Decode for SerializableHashMap<K, V>
where
    K: Decode + Eq + Hash + 'static,
    V: Decode + 'static,
{
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let raw: Vec<(K, V)> = Decode::decode(decoder)?;
        Ok(Self(raw.into_iter().collect()))
    }
}

impl<K, V> Encode for SerializableHashMap<K, V>
where
    K: Encode + Eq + Hash + Ord,
    V: Encode,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        // Sorted so that the same model always produces the same bytes.
        // The layout is the one of `Vec<(K, V)>`, which `decode` reads back.
        let mut raw: Vec<(&K, &V)> = self.0.iter().collect();
        raw.sort_unstable_by(|a, b| a.0.cmp(b.0));
        Encode::encode(&(raw.len() as u64), encoder)?;
        for (k, v) in raw {
            Encode::encode(k, encoder)?;
            Encode::encode(v, encoder)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializable_hash_map_round_trip() {
        let mut map = SerializableHashMap(HashMap::new());
        map.insert("buku".to_string(), 3u32);
        map.insert("air".to_string(), 1u32);

        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&map, config).unwrap();
        let decoded: SerializableHashMap<String, u32> =
            bincode::decode_from_std_read(&mut bytes.as_slice(), config).unwrap();

        assert_eq!(map, decoded);
    }

    #[test]
    fn test_serializable_hash_map_vec_layout() {
        let mut map = SerializableHashMap(HashMap::new());
        map.insert("kucing".to_string(), 2u32);
        map.insert("anjing".to_string(), 5u32);
        map.insert("burung".to_string(), 0u32);

        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&map, config).unwrap();
        let expected = vec![
            ("anjing".to_string(), 5u32),
            ("burung".to_string(), 0u32),
            ("kucing".to_string(), 2u32),
        ];
        assert_eq!(bincode::encode_to_vec(&expected, config).unwrap(), bytes);

        let raw: Vec<(String, u32)> =
            bincode::decode_from_std_read(&mut bytes.as_slice(), config).unwrap();
        assert_eq!(expected, raw);
    }

    #[test]
    fn test_serializable_hash_map_stable_bytes() {
        let mut a = SerializableHashMap(HashMap::new());
        let mut b = SerializableHashMap(HashMap::new());
        for (i, w) in ["x", "y", "z", "w"].iter().enumerate() {
            a.insert(w.to_string(), i as u32);
        }
        for (i, w) in ["x", "y", "z", "w"].iter().enumerate().rev() {
            b.insert(w.to_string(), i as u32);
        }

        let config = bincode::config::standard();
        assert_eq!(
            bincode::encode_to_vec(&a, config).unwrap(),
            bincode::encode_to_vec(&b, config).unwrap(),
        );
    }
}
