use bincode::config;
use serde::Serialize;

use crate::error::Result;

/// cacluate [blake3] hash of the `bincode` encoding of a serializable object
pub fn digest<T: Serialize>(t: &T) -> Result<[u8; 32]> {
    let encoded = bincode::serde::encode_to_vec(t, config::legacy())?;
    Ok(*blake3::hash(&encoded).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_follows_content() {
        let a = digest(&(1u32, "a.txt")).unwrap();
        let b = digest(&(1u32, "a.txt")).unwrap();
        let c = digest(&(2u32, "a.txt")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
