//! External collaborators of the loader.
//!
//! Both are called from the blocking thread pool, never from an async task.

use crate::error::{DecodeError, FetchError};

/// Produces the raw bytes behind an identifier.
pub trait AssetSource<K>: Send + Sync + 'static {
    fn fetch(&self, id: &K) -> Result<Vec<u8>, FetchError>;
}

/// Turns raw bytes into a decoded in-memory asset.
///
/// Implementations must be pure: the same bytes always decode the same way.
pub trait Decoder<A>: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8]) -> Result<A, DecodeError>;
}

impl<K, F> AssetSource<K> for F
where
    F: Fn(&K) -> Result<Vec<u8>, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self, id: &K) -> Result<Vec<u8>, FetchError> {
        self(id)
    }
}

impl<A, F> Decoder<A> for F
where
    F: Fn(&[u8]) -> Result<A, DecodeError> + Send + Sync + 'static,
{
    fn decode(&self, bytes: &[u8]) -> Result<A, DecodeError> {
        self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_act_as_collaborators() {
        let source = |id: &String| -> Result<Vec<u8>, FetchError> {
            if id.is_empty() {
                Err(FetchError::new("empty id"))
            } else {
                Ok(id.as_bytes().to_vec())
            }
        };
        let decoder = |bytes: &[u8]| -> Result<usize, DecodeError> { Ok(bytes.len()) };

        let bytes = AssetSource::fetch(&source, &"abc".to_string()).unwrap();
        assert_eq!(Decoder::decode(&decoder, &bytes), Ok(3));
        assert!(AssetSource::fetch(&source, &String::new()).is_err());
    }
}
