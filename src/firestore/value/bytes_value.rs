use bytes::Bytes;

/// An immutable blob field value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BytesValue(Bytes);

impl BytesValue {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BytesValue {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}
