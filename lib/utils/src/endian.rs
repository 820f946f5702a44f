//! ## Endianness Module
//! This module provides some structs to better resolve the data in specific endianness rules
//!
//! All the types declared here implements [EndianData<T>],
//! which defines [EndianData<T>::value] function to parse the data into the endianness of the current arch

///[u32] in Big Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct BigEndian32(u32);

///[u64] in Big Endianness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct BigEndian64(u64);

/// This trait defines a packed data in memory with some specific endianness.
pub trait EndianData<T>: Copy + Clone {
    /// Width of the packed data in bytes.
    const WIDTH: usize;

    /// Parse the value into the endianness of the current architecture.
    fn value(&self) -> T;

    /// Pack a native value.
    fn from_value(value: T) -> Self;

    /// Pack the first [Self::WIDTH] bytes of `bytes` as they are stored in memory.
    ///
    /// Return [None] if `bytes` is shorter than [Self::WIDTH].
    fn from_bytes(bytes: &[u8]) -> Option<Self>;

    /// The bytes of the packed data as they are stored in memory.
    fn to_bytes(&self) -> [u8; 8];
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in big endianess
macro_rules! impl_converter_big {
    ($type: tt, $tval: tt) => {
        impl EndianData<$tval> for $type {
            const WIDTH: usize = size_of::<$tval>();

            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_be(self.0)
            }

            #[inline(always)]
            fn from_value(value: $tval) -> Self {
                $type(value.to_be())
            }

            fn from_bytes(bytes: &[u8]) -> Option<Self> {
                let raw = bytes.get(..Self::WIDTH)?.try_into().ok()?;
                Some($type($tval::from_ne_bytes(raw)))
            }

            fn to_bytes(&self) -> [u8; 8] {
                let mut res = [0u8; 8];
                res[..Self::WIDTH].copy_from_slice(&self.0.to_ne_bytes());
                res
            }
        }
    };
}

impl_converter_big!(BigEndian32, u32);
impl_converter_big!(BigEndian64, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_words_read_most_significant_byte_first() {
        let word = BigEndian32::from_bytes(&[0x12, 0x34, 0x56, 0x78, 0xff]).unwrap();
        assert_eq!(word.value(), 0x1234_5678);
        assert_eq!(&word.to_bytes()[..4], &[0x12, 0x34, 0x56, 0x78]);

        let dword = BigEndian64::from_value(0x0102_0304_0506_0708);
        assert_eq!(dword.to_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn short_input_is_rejected() {
        assert!(BigEndian32::from_bytes(&[0, 0, 1]).is_none());
        assert!(BigEndian64::from_bytes(&[0; 7]).is_none());
    }
}
