use alloc::{boxed::Box, vec::Vec};
use core::{fmt::Display, str};
use utils::endian::{BigEndian32, EndianData};

/// A property copied out of the blob: its name and raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: Box<str>,
    pub data: Box<[u8]>,
}

impl Property {
    pub fn new(name: &str, data: &[u8]) -> Property {
        Property {
            name: Box::from(name),
            data: Box::from(data),
        }
    }

    /// Length of the stored value in bytes, terminators included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn value_as_u32(&self) -> Result<u32, PropertyError> {
        BigEndian32::from_bytes(&self.data)
            .map(|x| x.value())
            .ok_or(PropertyError::InvalidPropFormat)
    }

    /// Interpret the value as a single string. A trailing NUL is dropped.
    pub fn value_as_str(&self) -> Result<&str, PropertyError> {
        let bytes = self.data.strip_suffix(b"\0").unwrap_or(&self.data[..]);
        str::from_utf8(bytes).map_err(|_| PropertyError::InvalidUtf8)
    }

    /// Interpret the value as a list of NUL-separated strings.
    pub fn value_as_strlist(&self) -> Result<Vec<&str>, PropertyError> {
        let bytes = self.data.strip_suffix(b"\0").unwrap_or(&self.data[..]);
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        bytes
            .split(|b| *b == 0)
            .map(|s| str::from_utf8(s).map_err(|_| PropertyError::InvalidUtf8))
            .collect()
    }

    /// Interpret the value as an array of fixed-width big-endian elements.
    ///
    /// The value length must be a multiple of the element width.
    pub fn value_as_proplist<V, T: EndianData<V>>(&self) -> Result<Vec<T>, PropertyError> {
        if self.data.len() % T::WIDTH != 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        self.data
            .chunks_exact(T::WIDTH)
            .map(|chunk| T::from_bytes(chunk).ok_or(PropertyError::InvalidPropFormat))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    InvalidPropFormat,
    InvalidUtf8,
}

impl Display for PropertyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidPropFormat => f.write_str("malformed property value"),
            Self::InvalidUtf8 => f.write_str("property string is not valid UTF-8"),
        }
    }
}

impl core::error::Error for PropertyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_list_splits_on_nul() {
        let prop = Property::new("compatible", b"vendor,uart-v2\0ns16550a\0");
        assert_eq!(
            prop.value_as_strlist().unwrap(),
            ["vendor,uart-v2", "ns16550a"]
        );
        assert_eq!(Property::new("x", b"").value_as_strlist().unwrap().len(), 0);
    }

    #[test]
    fn single_string_drops_only_one_terminator() {
        assert_eq!(Property::new("status", b"okay\0").value_as_str(), Ok("okay"));
        assert_eq!(Property::new("status", b"ok\0\0").value_as_str(), Ok("ok\0"));
        assert_eq!(
            Property::new("status", &[0xff, 0]).value_as_str(),
            Err(PropertyError::InvalidUtf8)
        );
    }

    #[test]
    fn cell_arrays_must_be_word_aligned() {
        let prop = Property::new("reg", &[0, 0, 0x10, 0, 0, 0, 0x20, 0]);
        let cells = prop.value_as_proplist::<u32, BigEndian32>().unwrap();
        assert_eq!(cells.iter().map(|c| c.value()).collect::<Vec<_>>(), [0x1000, 0x2000]);

        let odd = Property::new("reg", &[0, 0, 0x10, 0, 1]);
        assert_eq!(
            odd.value_as_proplist::<u32, BigEndian32>(),
            Err(PropertyError::InvalidPropFormat)
        );
        assert_eq!(Property::new("x", &[1, 2]).value_as_u32(), Err(PropertyError::InvalidPropFormat));
    }
}
