//! Macros for defining thin wrapper types around plain values.

/// Implement conversions and [core::ops::Deref] for a struct wrapping a single `inner` field.
#[macro_export]
macro_rules! impl_basic {
    ($name: ident, $type: ty) => {
        impl core::convert::From<$type> for $name {
            fn from(value: $type) -> Self {
                $name { inner: value }
            }
        }
        impl core::convert::From<$name> for $type {
            fn from(value: $name) -> $type {
                value.inner
            }
        }

        impl core::ops::Deref for $name {
            type Target = $type;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }
    };
}

/// Print a wrapped integer in hexadecimal for both [core::fmt::Debug] and [core::fmt::Display].
#[macro_export]
macro_rules! impl_hex_fmt {
    ($name: ident) => {
        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_fmt(format_args!("{}({:#x})", stringify!($name), self.inner))
            }
        }
        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_fmt(format_args!("{:#x}", self.inner))
            }
        }
    };
}
