//! Typed response fields.
//!
//! A response payload starts with the command echo and a declared length,
//! followed by big-endian fields whose layout the caller supplies as a slice
//! of [`FieldKind`].

use bytes::Buf;
use serde::Serialize;

use crate::error::{DeviceError, Result};

/// Size of the echo and declared-length prefix in a response payload.
pub const RESPONSE_PREFIX_SIZE: usize = 2;

/// One slot in a response layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
}

impl FieldKind {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
        }
    }

    fn read(self, src: &mut &[u8]) -> FieldValue {
        match self {
            Self::I8 => FieldValue::I8(src.get_i8()),
            Self::U8 => FieldValue::U8(src.get_u8()),
            Self::I16 => FieldValue::I16(src.get_i16()),
            Self::U16 => FieldValue::U16(src.get_u16()),
            Self::I32 => FieldValue::I32(src.get_i32()),
            Self::U32 => FieldValue::U32(src.get_u32()),
        }
    }
}

/// Total encoded size of a layout.
pub fn fields_size(layout: &[FieldKind]) -> usize {
    layout.iter().map(|kind| kind.size()).sum()
}

/// A decoded response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
}

impl FieldValue {
    /// Kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::I8(_) => FieldKind::I8,
            Self::U8(_) => FieldKind::U8,
            Self::I16(_) => FieldKind::I16,
            Self::U16(_) => FieldKind::U16,
            Self::I32(_) => FieldKind::I32,
            Self::U32(_) => FieldKind::U32,
        }
    }

    /// Widened value, whatever the kind.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Self::I8(v) => i64::from(v),
            Self::U8(v) => i64::from(v),
            Self::I16(v) => i64::from(v),
            Self::U16(v) => i64::from(v),
            Self::I32(v) => i64::from(v),
            Self::U32(v) => i64::from(v),
        }
    }
}

/// Decoded fields of one response, with typed accessors.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Fields(Vec<FieldValue>);

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Field `index` as `", stringify!($ty), "`.")]
        pub fn $name(&self, index: usize) -> Result<$ty> {
            match self.0.get(index) {
                Some(FieldValue::$variant(v)) => Ok(*v),
                _ => Err(DeviceError::UnexpectedField {
                    index,
                    kind: FieldKind::$variant,
                }),
            }
        }
    };
}

impl Fields {
    /// Decode `payload` (after the echo/length prefix) according to `layout`.
    ///
    /// The caller guarantees `payload` holds at least `fields_size(layout)`
    /// bytes; extra bytes are ignored.
    pub fn decode(mut payload: &[u8], layout: &[FieldKind]) -> Self {
        Self(layout.iter().map(|kind| kind.read(&mut payload)).collect())
    }

    typed_getter!(i8, I8, i8);
    typed_getter!(u8, U8, u8);
    typed_getter!(i16, I16, i16);
    typed_getter!(u16, U16, u16);
    typed_getter!(i32, I32, i32);
    typed_getter!(u32, U32, u32);

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the values.
    pub fn values(&self) -> &[FieldValue] {
        &self.0
    }

    /// Take the values.
    pub fn into_values(self) -> Vec<FieldValue> {
        self.0
    }
}

impl From<Vec<FieldValue>> for Fields {
    fn from(values: Vec<FieldValue>) -> Self {
        Self(values)
    }
}
