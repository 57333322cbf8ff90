use std::fmt;
use std::marker::PhantomData;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Vec3(Vec3),
    Quat(Quat),
}

impl PropertyValue {
    pub fn same_type(&self, other: &PropertyValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

pub trait PropertyType: Copy {
    fn into_value(self) -> PropertyValue;
    fn from_value(value: PropertyValue) -> Option<Self>;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }

            fn from_value(value: PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

property_type!(i32, Int);
property_type!(f32, Float);
property_type!(bool, Bool);
property_type!(Vec3, Vec3);
property_type!(Quat, Quat);

/// Name of a networked property, tagged with the type it holds.
pub struct PropertyKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyKey").field(&self.name).finish()
    }
}

pub const PAINT_INDEX: PropertyKey<i32> = PropertyKey::new("paint_index");
pub const COUNTDOWN: PropertyKey<f32> = PropertyKey::new("countdown");
pub const CARRIED: PropertyKey<bool> = PropertyKey::new("carried");
pub const POSITION: PropertyKey<Vec3> = PropertyKey::new("position");
pub const ROTATION: PropertyKey<Quat> = PropertyKey::new("rotation");
