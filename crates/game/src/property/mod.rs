mod store;
mod value;

pub use store::{NetworkedProperty, PropertyStore};
pub use value::{
    CARRIED, COUNTDOWN, PAINT_INDEX, POSITION, PropertyKey, PropertyType, PropertyValue, ROTATION,
};
