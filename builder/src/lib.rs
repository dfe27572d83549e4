// Licensed under the Apache-2.0 license

pub mod fru_image;
pub mod record;

pub use self::fru_image::{fru_image_create, hex_dump, load_record, write_image};
pub use record::{FruFields, RecordError};
