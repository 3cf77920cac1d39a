pub mod analyze;
pub mod devices;
pub mod info;
pub mod record;
