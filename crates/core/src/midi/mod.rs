pub mod midi;
pub mod pyramidi;
pub mod router;
