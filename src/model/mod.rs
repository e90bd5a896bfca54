mod harvest;
mod record;

pub use harvest::{Bucket, Harvest};
pub use record::Record;
