pub mod profile;

pub use profile::{LookupStrategy, ProfileLoader};
