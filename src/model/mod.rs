//! Plain data returned by the content backend and held as resource results.

pub mod feed;
pub mod profile;
pub mod settings;

pub use feed::*;
pub use profile::*;
pub use settings::*;
