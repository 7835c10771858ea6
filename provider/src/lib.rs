mod config;
mod error;
mod kv;
mod local;
mod memory;
#[cfg(any(feature = "mock", test))]
pub mod mock;
pub mod provider_type;
mod registry;
mod resource;
mod store;
mod value;

pub use config::*;
pub use error::ProviderError;
pub use kv::*;
pub use local::*;
pub use memory::*;
pub use provider_type::ProviderType;
pub use registry::*;
pub use resource::*;
pub use store::*;
pub use value::*;
