pub(crate) mod extractors;
mod services;

pub use services::API_KEY_HEADER;
