pub mod client;
pub mod json;
pub mod method;
pub mod request;
pub mod response;
