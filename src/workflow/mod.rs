pub mod mapper;
pub mod sync;
pub mod webhook;
