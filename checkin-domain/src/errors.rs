// Rejections are expected outcomes; store errors are infrastructure failures

pub mod rejection;
pub mod store_error;

pub use rejection::*;
pub use store_error::*;
