pub mod document;
pub mod response;
pub mod routing;
