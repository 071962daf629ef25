// HTTP host for rendering pages

pub mod extract;
pub mod pages;

pub use extract::PageContext;
