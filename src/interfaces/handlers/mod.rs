pub mod submit;
pub mod system;
