pub mod assets;
pub mod date;
pub mod file;
pub mod response;
pub mod text;
