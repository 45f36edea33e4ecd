//! Built-in providers

pub mod file;
#[cfg(feature = "image")]
pub mod image;
pub mod vimeo;
pub mod youtube;

pub use file::FileProvider;
#[cfg(feature = "image")]
pub use self::image::ImageProvider;
pub use vimeo::VimeoProvider;
pub use youtube::YoutubeProvider;
