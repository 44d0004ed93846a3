mod double_buffered;
mod storage_buffer;
mod texture;

pub use self::double_buffered::*;
pub use self::storage_buffer::*;
pub use self::texture::*;
