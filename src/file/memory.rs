//! Owned-buffer backend for images that never touch the file system.

use super::Backend;
use crate::Result;

/// An image held in memory, as handed to [`crate::ModuleLoader::from_bytes`].
#[derive(Debug)]
pub struct Memory(Vec<u8>);

impl Memory {
    /// Takes ownership of `image`.
    pub fn new(image: Vec<u8>) -> Memory {
        Memory(image)
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.0.get(offset..end))
            .ok_or(out_of_bounds_error!())
    }

    fn data(&self) -> &[u8] {
        &self.0
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::image::ImageBuilder, Error};

    #[test]
    fn crafted_image() {
        let image = ImageBuilder::assembly("Mem").build();
        let size = image.len();
        let memory = Memory::new(image);

        assert_eq!(memory.len(), size);
        assert_eq!(memory.data_slice(0, 2).unwrap(), b"MZ");
        assert_eq!(memory.data()[..2], *b"MZ");
    }

    #[test]
    fn ranges_past_the_image() {
        let memory = Memory::new(ImageBuilder::netmodule("Mem").build());
        let size = memory.len();

        assert!(matches!(memory.data_slice(usize::MAX, 1), Err(Error::OutOfBounds)));
        assert!(matches!(memory.data_slice(size - 1, 2), Err(Error::OutOfBounds)));
        assert!(memory.data_slice(size, 0).unwrap().is_empty());
    }
}
