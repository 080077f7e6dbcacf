//! Destinations for encoded captures.

use std::cell::{Cell, RefCell};
use std::future::Future;

use crate::error::PersistError;
use crate::session::EncodedImage;

/// Receives each encoded capture exactly once.
pub trait ImageSink {
    /// Stores or hands off `image`.
    fn persist(&self, image: &EncodedImage) -> impl Future<Output = Result<(), PersistError>>;
}

impl<S: ImageSink> ImageSink for &S {
    fn persist(&self, image: &EncodedImage) -> impl Future<Output = Result<(), PersistError>> {
        (**self).persist(image)
    }
}

/// Keeps every persisted image in memory.
#[derive(Default)]
pub struct MemorySink {
    images: RefCell<Vec<EncodedImage>>,
    reject_next: Cell<bool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `persist` call fail.
    pub fn reject_next(&self) {
        self.reject_next.set(true);
    }

    /// Number of images received.
    pub fn len(&self) -> usize {
        self.images.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.borrow().is_empty()
    }

    /// Removes and returns every image received so far.
    pub fn take(&self) -> Vec<EncodedImage> {
        self.images.take()
    }
}

impl ImageSink for MemorySink {
    async fn persist(&self, image: &EncodedImage) -> Result<(), PersistError> {
        if self.reject_next.replace(false) {
            return Err(PersistError::Rejected(format!(
                "memory sink refused {}",
                image.filename
            )));
        }
        self.images.borrow_mut().push(image.clone());
        Ok(())
    }
}
