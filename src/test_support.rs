//! Fixtures shared by unit tests.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::error::IsolationError;
use crate::media::BackgroundIsolator;

/// A solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_png(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb([200, 40, 40]),
    )))
}

fn encode_png(img: DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Hang,
    Panic,
    Garbage,
}

/// Scripted isolator that counts how often it is called.
pub struct StubIsolator {
    behavior: Behavior,
    pub calls: AtomicUsize,
}

impl StubIsolator {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn succeed() -> Self {
        Self::new(Behavior::Succeed)
    }

    pub fn fail() -> Self {
        Self::new(Behavior::Fail)
    }

    pub fn hang() -> Self {
        Self::new(Behavior::Hang)
    }

    pub fn panic() -> Self {
        Self::new(Behavior::Panic)
    }

    pub fn garbage() -> Self {
        Self::new(Behavior::Garbage)
    }
}

#[async_trait]
impl BackgroundIsolator for StubIsolator {
    async fn isolate(&self, _image: &[u8]) -> Result<Vec<u8>, IsolationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(encode_png(DynamicImage::ImageRgba8(
                RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 0])),
            ))),
            Behavior::Fail => Err(IsolationError::Failed("model not loaded".to_string())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(IsolationError::Failed("woke up".to_string()))
            }
            Behavior::Panic => panic!("isolator crashed"),
            Behavior::Garbage => Ok(b"not an image".to_vec()),
        }
    }
}
