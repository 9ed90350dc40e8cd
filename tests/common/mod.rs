#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bibbox::{BackgroundIsolator, IsolationError};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

pub fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

pub fn load_fixture_bytes(path: &str) -> Vec<u8> {
    std::fs::read(format!("tests/fixtures/{path}")).unwrap()
}

/// Route logs to the test harness; `RUST_LOG=bibbox=debug` shows skipped points.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 90, 200])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Isolator that "removes" the background by returning a transparent PNG of
/// the same size, counting its invocations.
#[derive(Default)]
pub struct TransparentIsolator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl BackgroundIsolator for TransparentIsolator {
    async fn isolate(&self, image: &[u8]) -> Result<Vec<u8>, IsolationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let input =
            image::load_from_memory(image).map_err(|e| IsolationError::Failed(e.to_string()))?;
        let cutout = RgbaImage::from_pixel(input.width(), input.height(), Rgba([0, 0, 0, 0]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(cutout)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| IsolationError::Failed(e.to_string()))?;
        Ok(bytes)
    }
}

/// Isolator whose model never loads.
pub struct BrokenIsolator;

#[async_trait]
impl BackgroundIsolator for BrokenIsolator {
    async fn isolate(&self, _image: &[u8]) -> Result<Vec<u8>, IsolationError> {
        Err(IsolationError::Failed("model weights missing".to_string()))
    }
}
