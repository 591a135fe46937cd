//! Batch thumbnailing over a directory of splat files.

use splat_thumb::batch::{run_batch, thumbnail_file, BatchError};
use splat_thumb::RenderConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A tiny ascii scene: one red splat straight ahead of the default camera.
fn write_scene(path: &Path) {
    fs::write(
        path,
        "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float f_dc_0\nproperty float f_dc_1\nproperty float f_dc_2\nproperty float scale_0\nproperty float scale_1\nproperty float scale_2\nend_header\n0 0.5 10 1.7724539 -1.7724539 -1.7724539 -2.302585 -2.302585 -2.302585\n",
    )
    .unwrap();
}

fn small_config() -> RenderConfig {
    let mut config = RenderConfig::default();
    config.camera.width = 192;
    config.camera.height = 108;
    config
}

#[test]
fn test_batch_writes_every_output_dir() {
    let splats = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_scene(&splats.path().join("garden.ply"));
    write_scene(&splats.path().join("bicycle.ply"));
    fs::write(splats.path().join("README.md"), "not a scene").unwrap();

    let out_dirs: Vec<PathBuf> = vec![out.path().join("public"), out.path().join("dist")];
    let summary = run_batch(splats.path(), &out_dirs, &small_config()).unwrap();

    assert_eq!(summary.rendered.len(), 2);
    assert!(summary.failed.is_empty());
    for dir in &out_dirs {
        for stem in ["garden", "bicycle"] {
            let path = dir.join(format!("{}.jpg", stem));
            let img = image::open(&path).unwrap_or_else(|e| panic!("{:?}: {}", path, e));
            assert_eq!((img.width(), img.height()), (192, 108));
        }
    }
}

#[test]
fn test_batch_continues_past_bad_file() {
    let splats = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_scene(&splats.path().join("good.ply"));
    fs::write(splats.path().join("broken.ply"), "definitely not ply").unwrap();

    let out_dirs = vec![out.path().to_path_buf()];
    let summary = run_batch(splats.path(), &out_dirs, &small_config()).unwrap();

    assert_eq!(summary.rendered, vec![splats.path().join("good.ply")]);
    assert_eq!(summary.failed.len(), 1);
    assert!(!summary.all_failed());
    assert!(out.path().join("good.jpg").exists());
    assert!(!out.path().join("broken.jpg").exists());
}

#[test]
fn test_batch_all_failed() {
    let splats = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    fs::write(splats.path().join("a.ply"), "ply\nformat ascii 1.0\nend_header\n").unwrap();

    let summary = run_batch(splats.path(), &[out.path().to_path_buf()], &small_config()).unwrap();
    assert!(summary.all_failed());
}

#[test]
fn test_batch_unreadable_dir() {
    let out = TempDir::new().unwrap();
    let missing = out.path().join("no-such-dir");
    let result = run_batch(&missing, &[out.path().to_path_buf()], &small_config());
    assert!(matches!(result, Err(BatchError::ReadDir { .. })));
}

#[test]
fn test_single_file_thumbnail_center_is_red() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("scene.ply");
    write_scene(&input);
    let output = dir.path().join("thumbs").join("scene.png");

    let stats = thumbnail_file(&input, std::slice::from_ref(&output), &small_config()).unwrap();
    assert_eq!(stats.rasterized, 1);

    let img = image::open(&output).unwrap().to_rgb8();
    let center = img.get_pixel(96, 54);
    assert!(center[0] > 250 && center[1] < 5 && center[2] < 5, "{:?}", center);
    assert_eq!(*img.get_pixel(0, 0), image::Rgb([23, 23, 23]));
}
