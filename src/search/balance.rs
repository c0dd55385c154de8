//! Rebalances the image/non-image mix of a result list.
//!
//! When a query asks for figures or images, pure relevance order tends to
//! return one modality only. The balancer targets an even split without ever
//! fabricating results: a bucket that cannot fill its half hands the
//! shortfall to the other bucket.

use crate::search::dedup::FileHit;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "tif", "tiff", "webp", "heic", "emf",
];

/// True when the path's extension names a raster or vector image format.
pub fn is_image_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Interleave image and non-image results toward a `limit/2` split.
/// Relative order within each modality is preserved; output length is at
/// most `min(limit, input length)`.
pub fn balance_image_ratio<T: FileHit>(hits: Vec<T>, limit: usize) -> Vec<T> {
    if hits.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut images = Vec::new();
    let mut others = Vec::new();
    for hit in hits {
        if is_image_path(hit.path()) {
            images.push(hit);
        } else {
            others.push(hit);
        }
    }

    // Half each, with either bucket's shortfall redistributed to the other.
    let mut take_images = images.len().min(limit / 2);
    let take_others = others.len().min(limit - take_images);
    take_images = images.len().min(limit - take_others);

    let mut images = images.into_iter().take(take_images);
    let mut others = others.into_iter().take(take_others);

    let mut out = Vec::with_capacity(take_images + take_others);
    loop {
        match (images.next(), others.next()) {
            (Some(img), Some(other)) => {
                out.push(img);
                out.push(other);
            }
            (Some(img), None) => {
                out.push(img);
                out.extend(images);
                break;
            }
            (None, Some(other)) => {
                out.push(other);
                out.extend(others);
                break;
            }
            (None, None) => break,
        }
    }
    out
}
