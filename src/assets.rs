use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const ASSETS_DIR: &str = "assets";
const VALID_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];
/// Matches the original 16 MB upload limit.
const MAX_ASSET_BYTES: u64 = 16 * 1024 * 1024;

/// Copy an image file into the workspace, content-addressed by its sha256.
/// The returned ref (`<hash>.<ext>`) is what questions carry as `imageRef`;
/// importing identical bytes twice yields the same ref.
pub fn import_asset(workspace: &Path, source: &Path) -> anyhow::Result<String> {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("source file has no extension"))?;
    if !VALID_EXTENSIONS.contains(&ext.as_str()) {
        return Err(anyhow!("unsupported image type: .{}", ext));
    }

    let meta = std::fs::metadata(source)
        .with_context(|| format!("failed to stat {}", source.to_string_lossy()))?;
    if meta.len() > MAX_ASSET_BYTES {
        return Err(anyhow!(
            "image is {} bytes, larger than the {} byte limit",
            meta.len(),
            MAX_ASSET_BYTES
        ));
    }

    let bytes = std::fs::read(source)
        .with_context(|| format!("failed to read {}", source.to_string_lossy()))?;
    let digest = Sha256::digest(&bytes);
    let asset_ref = format!("{:x}.{}", digest, ext);

    let dir = workspace.join(ASSETS_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.to_string_lossy()))?;
    let dest = dir.join(&asset_ref);
    if !dest.exists() {
        std::fs::write(&dest, &bytes)
            .with_context(|| format!("failed to write {}", dest.to_string_lossy()))?;
    }
    Ok(asset_ref)
}

/// Map an asset ref back to its file path, if the file is still present.
pub fn resolve_asset(workspace: &Path, asset_ref: &str) -> Option<PathBuf> {
    // Refs are hash-dot-extension; reject anything path-like.
    if asset_ref.contains('/') || asset_ref.contains('\\') || asset_ref.contains("..") {
        return None;
    }
    let path = workspace.join(ASSETS_DIR).join(asset_ref);
    path.is_file().then_some(path)
}

pub fn assets_dir(workspace: &Path) -> PathBuf {
    workspace.join(ASSETS_DIR)
}
