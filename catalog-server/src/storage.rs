use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use catalog::basic_models::UploadedFile;
use rand::{distributions::Alphanumeric, Rng};

use crate::config::MediaConfig;

/// Uploaded images live under this directory of the media root.
pub const RECIPE_IMAGES: &str = "recipe_images";

/// Uploaded files on local disk, served back under the media url.
#[derive(Clone, Debug)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn from_config(conf: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&conf.root),
            url: conf.url.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public url for a stored file.
    pub fn url(&self, rel_path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), rel_path)
    }

    /// Write a file under `dir`, returning its path relative to the media root.
    /// An existing file with the same name is never overwritten.
    pub async fn save(&self, dir: &str, file: &UploadedFile) -> Result<String> {
        let full_dir = self.root.join(dir);
        tokio::fs::create_dir_all(&full_dir)
            .await
            .with_context(|| format!("Creating {}", full_dir.display()))?;
        let mut name = sanitize_file_name(&file.file_name);
        while tokio::fs::try_exists(full_dir.join(&name)).await? {
            name = with_random_suffix(&name);
        }
        let full_path = full_dir.join(&name);
        tokio::fs::write(&full_path, &file.content_bytes)
            .await
            .with_context(|| format!("Writing {}", full_path.display()))?;
        tracing::info!("Stored {} bytes at {}", file.content_bytes.len(), full_path.display());
        Ok(format!("{dir}/{name}"))
    }

    /// Upload an image for a recipe.
    pub async fn save_recipe_image(&self, file: &UploadedFile) -> Result<String> {
        self.save(RECIPE_IMAGES, file).await
    }
}

/// Keep only the final path component, made of characters safe in a url.
fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = base
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect::<String>();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".into()
    } else {
        cleaned.into()
    }
}

fn with_random_suffix(name: &str) -> String {
    let suffix = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect::<String>();
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("fried egg.png"), "fried_egg.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\egg.JPG"), "egg.JPG");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("<>"), "image");
    }

    #[test]
    fn suffix_goes_before_the_extension() {
        let name = with_random_suffix("egg.png");
        assert!(name.starts_with("egg_"));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "egg_.png".len() + 7);
    }

    #[tokio::test]
    async fn collisions_get_a_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MediaStorage::from_config(&MediaConfig {
            root: dir.path().display().to_string(),
            ..MediaConfig::default()
        });
        let file = UploadedFile {
            field_name: "image".into(),
            file_name: "egg.png".into(),
            content_type: None,
            content_bytes: vec![1, 2, 3],
        };
        let first = storage.save_recipe_image(&file).await.unwrap();
        let second = storage.save_recipe_image(&file).await.unwrap();
        assert_eq!(first, "recipe_images/egg.png");
        assert_ne!(first, second);
        assert_eq!(std::fs::read(dir.path().join(&second)).unwrap(), [1, 2, 3]);
        assert_eq!(storage.url(&first), "/media/recipe_images/egg.png");
    }
}
