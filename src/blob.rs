use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use log::{debug, info};

/// 以内容哈希命名的 PNG 文件目录，结构为扁平的 `<image_dir>/<hash>.png`
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// 打开图片目录，不存在时自动创建
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = std::path::absolute(dir.as_ref())?;
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.png"))
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.path_for(hash).is_file()
    }

    /// 写入图片
    ///
    /// 目标文件已存在时返回 `AlreadyExists` 错误，调用方应先检查 [`BlobStore::exists`]。
    /// 先写入临时文件再重命名，避免中途崩溃留下半个文件。
    pub fn write(&self, hash: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_for(hash);
        if path.exists() {
            return Err(io::Error::new(
                ErrorKind::AlreadyExists,
                format!("blob already exists: {}", path.display()),
            ));
        }

        let mut tmp_file = path.clone();
        tmp_file.set_extension("png.tmp");
        fs::write(&tmp_file, bytes)?;
        fs::rename(&tmp_file, &path)?;

        info!("写入图片 {}", path.display());
        Ok(())
    }

    /// 删除图片，返回文件是否存在。文件本就不存在时不视为错误。
    pub fn delete(&self, hash: &str) -> io::Result<bool> {
        let path = self.path_for(hash);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("删除图片 {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("图片不存在，跳过删除: {}", path.display());
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
