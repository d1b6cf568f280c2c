use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// 系统剪贴板
pub trait Clipboard {
    /// 读取剪贴板中的 PNG 图片
    fn read_image(&self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// 将 PNG 文件放入剪贴板
    fn write_image(&self, path: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// 剪贴板工具，依次尝试
struct Backend {
    name: &'static str,
    read: &'static [&'static str],
    write: &'static [&'static str],
}

const BACKENDS: &[Backend] = &[
    Backend {
        name: "Wayland",
        read: &["wl-paste", "--type", "image/png"],
        write: &["wl-copy", "--type", "image/png"],
    },
    Backend {
        name: "X11",
        read: &["xclip", "-selection", "clipboard", "-t", "image/png", "-o"],
        write: &["xclip", "-selection", "clipboard", "-t", "image/png"],
    },
];

fn no_backend() -> Error {
    Error::Clipboard("no suitable clipboard utility found (install wl-clipboard or xclip)".to_string())
}

/// 通过 wl-clipboard 或 xclip 访问剪贴板
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    async fn read_image(&self) -> Result<Vec<u8>> {
        for backend in BACKENDS {
            let output = match Command::new(backend.read[0])
                .args(&backend.read[1..])
                .stdin(Stdio::null())
                .output()
                .await
            {
                Ok(output) => output,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("{} 不可用: {}", backend.read[0], e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            debug!("从剪贴板读取 ({}): {} bytes", backend.name, output.stdout.len());
            if !output.status.success() || output.stdout.is_empty() {
                return Err(Error::NoClipboardImage);
            }
            return Ok(output.stdout);
        }
        Err(no_backend())
    }

    async fn write_image(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(Error::FileMissing(path.to_path_buf()));
        }
        let data = tokio::fs::read(path).await?;

        for backend in BACKENDS {
            let mut child = match Command::new(backend.write[0])
                .args(&backend.write[1..])
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .spawn()
            {
                Ok(child) => child,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("{} 不可用: {}", backend.write[0], e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(&data).await?;
            }
            let status = child.wait().await?;
            if !status.success() {
                return Err(Error::Clipboard(format!("{} exited with {}", backend.write[0], status)));
            }
            debug!("写入剪贴板 ({}): {}", backend.name, path.display());
            return Ok(());
        }
        Err(no_backend())
    }
}
