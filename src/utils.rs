use std::io::{Read, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};

/// 计算图片内容的 sha256，返回小写十六进制字符串
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 检查字符串是否为合法的 sha256 十六进制摘要
pub fn is_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f'))
}

pub fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let v = std::io::stdin()
        .bytes()
        .take_while(|c| c.as_ref().ok() != Some(&b'\n'))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(String::from_utf8(v)?.trim().to_owned())
}

/// 从终端读取一行，不回显输入
pub fn read_secret(prompt: &str) -> anyhow::Result<String> {
    let v = dialoguer::Password::new().with_prompt(prompt).allow_empty_password(true).interact()?;
    Ok(v.trim().to_owned())
}

/// 等待网络请求时显示的 spinner
pub fn spinner(msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner().with_message(msg);
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}").unwrap());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 截断过长的描述，用于表格输出
pub fn truncate(s: &str, max_chars: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars && line.len() == s.len() {
        return line.to_owned();
    }
    let mut out: String = line.chars().take(max_chars).collect();
    out.push('…');
    out
}
