use std::fs;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($dir:expr, $($args:expr),*) => {
        {
            let mut cmd = imagedb(&$dir)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 使用临时目录中的配置文件和数据目录
fn imagedb(dir: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("imagedb")?;
    cmd.arg("-c").arg(dir.path().join("config.yaml"));
    cmd.arg("-d").arg(dir.path().join("data"));
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

const HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

#[test]
fn list_empty_database() -> Result<()> {
    let dir = TempDir::new()?;

    cargo_run!(dir, "list").success().stdout(predicate::str::is_empty());
    cargo_run!(dir, "list", "--output-format", "json").success().stdout(predicate::str::contains("[]"));

    assert!(dir.path().join("data").join("index.db").exists());
    assert!(dir.path().join("data").join("images").is_dir());
    Ok(())
}

#[test]
fn delete_missing_image() -> Result<()> {
    let dir = TempDir::new()?;

    cargo_run!(dir, "delete", HASH)
        .code(2)
        .stderr(predicate::str::contains(format!("no image with hash {HASH}")));
    Ok(())
}

#[test]
fn delete_orphaned_image_file() -> Result<()> {
    let dir = TempDir::new()?;
    let images = dir.path().join("data").join("images");
    fs::create_dir_all(&images)?;
    fs::write(images.join(format!("{HASH}.png")), b"hello")?;

    cargo_run!(dir, "delete", HASH.to_uppercase())
        .success()
        .stdout(predicate::str::contains("Removed image file"));
    assert!(!images.join(format!("{HASH}.png")).exists());

    cargo_run!(dir, "delete", HASH).code(2);
    Ok(())
}

#[rstest]
#[case::save(&["save"])]
#[case::load(&["load", "a cat"])]
#[case::search(&["search", "a cat"])]
#[case::config(&["config", "--show"])]
fn commands_require_config(#[case] args: &[&str]) -> Result<()> {
    let dir = TempDir::new()?;

    imagedb(&dir)?.args(args).assert().code(1).stderr(predicate::str::contains("imagedb init"));
    Ok(())
}

#[test]
fn init_then_show_config() -> Result<()> {
    let dir = TempDir::new()?;

    cargo_run!(dir, "init", "--api-key", "sk-or-v1-secret", "--vision-model", "some/vision")
        .success()
        .stdout(predicate::str::contains("Config saved to"));

    cargo_run!(dir, "config")
        .success()
        .stdout(predicate::str::contains("api_key: sk-o****"))
        .stdout(predicate::str::contains("vision_model: some/vision"))
        .stdout(predicate::str::contains("secret").not());

    cargo_run!(dir, "config", "--embedding-model", "other/embed").success();
    let saved = fs::read_to_string(dir.path().join("config.yaml"))?;
    assert!(saved.contains("embedding_model: other/embed"));
    assert!(saved.contains("api_key: sk-or-v1-secret"));
    Ok(())
}

#[test]
fn init_reads_api_key_from_terminal_only() -> Result<()> {
    let dir = TempDir::new()?;

    assert_cmd::Command::from_std(imagedb(&dir)?)
        .args(["init", "--vision-model", "some/vision"])
        .write_stdin("sk-or-v1-secret\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("sk-or-v1-secret").not())
        .stderr(predicate::str::contains("sk-or-v1-secret").not());
    assert!(!dir.path().join("config.yaml").exists());
    Ok(())
}

#[test]
fn config_sets_default_data_dir() -> Result<()> {
    let dir = TempDir::new()?;
    let library = dir.path().join("library");

    cargo_run!(dir, "init", "--api-key", "sk-test", "--vision-model", "some/vision").success();
    cargo_run!(dir, "config", "--set-data-dir", &library).success();

    let saved = fs::read_to_string(dir.path().join("config.yaml"))?;
    assert!(saved.contains(&format!("data_dir: {}", library.display())));

    // 不带 -d 时使用配置中的数据目录
    Command::cargo_bin("imagedb")?
        .arg("-c")
        .arg(dir.path().join("config.yaml"))
        .arg("list")
        .assert()
        .success();
    assert!(library.join("index.db").exists());
    Ok(())
}

#[test]
fn save_rejects_non_png_file() -> Result<()> {
    let dir = TempDir::new()?;
    let image = dir.path().join("photo.jpg");
    fs::write(&image, b"\xff\xd8\xff\xe0 not a png")?;

    cargo_run!(dir, "init", "--api-key", "sk-test", "--vision-model", "some/vision").success();
    cargo_run!(dir, "save", "--file", &image)
        .code(1)
        .stderr(predicate::str::contains("is not a PNG file"));

    assert!(!dir.path().join("data").join("index.db").exists());
    Ok(())
}
