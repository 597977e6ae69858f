use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use tracing::{error, info};

use sihka_table::app::App;
use sihka_table::config::AppConfig;
use sihka_table::logging::init_tracing;
use sihka_table::usecase::services::import_service::ImportService;

fn ensure_webview_data_dir(base_data_dir: &Path) -> Result<PathBuf> {
    let webview_data_dir = base_data_dir.join("webview");
    std::fs::create_dir_all(&webview_data_dir).with_context(|| {
        format!(
            "failed to create webview dir: {}",
            webview_data_dir.display()
        )
    })?;
    Ok(webview_data_dir)
}

fn default_webview_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("id", "sihka", "sihka-table")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    ensure_webview_data_dir(project_dirs.data_local_dir())
}

// `--import <file.csv> <label_column>` loads a CSV as a collection before
// the window opens.
fn import_from_args(service: &ImportService, mut args: impl Iterator<Item = String>) -> Result<()> {
    let Some(flag) = args.next() else {
        return Ok(());
    };
    if flag != "--import" {
        return Err(anyhow!("unknown argument `{flag}`"));
    }
    let path = args
        .next()
        .ok_or_else(|| anyhow!("--import needs a csv path"))?;
    let label_column = args.next().unwrap_or_else(|| "label".to_string());
    let imported = service
        .import_csv(Path::new(&path), &label_column)
        .with_context(|| format!("failed to import {path}"))?;
    info!(
        path = %path,
        collection_id = imported.collection_id,
        rows = imported.row_count,
        "csv imported"
    );
    Ok(())
}

fn prepare() -> Result<(AppConfig, PathBuf)> {
    let config = AppConfig::load().context("failed to load configuration")?;
    let service = ImportService::new(config.db_path.clone());
    import_from_args(&service, std::env::args().skip(1))?;
    let seeded = service
        .ensure_sample()
        .context("failed to seed the sample collection")?;
    info!(
        db = %config.db_path.display(),
        collection_id = seeded.collection_id,
        rows = seeded.row_count,
        "local store ready"
    );
    let webview_data_dir = default_webview_data_dir()?;
    Ok((config, webview_data_dir))
}

fn main() {
    init_tracing();

    let (config, webview_data_dir) = match prepare() {
        Ok(prepared) => prepared,
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    };

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(dioxus::desktop::WindowBuilder::new().with_title("Sihka"))
                .with_data_directory(webview_data_dir),
        )
        .with_context(config)
        .launch(App);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_test_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("sihka-{prefix}-{nanos}"))
    }

    #[test]
    fn ensure_webview_data_dir_creates_webview_subdir() {
        let temp_dir = unique_test_dir("webview-data-dir");
        fs::create_dir_all(&temp_dir).expect("should create temp dir");

        let webview_dir =
            ensure_webview_data_dir(&temp_dir).expect("webview data dir should be created");

        assert_eq!(webview_dir, temp_dir.join("webview"));
        assert!(webview_dir.is_dir(), "webview directory should exist");

        fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
    }

    #[test]
    fn import_from_args_rejects_unknown_flag_and_missing_path() {
        let service = ImportService::new(unique_test_dir("import-args").join("app.sqlite"));

        assert!(import_from_args(&service, std::iter::empty()).is_ok());
        assert!(import_from_args(&service, ["--export".to_string()].into_iter()).is_err());
        assert!(import_from_args(&service, ["--import".to_string()].into_iter()).is_err());
    }
}
