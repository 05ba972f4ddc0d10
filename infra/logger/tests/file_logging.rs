use modhub_domain::config::LoggingConfig;
use modhub_logger::Logger;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn json_file_logging_writes_structured_lines() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let config = LoggingConfig {
        console: false,
        directory: Some(log_dir.clone()),
        json: true,
        ..LoggingConfig::default()
    };

    let logger = Logger::from_config("integration-file-logging", &config)?;
    assert!(logger.writes_files());

    tracing::info!(feature = "auth", "Feature loaded");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(&log_file)?;
    let line = contents.lines().find(|line| line.contains("Feature loaded")).expect("event is written");
    assert!(line.starts_with('{'), "file output is JSON: {line}");
    assert!(line.contains("\"feature\":\"auth\""));

    Ok(())
}
