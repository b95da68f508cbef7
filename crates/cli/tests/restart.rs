use config::Config;
use pretty_assertions::assert_eq;
use secwatch::{Exit, app, cli::RunArgs, marker::write_marker};
use std::time::Duration;

const CONFIG: &str = r#"
[checks]
ports = false
ssh = false

[paths]
state_dir = "state"
"#;

#[tokio::test(flavor = "multi_thread")]
async fn marker_ends_the_run_with_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_toml(CONFIG, dir.path()).unwrap();
    let marker = config.paths.restart_marker();

    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        write_marker(&marker).unwrap();
    });

    let args = RunArgs {
        foreground: true,
        ..Default::default()
    };
    let exit = tokio::time::timeout(Duration::from_secs(20), app::supervise(&config, &args))
        .await
        .expect("supervisor did not stop")
        .unwrap();
    writer.await.unwrap();

    assert_eq!(exit, Exit::Restart);
    // The pid survives an exec, so the file stays.
    let pid = std::fs::read_to_string(config.paths.pid_file()).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(config.paths.state_dir.join("snapshots/latest.json").is_file());
}
