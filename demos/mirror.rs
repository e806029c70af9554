use ftp_mirror::FtpSession;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(config), Some(remote)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: mirror <server.json> <remote dir> [local dir]");
    };
    let local = args.next().unwrap_or_else(|| ".".to_owned());

    let mut session = FtpSession::from_json(config).await?;
    println!("welcome: {}", session.welcome_message());
    println!("current path: {}", session.current_path());

    for entry in &session.list().await? {
        println!(
            "{:<6} {:>12} {:<16} {}",
            entry.kind.to_string(),
            entry.size.map(|s| s.to_string()).unwrap_or_default(),
            entry.modify.as_deref().unwrap_or(""),
            entry.name
        );
    }

    let report = session.mirror_directory(&remote, &local).await?;
    println!(
        "mirrored {} directories and {} files into {}",
        report.directories.len(),
        report.files.len(),
        local
    );
    for failure in &report.failures {
        println!("failed: {}: {}", failure.remote, failure.error);
    }

    session.disconnect().await?;
    Ok(())
}
