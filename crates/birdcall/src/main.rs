use std::{io::Read, path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use tracing::error;

use birdcall_core::{
    attachment::FileAttachment, config::Config, dispatch::Dispatcher, ports::Attachment,
};
use birdcall_reqwest::ReqwestTransport;

/// Send a notification as an X/Twitter direct message or public post.
#[derive(Debug, Parser)]
#[command(name = "birdcall", version)]
struct Cli {
    /// Endpoint URL: x://ckey/csecret/akey/asecret[/@user...][?mode=dm|tweet&batch=yes&cache=yes]
    #[arg(long, env = "BIRDCALL_URL")]
    url: Option<String>,

    /// Message body; read from stdin when omitted.
    #[arg(short, long)]
    body: Option<String>,

    #[arg(short, long, default_value = "")]
    title: String,

    /// Image to attach (repeatable).
    #[arg(short, long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, birdcall_core::Error> {
    birdcall_core::logging::init("birdcall")?;

    let cli = Cli::parse();

    let mut cfg = Config::load()?;
    if cli.url.is_some() {
        cfg.url = cli.url;
    }

    let body = match cli.body {
        Some(b) => b,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let transport = Arc::new(ReqwestTransport::from_config(&cfg)?);
    let mut dispatcher = Dispatcher::from_config(&cfg, transport)?;

    let files: Vec<FileAttachment> = cli.attachments.into_iter().map(FileAttachment::new).collect();
    let attachments: Vec<&dyn Attachment> = files.iter().map(|f| f as &dyn Attachment).collect();

    if dispatcher.dispatch(&body, &cli.title, &attachments).await {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("notification to {} failed", dispatcher.endpoint());
        Ok(ExitCode::FAILURE)
    }
}
