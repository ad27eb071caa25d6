//! Command execution.

use std::process::ExitCode;
use std::sync::Arc;

use drivedrop_drive::DriveClient;
use drivedrop_protocol::BatchResult;
use drivedrop_upload::UploadEngine;
use tokio_util::sync::CancellationToken;

use crate::Command;
use crate::config::Config;
use crate::files::read_files;

/// What a command produced.
#[derive(Debug)]
pub enum Output {
    Folder(String),
    Batch(BatchResult),
}

/// Builds the engine from `config` and runs `command`, cancelling on Ctrl-C.
pub async fn run(command: Command, config: Config) -> anyhow::Result<ExitCode> {
    let client = DriveClient::new(config.token()?)?
        .with_base_urls(&config.api_base_url, &config.upload_base_url);
    let engine = UploadEngine::new(Arc::new(client), config.engine)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        }
    });

    match execute(&engine, command, cancel).await? {
        Output::Folder(id) => {
            println!("{id}");
            Ok(ExitCode::SUCCESS)
        }
        Output::Batch(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Runs one command against `engine`.
pub async fn execute(
    engine: &UploadEngine,
    command: Command,
    cancel: CancellationToken,
) -> anyhow::Result<Output> {
    match command {
        Command::Resolve(path) => {
            let id = engine
                .resolve_path(
                    &path.model,
                    &path.platform,
                    &path.category,
                    path.title.as_deref(),
                )
                .await?;
            Ok(Output::Folder(id))
        }
        Command::Upload {
            folder_id,
            path,
            files,
        } => {
            let folder_id = match folder_id {
                Some(id) => id,
                None => {
                    engine
                        .resolve_path(
                            path.model.as_deref().unwrap_or_default(),
                            path.platform.as_deref().unwrap_or_default(),
                            path.category.as_deref().unwrap_or_default(),
                            path.title.as_deref(),
                        )
                        .await?
                }
            };

            let files = read_files(&files, engine.config()).await?;
            let result = engine
                .upload_batch_with_cancel(&files, &folder_id, cancel)
                .await?;
            Ok(Output::Batch(result))
        }
    }
}
