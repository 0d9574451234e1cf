use crate::navigation::{BlockingResponse, NavigationRequest};
use crate::server::listener::Dispatcher;
use anyhow::Result;
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

/// Answers one JSON request per line with one JSON response per line, in
/// order, until EOF or shutdown. Returns the number of requests answered.
pub async fn serve_lines<R, W>(
    dispatcher: &Dispatcher,
    reader: R,
    mut writer: W,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Request stream closed.");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let response = respond(dispatcher, line);
                let mut json = serde_json::to_string(&response)?;
                json.push('\n');
                writer.write_all(json.as_bytes()).await?;
                writer.flush().await?;
                answered += 1;
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    info!("Shutdown signal received. Stopping request loop...");
                    break;
                }
            }
        }
    }

    Ok(answered)
}

fn respond(dispatcher: &Dispatcher, line: &str) -> BlockingResponse {
    match serde_json::from_str::<NavigationRequest>(line) {
        Ok(request) => {
            let decision = dispatcher.dispatch(&request);
            BlockingResponse::for_decision(request.request_id, &decision)
        }
        Err(err) => {
            // Fail open: a request we cannot read proceeds untouched.
            warn!("Failed to parse request: {}", err);
            BlockingResponse::default()
        }
    }
}
