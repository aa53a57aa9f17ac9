//! Device claiming handler.

use tokio_util::sync::CancellationToken;
use tracing::info;

use rainfly_api::HttpDeviceTransport;
use rainfly_core::ClaimEngine;

use crate::cli::ClaimArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, args: ClaimArgs) -> Result<(), CliError> {
    let mut transport = HttpDeviceTransport::new(&args.host)?;

    // Ctrl-C cancels between handshake steps; the in-flight exchange
    // is allowed to finish.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    info!(host = %args.host, "starting claiming handshake");
    ClaimEngine::new(&mut transport, &ctx.api)
        .run(&cancel)
        .await?;

    output::success("Device claimed -- it can now connect to the cloud");
    Ok(())
}
