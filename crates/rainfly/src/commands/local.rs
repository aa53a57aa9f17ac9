//! Local-control handlers (LAN devices, no cloud round trip).

use rainfly_api::HttpDeviceTransport;
use rainfly_core::LocalSession;

use crate::cli::{LocalArgs, LocalCommand};
use crate::commands::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(_ctx: &Context, args: LocalArgs) -> Result<(), CliError> {
    match args.command {
        LocalCommand::Info { host } => {
            let mut session = LocalSession::new(HttpDeviceTransport::new(&host)?);
            let info = session.property_info().await?;
            output::print_value(&serde_json::Value::Object(info));
            Ok(())
        }

        LocalCommand::Set { host, payload } => {
            let payload: serde_json::Value = serde_json::from_str(&payload)?;
            let mut session = LocalSession::new(HttpDeviceTransport::new(&host)?);
            session.set_property(&payload).await?;
            output::success("Property written");
            Ok(())
        }
    }
}
