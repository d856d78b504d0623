//! Serve command handler.

use clap::Args;
use vta_core::{config::AppConfig, AppResult};

/// Run the HTTP answer service
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (default from config, 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default from config or PORT, 5000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Expose POST /api/update
    #[arg(long)]
    pub enable_update: bool,
}

impl ServeCommand {
    pub async fn execute(&self, mut config: AppConfig) -> AppResult<()> {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.enable_update {
            config.server.enable_update = true;
        }

        vta_server::serve(&config).await
    }
}
