//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! `havokmud` binary

use anyhow::Context;
use clap::Parser;
use havok_server::{AppContext, CONFIG_ENV, MudConfig, MudFactory, logging};
use havok_service::{SessionRegistry, TelnetServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// HavokMud telnet server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `havok_service=trace`
    #[arg(short, long)]
    log_level: Option<String>,

    /// Listen on this port instead of the configured one
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut config = match MudConfig::resolve_path(args.config, home) {
        Some(path) => MudConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MudConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logging::init(args.log_level.as_deref(), config.logging.level.as_deref())
        .context("installing the log subscriber")?;

    let registry = Arc::new(SessionRegistry::new());
    let service_config = config.server.service_config();
    let ctx = AppContext::build(config, registry.clone())
        .await
        .context("building the application context")?;
    let primed = ctx.prime_cache().await.context("priming the auth cache")?;
    info!(accounts = primed, "Auth cache primed");

    let mud_name = ctx.mud_name().to_string();
    let server = TelnetServer::with_registry(service_config, registry)
        .await
        .context("binding the telnet listener")?;
    server
        .start(Arc::new(MudFactory::new(ctx)))
        .await
        .context("starting the telnet server")?;
    info!("{} is accepting connections on {}", mud_name, server.bind_address());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Shutting down");
    server.shutdown().await.context("shutting down")?;
    Ok(())
}
