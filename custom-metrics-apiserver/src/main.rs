use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use cli::{Cli, LogLevel};
use config::MetricsConfig;
use custom_metrics_apiserver_core::{
    custom_metrics::METRIC_VALUE_LIST_KIND,
    handlers::RequestScopeBuilder,
    naming::ContextBasedNaming,
    negotiation::CodecFactory,
    CUSTOM_METRICS_GROUP, CUSTOM_METRICS_VERSION,
};
use env_logger::Target;
use kube::core::{GroupVersion, GroupVersionKind};
use log::{info, LevelFilter};
use provider::StaticMetricsProvider;
use routes::metrics_routes;
use warp::Filter;

mod cli;
mod config;
mod provider;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli);

    let config = MetricsConfig::load(&cli.metrics_config)
        .context("Couldn't load the metrics configuration!")?;
    info!(
        "Loaded {} metric series from {}",
        config.series.len(),
        cli.metrics_config.display()
    );

    let group_version = GroupVersion {
        group: CUSTOM_METRICS_GROUP.to_owned(),
        version: CUSTOM_METRICS_VERSION.to_owned(),
    };
    let scope = RequestScopeBuilder::default()
        .serializer(Arc::new(CodecFactory::default()))
        .kind(GroupVersionKind {
            group: group_version.group.to_owned(),
            version: group_version.version.to_owned(),
            kind: METRIC_VALUE_LIST_KIND.to_owned(),
        })
        .namer(Arc::new(ContextBasedNaming::new(&group_version, false)))
        .build()
        .context("Couldn't build the request scope!")?;

    let routes = metrics_routes(
        Arc::new(scope),
        Arc::new(StaticMetricsProvider::new(config)),
    )
    .with(warp::log("custom_metrics_apiserver"));

    let address = SocketAddr::new(cli.bind_address, cli.port);
    info!("Serving {CUSTOM_METRICS_GROUP}/{CUSTOM_METRICS_VERSION} on {address}");

    warp::serve(routes).run(address).await;

    Ok(())
}

fn configure_logging(cli: &Cli) {
    let log_level = cli.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .target(Target::Stderr);

    match log_level {
        LogLevel::Normal => logger.filter(Some("custom_metrics_apiserver"), LevelFilter::Info),
        LogLevel::Verbose => logger.filter(Some("custom_metrics_apiserver"), LevelFilter::Debug),
        LogLevel::Trace => logger.filter(None, LevelFilter::Trace),
    };

    logger.init();
}
