use std::sync::Arc;

use pulsr_core::{Controller, EngineConfig, HttpClient, RequestDef, RequestExecutor, StatsAggregator};

use crate::cli::RunArgs;
use crate::config;
use crate::exit_codes::ExitCode;
use crate::output;

pub(crate) async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let (client_cfg, requests) = match config::load(&args.config).await {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{err:#}");
            return Ok(ExitCode::InvalidInput);
        }
    };

    if requests.is_empty() {
        eprintln!("config {} defines no requests", args.config.display());
        return Ok(ExitCode::InvalidInput);
    }

    let engine = EngineConfig {
        tick_interval: args.tick_interval,
        max_in_flight: args.max_in_flight,
    };

    let stats_folder = client_cfg.stats_folder.clone();
    let executor = Arc::new(RequestExecutor::new(
        HttpClient::default(),
        Arc::new(client_cfg),
        args.request_timeout,
    ));

    let fire = {
        let executor = executor.clone();
        move |def: Arc<RequestDef>| {
            let executor = executor.clone();
            async move { executor.execute(&def).await }
        }
    };

    let controller = match Controller::new(
        engine,
        requests,
        stats_folder,
        Arc::new(StatsAggregator::default()),
        fire,
    ) {
        Ok(controller) => Arc::new(controller),
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::InvalidInput);
        }
    };

    for stage in &args.stages {
        println!(
            "running stage {} for {}",
            stage.name,
            humantime::format_duration(stage.duration)
        );

        let handle = tokio::spawn({
            let controller = controller.clone();
            let name = stage.name.clone();
            async move { controller.run(&name).await }
        });

        tokio::time::sleep(stage.duration).await;
        controller.close();
        handle.await??;

        let snapshot = controller.flush().await?;
        output::print_stage_summary(&stage.name, &snapshot);
    }

    Ok(ExitCode::Success)
}
