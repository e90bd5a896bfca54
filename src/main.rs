// src/main.rs
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use omeka_harvest::{
    api::categories::Category, measure_harvest, write_partial, AppError, CommandLineInput,
    ExportReport, Harvest, HarvestConfig, HarvestStats, OmekaClient, PassThroughMapper,
    RecordExporter, RecordSource,
};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

const LOG_FILE_NAME: &str = "omeka-harvest.log";

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Kept out of the output directory, which only ever holds exports
    let log_file_path = std::env::temp_dir().join(LOG_FILE_NAME);
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(if verbose {
                    LevelFilter::Debug
                } else {
                    LevelFilter::Warn
                })))
                .build("stdout", Box::new(stdout_appender)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::info!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Runs one harvest: collect → export → report. The client is closed on
/// every path out of this function.
async fn execute_harvest(config: &HarvestConfig) -> Result<(), AppError> {
    let client = OmekaClient::connect(config).await?;
    let run = IwacHarvest::new(config, &client);
    let outcome = run.execute().await;

    if config.profile {
        run.report_profile();
    }
    client.close();
    outcome
}

/// Orchestrates the collection and export of one Omeka S instance.
struct IwacHarvest<'a> {
    config: &'a HarvestConfig,
    client: &'a OmekaClient,
    started: Instant,
}

impl<'a> IwacHarvest<'a> {
    fn new(config: &'a HarvestConfig, client: &'a OmekaClient) -> Self {
        Self {
            config,
            client,
            started: Instant::now(),
        }
    }

    async fn execute(&self) -> Result<(), AppError> {
        let harvest = match self.collect().await {
            Ok(harvest) => harvest,
            Err(AppError::CollectionAborted { failure, partial }) => {
                self.dump_partial(Arc::new(*partial)).await;
                return Err(AppError::Fetch(failure));
            }
            Err(e) => return Err(e),
        };
        let collected_in = self.started.elapsed();

        if harvest.is_empty() {
            log::warn!("No data fetched from the API. Exiting.");
            self.report_failures(&harvest);
            return Ok(());
        }

        let harvest = Arc::new(harvest);
        let report = match self.export(Arc::clone(&harvest)).await {
            Ok(report) => report,
            Err(e) => {
                self.dump_partial(harvest).await;
                return Err(e);
            }
        };
        self.report_completion(&measure_harvest(&harvest), &report, collected_in);
        self.report_failures(&harvest);
        Ok(())
    }

    async fn dump_partial(&self, harvest: Arc<Harvest>) {
        if let Some(dir) = write_partial(harvest, &self.config.output_dir).await {
            eprintln!("Partial results written to {}", dir.display());
        }
    }

    fn report_completion(&self, stats: &HarvestStats, report: &ExportReport, collected_in: Duration) {
        println!(
            "Fetched {} records in {:.1}s",
            stats.total_records,
            collected_in.as_secs_f64()
        );
        for (category, count) in &stats.category_counts {
            println!("  {:<28} {:>7}", category, count);
        }
        for (bucket, total) in &stats.bucket_totals {
            log::info!("{} total: {}", bucket, total);
        }
        for (language, count) in stats.top_languages(5) {
            log::info!("Language {}: {}", language, count);
        }
        log::info!("Public records: {:.1}%", stats.public_share * 100.0);
        println!(
            "Words: {} total, {:.2} per item",
            stats.total_words, stats.average_words
        );

        for path in &report.files {
            println!("✓ Wrote {}", path.display());
        }
        log::info!("Export size: {} bytes", report.bytes_written);
        if !report.failures.is_empty() {
            eprintln!(
                "⚠️  {} record(s) could not be exported; see errors.log",
                report.failures.len()
            );
        }
    }

    fn report_failures(&self, harvest: &Harvest) {
        let failed = harvest.failed_categories();
        if !failed.is_empty() {
            eprintln!("⚠️  Failed categories: {}", failed.join(", "));
        }
    }

    fn report_profile(&self) {
        let report = self.client.report();
        log::info!("Elapsed: {:.2}s", self.started.elapsed().as_secs_f64());
        log::info!(
            "Requests: {} ({} from cache, {} network attempts, {} failed)",
            report.fetch.requests,
            report.fetch.cache_hits,
            report.fetch.network_attempts,
            report.fetch.failures
        );
        if let Some(cache) = report.cache {
            log::info!(
                "Cache: {} memory hits, {} disk hits, {} misses, {} writes ({} failed)",
                cache.memory_hits,
                cache.disk_hits,
                cache.misses,
                cache.writes,
                cache.write_failures
            );
        }
        let health = report.pool.health;
        log::info!(
            "HTTP: {} ok, {} failed, {} connection errors, avg latency {}ms",
            health.successful_requests,
            health.failed_requests,
            health.connection_errors,
            health.average_latency_ms
        );
    }

    fn categories(&self) -> Vec<Category> {
        self.config.categories.clone()
    }
}

#[async_trait::async_trait]
impl RecordSource for IwacHarvest<'_> {
    async fn collect(&self) -> Result<Harvest, AppError> {
        log::info!("Harvesting from {}", self.config.base_url);
        self.client
            .collector(self.categories(), self.config.failure_policy)
            .with_progress(self.config.show_progress)
            .collect()
            .await
    }
}

#[async_trait::async_trait]
impl RecordExporter for IwacHarvest<'_> {
    async fn export(&self, harvest: Arc<Harvest>) -> Result<ExportReport, AppError> {
        omeka_harvest::export(harvest, Arc::new(PassThroughMapper), &self.config.output_dir).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = HarvestConfig::resolve(cli)?;

    if let Err(e) = execute_harvest(&config).await {
        log::error!("Harvest failed: {}", e);
        return Err(anyhow::Error::new(e).context("omeka-harvest did not complete"));
    }

    Ok(())
}
