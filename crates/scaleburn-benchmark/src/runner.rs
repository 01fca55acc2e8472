use std::sync::Arc;

use scaleburn_core::{
    BenchmarkConfig, LevelStatistic, Report, Result, ScaleBurnError, TestCase, WorkerTotal,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{Completion, CompletionClient};

/// Progress notifications emitted while a test case runs.
#[derive(Debug, Clone)]
pub enum BenchmarkEvent {
    Warmup { content: String },
    Level { current: usize, total: usize, concurrency: u32 },
    LevelComplete { concurrency: u32, stats: LevelStatistic },
    Done { report: Report },
    Error { message: String },
}

/// Drives a test case across its concurrency profile.
pub struct BenchmarkRunner<C> {
    client: Arc<C>,
    config: BenchmarkConfig,
}

impl<C: CompletionClient + 'static> BenchmarkRunner<C> {
    pub fn new(client: C, config: BenchmarkConfig) -> Self {
        Self::with_shared_client(Arc::new(client), config)
    }

    pub fn with_shared_client(client: Arc<C>, config: BenchmarkConfig) -> Self {
        Self { client, config }
    }

    /// One throwaway call so the first level doesn't pay for a cold server.
    pub async fn warmup(&self) -> Result<Completion> {
        let warmup = &self.config.warmup;
        let completion = self
            .client
            .complete(&warmup.messages, warmup.temperature, warmup.max_tokens)
            .await?;

        info!(
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            "Wake up completion: {}",
            preview(&completion.content)
        );
        Ok(completion)
    }

    pub async fn run(&self, name: &str, test_case: &TestCase) -> Result<Report> {
        self.run_with_events(name, test_case, None).await
    }

    #[instrument(skip(self, test_case, events), fields(levels = test_case.profile.len()))]
    pub async fn run_with_events(
        &self,
        name: &str,
        test_case: &TestCase,
        events: Option<mpsc::Sender<BenchmarkEvent>>,
    ) -> Result<Report> {
        test_case.validate()?;
        self.config.validate()?;

        let requests_per_worker = self.config.requests_per_worker;

        let warmup = match self.warmup().await {
            Ok(completion) => completion,
            Err(e) => {
                error!("Warmup failed: {}", e);
                emit(&events, BenchmarkEvent::Error { message: e.to_string() }).await;
                return Err(e);
            }
        };
        emit(&events, BenchmarkEvent::Warmup { content: warmup.content }).await;

        let started = Instant::now();
        let total = test_case.profile.len();
        let mut report = Report::new(name);

        for (i, &concurrency) in test_case.profile.iter().enumerate() {
            info!("Level {}/{}: {} workers", i + 1, total, concurrency);
            emit(
                &events,
                BenchmarkEvent::Level {
                    current: i + 1,
                    total,
                    concurrency,
                },
            )
            .await;

            match self.run_level(test_case, concurrency, requests_per_worker).await {
                Ok(stats) => {
                    info!(
                        concurrency,
                        prompt_tokens = stats.prompt_tokens,
                        completion_tokens = stats.completion_tokens,
                        elapsed_secs = stats.elapsed_secs,
                        "Level complete"
                    );
                    report.push(concurrency, stats);
                    emit(&events, BenchmarkEvent::LevelComplete { concurrency, stats }).await;
                }
                Err(e) => {
                    error!("Stopping {} at level {}: {}", name, concurrency, e);
                    report.total_elapsed_secs = started.elapsed().as_secs_f64();
                    emit(&events, BenchmarkEvent::Error { message: e.to_string() }).await;
                    return Err(ScaleBurnError::RunFailed {
                        concurrency,
                        completed: Box::new(report),
                        source: Box::new(e),
                    });
                }
            }
        }

        report.total_elapsed_secs = started.elapsed().as_secs_f64();
        info!("Total time elapsed: {:.2}, sec", report.total_elapsed_secs);

        emit(&events, BenchmarkEvent::Done { report: report.clone() }).await;
        Ok(report)
    }

    /// Runs `n_workers` workers at once and reduces them to per-request averages.
    ///
    /// The first worker failure aborts the rest of the level.
    pub async fn run_level(
        &self,
        test_case: &TestCase,
        n_workers: u32,
        requests_per_worker: u32,
    ) -> Result<LevelStatistic> {
        if n_workers == 0 {
            return Err(ScaleBurnError::InvalidWorkload(
                "a level needs at least one worker".to_string(),
            ));
        }
        if requests_per_worker == 0 {
            return Err(ScaleBurnError::Config(
                "requests_per_worker must be at least 1".to_string(),
            ));
        }

        let workload = Arc::new(test_case.clone());
        let mut workers = JoinSet::new();

        for _ in 0..n_workers {
            let client = Arc::clone(&self.client);
            let workload = Arc::clone(&workload);
            workers.spawn(async move {
                run_worker(client.as_ref(), &workload, requests_per_worker).await
            });
        }

        let mut totals = Vec::with_capacity(n_workers as usize);
        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| ScaleBurnError::WorkerPanicked(e.to_string()))
                .and_then(|r| r);

            match outcome {
                Ok(total) => totals.push(total),
                Err(e) => {
                    warn!(
                        "Worker failed at {} workers, cancelling {} still running",
                        n_workers,
                        workers.len()
                    );
                    workers.abort_all();
                    return Err(ScaleBurnError::LevelFailed {
                        concurrency: n_workers,
                        source: Box::new(e),
                    });
                }
            }
        }

        LevelStatistic::reduce(&totals, requests_per_worker)
    }
}

/// Issues `requests_per_worker` identical calls one after another.
pub async fn run_worker<C: CompletionClient + ?Sized>(
    client: &C,
    test_case: &TestCase,
    requests_per_worker: u32,
) -> Result<WorkerTotal> {
    let mut total = WorkerTotal::default();

    let started = Instant::now();
    for i in 0..requests_per_worker {
        let completion = client
            .complete(&test_case.messages, test_case.temperature, test_case.max_tokens)
            .await?;
        debug!(
            "Request {}/{}: {} prompt, {} completion tokens",
            i + 1,
            requests_per_worker,
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens
        );
        total.record(&completion.usage);
    }
    total.elapsed_secs = started.elapsed().as_secs_f64();

    Ok(total)
}

async fn emit(events: &Option<mpsc::Sender<BenchmarkEvent>>, event: BenchmarkEvent) {
    if let Some(tx) = events {
        if tx.send(event).await.is_err() {
            debug!("Benchmark event receiver dropped");
        }
    }
}

fn preview(content: &str) -> &str {
    match content.char_indices().nth(200) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
