use crate::core::{CycleOutcome, Pipeline};
use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

pub struct BotEngine<P: Pipeline> {
    pipeline: P,
    interval: Duration,
}

impl<P: Pipeline> BotEngine<P> {
    pub fn new(pipeline: P, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// One full cycle: open the sheet, fetch bars, classify, write the label.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        tracing::info!("Starting MA update cycle...");

        let worksheet = self.pipeline.prepare().await?;

        let bars = self.pipeline.extract().await?;
        if bars.is_empty() {
            tracing::error!("No bars returned; skipping sheet update.");
            return Ok(CycleOutcome::Skipped {
                reason: "no bars returned".to_string(),
            });
        }

        let signal = self.pipeline.transform(bars).await?;
        let report = self.pipeline.load(worksheet, signal).await?;

        if report.written {
            tracing::info!(
                "Finished cycle. {}!{} is now '{}' (diff vs MA: {:.2}%).",
                report
                    .worksheet
                    .as_ref()
                    .map(|w| w.title.as_str())
                    .unwrap_or("?"),
                report.cell,
                report.signal.label,
                report.signal.diff_pct
            );
        } else {
            tracing::info!(
                "Finished cycle without writing. Label '{}' (diff vs MA: {:.2}%).",
                report.signal.label,
                report.signal.diff_pct
            );
        }

        Ok(CycleOutcome::Updated(report))
    }

    /// Runs cycles until `shutdown` resolves. A failed cycle is logged and the
    /// loop carries on after the usual sleep. Returns the number of cycles run.
    pub async fn run<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0usize;

        loop {
            tokio::select! {
                outcome = self.run_once() => {
                    cycles += 1;
                    if let Err(e) = outcome {
                        tracing::error!(
                            "Unexpected error during update cycle: {} (Category: {:?}, Severity: {:?})",
                            e,
                            e.category(),
                            e.severity()
                        );
                        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
                        if !e.is_transient() {
                            tracing::warn!("This error will likely repeat until the configuration or credentials are fixed.");
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested during a cycle; stopping.");
                    return cycles;
                }
            }

            tracing::info!(
                "Sleeping for {} seconds before next run...",
                self.interval.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested; stopping after {} cycles.", cycles);
                    return cycles;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bar, CycleReport, TrendLabel, TrendSignal, WorksheetRef};
    use crate::utils::error::BotError;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct ScriptedPipeline {
        bars: Vec<Bar>,
        fail_extract: bool,
        loads: Arc<AtomicUsize>,
        extracts: Arc<AtomicUsize>,
    }

    impl ScriptedPipeline {
        fn new(bars: Vec<Bar>) -> Self {
            Self {
                bars,
                fail_extract: false,
                loads: Arc::new(AtomicUsize::new(0)),
                extracts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    fn bar(close: f64) -> Bar {
        Bar {
            t: Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap(),
            o: None,
            h: None,
            l: None,
            c: Some(close),
            v: None,
            n: None,
            vw: None,
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for ScriptedPipeline {
        async fn prepare(&self) -> Result<Option<WorksheetRef>> {
            Ok(Some(WorksheetRef {
                spreadsheet_id: "id".to_string(),
                title: "Dashboard".to_string(),
            }))
        }

        async fn extract(&self) -> Result<Vec<Bar>> {
            self.extracts.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                return Err(BotError::ApiResponseError {
                    service: "Alpaca".to_string(),
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self.bars.clone())
        }

        async fn transform(&self, bars: Vec<Bar>) -> Result<TrendSignal> {
            let last = bars.last().unwrap();
            Ok(TrendSignal {
                symbol: "RSP".to_string(),
                window: bars.len(),
                ma_value: 1.0,
                last_price: last.c.unwrap(),
                last_time: last.t,
                label: TrendLabel::Moderate,
                diff_pct: 0.0,
            })
        }

        async fn load(&self, worksheet: Option<WorksheetRef>, signal: TrendSignal) -> Result<CycleReport> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(CycleReport {
                signal,
                worksheet,
                cell: "T3".to_string(),
                previous_value: None,
                written: true,
            })
        }
    }

    #[tokio::test]
    async fn test_run_once_updates() {
        let pipeline = ScriptedPipeline::new(vec![bar(1.0)]);
        let engine = BotEngine::new(pipeline.clone(), Duration::from_secs(1));

        match engine.run_once().await.unwrap() {
            CycleOutcome::Updated(report) => assert_eq!(report.signal.label, TrendLabel::Moderate),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_once_skips_without_bars() {
        let pipeline = ScriptedPipeline::new(vec![]);
        let engine = BotEngine::new(pipeline.clone(), Duration::from_secs(1));

        let outcome = engine.run_once().await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Skipped { .. }));
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_keeps_going_after_errors_until_shutdown() {
        let mut pipeline = ScriptedPipeline::new(vec![bar(1.0)]);
        pipeline.fail_extract = true;
        let engine = BotEngine::new(pipeline.clone(), Duration::from_secs(3600));

        // three cycles at t=0, 1h, 2h; shutdown lands during the third sleep
        let shutdown = tokio::time::sleep(Duration::from_secs(3600 * 2 + 10));
        let cycles = engine.run(shutdown).await;

        assert_eq!(cycles, 3);
        assert_eq!(pipeline.extracts.load(Ordering::SeqCst), 3);
        assert_eq!(pipeline.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_stops_immediately_on_ready_shutdown() {
        let pipeline = ScriptedPipeline::new(vec![bar(1.0)]);
        let engine = BotEngine::new(pipeline, Duration::from_secs(3600));

        let cycles = engine.run(std::future::ready(())).await;
        assert!(cycles <= 1);
    }
}
