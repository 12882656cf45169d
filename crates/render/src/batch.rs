//! Parallel transformation of many statuses.

use crate::node::RenderNode;
use crate::options::TransformOptions;
use crate::pipeline::{ContentPipeline, TransformContext, is_degraded};
use crate::tables::{EmojiTable, MentionTable};
use fedimark_core::Diagnostics;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// One status to transform, with its own side tables.
#[derive(Debug, Clone, Default)]
pub struct BatchInput {
    /// Caller identifier echoed in the result.
    pub id: String,
    /// Raw status HTML.
    pub content: String,
    /// Custom emoji available to this status.
    pub emojis: Option<EmojiTable>,
    /// Accounts mentioned by this status.
    pub mentions: Option<MentionTable>,
}

/// Batch processing options.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Upper bound on worker threads; the global pool is used when unset.
    pub max_threads: Option<usize>,
    /// Options applied to every status.
    pub options: TransformOptions,
}

/// Result for one status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Identifier from the input.
    pub id: String,
    /// The render forest.
    pub nodes: Vec<RenderNode>,
    /// Recoveries made while transforming this status.
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

/// Aggregate statistics.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    /// Number of statuses processed.
    pub total: u32,
    /// Statuses whose markup needed structural repair or had an unterminated fence.
    pub degraded: u32,
    /// Total warnings across the batch.
    pub warnings: u32,
    /// Wall-clock time in milliseconds.
    pub processing_time_ms: f64,
}

/// Batch results in input order, plus statistics.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    /// Per-status results.
    pub results: Vec<BatchResult>,
    /// Aggregate statistics.
    pub stats: BatchStats,
}

impl ContentPipeline {
    /// Transforms independent statuses in parallel.
    ///
    /// Results keep input order. Pool construction failure falls back to the
    /// global rayon pool.
    pub fn run_batch(&self, inputs: Vec<BatchInput>, max_threads: Option<usize>) -> BatchOutput {
        let start = Instant::now();

        let pool = max_threads.and_then(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| log::warn!("falling back to the global pool: {}", err))
                .ok()
        });

        let total = inputs.len() as u32;
        let degraded = AtomicU32::new(0);
        let warnings = AtomicU32::new(0);

        let process_input = |input: BatchInput| -> BatchResult {
            let mut context = TransformContext::new();
            if let Some(emojis) = &input.emojis {
                context = context.with_emojis(emojis);
            }
            if let Some(mentions) = &input.mentions {
                context = context.with_mentions(mentions);
            }
            let output = self.run(&input.content, &context);

            if is_degraded(&output.diagnostics) {
                degraded.fetch_add(1, Ordering::Relaxed);
            }
            warnings.fetch_add(output.diagnostics.count() as u32, Ordering::Relaxed);
            BatchResult {
                id: input.id,
                nodes: output.nodes,
                diagnostics: output.diagnostics,
            }
        };

        let results: Vec<BatchResult> = match pool {
            Some(pool) => pool.install(|| inputs.into_par_iter().map(process_input).collect()),
            None => inputs.into_par_iter().map(process_input).collect(),
        };

        let elapsed = start.elapsed();
        BatchOutput {
            results,
            stats: BatchStats {
                total,
                degraded: degraded.load(Ordering::Relaxed),
                warnings: warnings.load(Ordering::Relaxed),
                processing_time_ms: elapsed.as_secs_f64() * 1000.0,
            },
        }
    }
}

/// Transforms many statuses in parallel with shared options.
pub fn transform_batch(inputs: Vec<BatchInput>, options: &BatchOptions) -> BatchOutput {
    ContentPipeline::new(options.options.clone()).run_batch(inputs, options.max_threads)
}
