//! Terminal progress bars fed by pipeline events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::{PipelineEvent, PipelineStage, PipelineStatus};

const PROGRESS_TEMPLATE: &str = "{prefix:>10} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";
const PROGRESS_CHARS: &str = "█▓▒░ ";

fn stage_bar(stage: PipelineStage, total: usize, hidden: bool) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if hidden {
        bar.set_draw_target(ProgressDrawTarget::hidden());
    }
    let style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars(PROGRESS_CHARS));
    bar.set_style(style);
    bar.set_prefix(stage.as_str());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Spawn a task that renders pipeline events as one bar per stage.
///
/// Returns the sender to hand to the pipeline and the render task; the task
/// ends once every sender is dropped.
pub fn spawn_progress_renderer(hidden: bool) -> (mpsc::Sender<PipelineEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(256);

    let handle = tokio::spawn(async move {
        let mut current: Option<(PipelineStage, ProgressBar)> = None;

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Progress(progress) => {
                    let bar = match &current {
                        Some((stage, bar)) if *stage == progress.stage => bar.clone(),
                        _ => {
                            if let Some((_, previous)) = current.take() {
                                previous.finish();
                            }
                            let bar = stage_bar(progress.stage, progress.total, hidden);
                            current = Some((progress.stage, bar.clone()));
                            bar
                        }
                    };
                    bar.set_length(progress.total as u64);
                    bar.set_position((progress.processed + progress.failed) as u64);
                    match progress.status {
                        PipelineStatus::Running => {
                            if progress.failed > 0 {
                                bar.set_message(format!("{} failed", progress.failed));
                            }
                        }
                        PipelineStatus::Completed => bar.finish_with_message(format!(
                            "done ({} failed)",
                            progress.failed
                        )),
                        PipelineStatus::Cancelled => bar.abandon_with_message("cancelled"),
                    }
                }
                PipelineEvent::UnitFailed { unit, .. } => {
                    if let Some((_, bar)) = &current {
                        bar.set_message(format!("failed: {unit}"));
                    }
                }
            }
        }

        if let Some((_, bar)) = current {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    });

    (tx, handle)
}
