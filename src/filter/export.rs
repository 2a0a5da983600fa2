use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use crate::encode::codec::{CodecCandidate, CodecProbe, negotiate};
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::filter::chain::{FilterGraph, FilterOptions, build_complete_chain};
use crate::foundation::error::{VeilError, VeilResult};
use crate::config::ExportConfig;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::orchestrator::{ExportRequest, Session};
use crate::pipeline::progress::{ExportState, ProgressReporter, render_band};

/// Result of a filter-graph export.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOutcome {
    pub output: PathBuf,
    pub mime: String,
    pub graph: FilterGraph,
}

/// One event parsed from `ffmpeg -progress` output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum ProgressEvent {
    /// Encoded up to this timestamp (seconds).
    OutTime(f64),
    End,
}

/// Parse a single `key=value` line of `-progress` output.
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Both keys carry microseconds.
        "out_time_us" | "out_time_ms" => value
            .parse::<i64>()
            .ok()
            .filter(|us| *us >= 0)
            .map(|us| ProgressEvent::OutTime(us as f64 / 1_000_000.0)),
        "progress" if value == "end" => Some(ProgressEvent::End),
        _ => None,
    }
}

/// Applies the whole composition in a single `ffmpeg -filter_complex` pass instead of
/// stepping frames.
#[derive(Clone, Debug)]
pub struct FilterExport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Map the source audio into the output when present.
    pub has_audio: bool,
}

impl FilterExport {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, has_audio: bool) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            has_audio,
        }
    }

    pub(crate) fn command_args(
        &self,
        graph: &FilterGraph,
        codec: &CodecCandidate,
        video_bps: u64,
        audio_bps: u64,
    ) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-nostats", "-progress", "pipe:1", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(self.input.display().to_string());
        args.extend([
            "-filter_complex".to_string(),
            graph.graph.clone(),
            "-map".to_string(),
            format!("[{}]", graph.output_label),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-c:v".to_string(),
            codec.video_encoder.clone(),
            "-b:v".to_string(),
            video_bps.to_string(),
        ]);
        match (self.has_audio, codec.audio_encoder.as_deref()) {
            (true, Some(enc)) => args.extend([
                "-map".to_string(),
                "0:a?".to_string(),
                "-c:a".to_string(),
                enc.to_string(),
                "-b:a".to_string(),
                audio_bps.to_string(),
            ]),
            _ => args.push("-an".to_string()),
        }
        args.extend(["-f".to_string(), codec.container.clone()]);
        args.push(self.output.display().to_string());
        args
    }

    /// Run the export under `session`'s lock, reporting progress and honouring its cancel token.
    #[tracing::instrument(level = "info", skip_all, fields(input = %self.input.display(), output = %self.output.display()))]
    pub fn run(
        &self,
        session: Session,
        ffmpeg_bin: &str,
        probe: &dyn CodecProbe,
    ) -> VeilResult<FilterOutcome> {
        let (token, request, config, cancel, mut reporter) = session.into_parts();
        reporter.state(ExportState::Initializing);
        reporter.progress(0);

        let result = self.execute(&request, &config, &cancel, &mut reporter, ffmpeg_bin, probe);

        match &result {
            Ok(outcome) => {
                reporter.progress(100);
                reporter.state(ExportState::Complete);
                tracing::info!(output = %outcome.output.display(), "filter export complete");
            }
            Err(e) => {
                reporter.state(ExportState::Failed);
                tracing::error!(error = %e, "filter export failed");
            }
        }
        drop(token);
        result
    }

    fn execute(
        &self,
        request: &ExportRequest,
        config: &ExportConfig,
        cancel: &CancelToken,
        reporter: &mut ProgressReporter,
        ffmpeg_bin: &str,
        probe: &dyn CodecProbe,
    ) -> VeilResult<FilterOutcome> {
        let graph = build_complete_chain(
            &request.regions,
            &request.texts,
            &request.metadata,
            &FilterOptions::from(config),
        )?;
        tracing::debug!(graph = %graph.graph, "filter graph built");
        reporter.progress(5);

        let codec = negotiate(&config.codec_candidates, probe, self.has_audio)?;
        tracing::info!(mime = %codec.mime, "codec negotiated");
        ensure_parent_dir(&self.output)?;
        cancel.check()?;
        reporter.progress(10);

        let args = self.command_args(
            &graph,
            &codec,
            config.video_bits_per_second,
            config.audio_bits_per_second,
        );
        let mut child = Command::new(ffmpeg_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VeilError::media(format!(
                    "failed to spawn {ffmpeg_bin} (is it installed and on PATH?): {e}"
                ))
            })?;
        let stderr = child.stderr.take();
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut bytes)?;
            }
            Ok::<_, std::io::Error>(bytes)
        });
        reporter.progress(15);
        reporter.state(ExportState::Rendering);

        // From here on every exit reaps the child and joins the drain.
        let status = match follow_progress(&mut child, request.metadata.duration, cancel, reporter)
        {
            Ok(()) => child
                .wait()
                .map_err(|e| VeilError::media(format!("failed to wait for ffmpeg: {e}"))),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(e)
            }
        };
        let stderr_bytes = stderr_drain
            .join()
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        let status = match status {
            Ok(status) if cancel.is_cancelled() => {
                tracing::debug!(%status, "ffmpeg finished after cancellation");
                Err(VeilError::Cancelled)
            }
            other => other,
        };
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                let _ = std::fs::remove_file(&self.output);
                return Err(e);
            }
        };

        reporter.progress(90);
        reporter.state(ExportState::Finalizing);
        if !status.success() {
            let _ = std::fs::remove_file(&self.output);
            return Err(VeilError::media(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        reporter.progress(95);
        Ok(FilterOutcome {
            output: self.output.clone(),
            mime: codec.mime,
            graph,
        })
    }
}

/// Read `-progress` output until ffmpeg reports the end or closes stdout.
fn follow_progress(
    child: &mut Child,
    duration: f64,
    cancel: &CancelToken,
    reporter: &mut ProgressReporter,
) -> VeilResult<()> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| VeilError::media("failed to open ffmpeg stdout (unexpected)"))?;
    let duration = duration.max(f64::EPSILON);
    let total_us = (duration * 1_000_000.0) as u64;
    for line in BufReader::new(stdout).lines() {
        let line = line.map_err(|e| VeilError::media(format!("ffmpeg progress read: {e}")))?;
        cancel.check()?;
        match parse_progress_line(&line) {
            Some(ProgressEvent::OutTime(secs)) => {
                let done_us = (secs.min(duration) * 1_000_000.0) as u64;
                reporter.progress(render_band(done_us, total_us));
            }
            Some(ProgressEvent::End) => break,
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filter/export.rs"]
mod tests;
