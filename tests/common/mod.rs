#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use upscale_pipeline::adapters::waifu2x::Waifu2xCommand;
use upscale_pipeline::domain::ports::{
    CommandSpec, FormatConverter, ImageProbe, ProcessOutput, ProcessRunner, RunError,
};
use upscale_pipeline::{Orchestrator, ProbeResult, Result, UpscaleEngine};

/// Probe that reports a fixed result and counts calls.
pub struct FixedProbe {
    pub result: ProbeResult,
    pub calls: AtomicUsize,
}

impl FixedProbe {
    pub fn new(width: u32, height: u32, format: &str) -> Arc<Self> {
        Arc::new(Self {
            result: ProbeResult::new(width, height, format),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageProbe for FixedProbe {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn probe(&self, _path: &Path) -> Result<ProbeResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Converter that writes a marker file.
#[derive(Default)]
pub struct MarkerConverter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl FormatConverter for MarkerConverter {
    fn name(&self) -> &'static str {
        "marker"
    }

    async fn convert_to_png(&self, _source: &Path, destination: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(destination, b"converted")?;
        Ok(())
    }
}

/// Stands in for ImageMagick and waifu2x, dispatching on the program name.
pub struct FakeTools {
    /// What `magick ... info:` prints.
    pub identify: String,
    pub upscaler_fails: bool,
    pub upscaler_delay: Option<Duration>,
    pub commands: Mutex<Vec<CommandSpec>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Counts one running upscaler for as long as it lives.
struct Running<'a>(&'a AtomicUsize);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTools {
    pub fn new(identify: &str) -> Arc<Self> {
        Self::build(identify, false, None)
    }

    pub fn failing(identify: &str) -> Arc<Self> {
        Self::build(identify, true, None)
    }

    pub fn slow(identify: &str, delay: Duration) -> Arc<Self> {
        Self::build(identify, false, Some(delay))
    }

    fn build(identify: &str, upscaler_fails: bool, upscaler_delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            identify: identify.to_string(),
            upscaler_fails,
            upscaler_delay,
            commands: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    /// Most upscaler runs seen in flight at once.
    pub fn peak_upscalers(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(CommandSpec::display)
            .collect()
    }

    pub fn upscaler_calls(&self) -> Vec<Vec<String>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program.to_string_lossy().contains("waifu2x"))
            .map(|c| c.args.iter().map(|a| a.to_string_lossy().into_owned()).collect())
            .collect()
    }
}

fn ok(stdout: &str) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let i = args.iter().position(|a| a == flag)?;
    args.get(i + 1).cloned()
}

#[async_trait]
impl ProcessRunner for FakeTools {
    async fn run(
        &self,
        command: &CommandSpec,
        deadline: Option<Duration>,
    ) -> std::result::Result<ProcessOutput, RunError> {
        self.commands.lock().unwrap().push(command.clone());
        let program = command.program.to_string_lossy().into_owned();
        let args: Vec<String> = command
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        if program == "magick" {
            if args.last().map(String::as_str) == Some("info:") {
                return Ok(ok(&self.identify));
            }
            let target = args.last().cloned().unwrap_or_default();
            let path = target.strip_prefix("png:").unwrap_or(&target);
            std::fs::write(path, b"converted").unwrap();
            return Ok(ok(""));
        }

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = Running(&self.active);
        self.peak.fetch_max(running, Ordering::SeqCst);

        let output = flag_value(&args, "-o").expect("upscaler called without -o");

        if let Some(delay) = self.upscaler_delay {
            std::fs::write(&output, b"TRUNC").unwrap();
            match deadline {
                Some(deadline) if deadline < delay => {
                    tokio::time::sleep(deadline).await;
                    return Err(RunError::TimedOut { program, deadline });
                }
                _ => tokio::time::sleep(delay).await,
            }
        }

        if self.upscaler_fails {
            std::fs::write(&output, b"TRUNC").unwrap();
            return Ok(ProcessOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "out of GPU memory".to_string(),
            });
        }

        let scale = flag_value(&args, "-s").unwrap_or_default();
        std::fs::write(output, format!("upscaled x{}", scale)).unwrap();
        Ok(ok(""))
    }
}

/// Engine wired with a fixed probe, a marker converter and the fake tools.
pub fn engine_with(
    probe: Arc<FixedProbe>,
    converter: Arc<MarkerConverter>,
    tools: Arc<FakeTools>,
) -> UpscaleEngine {
    let orchestrator = Orchestrator::new(converter, tools, Waifu2xCommand::default());
    UpscaleEngine::new(probe, orchestrator)
}

pub fn write_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"source bytes").unwrap();
    path
}
