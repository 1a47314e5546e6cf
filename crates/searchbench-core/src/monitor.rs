//! Background resource monitoring for benchmark spans.
//!
//! A monitor samples the current process at a fixed interval between
//! `start` and `stop` and keeps every reading, so a span can be
//! summarized into average and peak CPU / memory. Sampling failures are
//! swallowed: a reading that cannot be taken is simply not recorded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// One point-in-time reading of the current process.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

/// Aggregate resource usage over a monitored span.
/// A span with no samples summarizes to all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub avg_cpu_percent: f64,
    pub peak_cpu_percent: f64,
    pub avg_memory_mb: f64,
    pub peak_memory_mb: f64,
}

/// Reads CPU and memory for the current process. CPU usage is relative
/// to the previous read, so the first reading of a probe reports 0.
struct ProcessProbe {
    sys: System,
    pid: Pid,
}

impl ProcessProbe {
    fn current() -> Self {
        Self {
            sys: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }

    fn read(&mut self) -> Option<ResourceSample> {
        let pids = [self.pid];
        self.sys.refresh_processes(ProcessesToUpdate::Some(&pids), true);
        let process = self.sys.process(self.pid)?;
        Some(ResourceSample {
            cpu_percent: process.cpu_usage(),
            memory_mb: process.memory() as f64 / (1024.0 * 1024.0),
        })
    }
}

struct Shared {
    probe: Mutex<ProcessProbe>,
    samples: Mutex<Vec<ResourceSample>>,
    active: AtomicBool,
}

impl Shared {
    fn record(&self) {
        if !self.active.load(Ordering::Relaxed) {
            return;
        }
        let sample = match self.probe.lock() {
            Ok(mut probe) => probe.read(),
            Err(_) => None,
        };
        if let Some(sample) = sample {
            if let Ok(mut samples) = self.samples.lock() {
                samples.push(sample);
            }
        }
    }
}

/// Samples the current process in the background between `start` and
/// `stop`. `record` can take extra samples on demand from any thread
/// while a span is active.
pub struct ResourceMonitor {
    interval: Duration,
    shared: Arc<Shared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_SAMPLE_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared {
                probe: Mutex::new(ProcessProbe::current()),
                samples: Mutex::new(Vec::new()),
                active: AtomicBool::new(false),
            }),
            handle: None,
        }
    }

    /// Begin a monitored span. Samples from any previous span are
    /// discarded and the background sampling thread is spawned.
    pub fn start(&mut self) {
        self.shutdown();
        if let Ok(mut samples) = self.shared.samples.lock() {
            samples.clear();
        }
        self.shared.active.store(true, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        self.handle = Some(thread::spawn(move || {
            while shared.active.load(Ordering::Relaxed) {
                shared.record();
                thread::sleep(interval);
            }
        }));
    }

    /// Take one sample immediately, in addition to the periodic ones.
    /// A no-op outside an active span.
    pub fn record(&self) {
        self.shared.record();
    }

    /// End the span and summarize everything sampled since `start`.
    /// Safe to call again; repeated calls return the same summary.
    pub fn stop(&mut self) -> ResourceUsage {
        self.shutdown();
        match self.shared.samples.lock() {
            Ok(samples) => summarize_usage(&samples),
            Err(_) => ResourceUsage::default(),
        }
    }

    fn shutdown(&mut self) {
        self.shared.active.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Aggregate a sequence of samples into averages and peaks.
pub fn summarize_usage(samples: &[ResourceSample]) -> ResourceUsage {
    if samples.is_empty() {
        return ResourceUsage::default();
    }
    let mut usage = ResourceUsage::default();
    for sample in samples {
        let cpu = f64::from(sample.cpu_percent);
        usage.avg_cpu_percent += cpu;
        usage.avg_memory_mb += sample.memory_mb;
        if cpu > usage.peak_cpu_percent {
            usage.peak_cpu_percent = cpu;
        }
        if sample.memory_mb > usage.peak_memory_mb {
            usage.peak_memory_mb = sample.memory_mb;
        }
    }
    let n = samples.len() as f64;
    usage.avg_cpu_percent /= n;
    usage.avg_memory_mb /= n;
    usage
}
