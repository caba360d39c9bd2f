// Integration Test Utilities
//
// Builders for captured run directories (power stream, fork trace, root PID,
// timesheet) and experiment configs pointing at them.
#![allow(dead_code)]

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// A consumer present in every sample: (pid, exe, watts)
pub type Consumer<'a> = (u32, &'a str, f64);

/// Concatenated-object power stream, 1 Hz from `start`, readings in microwatts
pub fn power_stream(start: f64, samples: usize, host_watts: f64, consumers: &[Consumer]) -> String {
    (0..samples)
        .map(|i| {
            let t = start + i as f64;
            let consumers: Vec<_> = consumers
                .iter()
                .map(|(pid, exe, watts)| {
                    json!({
                        "pid": pid,
                        "exe": exe,
                        "cmdline": exe,
                        "timestamp": t,
                        "consumption": watts * 1_000_000.0,
                    })
                })
                .collect();
            json!({
                "host": {"timestamp": t, "consumption": host_watts * 1_000_000.0},
                "consumers": consumers,
            })
            .to_string()
        })
        .collect()
}

/// Keyed timesheet holding a single event
pub fn timesheet(name: &str, start: f64, end: f64) -> String {
    json!([{ name: {"start": start, "end": end, "duration": end - start} }]).to_string()
}

/// Captured inputs for one run
pub struct RunFixture {
    pub power: String,
    pub trace: Option<String>,
    pub root_pid: Option<u32>,
    pub timesheet: String,
}

impl RunFixture {
    /// 10 s of 100 W host power; worker 11 (child of 10) draws `worker_watts`,
    /// unrelated daemon 99 draws 1 W; block spans t = 1002..1006
    pub fn standard(worker_watts: f64) -> Self {
        Self {
            power: power_stream(
                1000.0,
                10,
                100.0,
                &[(11, "/usr/bin/worker", worker_watts), (99, "/usr/sbin/cron", 1.0)],
            ),
            trace: Some("sh (10) -> worker (11)\n".to_string()),
            root_pid: Some(10),
            timesheet: timesheet("block", 1002.0, 1006.0),
        }
    }

    pub fn write(&self, dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("power.json"), &self.power).unwrap();
        if let Some(trace) = &self.trace {
            fs::write(dir.join("ptrace.txt"), trace).unwrap();
        }
        if let Some(pid) = self.root_pid {
            fs::write(dir.join("rpid.txt"), format!("{}\n", pid)).unwrap();
        }
        fs::write(dir.join("timesheet.json"), &self.timesheet).unwrap();
    }
}

/// Write `experiment.toml` under `root` with results in `root/results`
pub fn write_config(root: &Path, images: &[&str], external: u32, extra: &str) -> PathBuf {
    let images: Vec<String> = images.iter().map(|i| format!("{:?}", i)).collect();
    let content = format!(
        "images = [{}]\nout = {:?}\n\n[procedure]\nexternal_repetitions = {}\ninternal_repetitions = 2\n{}",
        images.join(", "),
        root.join("results"),
        external,
        extra
    );
    let path = root.join("experiment.toml");
    fs::write(&path, content).unwrap();
    path
}
