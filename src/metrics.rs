//! Global metrics and the persisted metrics report.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use crate::irq::IrqKind;
use crate::process::ProcessTable;

/// Machine-wide counters, updated on every kernel entry (§4.8).
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalMetrics {
    pub total_ticks: i64,
    pub idle_ticks: i64,
    pub irq_counts: [u32; IrqKind::COUNT],
    pub preemptions: u32,
}

impl GlobalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_irq(&mut self, irq: IrqKind) {
        let idx = irq.index();
        if idx < self.irq_counts.len() {
            self.irq_counts[idx] += 1;
        }
    }

    /// Folds in the elapsed-time delta since the previous kernel entry.
    pub fn accumulate(&mut self, delta: i64, was_idle: bool) {
        self.total_ticks += delta;
        if was_idle {
            self.idle_ticks += delta;
        }
    }
}

/// Renders the metrics report in the format described in §6: global counters
/// first, then per-process counters, one block per process.
pub fn render(global: &GlobalMetrics, table: &ProcessTable) -> String {
    let total_preemptions: u32 = table.iter().map(|p| p.metrics.preemptions).sum();

    let mut out = String::new();
    let _ = writeln!(out, "KERNEL METRICS:\n");
    let _ = writeln!(out, "Total time: {}", global.total_ticks);
    let _ = writeln!(out, "Idle time: {}", global.idle_ticks);
    let _ = writeln!(out, "Process count: {}", table.len());
    let _ = writeln!(out, "Preemptions: {}", total_preemptions);
    for (i, count) in global.irq_counts.iter().enumerate() {
        let _ = writeln!(out, "Interrupt {}: {}", i, count);
    }

    let _ = writeln!(out, "\nPER-PROCESS METRICS:\n");
    for proc in table.iter() {
        let _ = writeln!(out, "Process {}", proc.id.0);
        let _ = writeln!(out, "Turnaround time: {}", proc.metrics.turnaround);
        let _ = writeln!(out, "Preemptions: {}", proc.metrics.preemptions);
        let _ = writeln!(out, "Response time: {}", proc.metrics.response_time());
        for state in 0..3 {
            let _ = writeln!(out, "Time in state {}: {}", state, proc.metrics.state_time[state]);
            let _ = writeln!(out, "Entries into state {}: {}", state, proc.metrics.state_entries[state]);
        }
        let _ = writeln!(out);
    }
    out
}

/// Writes the report to `metricas_so_<scheduler>.txt` under `dir`.
pub fn write_to_file(
    dir: &Path,
    scheduler: i32,
    global: &GlobalMetrics,
    table: &ProcessTable,
) -> io::Result<()> {
    let path = dir.join(format!("metricas_so_{}.txt", scheduler));
    fs::write(path, render(global, table))
}
