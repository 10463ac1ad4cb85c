use crate::domain::pledge::{PledgeState, PollSchedule};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, Serialize, PartialEq)]
pub struct ScheduleRow {
    pub elapsed_ms: u64,
    pub delay_ms: u64,
}

/// Lays out every poll a watcher would make for a status stuck in `state`.
pub fn schedule_rows(schedule: &PollSchedule, state: PledgeState) -> Result<Vec<ScheduleRow>> {
    let schedule = schedule.validate()?;
    let mut rows = Vec::new();
    let mut elapsed = Duration::ZERO;
    while let Some(delay) = schedule.next_delay(elapsed, state) {
        rows.push(ScheduleRow {
            elapsed_ms: elapsed.as_millis() as u64,
            delay_ms: delay.as_millis() as u64,
        });
        elapsed += delay;
    }
    Ok(rows)
}

/// Writes a poll schedule as CSV.
pub struct ScheduleWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ScheduleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes the header and one row per poll; returns the number of polls.
    pub fn write_schedule(&mut self, schedule: &PollSchedule, state: PledgeState) -> Result<usize> {
        let rows = schedule_rows(schedule, state)?;
        if rows.is_empty() {
            self.writer.write_record(["elapsed_ms", "delay_ms"])?;
        }
        for row in &rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(rows.len())
    }
}
