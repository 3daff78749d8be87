//! Column-aligned text output.

use tabled::{settings::Style, Table, Tabled};

use super::model::{LogDirDescriptor, MoveOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct LogDirRow {
    #[tabled(rename = "DIR")]
    pub dir: String,
    #[tabled(rename = "DIR ERR")]
    pub dir_error: String,
    #[tabled(rename = "TOPIC")]
    pub topic: String,
    #[tabled(rename = "PARTITION")]
    pub partition: String,
    #[tabled(rename = "SIZE")]
    pub size: String,
    #[tabled(rename = "OFFSET LAG")]
    pub offset_lag: String,
    #[tabled(rename = "IS FUTURE")]
    pub is_future: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct MoveRow {
    #[tabled(rename = "TOPIC")]
    pub topic: String,
    #[tabled(rename = "PARTITION")]
    pub partition: i32,
    #[tabled(rename = "ERROR")]
    pub error: String,
}

/// One row per partition, or a single row for a directory that reported an error.
pub fn log_dir_rows(dirs: &[LogDirDescriptor]) -> Vec<LogDirRow> {
    let mut rows = vec![];
    for dir in dirs {
        if let Some(error) = dir.error {
            rows.push(LogDirRow {
                dir: dir.path.clone(),
                dir_error: error.to_string(),
                topic: String::new(),
                partition: String::new(),
                size: String::new(),
                offset_lag: String::new(),
                is_future: String::new(),
            });
            continue;
        }

        for topic in &dir.topics {
            for partition in &topic.partitions {
                rows.push(LogDirRow {
                    dir: dir.path.clone(),
                    dir_error: String::new(),
                    topic: topic.topic.clone(),
                    partition: partition.partition.to_string(),
                    size: partition.size.to_string(),
                    offset_lag: partition.offset_lag.to_string(),
                    is_future: partition.is_future.to_string(),
                });
            }
        }
    }
    rows
}

pub fn move_rows(outcomes: &[MoveOutcome]) -> Vec<MoveRow> {
    outcomes
        .iter()
        .map(|outcome| MoveRow {
            topic: outcome.topic.clone(),
            partition: outcome.partition,
            error: outcome.error.map(|e| e.to_string()).unwrap_or_default(),
        })
        .collect()
}

pub fn render_log_dirs(dirs: &[LogDirDescriptor]) -> String {
    table(log_dir_rows(dirs))
}

pub fn render_moves(outcomes: &[MoveOutcome]) -> String {
    table(move_rows(outcomes))
}

fn table<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::blank());
    table.to_string()
}
