//! Synchronizer / exporter 指标收集模块
//!
//! 基于 SyncTuple 收集和统计同步运行指标。

use std::collections::BTreeMap;
use std::fmt;

use contracts::SyncTuple;
use metrics::{counter, gauge, histogram};

/// 从 SyncTuple 记录指标
///
/// 每次产生 SyncTuple 时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_tuple_metrics;
///
/// if let Some(tuple) = synchronizer.push(record)? {
///     record_tuple_metrics(&tuple);
///     // ...
/// }
/// ```
pub fn record_tuple_metrics(tuple: &SyncTuple) {
    counter!("rgbd_export_tuples_total").increment(1);
    gauge!("rgbd_export_last_tuple_id").set(tuple.tuple_id as f64);
    histogram!("rgbd_export_tuple_spread_ms").record(tuple.spread() * 1000.0);

    for record in &tuple.records {
        counter!(
            "rgbd_export_tuple_members_total",
            "stream" => record.stream.to_string()
        )
        .increment(1);
    }
}

/// 记录读取的记录
pub fn record_record_read(stream: &str, inserted: bool) {
    let status = if inserted { "inserted" } else { "skipped" };
    counter!(
        "rgbd_export_records_total",
        "stream" => stream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录帧写出
pub fn record_frame_written(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "rgbd_export_frames_written_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录队列深度
pub fn record_queue_depth(stream: &str, depth: usize) {
    gauge!(
        "rgbd_export_queue_depth",
        "stream" => stream.to_string()
    )
    .set(depth as f64);
}

/// Tuple 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct TupleMetricsAggregator {
    /// 总 tuple 数
    pub total_tuples: u64,

    /// 各流参与 tuple 的次数
    pub member_counts: BTreeMap<String, u64>,

    /// spread 统计 (毫秒)
    pub spread_stats: SampleStats,

    /// 相邻 tuple 的时间间隔统计 (毫秒)
    pub interval_stats: SampleStats,

    last_t_sync_ns: Option<i64>,
}

impl TupleMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, tuple: &SyncTuple) {
        self.total_tuples += 1;

        for record in &tuple.records {
            *self
                .member_counts
                .entry(record.stream.to_string())
                .or_insert(0) += 1;
        }

        self.spread_stats.push(tuple.spread() * 1000.0);

        if let Some(last) = self.last_t_sync_ns {
            self.interval_stats
                .push((tuple.t_sync_ns - last) as f64 / 1e6);
        }
        self.last_t_sync_ns = Some(tuple.t_sync_ns);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_tuples: self.total_tuples,
            member_counts: self.member_counts.clone(),
            spread_ms: self.spread_stats,
            interval_ms: self.interval_stats,
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_tuples: u64,
    pub member_counts: BTreeMap<String, u64>,
    pub spread_ms: SampleStats,
    pub interval_ms: SampleStats,
}

impl MetricsSummary {
    /// 某个流出现在 tuple 中的比例 (百分比)
    pub fn coverage(&self, stream: &str) -> f64 {
        match (self.total_tuples, self.member_counts.get(stream)) {
            (0, _) | (_, None) => 0.0,
            (total, Some(&n)) => n as f64 / total as f64 * 100.0,
        }
    }
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tuples: {}", self.total_tuples)?;
        writeln!(f, "spread_ms: {}", self.spread_ms)?;
        writeln!(f, "interval_ms: {}", self.interval_ms)?;
        for (stream, count) in &self.member_counts {
            writeln!(f, "  {stream}: {count} ({:.2}%)", self.coverage(stream))?;
        }
        Ok(())
    }
}

/// 毫秒样本的 min / mean / max
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    count: u64,
    sum: f64,
    range: Option<(f64, f64)>,
}

impl SampleStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.range = Some(match self.range {
            Some((lo, hi)) => (lo.min(value), hi.max(value)),
            None => (value, value),
        });
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// 无样本时为 `None`
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.range.map(|(lo, _)| lo)
    }

    pub fn max(&self) -> Option<f64> {
        self.range.map(|(_, hi)| hi)
    }
}

impl fmt::Display for SampleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.range, self.mean()) {
            (Some((lo, hi)), Some(mean)) => {
                write!(f, "{lo:.3} / {mean:.3} / {hi:.3} (n={})", self.count)
            }
            _ => f.write_str("-"),
        }
    }
}
