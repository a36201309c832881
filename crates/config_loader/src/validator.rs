//! 配置校验模块
//!
//! 校验规则：
//! - 流名称非空且互不相同
//! - queue_size >= 1, slop 为有限非负数
//! - 时间范围 0 <= start <= end
//! - 输入/导出路径非空，导出格式可识别

use std::collections::HashSet;

use contracts::{ContractError, ExportBlueprint};
use validator::Validate;

/// 校验 ExportBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
    validate_paths(blueprint)?;
    validate_streams(blueprint)?;
    validate_sync(blueprint)?;
    validate_range(blueprint)?;
    blueprint.export_format()?;
    Ok(())
}

fn validate_paths(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
    if blueprint.input.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "input.path",
            "input path cannot be empty",
        ));
    }
    if blueprint.export.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "export.path",
            "export path cannot be empty",
        ));
    }
    Ok(())
}

/// 校验流名称
fn validate_streams(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
    let streams = &blueprint.streams;
    let roles = [
        ("colour", Some(&streams.colour)),
        ("depth", Some(&streams.depth)),
        ("info", Some(&streams.info)),
        ("pose", streams.pose.as_ref()),
    ];

    let mut seen = HashSet::new();
    for (role, name) in roles {
        let Some(name) = name else { continue };
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("streams.{role}"),
                "stream name cannot be empty",
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ContractError::config_validation(
                format!("streams.{role}"),
                format!("duplicate stream '{name}'"),
            ));
        }
    }
    Ok(())
}

/// 校验同步参数
fn validate_sync(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
    let sync = &blueprint.sync;
    if !sync.slop.is_finite() {
        return Err(ContractError::config_validation(
            "sync.slop",
            format!("slop must be finite, got {}", sync.slop),
        ));
    }
    sync.validate()
        .map_err(|e| ContractError::config_validation("sync", e.to_string()))
}

/// 校验时间范围
fn validate_range(blueprint: &ExportBlueprint) -> Result<(), ContractError> {
    let Some(range) = blueprint.range else {
        return Ok(());
    };
    if !range.start.is_finite() || !range.end.is_finite() {
        return Err(ContractError::config_validation(
            "range",
            "range bounds must be finite",
        ));
    }
    if range.start < 0.0 {
        return Err(ContractError::config_validation(
            "range.start",
            format!("start must be >= 0, got {}", range.start),
        ));
    }
    if range.start > range.end {
        return Err(ContractError::config_validation(
            "range.start / range.end",
            format!(
                "start ({}) must be <= end ({})",
                range.start, range.end
            ),
        ));
    }
    Ok(())
}
