// ==========================================
// 冷链仓储入库收货系统 - 应答契约
// ==========================================
// 每次扫码提交返回: 错误文案/提示文案 (至多其一)、
// 当前步骤、字段覆盖列表、可选负载、可用功能键
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::ReceivingStep;
use crate::i18n;

// ===== 终端路由令牌 (提示文案通道，终端外壳消费) =====
pub const INFO_MAIN_MENU: &str = "RFINBOUNDMAINMENU";
pub const INFO_DYNAMIC_WAREHOUSE: &str = "DYNAMICWAREHOUSE";
pub const INFO_MERGE_PALLETS: &str = "MergePallets";
pub const INFO_LOADING: &str = "LOADING";

/// 扫码请求: 终端一次提交一个字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub input: String,
}

impl ScanRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// 功能键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKey {
    Exit,     // F5 退出
    SkipLot,  // F4 跳过批号
    SkipDate, // F2 跳过日期
    Label,    // F8 标签
    Dims,     // F7 尺寸
}

impl FunctionKey {
    pub fn key(&self) -> &'static str {
        match self {
            FunctionKey::Exit => "F5",
            FunctionKey::SkipLot => "F4",
            FunctionKey::SkipDate => "F2",
            FunctionKey::Label => "F8",
            FunctionKey::Dims => "F7",
        }
    }

    pub fn label(&self) -> String {
        match self {
            FunctionKey::Exit => i18n::t("keys.f5_exit"),
            FunctionKey::SkipLot => i18n::t("keys.f4_skip_lot"),
            FunctionKey::SkipDate => i18n::t("keys.f2_skip_date"),
            FunctionKey::Label => i18n::t("keys.f8_label"),
            FunctionKey::Dims => i18n::t("keys.f7_dims"),
        }
    }
}

/// 字段覆盖 (装饰终端字段; 核心只写不读)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldOverride {
    pub key: String,
    pub label: Option<String>,
    pub value: Option<String>,
    pub default_value: Option<String>,
    pub max_length: Option<i64>,
    pub readonly: bool,
    pub hidden: bool,
}

impl FieldOverride {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn max_length(mut self, len: i64) -> Self {
        if len > 0 {
            self.max_length = Some(len);
        }
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// 扫码应答
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub error: Option<String>,
    pub info: Option<String>,
    pub step: ReceivingStep,
    pub fields: Vec<FieldOverride>,
    pub payload: Option<serde_json::Value>,
    pub function_keys: Vec<FunctionKey>,
}

impl Response {
    pub fn ok(step: ReceivingStep) -> Self {
        Self {
            error: None,
            info: None,
            step,
            fields: Vec::new(),
            payload: None,
            function_keys: vec![FunctionKey::Exit],
        }
    }

    /// 错误应答: 步骤与会话保持不变
    pub fn error(step: ReceivingStep, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::ok(step)
        }
    }

    /// 提示应答: 可以改变上下文，不代表失败
    pub fn info(step: ReceivingStep, message: impl Into<String>) -> Self {
        Self {
            info: Some(message.into()),
            ..Self::ok(step)
        }
    }

    pub fn with_field(mut self, field: FieldOverride) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_keys(mut self, keys: Vec<FunctionKey>) -> Self {
        self.function_keys = keys;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_carries_at_most_one_message() {
        let err = Response::error(ReceivingStep::Batch, "boom");
        assert!(err.error.is_some() && err.info.is_none());

        let info = Response::info(ReceivingStep::Batch, "hint");
        assert!(info.info.is_some() && info.error.is_none());
    }

    #[test]
    fn test_field_override_builder() {
        let f = FieldOverride::new("qty")
            .label("数量")
            .default_value("12")
            .max_length(0);
        assert_eq!(f.key, "qty");
        assert!(f.max_length.is_none());
        assert_eq!(f.default_value.as_deref(), Some("12"));
    }
}
