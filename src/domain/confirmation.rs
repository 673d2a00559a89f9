// ==========================================
// 冷链仓储入库收货系统 - 发运确认单
// ==========================================
// 入库批次可关联确认单; 结算时校准完成时间并级联同单批次
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentConfirmation {
    pub confirmation_no: String,
    pub start_at: Option<NaiveDateTime>,
    pub finish_at: Option<NaiveDateTime>,
    pub live_drop: String,     // D=甩挂落场
    pub reuse_trailer: bool,   // 挂车是否复用
}

impl ShipmentConfirmation {
    /// 甩挂且不复用挂车时需要通知场内移车
    pub fn needs_yard_move(&self) -> bool {
        self.live_drop == "D" && !self.reuse_trailer
    }
}
