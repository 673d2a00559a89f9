use crate::domain::product::ProductSnapshot;

/// 批号重量整算
///
/// 抓重品种且存在明细行: 净重 = 明细净重合计，毛重 = 净重 + 皮重×数量
/// 其余: 按品种主数据单件重量 × 数量
///
/// # 返回
/// - (毛重, 净重)
pub fn lot_weights(
    product: Option<&ProductSnapshot>,
    detail_net: Option<f64>,
    qty: i64,
) -> (f64, f64) {
    let product = match product {
        Some(p) => p,
        None => return (0.0, 0.0),
    };
    let qty = qty as f64;

    if product.is_catch_weight() {
        if let Some(net) = detail_net {
            let gross = net + product.tare_weight * qty;
            return (gross, net);
        }
    }
    (product.gross_weight * qty, product.net_weight * qty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(catch: &str) -> ProductSnapshot {
        ProductSnapshot {
            customer_code: "CUST01".to_string(),
            owner_code: "CUST01".to_string(),
            product_group: "".to_string(),
            product_code: "PROD1".to_string(),
            supplier_product: "".to_string(),
            catch_weight: catch.to_string(),
            net_weight: 9.0,
            gross_weight: 10.0,
            tare_weight: 1.0,
            date_type: "".to_string(),
            best_by_type: "".to_string(),
            blast_room: "".to_string(),
            blast_hours: 0,
            is_hpp: false,
            tie: 0,
            high: 0,
            width: 0.0,
            height: 0.0,
            length: 0.0,
        }
    }

    #[test]
    fn test_master_weights_when_not_catch() {
        let p = product("N");
        assert_eq!(lot_weights(Some(&p), Some(999.0), 10), (100.0, 90.0));
    }

    #[test]
    fn test_catch_weight_uses_detail_rows() {
        let p = product("I");
        // 净重 = 明细合计 85, 毛重 = 85 + 1.0*10
        assert_eq!(lot_weights(Some(&p), Some(85.0), 10), (95.0, 85.0));
        // 无明细行回落主数据
        assert_eq!(lot_weights(Some(&p), None, 10), (100.0, 90.0));
    }

    #[test]
    fn test_missing_product_gives_zero() {
        assert_eq!(lot_weights(None, Some(85.0), 10), (0.0, 0.0));
    }
}
