use std::collections::BTreeMap;

use pt_lifecycle::LifecycleStatus;
use serde_json::{Map, Value};

use crate::AllowedStatuses;

/// Copy of `data` with only the buckets `allowed` may see.
pub fn filter_by_permission<T: Clone>(
    data: &BTreeMap<LifecycleStatus, T>,
    allowed: &AllowedStatuses,
) -> BTreeMap<LifecycleStatus, T> {
    data.iter()
        .filter(|(status, _)| allowed.allows(**status))
        .map(|(status, v)| (*status, v.clone()))
        .collect()
}

/// JSON counterpart of [`filter_by_permission`].
///
/// Top-level keys that parse as a status code or label are filtered; any
/// other key (totals, metadata) is kept. Non-object values come back as-is.
pub fn filter_json_by_permission(value: &Value, allowed: &AllowedStatuses) -> Value {
    let Value::Object(obj) = value else {
        return value.clone();
    };
    let kept: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| match k.parse::<LifecycleStatus>() {
            Ok(status) => allowed.allows(status),
            Err(_) => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_lifecycle::status_map;
    use serde_json::json;

    #[test]
    fn all_passes_everything() {
        let data = status_map(|_| 1u64);
        assert_eq!(filter_by_permission(&data, &AllowedStatuses::All), data);
    }

    #[test]
    fn empty_set_yields_empty_map() {
        let data = status_map(|_| 1u64);
        assert!(filter_by_permission(&data, &AllowedStatuses::none()).is_empty());
    }

    #[test]
    fn json_keeps_non_status_keys() {
        let v = json!({
            "total": 9,
            "cut": 3,
            "已入库": 4,
            "shipped": 2,
        });
        let allowed = AllowedStatuses::only([LifecycleStatus::Cut]);
        assert_eq!(
            filter_json_by_permission(&v, &allowed),
            json!({ "total": 9, "cut": 3 })
        );
    }

    #[test]
    fn json_non_object_untouched() {
        let v = json!([1, 2, 3]);
        assert_eq!(filter_json_by_permission(&v, &AllowedStatuses::none()), v);
    }
}
