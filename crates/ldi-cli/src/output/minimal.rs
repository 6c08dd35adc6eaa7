use serde_json::Value;

use super::{flatten, format_scalar, result_of};

/// Key answer fields, most specific first. Matched against the last
/// segment of each flattened result key.
const PRIORITY_KEYS: [&str; 7] = [
    "notional",
    "years_to_full_funding",
    "years_at_zero_additional",
    "closest_duration_match",
    "price_pct_of_face",
    "dv01",
    "present_value",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    match result {
        Value::Object(map) => {
            let flat = flatten(map);
            match pick(&flat) {
                Some(val) => println!("{}", format_scalar(val)),
                None => match flat.first() {
                    Some((key, val)) => println!("{}: {}", key, format_scalar(val)),
                    None => println!("{{}}"),
                },
            }
        }
        _ => println!("{}", format_scalar(result)),
    }
}

fn pick(flat: &[(String, Value)]) -> Option<&Value> {
    PRIORITY_KEYS.iter().find_map(|wanted| {
        flat.iter()
            .find(|(key, val)| {
                !val.is_null() && key.rsplit('.').next() == Some(*wanted)
            })
            .map(|(_, val)| val)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_prefers_notional() {
        let v = json!({"hedge": {"hedge_ratio": "2", "notional": "1000"}, "liabilities": {"dv01": "5"}});
        let flat = flatten(v.as_object().unwrap());
        assert_eq!(pick(&flat), Some(&json!("1000")));
    }

    #[test]
    fn test_pick_skips_null() {
        let v = json!({"years_to_full_funding": null, "sweep": {"years_at_zero_additional": "14.9"}});
        let flat = flatten(v.as_object().unwrap());
        assert_eq!(pick(&flat), Some(&json!("14.9")));
    }
}
